//! Pipeline behavior under failures, busy broadcasting and time-step
//! coverage.

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::*;
use voxseg::*;

#[test]
fn busy_broadcast_wraps_computation() {
    let mut session = session_with_data(1);
    let (strategy, _, _) = WindowThreshold::new(2.0, 3.0);
    let tool = session.register_tool(Box::new(strategy));
    session.activate_tool(Some(tool)).unwrap();

    let broadcasts = Rc::new(RefCell::new(Vec::new()));
    let sink = broadcasts.clone();
    session
        .active_tool_mut()
        .unwrap()
        .pipeline_mut()
        .busy_events()
        .subscribe(move |busy: &bool| sink.borrow_mut().push(*busy));

    session.update_preview(false).unwrap();
    assert_eq!(*broadcasts.borrow(), vec![true, false]);

    // A skipped (idempotent) update broadcasts nothing.
    session.update_preview(false).unwrap();
    assert_eq!(*broadcasts.borrow(), vec![true, false]);
}

#[test]
fn hook_failure_is_contained_and_retryable() {
    let mut session = session_with_data(1);
    let (strategy, calls, fail) = WindowThreshold::new(2.0, 3.0);
    let tool = session.register_tool(Box::new(strategy));
    session.activate_tool(Some(tool)).unwrap();

    let broadcasts = Rc::new(RefCell::new(Vec::new()));
    let sink = broadcasts.clone();
    session
        .active_tool_mut()
        .unwrap()
        .pipeline_mut()
        .busy_events()
        .subscribe(move |busy: &bool| sink.borrow_mut().push(*busy));

    fail.set(true);
    session.update_preview(false).unwrap();

    let pipeline = session.active_tool().unwrap().pipeline();
    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert!(pipeline.last_error().unwrap().contains("synthetic failure"));
    assert!(!pipeline.is_updating());
    assert_eq!(
        *broadcasts.borrow(),
        vec![true, false],
        "busy is cleared on the failure path"
    );
    assert_eq!(calls.get(), 1);

    // The session stays usable: fixing the cause and retrying succeeds.
    fail.set(false);
    session.update_preview(false).unwrap();
    let pipeline = session.active_tool().unwrap().pipeline();
    assert_eq!(pipeline.state(), PipelineState::Idle);
    assert!(pipeline.last_error().is_none());
    assert_eq!(calls.get(), 2);
}

#[test]
fn failure_keeps_last_known_good_of_other_steps() {
    let mut session = session_with_data(3);
    let (strategy, _, fail) = WindowThreshold::new(2.0, 3.0);
    let tool = session.register_tool(Box::new(strategy));
    session.activate_tool(Some(tool)).unwrap();

    session.update_preview(true).unwrap();
    let good_step_1 = session
        .active_tool()
        .unwrap()
        .pipeline()
        .preview()
        .unwrap()
        .frame(1)
        .unwrap()
        .to_vec();
    assert!(good_step_1.iter().any(|&v| v != 0));

    // Fail a recomputation of step 0 only.
    fail.set(true);
    session
        .active_tool_mut()
        .unwrap()
        .pipeline_mut()
        .strategy_as_mut::<WindowThreshold>()
        .unwrap()
        .set_window(1.0, 3.0);
    session.update_preview(false).unwrap();

    let preview = session.active_tool().unwrap().pipeline().preview().unwrap();
    assert_eq!(
        session.active_tool().unwrap().pipeline().state(),
        PipelineState::Failed
    );
    assert!(
        preview.frame(0).unwrap().iter().all(|&v| v == 0),
        "the failed step is cleared"
    );
    assert_eq!(
        preview.frame(1).unwrap(),
        good_step_1.as_slice(),
        "unaffected steps keep their last-known-good content"
    );
}

#[test]
fn confirm_fails_when_computation_fails() {
    let mut session = session_with_data(1);
    let (strategy, _, fail) = WindowThreshold::new(2.0, 3.0);
    let tool = session.register_tool(Box::new(strategy));
    session.activate_tool(Some(tool)).unwrap();

    fail.set(true);
    assert!(matches!(
        session.confirm_segmentation(),
        Err(VoxsegError::AlgorithmFailure(_))
    ));
    assert!(
        marked_count(&session) == 0,
        "nothing is committed on failure"
    );
}

fn marked_count(session: &Session) -> usize {
    working_of(session)
        .frame(0)
        .unwrap()
        .iter()
        .filter(|&&v| v != 0)
        .count()
}

#[test]
fn missing_input_makes_update_a_noop() {
    let mut session = session_with_data(1);
    let (strategy, calls, _) = WindowThreshold::new(2.0, 3.0);
    let tool = session.register_tool(Box::new(strategy));
    session.activate_tool(Some(tool)).unwrap();

    let reference = session.storage().first_of_role(DataRole::Reference).unwrap();
    session.storage_mut().remove(reference);

    session.update_preview(false).unwrap();
    assert_eq!(calls.get(), 0);
    assert_eq!(
        session.active_tool().unwrap().pipeline().state(),
        PipelineState::Idle
    );
}

#[test]
fn default_update_covers_only_the_selected_time_step() {
    let mut session = session_with_data(3);
    let (strategy, calls, _) = WindowThreshold::new(2.0, 3.0);
    let tool = session.register_tool(Box::new(strategy));
    session.activate_tool(Some(tool)).unwrap();

    session.update_preview(false).unwrap();
    assert_eq!(calls.get(), 1, "one hook call for the current step");

    // Moving the time point by itself does not recompute a non-lazy,
    // fully dynamic preview; the next explicit update does.
    session.set_selected_time_point(1.5).unwrap();
    assert_eq!(calls.get(), 1);
    session.update_preview(false).unwrap();
    assert_eq!(calls.get(), 2);
}

#[test]
fn confirm_covers_every_time_step() {
    let mut session = session_with_data(3);
    let (strategy, calls, _) = WindowThreshold::new(2.0, 3.0);
    let tool = session.register_tool(Box::new(strategy));
    session.activate_tool(Some(tool)).unwrap();

    session.update_preview(false).unwrap();
    session.confirm_segmentation().unwrap();
    assert_eq!(calls.get(), 4, "1 current-step call + 3 full-coverage calls");

    for step in 0..3 {
        let marked = working_of(&session)
            .frame(step)
            .unwrap()
            .iter()
            .filter(|&&v| v != 0)
            .count();
        assert_eq!(marked, 8, "time step {step} committed");
    }
}

#[test]
fn forced_coverage_is_idempotent_too() {
    let mut session = session_with_data(3);
    let (strategy, calls, _) = WindowThreshold::new(2.0, 3.0);
    let config = PreviewConfig {
        keep_active_after_accept: true,
        ..PreviewConfig::default()
    };
    let tool = session.register_tool_with_config(Box::new(strategy), config);
    session.activate_tool(Some(tool)).unwrap();

    session.update_preview(true).unwrap();
    assert_eq!(calls.get(), 3);
    session.update_preview(true).unwrap();
    assert_eq!(calls.get(), 3);

    // A commit right after a current full-coverage run recomputes nothing.
    session.confirm_segmentation().unwrap();
    assert_eq!(calls.get(), 3);
}

#[test]
fn lazy_dynamic_preview_follows_the_time_point() {
    let mut session = session_with_data(3);
    let (strategy, calls, _) = WindowThreshold::new(2.0, 3.0);
    let config = PreviewConfig {
        lazy_dynamic_previews: true,
        ..PreviewConfig::default()
    };
    let tool = session.register_tool_with_config(Box::new(strategy), config);
    session.activate_tool(Some(tool)).unwrap();

    session.update_preview(false).unwrap();
    assert_eq!(calls.get(), 1);

    // Lazy previews recompute the newly selected step automatically.
    session.set_selected_time_point(2.0).unwrap();
    assert_eq!(calls.get(), 2);

    // Unchanged time point: nothing to do.
    session.set_selected_time_point(2.0).unwrap();
    assert_eq!(calls.get(), 2);
}

#[test]
fn clearing_the_roi_restores_the_full_input() {
    let mut session = session_with_data(1);
    let (strategy, _, _) = WindowThreshold::new(2.0, 3.0);
    let tool = session.register_tool(Box::new(strategy));
    session.activate_tool(Some(tool)).unwrap();

    let roi = Roi::new(UVec3::new(1, 1, 0), UVec3::new(2, 2, 1));
    session.set_region_of_interest(Some(roi)).unwrap();
    assert_eq!(
        session
            .active_tool()
            .unwrap()
            .pipeline()
            .preview()
            .unwrap()
            .geometry()
            .dims(),
        UVec3::new(2, 2, 1)
    );
    assert!(session.storage().first_of_role(DataRole::Roi).is_some());

    session.set_region_of_interest(None).unwrap();
    assert_eq!(
        session
            .active_tool()
            .unwrap()
            .pipeline()
            .preview()
            .unwrap()
            .geometry()
            .dims(),
        DIMS
    );
    assert!(session.storage().first_of_role(DataRole::Roi).is_none());
}

#[test]
fn direct_pipeline_use_without_a_session() {
    let mut storage = DataStorage::new();
    storage.add(DataNode::new(
        "ct",
        DataRole::Reference,
        NodeData::Image(ramp_image(1)),
    ));
    storage.add(DataNode::new(
        "seg",
        DataRole::Working,
        NodeData::Labels(working_labels(1)),
    ));

    let (strategy, calls, _) = WindowThreshold::new(2.0, 3.0);
    let mut pipeline = PreviewPipeline::new(Box::new(strategy), PreviewConfig::default());
    pipeline.activate(&mut storage, 0.0).unwrap();
    pipeline.update_preview(&storage, false).unwrap();
    assert_eq!(calls.get(), 1);

    pipeline.confirm_segmentation(&mut storage, None).unwrap();
    assert!(!pipeline.is_active());
    let working = storage.first_of_role(DataRole::Working).unwrap();
    let marked = storage
        .get(working)
        .unwrap()
        .as_labels()
        .unwrap()
        .frame(0)
        .unwrap()
        .iter()
        .filter(|&&v| v != 0)
        .count();
    assert_eq!(marked, 8);
}
