//! A complete editing session with a windowed-threshold tool.
//!
//! Builds a synthetic CT-like volume, marks a seed, previews a threshold
//! segmentation, narrows it to a region of interest and commits the result.
//!
//! Run with: `cargo run --example threshold_session`

use voxseg::*;

/// Marks every voxel whose sample falls into a configurable window.
struct WindowThreshold {
    lower: f64,
    upper: f64,
    active_label: LabelValue,
    revision: Revision,
}

impl WindowThreshold {
    fn new(lower: f64, upper: f64) -> Self {
        Self {
            lower,
            upper,
            active_label: 1,
            revision: Revision::now(),
        }
    }

    fn set_window(&mut self, lower: f64, upper: f64) {
        self.lower = lower;
        self.upper = upper;
        self.revision.touch();
    }
}

impl PreviewComputeStrategy for WindowThreshold {
    fn name(&self) -> &str {
        "window threshold"
    }

    fn compute_preview(
        &mut self,
        input: &ScalarFrame,
        _prior: Option<&LabelFrame>,
        time_step: usize,
    ) -> Result<LabelFrame> {
        log::info!(
            "thresholding time step {time_step} ({} voxels)",
            input.geometry().num_voxels()
        );
        let mut frame = LabelFrame::new_empty(*input.geometry());
        for idx in 0..frame.voxels().len() {
            if let Some(sample) = input.data().sample_as_f64(idx) {
                if sample >= self.lower && sample <= self.upper {
                    frame.voxels_mut()[idx] = self.active_label;
                }
            }
        }
        Ok(frame)
    }

    fn parameter_revision(&self) -> Revision {
        self.revision
    }

    fn prepare_update(&mut self, active_label: LabelValue) {
        self.active_label = active_label;
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

/// A blurry bright sphere in a dark volume.
fn synthetic_volume(dims: UVec3) -> ImageVolume {
    let geometry = VolumeGeometry::with_dims(dims);
    let center = dims.as_vec3() * 0.5;
    let radius = dims.x as f32 * 0.3;
    let mut samples = vec![0i16; geometry.num_voxels()];
    for (idx, sample) in samples.iter_mut().enumerate() {
        let position = geometry.unflatten_index(idx).as_vec3();
        let falloff = 1.0 - (position.distance(center) / radius).min(1.0);
        *sample = (falloff * 1000.0) as i16;
    }
    ImageVolume::from_frames(
        "synthetic ct",
        geometry,
        TimeGeometry::single_step(),
        vec![ScalarData::I16(samples)],
    )
    .expect("frame shape matches the geometry")
}

fn count_marked(volume: &LabelVolume, step: usize) -> usize {
    volume
        .frame(step)
        .map_or(0, |frame| frame.iter().filter(|&&v| v != 0).count())
}

fn main() -> Result<()> {
    init_logging();

    let dims = UVec3::new(32, 32, 32);
    let mut session = Session::new();
    session.add_reference_image(synthetic_volume(dims));

    let mut working = LabelVolume::new_empty(
        "segmentation",
        VolumeGeometry::with_dims(dims),
        TimeGeometry::single_step(),
    );
    working
        .labels_mut()
        .insert(Label::new(1, "lesion", Vec3::new(0.9, 0.2, 0.2)))?;
    session.add_working_labels(working);

    let tool = session.register_tool(Box::new(WindowThreshold::new(500.0, 1000.0)));
    session.activate_tool(Some(tool))?;

    // Watch the busy broadcast the way UI chrome would.
    session
        .active_tool_mut()
        .expect("tool was just activated")
        .pipeline_mut()
        .busy_events()
        .subscribe(|busy: &bool| {
            println!("busy: {busy}");
        });

    // The operator marks a seed near the bright center.
    session
        .active_tool_mut()
        .expect("tool is active")
        .controller_mut()
        .add_point(Vec3::new(16.0, 16.0, 16.0));

    session.update_preview(false)?;
    let preview_voxels = count_marked(
        session
            .active_tool()
            .expect("tool is active")
            .pipeline()
            .preview()
            .expect("preview exists after an update"),
        0,
    );
    println!("preview marks {preview_voxels} voxels");

    // Restrict the computation to a sub-window around the seed.
    session.set_region_of_interest(Some(Roi::new(
        UVec3::new(8, 8, 8),
        UVec3::new(16, 16, 16),
    )))?;

    // Loosen the window and commit.
    session
        .active_tool_mut()
        .expect("tool is active")
        .pipeline_mut()
        .strategy_as_mut::<WindowThreshold>()
        .expect("the registered tool is a window threshold")
        .set_window(400.0, 1000.0);
    session.confirm_segmentation()?;

    let working_id = session
        .storage()
        .first_of_role(DataRole::Working)
        .expect("working volume registered above");
    let committed = session
        .storage()
        .get(working_id)
        .and_then(DataNode::as_labels)
        .map_or(0, |labels| count_marked(labels, 0));
    println!("committed {committed} voxels into the working segmentation");

    Ok(())
}
