//! The preview pipeline.
//!
//! A [`PreviewPipeline`] owns the transient preview volume of one editing
//! session. It assembles the algorithm input (full reference frame or ROI
//! crop) per time step, invokes the compute strategy only when something
//! actually changed, contains algorithm failures to a retryable failed
//! state, and commits accepted previews into the resolved target volume
//! under the label-transfer rules.

use std::collections::BTreeSet;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use voxseg_core::error::{Result, VoxsegError};
use voxseg_core::event::EventChannel;
use voxseg_core::geometry::Roi;
use voxseg_core::label::{Label, LabelValue};
use voxseg_core::revision::Revision;
use voxseg_core::storage::{DataNode, DataRole, DataStorage, NodeData, NodeId};
use voxseg_core::volume::{ImageVolume, LabelVolume};

use voxseg_interaction::PointSet;

use crate::strategy::PreviewComputeStrategy;
use crate::target::SegmentationTargetResolver;
use crate::transfer::{ensure_mapped_labels, transfer_frame, LabelMapping, MergeStyle};

/// Configuration of a preview pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewConfig {
    /// Recompute only the viewed time step until a full-coverage operation
    /// (commit) is requested.
    pub lazy_dynamic_previews: bool,
    /// Commit transfers every time step; otherwise only the one at the
    /// selected time point.
    pub create_all_time_steps: bool,
    /// Stay active after a successful commit instead of deactivating.
    pub keep_active_after_accept: bool,
    /// Reset discards preview content; otherwise the preview starts as a
    /// copy of the current target content. Also clears the preview after a
    /// commit.
    pub resets_to_empty_preview: bool,
    /// React to selected-time-point changes.
    pub time_point_change_aware: bool,
    /// Recolor the preview's active label with the preview color.
    pub use_preview_color: bool,
    /// Display color of preview content.
    pub preview_color: Vec3,
    /// Display opacity of the preview node.
    pub preview_opacity: f32,
    /// How commits combine with existing target content.
    pub merge_style: MergeStyle,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            lazy_dynamic_previews: false,
            create_all_time_steps: true,
            keep_active_after_accept: false,
            resets_to_empty_preview: true,
            time_point_change_aware: true,
            use_preview_color: true,
            preview_color: Vec3::new(0.0, 1.0, 0.0),
            preview_opacity: 0.3,
            merge_style: MergeStyle::Replace,
        }
    }
}

/// The computation states of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineState {
    /// Ready for updates and commits.
    #[default]
    Idle,
    /// A computation is in flight; further updates are rejected.
    Computing,
    /// The last computation failed; the session stays usable for a retry.
    Failed,
}

/// Computes, caches and commits a preview segmentation.
pub struct PreviewPipeline {
    config: PreviewConfig,
    strategy: Box<dyn PreviewComputeStrategy>,
    resolver: SegmentationTargetResolver,

    state: PipelineState,
    active: bool,
    reference_node: Option<NodeId>,
    roi: Option<Roi>,
    preview: Option<LabelVolume>,
    preview_node: Option<NodeId>,

    selected_time_point: f64,
    last_update_time_point: Option<f64>,
    last_input_revision: Revision,
    last_seed_revision: Revision,
    last_parameter_revision: Revision,
    last_coverage_all: bool,
    has_computed: bool,
    stale_steps: BTreeSet<usize>,
    last_error: Option<String>,
    user_defined_active_label: LabelValue,

    busy: EventChannel<bool>,
    refresh: EventChannel<()>,
}

impl PreviewPipeline {
    /// Creates a pipeline around a compute strategy.
    pub fn new(strategy: Box<dyn PreviewComputeStrategy>, config: PreviewConfig) -> Self {
        let resolver = SegmentationTargetResolver::new(strategy.name());
        Self {
            config,
            strategy,
            resolver,
            state: PipelineState::Idle,
            active: false,
            reference_node: None,
            roi: None,
            preview: None,
            preview_node: None,
            selected_time_point: 0.0,
            last_update_time_point: None,
            last_input_revision: Revision::default(),
            last_seed_revision: Revision::default(),
            last_parameter_revision: Revision::default(),
            last_coverage_all: false,
            has_computed: false,
            stale_steps: BTreeSet::new(),
            last_error: None,
            user_defined_active_label: 1,
            busy: EventChannel::new(),
            refresh: EventChannel::new(),
        }
    }

    /// Returns the tool name of the compute strategy.
    #[must_use]
    pub fn name(&self) -> &str {
        self.strategy.name()
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &PreviewConfig {
        &self.config
    }

    /// Returns the configuration mutably.
    pub fn config_mut(&mut self) -> &mut PreviewConfig {
        &mut self.config
    }

    /// Returns the target resolver.
    #[must_use]
    pub fn resolver(&self) -> &SegmentationTargetResolver {
        &self.resolver
    }

    /// Returns the target resolver mutably (e.g. to flip the overwrite
    /// policy).
    pub fn resolver_mut(&mut self) -> &mut SegmentationTargetResolver {
        &mut self.resolver
    }

    /// Returns the compute strategy.
    #[must_use]
    pub fn strategy(&self) -> &dyn PreviewComputeStrategy {
        self.strategy.as_ref()
    }

    /// Returns the compute strategy downcast to its concrete type.
    pub fn strategy_as<S: PreviewComputeStrategy>(&self) -> Option<&S> {
        self.strategy.as_any().downcast_ref::<S>()
    }

    /// Returns the compute strategy downcast to its concrete type, mutably.
    pub fn strategy_as_mut<S: PreviewComputeStrategy>(&mut self) -> Option<&mut S> {
        self.strategy.as_any_mut().downcast_mut::<S>()
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Returns true while a computation is in flight.
    #[must_use]
    pub fn is_updating(&self) -> bool {
        self.state == PipelineState::Computing
    }

    /// Returns true between activation and deactivation.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Returns the message of the last failed computation, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Returns the cached preview volume, if one exists.
    #[must_use]
    pub fn preview(&self) -> Option<&LabelVolume> {
        self.preview.as_ref()
    }

    /// Returns the transient display node of the preview, if active.
    #[must_use]
    pub fn preview_node(&self) -> Option<NodeId> {
        self.preview_node
    }

    /// Returns the configured region of interest, if any.
    #[must_use]
    pub fn region_of_interest(&self) -> Option<Roi> {
        self.roi
    }

    /// Returns the selected time point.
    #[must_use]
    pub fn selected_time_point(&self) -> f64 {
        self.selected_time_point
    }

    /// The busy/idle broadcast: `true` at entry into a computation, `false`
    /// at exit, also on the failure path.
    pub fn busy_events(&mut self) -> &mut EventChannel<bool> {
        &mut self.busy
    }

    /// Fired after any change to preview or committed content, requesting a
    /// redraw.
    pub fn refresh_events(&mut self) -> &mut EventChannel<()> {
        &mut self.refresh
    }

    /// Starts an editing session.
    ///
    /// Looks up the reference volume, adds the transient preview node to the
    /// storage and builds the initial preview content. Fails with
    /// [`VoxsegError::MissingReferenceData`] when no reference volume is
    /// stored.
    pub fn activate(&mut self, storage: &mut DataStorage, time_point: f64) -> Result<()> {
        let reference = storage.first_of_role(DataRole::Reference);
        if reference.is_none() {
            self.active = false;
            return Err(VoxsegError::MissingReferenceData);
        }
        self.reference_node = reference;
        self.selected_time_point = time_point;
        self.user_defined_active_label = 1;
        self.resolver.reset_session();
        self.roi = storage
            .first_of_role(DataRole::Roi)
            .and_then(|id| storage.get(id))
            .and_then(DataNode::as_roi)
            .copied();

        let mut node = DataNode::new(
            format!("{} preview", self.strategy.name()),
            DataRole::Helper,
            NodeData::None,
        );
        node.properties_mut().color = self.config.preview_color;
        node.properties_mut().opacity = self.config.preview_opacity;
        node.properties_mut().helper = true;
        self.preview_node = Some(storage.add(node));

        self.active = true;
        self.reset_preview_impl(storage)?;
        log::debug!("tool '{}' activated", self.strategy.name());
        self.refresh.publish(&());
        Ok(())
    }

    /// Ends the editing session, removing the transient preview node and
    /// discarding the preview volume.
    pub fn deactivate(&mut self, storage: &mut DataStorage) {
        if let Some(id) = self.preview_node.take() {
            storage.remove(id);
        }
        self.preview = None;
        self.reference_node = None;
        self.active = false;
        self.state = PipelineState::Idle;
        self.has_computed = false;
        self.stale_steps.clear();
        self.last_error = None;
        self.last_update_time_point = None;
        log::debug!("tool '{}' deactivated", self.strategy.name());
        self.refresh.publish(&());
    }

    /// Discards cached preview content.
    ///
    /// Depending on [`PreviewConfig::resets_to_empty_preview`], the preview
    /// restarts empty or as a copy of the current target content. Calling
    /// this while a computation is in flight is an error.
    pub fn reset_preview_node(&mut self, storage: &DataStorage) -> Result<()> {
        if self.state == PipelineState::Computing {
            return Err(VoxsegError::InvalidState(
                "cannot reset the preview while an update is in progress".into(),
            ));
        }
        self.reset_preview_impl(storage)?;
        self.refresh.publish(&());
        Ok(())
    }

    /// Computes the preview image.
    ///
    /// Without `force_all_time_steps`, only the time step at the selected
    /// time point is recomputed; with it, every time step is. The call is a
    /// no-op when nothing changed since the last successful computation
    /// (input data, seeds, parameters, selected time point, coverage). A
    /// re-entrant call while computing is rejected, not queued.
    pub fn update_preview(&mut self, storage: &DataStorage, force_all_time_steps: bool) -> Result<()> {
        self.update_preview_with_seeds(storage, None, force_all_time_steps)
    }

    /// [`update_preview`](Self::update_preview) with the session's seed
    /// points, forwarded to the strategy when they changed.
    pub fn update_preview_with_seeds(
        &mut self,
        storage: &DataStorage,
        seeds: Option<&PointSet>,
        force_all_time_steps: bool,
    ) -> Result<()> {
        if self.state == PipelineState::Computing {
            return Err(VoxsegError::InvalidState(
                "a preview update is already in progress".into(),
            ));
        }
        if !self.active {
            return Ok(());
        }
        let Some(image) = self.reference_image(storage) else {
            log::debug!("no segmentation input, skipping preview update");
            return Ok(());
        };
        if self.preview.is_none() {
            return Ok(());
        }

        let label_changed = self.refresh_user_defined_active_label(storage);
        let input_revision = image.revision();
        let seed_revision = seeds.map_or(self.last_seed_revision, PointSet::revision);
        let coverage_all = force_all_time_steps;
        let time_point_changed = self.config.time_point_change_aware
            && self.last_update_time_point != Some(self.selected_time_point);

        let unchanged = self.has_computed
            && self.state != PipelineState::Failed
            && self.stale_steps.is_empty()
            && !label_changed
            && !time_point_changed
            && input_revision == self.last_input_revision
            && seed_revision == self.last_seed_revision
            && self.strategy.parameter_revision() == self.last_parameter_revision
            && coverage_all == self.last_coverage_all;
        if unchanged {
            log::trace!("preview is up to date, skipping recomputation");
            return Ok(());
        }

        if let Some(points) = seeds {
            if points.revision() != self.last_seed_revision {
                self.strategy.set_seeds(points.points());
            }
        }
        if time_point_changed {
            self.strategy.time_point_changed();
        }
        let parameter_revision = self.strategy.parameter_revision();

        self.state = PipelineState::Computing;
        self.busy.publish(&true);

        let active_label = self
            .preview
            .as_ref()
            .and_then(|p| p.labels().active_value())
            .unwrap_or(self.user_defined_active_label);
        self.strategy.prepare_update(active_label);

        let (num_steps, current_step) = self.preview.as_ref().map_or((0, 0), |preview| {
            (
                preview.num_time_steps(),
                preview
                    .time_geometry()
                    .time_point_to_step(self.selected_time_point),
            )
        });
        let steps: Vec<usize> = if coverage_all {
            (0..num_steps).collect()
        } else {
            vec![current_step]
        };

        let mut failure: Option<String> = None;
        for &step in &steps {
            let time_point = if coverage_all {
                self.preview
                    .as_ref()
                    .map_or(self.selected_time_point, |p| {
                        p.time_geometry().step_to_time_point(step)
                    })
            } else {
                self.selected_time_point
            };
            let input_step = image.time_geometry().time_point_to_step(time_point);
            let input_frame = match self.roi {
                Some(roi) => image.crop_frame(input_step, &roi),
                None => image.extract_frame(input_step),
            };
            let Some(input_frame) = input_frame else {
                continue;
            };

            let prior = self.preview.as_ref().and_then(|p| p.extract_frame(step));
            let result = self
                .strategy
                .compute_preview(&input_frame, prior.as_ref(), step);
            let Some(preview) = self.preview.as_mut() else {
                break;
            };
            match result.and_then(|frame| preview.write_frame(step, &frame)) {
                Ok(()) => {
                    self.stale_steps.remove(&step);
                }
                Err(err) => {
                    // Keep the last-known-good content of the other steps,
                    // drop the partial result of this one.
                    preview.clear_frame(step);
                    self.stale_steps.insert(step);
                    failure = Some(err.to_string());
                    break;
                }
            }
        }

        match failure {
            Some(message) => {
                log::error!("preview computation failed: {message}");
                self.last_error = Some(message);
                self.state = PipelineState::Failed;
            }
            None => {
                self.last_error = None;
                self.state = PipelineState::Idle;
                self.has_computed = true;
                self.last_input_revision = input_revision;
                self.last_seed_revision = seed_revision;
                self.last_parameter_revision = parameter_revision;
                self.last_update_time_point = Some(self.selected_time_point);
                self.last_coverage_all = coverage_all;
            }
        }

        self.busy.publish(&false);
        self.refresh.publish(&());
        Ok(())
    }

    /// Commits the accepted preview into the resolved target volume.
    ///
    /// Forces a full-coverage update first unless the computation is already
    /// current. Destination voxels holding a locked label are left
    /// untouched. Afterwards the pipeline deactivates unless configured to
    /// stay active.
    pub fn confirm_segmentation(
        &mut self,
        storage: &mut DataStorage,
        seeds: Option<&PointSet>,
    ) -> Result<()> {
        if self.state == PipelineState::Computing {
            return Err(VoxsegError::InvalidState(
                "cannot confirm while an update is in progress".into(),
            ));
        }
        if !self.active {
            return Err(VoxsegError::InvalidState(
                "cannot confirm: the pipeline is not active".into(),
            ));
        }

        self.update_preview_with_seeds(storage, seeds, true)?;
        if self.state == PipelineState::Failed {
            return Err(VoxsegError::AlgorithmFailure(
                self.last_error.clone().unwrap_or_default(),
            ));
        }

        let target_id = self.resolver.resolve(storage)?;
        let mapping = self.label_mapping();
        {
            let preview = self
                .preview
                .as_ref()
                .ok_or(VoxsegError::MissingReferenceData)?;
            let target_node = storage
                .get_mut(target_id)
                .ok_or(VoxsegError::NodeNotFound(target_id))?;
            let target = target_node.as_labels_mut().ok_or_else(|| {
                VoxsegError::InvalidState("commit target is not a label volume".into())
            })?;

            if preview.num_time_steps() != target.num_time_steps() {
                return Err(VoxsegError::GeometryMismatch(
                    "preview and commit target have different time step counts".into(),
                ));
            }

            ensure_mapped_labels(&mapping, preview.labels(), target.labels_mut())?;

            let steps: Vec<usize> = if self.config.create_all_time_steps {
                (0..preview.num_time_steps()).collect()
            } else {
                vec![target
                    .time_geometry()
                    .time_point_to_step(self.selected_time_point)]
            };
            for step in steps {
                let Some(frame) = preview.extract_frame(step) else {
                    continue;
                };
                transfer_frame(&frame, target, step, &mapping, self.config.merge_style)?;
            }
        }
        log::debug!("tool '{}' committed its preview", self.strategy.name());
        self.refresh.publish(&());

        if self.config.resets_to_empty_preview {
            if let Some(preview) = self.preview.as_mut() {
                preview.clear_all();
            }
            self.has_computed = false;
        }
        if !self.config.keep_active_after_accept {
            self.deactivate(storage);
        }
        Ok(())
    }

    /// Reconfigures the region of interest, rebuilding the preview and
    /// recomputing. `None` restores the full reference input.
    pub fn handle_roi_changed(&mut self, storage: &DataStorage, roi: Option<Roi>) -> Result<()> {
        if self.state == PipelineState::Computing {
            return Err(VoxsegError::InvalidState(
                "cannot change the region of interest while an update is in progress".into(),
            ));
        }
        self.roi = roi;
        if !self.active {
            return Ok(());
        }
        self.reset_preview_impl(storage)?;
        self.update_preview(storage, false)
    }

    /// Tracks a change of the selected time point.
    ///
    /// Recomputes only when the pipeline is time-point-aware and either runs
    /// lazy dynamic previews or holds a static preview over a dynamic input.
    pub fn handle_time_point_changed(
        &mut self,
        storage: &DataStorage,
        seeds: Option<&PointSet>,
        time_point: f64,
    ) -> Result<()> {
        let previous = self.selected_time_point;
        self.selected_time_point = time_point;
        if !self.config.time_point_change_aware || !self.active {
            return Ok(());
        }
        let Some(image) = self.reference_image(storage) else {
            return Ok(());
        };
        let Some(preview) = self.preview.as_ref() else {
            return Ok(());
        };
        let static_on_dynamic =
            preview.num_time_steps() == 1 && image.num_time_steps() > 1;
        let moved = self.last_update_time_point != Some(time_point) && previous != time_point;
        if moved && (static_on_dynamic || self.config.lazy_dynamic_previews) {
            self.update_preview_with_seeds(storage, seeds, false)?;
        }
        Ok(())
    }

    fn reference_image<'a>(&self, storage: &'a DataStorage) -> Option<&'a ImageVolume> {
        storage
            .get(self.reference_node?)
            .and_then(DataNode::as_image)
    }

    /// Re-reads the active label of the working volume. Returns true if it
    /// changed since the last read.
    fn refresh_user_defined_active_label(&mut self, storage: &DataStorage) -> bool {
        let active = storage
            .first_of_role(DataRole::Working)
            .and_then(|id| storage.get(id))
            .and_then(DataNode::as_labels)
            .and_then(|labels| labels.labels().active_value());
        match active {
            Some(value) => {
                let changed = value != self.user_defined_active_label;
                self.user_defined_active_label = value;
                changed
            }
            None => {
                self.user_defined_active_label = 1;
                false
            }
        }
    }

    /// The commit mapping: the preview's result label lands on the working
    /// volume's active label.
    fn label_mapping(&self) -> LabelMapping {
        let source = self
            .preview
            .as_ref()
            .and_then(|p| p.labels().active_value())
            .unwrap_or(1);
        vec![(source, self.user_defined_active_label.max(1))]
    }

    fn reset_preview_impl(&mut self, storage: &DataStorage) -> Result<()> {
        let Some(image) = self.reference_image(storage) else {
            return Ok(());
        };

        let geometry = match self.roi {
            Some(roi) => image.geometry().crop(&roi),
            None => *image.geometry(),
        };
        let working = storage
            .first_of_role(DataRole::Working)
            .and_then(|id| storage.get(id))
            .and_then(DataNode::as_labels);
        let time = working.map_or(*image.time_geometry(), |w| *w.time_geometry());

        let mut preview = LabelVolume::new_empty(
            format!("{} preview", self.strategy.name()),
            geometry,
            time,
        );
        if let Some(working) = working {
            // Carry the working label table so cloned content stays valid.
            *preview.labels_mut() = working.labels().clone();
            if !self.config.resets_to_empty_preview {
                for step in 0..preview.num_time_steps() {
                    let window = match self.roi {
                        Some(roi) => working.extract_window(step, &roi),
                        None => working.extract_frame(step),
                    };
                    if let Some(window) = window {
                        preview.write_frame(step, &window)?;
                    }
                }
            }
        }

        match preview.labels().active_value() {
            None => {
                let value = preview.labels().next_free_value();
                let mut label = Label::new(value, "tool result", self.config.preview_color);
                label.set_visible(true);
                preview.labels_mut().insert(label)?;
                preview.labels_mut().set_active(value)?;
            }
            Some(value) => {
                if self.config.use_preview_color {
                    if let Some(label) = preview.labels_mut().get_mut(value) {
                        label.set_color(self.config.preview_color);
                        label.set_visible(true);
                    }
                }
            }
        }

        self.preview = Some(preview);
        self.state = PipelineState::Idle;
        self.has_computed = false;
        self.stale_steps.clear();
        self.last_error = None;
        self.last_update_time_point = None;
        self.last_coverage_all = false;
        Ok(())
    }
}
