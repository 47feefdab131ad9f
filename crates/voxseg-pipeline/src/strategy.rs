//! The preview-compute strategy seam.

use std::any::Any;

use glam::Vec3;

use voxseg_core::error::Result;
use voxseg_core::label::LabelValue;
use voxseg_core::revision::Revision;
use voxseg_core::volume::{LabelFrame, ScalarFrame};

/// The algorithm hook of a preview pipeline.
///
/// A strategy is invoked once per recomputed time step with the assembled
/// input sub-volume (full reference frame or ROI crop), the prior preview
/// content at that step for algorithms that need incremental context, and
/// the time step index. It returns the new preview content for that step,
/// geometry-matched to the input.
///
/// Produced frames are written into the preview verbatim; strategies mark
/// result voxels with the active label value handed to
/// [`prepare_update`](Self::prepare_update) before each computation round.
/// Seed points, when the tool uses any, arrive in the input volume's world
/// coordinate space; index-space conversion is the strategy's concern.
pub trait PreviewComputeStrategy: Any {
    /// Human-readable tool name, used for preview and target naming.
    fn name(&self) -> &str;

    /// Computes the preview content for one time step.
    ///
    /// Errors are caught at the pipeline boundary and put the pipeline into
    /// its failed state; they never tear down the session.
    fn compute_preview(
        &mut self,
        input: &ScalarFrame,
        prior: Option<&LabelFrame>,
        time_step: usize,
    ) -> Result<LabelFrame>;

    /// Modification stamp of the strategy's parameters.
    ///
    /// Bump the stamp on any parameter change; the pipeline recomputes when
    /// it observes a newer stamp.
    fn parameter_revision(&self) -> Revision;

    /// Called once before each computation round with the label value result
    /// voxels must carry.
    fn prepare_update(&mut self, _active_label: LabelValue) {}

    /// Replaces the strategy's seed points (world coordinates).
    ///
    /// Only called when the seed set actually changed; strategies without
    /// seed input ignore it.
    fn set_seeds(&mut self, _seeds: &[Vec3]) {}

    /// Called when the selected time point changed since the last
    /// computation, for strategies that cache across invocations.
    fn time_point_changed(&mut self) {}

    /// Returns a reference to self as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Returns a mutable reference to self as `Any` for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
