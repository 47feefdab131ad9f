//! voxseg-rs: interactive seed-point editing and preview/confirm
//! segmentation for volumetric label data.
//!
//! An operator marks seed geometry on a volumetric dataset; a
//! segmentation-producing algorithm turns that input into a preview which is
//! iteratively refined and finally committed into a persistent multi-label
//! volume, honoring locked labels.
//!
//! # Quick Start
//!
//! ```no_run
//! use voxseg::*;
//!
//! struct FillEverything {
//!     revision: Revision,
//!     label: LabelValue,
//! }
//!
//! impl PreviewComputeStrategy for FillEverything {
//!     fn name(&self) -> &str {
//!         "fill everything"
//!     }
//!
//!     fn compute_preview(
//!         &mut self,
//!         input: &ScalarFrame,
//!         _prior: Option<&LabelFrame>,
//!         _time_step: usize,
//!     ) -> Result<LabelFrame> {
//!         let mut frame = LabelFrame::new_empty(*input.geometry());
//!         frame.voxels_mut().fill(self.label);
//!         Ok(frame)
//!     }
//!
//!     fn parameter_revision(&self) -> Revision {
//!         self.revision
//!     }
//!
//!     fn prepare_update(&mut self, active_label: LabelValue) {
//!         self.label = active_label;
//!     }
//!
//!     fn as_any(&self) -> &dyn std::any::Any {
//!         self
//!     }
//!
//!     fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
//!         self
//!     }
//! }
//!
//! fn main() -> Result<()> {
//!     let mut session = Session::new();
//!     session.add_reference_image(ImageVolume::new(
//!         "ct",
//!         VolumeGeometry::with_dims(UVec3::new(16, 16, 16)),
//!         TimeGeometry::single_step(),
//!         ScalarKind::I16,
//!     ));
//!     session.add_working_labels(LabelVolume::new_empty(
//!         "seg",
//!         VolumeGeometry::with_dims(UVec3::new(16, 16, 16)),
//!         TimeGeometry::single_step(),
//!     ));
//!
//!     let tool = session.register_tool(Box::new(FillEverything {
//!         revision: Revision::now(),
//!         label: 1,
//!     }));
//!     session.activate_tool(Some(tool))?;
//!     session.update_preview(false)?;
//!     session.confirm_segmentation()?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`PointInteractionController`] turns pointer actions into point-set
//!   mutations and raises derived events such as "contour closed".
//! - [`PreviewPipeline`] assembles the algorithm input per time step
//!   (optionally ROI-cropped), invokes a [`PreviewComputeStrategy`] only
//!   when something changed, and commits accepted previews.
//! - [`MultiLabelPreview`] wraps algorithms that produce several candidate
//!   labels at once and reduces the selected subset for display and commit.
//! - [`Session`] owns the data storage and the tool table; tools are
//!   addressed by [`ToolId`] handles.

mod session;

// Re-export core types
pub use voxseg_core::{
    error::{Result, VoxsegError},
    event::{EventChannel, Subscription},
    geometry::{Roi, TimeGeometry, VolumeGeometry},
    label::{Label, LabelSet, LabelValue, BACKGROUND_VALUE},
    revision::Revision,
    scalar::{ScalarData, ScalarKind},
    storage::{DataNode, DataRole, DataStorage, NodeData, NodeId, NodeProperties},
    volume::{ImageVolume, LabelFrame, LabelVolume, ScalarFrame},
};

// Re-export interaction types
pub use voxseg_interaction::{
    BoundedInsertPolicy, InsertOutcome, InteractionState, PointInteractionController, PointSet,
};

// Re-export pipeline types
pub use voxseg_pipeline::{
    LabelMapping, MergeStyle, MultiLabelCompute, MultiLabelPreview, PipelineState,
    PreviewComputeStrategy, PreviewConfig, PreviewPipeline, SegmentationTargetResolver,
};

pub use session::{Session, Tool, ToolId};

// Re-export glam types for convenience
pub use glam::{UVec3, Vec3};

/// Initializes logging from the `RUST_LOG` environment variable.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging() {
    let _ = env_logger::try_init();
    log::debug!("voxseg-rs logging initialized");
}
