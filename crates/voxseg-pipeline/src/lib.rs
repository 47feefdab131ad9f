//! Preview/confirm segmentation pipeline for voxseg-rs.
//!
//! The pipeline turns an arbitrary segmentation-producing algorithm into a
//! safe, resumable editing session:
//! - [`PreviewComputeStrategy`] - the narrow hook a concrete algorithm
//!   implements, invoked once per recomputed time step
//! - [`PreviewPipeline`] - computes, caches and commits preview
//!   segmentations, scoped by time step and optional region of interest
//! - [`MultiLabelPreview`] - wraps a multi-label algorithm and reduces a
//!   selected label subset to the single-label preview used for commit
//! - [`SegmentationTargetResolver`] - decides whether commits overwrite the
//!   working volume or go to a freshly created one
//! - [`transfer`] - the per-voxel commit rules, including locked-label
//!   protection and merge/replace semantics

#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]

pub mod multi_label;
pub mod pipeline;
pub mod strategy;
pub mod target;
pub mod transfer;

pub use multi_label::{MultiLabelCompute, MultiLabelPreview};
pub use pipeline::{PipelineState, PreviewConfig, PreviewPipeline};
pub use strategy::PreviewComputeStrategy;
pub use target::SegmentationTargetResolver;
pub use transfer::{LabelMapping, MergeStyle};
