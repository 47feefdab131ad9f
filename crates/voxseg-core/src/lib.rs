//! Core abstractions for voxseg-rs.
//!
//! This crate provides the fundamental types used throughout voxseg-rs:
//! - [`ImageVolume`] and [`LabelVolume`] for multi-time-step voxel data
//! - [`Label`] and [`LabelSet`] for the label model, including locked labels
//! - [`VolumeGeometry`], [`Roi`] and [`TimeGeometry`] for spatial and
//!   temporal layout
//! - [`DataStorage`] for role-tagged data nodes
//! - [`EventChannel`] for typed publish/subscribe notification
//! - [`Revision`] stamps from a process-wide modification clock

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Config structs legitimately have many boolean flags
#![allow(clippy::struct_excessive_bools)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]

pub mod error;
pub mod event;
pub mod geometry;
pub mod label;
pub mod revision;
pub mod scalar;
pub mod storage;
pub mod volume;

pub use error::{Result, VoxsegError};
pub use event::{EventChannel, Subscription};
pub use geometry::{Roi, TimeGeometry, VolumeGeometry};
pub use label::{Label, LabelSet, LabelValue, BACKGROUND_VALUE};
pub use revision::Revision;
pub use scalar::{ScalarData, ScalarKind};
pub use storage::{DataNode, DataRole, DataStorage, NodeData, NodeId, NodeProperties};
pub use volume::{ImageVolume, LabelFrame, LabelVolume, ScalarFrame};

// Re-export glam types for convenience
pub use glam::{UVec3, Vec3};
