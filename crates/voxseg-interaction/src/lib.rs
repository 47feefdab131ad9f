//! Seed-point editing for voxseg-rs.
//!
//! This crate turns discrete pointer actions into structured point-set
//! mutations:
//! - [`PointSet`] - an ordered collection of labeled 3D points with a
//!   selection cursor and an optional size bound
//! - [`PointInteractionController`] - the finite-state controller mapping
//!   press/drag/release/delete actions onto a point set, with closed-contour
//!   detection and whole-set translation

#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod controller;
pub mod point_set;

pub use controller::{InteractionState, PointInteractionController};
pub use point_set::{BoundedInsertPolicy, InsertOutcome, PointSet};
