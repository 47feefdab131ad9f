//! Error types for voxseg-rs.

use thiserror::Error;

use crate::scalar::ScalarKind;
use crate::storage::NodeId;

/// The main error type for voxseg-rs operations.
#[derive(Error, Debug)]
pub enum VoxsegError {
    /// No reference/input volume is available for the requested operation.
    #[error("no reference data available")]
    MissingReferenceData,

    /// A point index was out of range.
    #[error("point index {index} out of range (set has {len} points)")]
    InvalidIndex { index: usize, len: usize },

    /// The external segmentation algorithm raised an error.
    #[error("segmentation algorithm failed: {0}")]
    AlgorithmFailure(String),

    /// Two volumes that must share a spatial layout do not.
    #[error("geometry mismatch: {0}")]
    GeometryMismatch(String),

    /// A scalar buffer was accessed with the wrong numeric kind.
    #[error("scalar kind mismatch: expected {expected:?}, got {actual:?}")]
    ScalarKindMismatch {
        expected: ScalarKind,
        actual: ScalarKind,
    },

    /// A label with the given value already exists in the label set.
    #[error("label value {0} already exists")]
    LabelExists(u16),

    /// An operation was requested in a state that does not permit it.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A data node handle did not resolve to a stored node.
    #[error("data node {0:?} not found")]
    NodeNotFound(NodeId),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for voxseg-rs operations.
pub type Result<T> = std::result::Result<T, VoxsegError>;
