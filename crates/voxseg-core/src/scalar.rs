//! Scalar voxel buffers with runtime numeric-kind dispatch.
//!
//! Input volumes arrive with a pixel type that is only known at runtime.
//! [`ScalarKind`] is the runtime tag and [`ScalarData`] the tagged buffer;
//! generic operations dispatch on the tag through [`dispatch_scalar!`]
//! instead of compile-time type parameters.

use serde::{Deserialize, Serialize};

/// Runtime tag for the numeric type of a scalar voxel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarKind {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl ScalarKind {
    /// Returns the size in bytes of one sample.
    #[must_use]
    pub fn sample_size(self) -> usize {
        match self {
            ScalarKind::I8 | ScalarKind::U8 => 1,
            ScalarKind::I16 | ScalarKind::U16 => 2,
            ScalarKind::I32 | ScalarKind::U32 | ScalarKind::F32 => 4,
            ScalarKind::F64 => 8,
        }
    }

    /// Returns true for the floating-point kinds.
    #[must_use]
    pub fn is_float(self) -> bool {
        matches!(self, ScalarKind::F32 | ScalarKind::F64)
    }
}

/// A voxel buffer tagged with its numeric kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarData {
    I8(Vec<i8>),
    U8(Vec<u8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    I32(Vec<i32>),
    U32(Vec<u32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

/// Dispatches on the numeric kind of a [`ScalarData`], binding the typed
/// buffer to the given identifier in each arm.
///
/// This is the runtime counterpart of per-pixel-type template instantiation:
/// one table from kind to typed code path.
#[macro_export]
macro_rules! dispatch_scalar {
    ($data:expr, $buffer:ident => $body:expr) => {
        match $data {
            $crate::scalar::ScalarData::I8($buffer) => $body,
            $crate::scalar::ScalarData::U8($buffer) => $body,
            $crate::scalar::ScalarData::I16($buffer) => $body,
            $crate::scalar::ScalarData::U16($buffer) => $body,
            $crate::scalar::ScalarData::I32($buffer) => $body,
            $crate::scalar::ScalarData::U32($buffer) => $body,
            $crate::scalar::ScalarData::F32($buffer) => $body,
            $crate::scalar::ScalarData::F64($buffer) => $body,
        }
    };
}

impl ScalarData {
    /// Creates a zero-filled buffer of the given kind and length.
    #[must_use]
    pub fn zeros(kind: ScalarKind, len: usize) -> Self {
        match kind {
            ScalarKind::I8 => ScalarData::I8(vec![0; len]),
            ScalarKind::U8 => ScalarData::U8(vec![0; len]),
            ScalarKind::I16 => ScalarData::I16(vec![0; len]),
            ScalarKind::U16 => ScalarData::U16(vec![0; len]),
            ScalarKind::I32 => ScalarData::I32(vec![0; len]),
            ScalarKind::U32 => ScalarData::U32(vec![0; len]),
            ScalarKind::F32 => ScalarData::F32(vec![0.0; len]),
            ScalarKind::F64 => ScalarData::F64(vec![0.0; len]),
        }
    }

    /// Returns the numeric kind of this buffer.
    #[must_use]
    pub fn kind(&self) -> ScalarKind {
        match self {
            ScalarData::I8(_) => ScalarKind::I8,
            ScalarData::U8(_) => ScalarKind::U8,
            ScalarData::I16(_) => ScalarKind::I16,
            ScalarData::U16(_) => ScalarKind::U16,
            ScalarData::I32(_) => ScalarKind::I32,
            ScalarData::U32(_) => ScalarKind::U32,
            ScalarData::F32(_) => ScalarKind::F32,
            ScalarData::F64(_) => ScalarKind::F64,
        }
    }

    /// Returns the number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        dispatch_scalar!(self, buffer => buffer.len())
    }

    /// Returns true if the buffer holds no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resets every sample to zero.
    pub fn fill_zero(&mut self) {
        match self {
            ScalarData::I8(buffer) => buffer.fill(0),
            ScalarData::U8(buffer) => buffer.fill(0),
            ScalarData::I16(buffer) => buffer.fill(0),
            ScalarData::U16(buffer) => buffer.fill(0),
            ScalarData::I32(buffer) => buffer.fill(0),
            ScalarData::U32(buffer) => buffer.fill(0),
            ScalarData::F32(buffer) => buffer.fill(0.0),
            ScalarData::F64(buffer) => buffer.fill(0.0),
        }
    }

    /// Returns the sample at a linear index widened to `f64`.
    ///
    /// This is the generic sampling path for kind-agnostic consumers such as
    /// thresholding algorithms; precision loss only occurs for `u64`-scale
    /// integers, which no supported kind produces.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_lossless)]
    pub fn sample_as_f64(&self, idx: usize) -> Option<f64> {
        if idx >= self.len() {
            return None;
        }
        Some(dispatch_scalar!(self, buffer => buffer[idx] as f64))
    }

    /// Copies a strided sub-window out of this buffer.
    ///
    /// `copy` receives pairs of (source range start, destination range start,
    /// run length) describing x-runs of the window; the caller computes them
    /// from the geometries.
    pub(crate) fn copy_runs(&self, runs: &[(usize, usize, usize)], out_len: usize) -> ScalarData {
        macro_rules! crop_typed {
            ($variant:ident, $buffer:expr, $zero:expr) => {{
                let mut out = vec![$zero; out_len];
                for &(src, dst, len) in runs {
                    out[dst..dst + len].copy_from_slice(&$buffer[src..src + len]);
                }
                ScalarData::$variant(out)
            }};
        }
        match self {
            ScalarData::I8(buffer) => crop_typed!(I8, buffer, 0),
            ScalarData::U8(buffer) => crop_typed!(U8, buffer, 0),
            ScalarData::I16(buffer) => crop_typed!(I16, buffer, 0),
            ScalarData::U16(buffer) => crop_typed!(U16, buffer, 0),
            ScalarData::I32(buffer) => crop_typed!(I32, buffer, 0),
            ScalarData::U32(buffer) => crop_typed!(U32, buffer, 0),
            ScalarData::F32(buffer) => crop_typed!(F32, buffer, 0.0),
            ScalarData::F64(buffer) => crop_typed!(F64, buffer, 0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeros_match_kind_and_len() {
        for kind in [
            ScalarKind::I8,
            ScalarKind::U8,
            ScalarKind::I16,
            ScalarKind::U16,
            ScalarKind::I32,
            ScalarKind::U32,
            ScalarKind::F32,
            ScalarKind::F64,
        ] {
            let data = ScalarData::zeros(kind, 7);
            assert_eq!(data.kind(), kind);
            assert_eq!(data.len(), 7);
            assert_eq!(data.sample_as_f64(0), Some(0.0));
        }
    }

    #[test]
    fn test_sample_widening() {
        let data = ScalarData::I16(vec![-4, 250]);
        assert_eq!(data.sample_as_f64(0), Some(-4.0));
        assert_eq!(data.sample_as_f64(1), Some(250.0));
        assert_eq!(data.sample_as_f64(2), None);
    }

    #[test]
    fn test_fill_zero() {
        let mut data = ScalarData::F32(vec![1.5, -2.5]);
        data.fill_zero();
        assert_eq!(data, ScalarData::F32(vec![0.0, 0.0]));
    }

    #[test]
    fn test_copy_runs() {
        let data = ScalarData::U8(vec![0, 1, 2, 3, 4, 5, 6, 7]);
        let out = data.copy_runs(&[(1, 0, 2), (5, 2, 2)], 4);
        assert_eq!(out, ScalarData::U8(vec![1, 2, 5, 6]));
    }
}
