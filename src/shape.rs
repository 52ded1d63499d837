//! Shape checks and row-major offset arithmetic shared by the forward and
//! backward passes.

use anyhow::Result;
use smallvec::SmallVec;

use crate::error::ShiftError;

pub type Strides = SmallVec<[usize; 4]>;

/// Row-major (C-contiguous) strides for `dims`.
pub fn contiguous_strides(dims: &[usize]) -> Strides {
    let mut strides: Strides = SmallVec::from_elem(1, dims.len());
    for i in (0..dims.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * dims[i + 1];
    }
    strides
}

/// Flat offset of a multi-index under `strides`.
pub fn flat_offset(indices: &[usize], strides: &[usize]) -> usize {
    debug_assert_eq!(indices.len(), strides.len());
    indices.iter().zip(strides.iter()).map(|(i, s)| i * s).sum()
}

/// Checks a shift vector against an input shape and returns the output shape,
/// which is always the input shape.
pub fn validate(shifts: &[i64], input_shape: &[usize]) -> Result<Vec<usize>> {
    if input_shape.is_empty() {
        return Err(ShiftError::Configuration("shift requires an input of rank >= 1".into()).into());
    }
    if shifts.len() != input_shape.len() {
        return Err(ShiftError::rank_mismatch(shifts.len(), input_shape.len()).into());
    }
    Ok(input_shape.to_vec())
}
