//! Per-axis address tables for the shift operator.
//!
//! `table[a][o]` is the coordinate along axis `a` that output coordinate `o`
//! reads from. Border handling only ever looks at one axis, so the full
//! N-dimensional gather is the composition of the per-axis lookups:
//!
//! ```text
//! y[o0, o1, .., ok] = x[table[0][o0], table[1][o1], .., table[k][ok]]
//! ```
//!
//! The tables hold coordinates only, never tensor data, and are immutable once
//! built, so one table can serve any number of passes over tensors of its shape.

use anyhow::Result;
use log::debug;
use smallvec::{smallvec, SmallVec};

use crate::border::BorderMode;
use crate::shape::{self, Strides};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddrTable {
    shape: Vec<usize>,
    strides: Strides,
    axes: Vec<Vec<usize>>,
}

/// One level of the axis recursion: the axis about to be expanded and the flat
/// offsets accumulated over the axes above it.
#[derive(Debug, Clone, Copy)]
struct Frame {
    axis: usize,
    x_offset: usize,
    y_offset: usize,
}

impl AddrTable {
    /// Validates `shifts` against `shape` and builds one table per axis.
    /// Cost is O(sum of shape), independent of the tensor volume.
    pub fn build(shape: &[usize], shifts: &[i64], border_mode: BorderMode) -> Result<Self> {
        let shape = shape::validate(shifts, shape)?;
        let axes = shape
            .iter()
            .zip(shifts.iter())
            .map(|(&size, &shift)| build_axis(size, shift, border_mode))
            .collect();
        let strides = shape::contiguous_strides(&shape);
        debug!(
            "built {} address table for shape {:?} with shifts {:?}",
            border_mode, shape, shifts
        );
        Ok(AddrTable { shape, strides, axes })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Number of elements of a tensor with this table's shape.
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn axis(&self, axis: usize) -> &[usize] {
        &self.axes[axis]
    }

    /// True when the axis reads every coordinate from itself.
    pub fn is_identity_axis(&self, axis: usize) -> bool {
        self.axes[axis].iter().enumerate().all(|(o, &src)| o == src)
    }

    pub fn inner(&self) -> &[usize] {
        &self.axes[self.rank() - 1]
    }

    /// Flat input offset read by the output multi-index `out_index`.
    pub fn source_offset(&self, out_index: &[usize]) -> usize {
        let src: SmallVec<[usize; 4]> = out_index
            .iter()
            .enumerate()
            .map(|(a, &o)| self.axes[a][o])
            .collect();
        shape::flat_offset(&src, &self.strides)
    }

    /// Calls `f(x_row, y_row)` once per innermost row in row-major output
    /// order, where `x_row` / `y_row` are the flat offsets of the start of the
    /// input row and output row. The innermost table is left to the caller.
    pub(crate) fn for_each_row(&self, mut f: impl FnMut(usize, usize)) {
        if self.is_empty() {
            return;
        }
        let inner = self.rank() - 1;
        let mut stack: SmallVec<[Frame; 16]> = smallvec![Frame {
            axis: 0,
            x_offset: 0,
            y_offset: 0,
        }];
        while let Some(frame) = stack.pop() {
            if frame.axis == inner {
                f(frame.x_offset, frame.y_offset);
                continue;
            }
            let stride = self.strides[frame.axis];
            // pushed in reverse so rows pop in ascending output order
            for (o, &src) in self.axes[frame.axis].iter().enumerate().rev() {
                stack.push(Frame {
                    axis: frame.axis + 1,
                    x_offset: frame.x_offset + src * stride,
                    y_offset: frame.y_offset + o * stride,
                });
            }
        }
    }
}

fn build_axis(size: usize, shift: i64, border_mode: BorderMode) -> Vec<usize> {
    (0..size)
        .map(|o| border_mode.source_index(o, shift, size))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ShiftError;
    use itertools::iproduct;

    #[test]
    fn test_tables() {
        let t = AddrTable::build(&[2, 4], &[0, 1], BorderMode::Nearest).unwrap();
        assert_eq!(t.axis(0), &[0, 1]);
        assert_eq!(t.axis(1), &[0, 0, 1, 2]);
        assert!(t.is_identity_axis(0));
        assert!(!t.is_identity_axis(1));

        let t = AddrTable::build(&[2, 4], &[0, 1], BorderMode::Reflect).unwrap();
        assert_eq!(t.axis(1), &[1, 0, 1, 2]);
        assert_eq!(t.inner(), &[1, 0, 1, 2]);
    }

    #[test]
    fn test_size_one_axis() {
        let t = AddrTable::build(&[1, 3], &[0, 0], BorderMode::Reflect).unwrap();
        assert_eq!(t.axis(0), &[0]);
        let t = AddrTable::build(&[1, 3], &[5, 0], BorderMode::Nearest).unwrap();
        assert_eq!(t.axis(0), &[0]);
    }

    #[test]
    fn test_rank_mismatch() {
        let err = AddrTable::build(&[2, 3, 4], &[1, 1], BorderMode::Nearest).unwrap_err();
        assert!(err.downcast_ref::<ShiftError>().unwrap().is_configuration());
    }

    #[test]
    fn test_row_walk_order() {
        let t = AddrTable::build(&[2, 3, 4], &[1, -1, 2], BorderMode::Nearest).unwrap();
        let mut rows = Vec::new();
        t.for_each_row(|x, y| rows.push((x, y)));
        assert_eq!(rows.len(), 6);

        let expected: Vec<_> = iproduct!(0..2, 0..3)
            .map(|(i, j)| (t.source_offset(&[i, j, 0]), i * 12 + j * 4))
            .collect();
        assert_eq!(rows, expected);
        // the axis-0 shift of 1 clamps both leading rows to input plane 0
        assert_eq!(rows[0].0, 4);
        assert_eq!(rows[3].0, 4);
    }

    #[test]
    fn test_empty_axis() {
        let t = AddrTable::build(&[3, 0], &[1, 1], BorderMode::Reflect).unwrap();
        assert!(t.is_empty());
        let mut calls = 0;
        t.for_each_row(|_, _| calls += 1);
        assert_eq!(calls, 0);
    }
}
