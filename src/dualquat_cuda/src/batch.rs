//! Borrowed batch views with shape validation.
//!
//! A batch is a contiguous, row-major slice of N like-shaped rows owned by
//! the caller. The views here borrow that memory for the duration of one
//! call; nothing in this crate retains a reference past return.
//!
//! Construction is where geometry is checked: the trailing dimension must
//! match the element width (8 / 4 / 3) and the slice length must be an
//! exact multiple of it. Binary operations additionally require matching
//! row counts, or a length-1 batch on either side which broadcasts.

use crate::error::{DualQuatError, Result};

/// Components per dual quaternion: `[rw, rx, ry, rz, dw, dx, dy, dz]`.
pub const DUAL_QUAT_WIDTH: usize = 8;
/// Components per quaternion: `[w, x, y, z]`.
pub const QUAT_WIDTH: usize = 4;
/// Components per 3D point.
pub const POINT_WIDTH: usize = 3;

fn check_geometry(data_len: usize, trailing: usize, expected: usize) -> Result<usize> {
    if trailing != expected {
        return Err(DualQuatError::ShapeMismatch {
            expected,
            got: trailing,
        });
    }
    if data_len % expected != 0 {
        return Err(DualQuatError::RaggedBuffer {
            len: data_len,
            width: expected,
        });
    }
    Ok(data_len / expected)
}

/// Borrowed batch of 8-component dual quaternions.
#[derive(Debug, Clone, Copy)]
pub struct DualQuatBatch<'a> {
    data: &'a [f32],
    len: usize,
}

impl<'a> DualQuatBatch<'a> {
    /// Create a view over `data` whose rows are `trailing` floats wide.
    ///
    /// Fails with `ShapeMismatch` unless `trailing == 8`, and with
    /// `RaggedBuffer` when `data` is not a whole number of rows.
    pub fn new(data: &'a [f32], trailing: usize) -> Result<Self> {
        let len = check_geometry(data.len(), trailing, DUAL_QUAT_WIDTH)?;
        Ok(Self { data, len })
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Row `i` as an 8-float slice.
    pub fn row(&self, i: usize) -> &'a [f32] {
        &self.data[i * DUAL_QUAT_WIDTH..(i + 1) * DUAL_QUAT_WIDTH]
    }

    pub fn as_slice(&self) -> &'a [f32] {
        self.data
    }
}

/// Borrowed batch of 4-component quaternions.
#[derive(Debug, Clone, Copy)]
pub struct QuatBatch<'a> {
    data: &'a [f32],
    len: usize,
}

impl<'a> QuatBatch<'a> {
    /// Create a view over `data` whose rows are `trailing` floats wide.
    pub fn new(data: &'a [f32], trailing: usize) -> Result<Self> {
        let len = check_geometry(data.len(), trailing, QUAT_WIDTH)?;
        Ok(Self { data, len })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn row(&self, i: usize) -> &'a [f32] {
        &self.data[i * QUAT_WIDTH..(i + 1) * QUAT_WIDTH]
    }

    pub fn as_slice(&self) -> &'a [f32] {
        self.data
    }
}

/// Borrowed batch of 3D points.
#[derive(Debug, Clone, Copy)]
pub struct PointBatch<'a> {
    data: &'a [f32],
    len: usize,
}

impl<'a> PointBatch<'a> {
    /// Create a view over `data` whose rows are `trailing` floats wide.
    pub fn new(data: &'a [f32], trailing: usize) -> Result<Self> {
        let len = check_geometry(data.len(), trailing, POINT_WIDTH)?;
        Ok(Self { data, len })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn row(&self, i: usize) -> &'a [f32] {
        &self.data[i * POINT_WIDTH..(i + 1) * POINT_WIDTH]
    }

    pub fn as_slice(&self) -> &'a [f32] {
        self.data
    }
}

/// Resolve the output length and per-side row strides for a binary op.
///
/// Returns `(out_len, lhs_stride, rhs_stride)` where a stride of 0 marks a
/// length-1 batch broadcast across the other side.
pub fn broadcast_pair(lhs: usize, rhs: usize) -> Result<(usize, usize, usize)> {
    if lhs == rhs {
        Ok((lhs, 1, 1))
    } else if lhs == 1 {
        Ok((rhs, 0, 1))
    } else if rhs == 1 {
        Ok((lhs, 1, 0))
    } else {
        Err(DualQuatError::BatchLenMismatch { lhs, rhs })
    }
}
