//! CubeCL-based CUDA library for batched dual-quaternion algebra.
//!
//! A dual quaternion packs a rigid 3D transform (rotation + translation)
//! into 8 floats. This library operates on contiguous, row-major batches
//! of them: multiplication, conjugation, normalization, rigid transform
//! application, and conversions to and from rotation + translation pairs.
//!
//! # Architecture
//!
//! - [`batch`]: borrowed batch views; shape validation happens at view
//!   construction (trailing dimension 8 / 4 / 3, broadcast rules)
//! - [`ops::cpu`]: nalgebra reference implementations, parallel via rayon
//! - [`ops::gpu`]: CubeCL CUDA kernels, one thread per batch element
//! - [`runtime`]: device client and dispatch wrappers
//! - [`device`]: runtime capability probe, cached once per process
//!
//! # Usage
//!
//! ```ignore
//! use dualquat_cuda::{DualQuatBatch, GpuRuntime};
//!
//! let runtime = GpuRuntime::new()?;
//!
//! let lhs = DualQuatBatch::new(&lhs_data, 8)?;
//! let rhs = DualQuatBatch::new(&rhs_data, 8)?;
//! let product = runtime.dual_quaternion_mul(lhs, rhs)?;
//! ```
//!
//! The caller owns all batch memory; views borrow it for one call and the
//! library keeps no state across calls beyond the CUDA client handle.

pub mod batch;
pub mod device;
pub mod error;
pub mod ops;
pub mod runtime;
pub mod test_utils;
pub mod timing;

pub use batch::{
    broadcast_pair, DualQuatBatch, PointBatch, QuatBatch, DUAL_QUAT_WIDTH, POINT_WIDTH, QUAT_WIDTH,
};
pub use error::{DualQuatError, Result};
pub use ops::DEGENERATE_EPS;

// Runtime device probe (replaces build-time architecture selection)
pub use device::{DeviceDescriptor, MIN_COMPUTE_CAPABILITY};

// GPU runtime
pub use runtime::{is_cuda_available, GpuRuntime};
