//! Batched dual-quaternion operations.
//!
//! Every operation exists twice with identical semantics:
//! - `cpu`: nalgebra-based reference implementation, parallel via rayon
//! - `gpu`: CubeCL CUDA kernels, dispatched through [`crate::GpuRuntime`]
//!
//! The CPU path is the source of truth; GPU tests compare against it.

pub mod cpu;
pub mod gpu;

pub use cpu::DEGENERATE_EPS;
