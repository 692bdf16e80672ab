//! GPU runtime management for CubeCL CUDA execution.
//!
//! This module owns the CUDA device handle and compute client and provides
//! the dispatch wrappers for every batched operation: validate geometry,
//! upload the borrowed batches, launch one thread per element, read the
//! result back. No state survives a call beyond the client handle itself;
//! concurrent callers are interleaved by the device scheduler, not by this
//! code.
//!
//! # Example
//!
//! ```ignore
//! use dualquat_cuda::{DualQuatBatch, GpuRuntime};
//!
//! let runtime = GpuRuntime::new()?;
//! let out = runtime.dual_quaternion_mul(lhs, rhs)?;
//! ```

use cubecl::client::ComputeClient;
use cubecl::cuda::{CudaDevice, CudaRuntime};
use cubecl::prelude::*;

use crate::batch::{
    broadcast_pair, DualQuatBatch, PointBatch, QuatBatch, DUAL_QUAT_WIDTH, POINT_WIDTH, QUAT_WIDTH,
};
use crate::device::DeviceDescriptor;
use crate::error::Result;
use crate::ops::cpu::DEGENERATE_EPS;
use crate::ops::gpu::{
    dual_quaternion_apply_kernel, dual_quaternion_conjugate_kernel, dual_quaternion_mul_kernel,
    dual_quaternion_normalize_kernel, from_rotation_translation_kernel, quaternion_apply_kernel,
    quaternion_conjugate_kernel, quaternion_mul_kernel, standardize_quaternion_kernel,
    to_rotation_translation_kernel,
};
use crate::timing::{DispatchTiming, Timer};

/// Type alias for CUDA compute client
type CudaClient = ComputeClient<<CudaRuntime as Runtime>::Server, <CudaRuntime as Runtime>::Channel>;

/// GPU runtime for batched dual-quaternion operations.
///
/// Holds the CUDA device and compute client for the process; all dispatch
/// methods borrow their inputs and allocate only transient staging
/// buffers.
pub struct GpuRuntime {
    /// CUDA device (kept alive for runtime lifetime)
    #[allow(dead_code)]
    device: CudaDevice,
    /// Compute client for kernel execution
    client: CudaClient,
}

impl GpuRuntime {
    /// Create a runtime on the default CUDA device.
    pub fn new() -> Result<Self> {
        Self::with_device_id(0)
    }

    /// Create a runtime on a specific CUDA device.
    ///
    /// Probes the device capability first so a missing or too-old device
    /// fails here, not at first dispatch.
    pub fn with_device_id(device_id: usize) -> Result<Self> {
        DeviceDescriptor::probe(device_id)?;

        let device = CudaDevice::new(device_id);
        let client = CudaRuntime::client(&device);

        Ok(Self { device, client })
    }

    /// Get the underlying compute client.
    pub fn client(&self) -> &CudaClient {
        &self.client
    }

    /// Elementwise Hamilton product of two quaternion batches.
    pub fn quaternion_mul(&self, lhs: QuatBatch, rhs: QuatBatch) -> Result<Vec<f32>> {
        let (out_len, ls, rs) = broadcast_pair(lhs.len(), rhs.len())?;
        if out_len == 0 {
            return Ok(Vec::new());
        }

        let lhs_gpu = self.client.create(f32::as_bytes(lhs.as_slice()));
        let rhs_gpu = self.client.create(f32::as_bytes(rhs.as_slice()));
        let out_gpu = self
            .client
            .empty(out_len * QUAT_WIDTH * std::mem::size_of::<f32>());

        let cube_count = out_len.div_ceil(256) as u32;
        unsafe {
            quaternion_mul_kernel::launch_unchecked::<f32, CudaRuntime>(
                &self.client,
                CubeCount::Static(cube_count, 1, 1),
                CubeDim::new(256, 1, 1),
                ArrayArg::from_raw_parts::<f32>(&lhs_gpu, lhs.len() * QUAT_WIDTH, 1),
                ArrayArg::from_raw_parts::<f32>(&rhs_gpu, rhs.len() * QUAT_WIDTH, 1),
                ScalarArg::new(ls as u32),
                ScalarArg::new(rs as u32),
                ScalarArg::new(out_len as u32),
                ArrayArg::from_raw_parts::<f32>(&out_gpu, out_len * QUAT_WIDTH, 1),
            );
        }

        let bytes = self.client.read_one(out_gpu.binding());
        Ok(f32::from_bytes(&bytes).to_vec())
    }

    /// Elementwise quaternion conjugate.
    pub fn quaternion_conjugate(&self, batch: QuatBatch) -> Result<Vec<f32>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let n = batch.len();
        let input_gpu = self.client.create(f32::as_bytes(batch.as_slice()));
        let out_gpu = self
            .client
            .empty(n * QUAT_WIDTH * std::mem::size_of::<f32>());

        let cube_count = n.div_ceil(256) as u32;
        unsafe {
            quaternion_conjugate_kernel::launch_unchecked::<f32, CudaRuntime>(
                &self.client,
                CubeCount::Static(cube_count, 1, 1),
                CubeDim::new(256, 1, 1),
                ArrayArg::from_raw_parts::<f32>(&input_gpu, n * QUAT_WIDTH, 1),
                ScalarArg::new(n as u32),
                ArrayArg::from_raw_parts::<f32>(&out_gpu, n * QUAT_WIDTH, 1),
            );
        }

        let bytes = self.client.read_one(out_gpu.binding());
        Ok(f32::from_bytes(&bytes).to_vec())
    }

    /// Rotate a point batch by a unit-quaternion batch.
    pub fn quaternion_apply(&self, quats: QuatBatch, points: PointBatch) -> Result<Vec<f32>> {
        let (out_len, qs, ps) = broadcast_pair(quats.len(), points.len())?;
        if out_len == 0 {
            return Ok(Vec::new());
        }

        let quats_gpu = self.client.create(f32::as_bytes(quats.as_slice()));
        let points_gpu = self.client.create(f32::as_bytes(points.as_slice()));
        let out_gpu = self
            .client
            .empty(out_len * POINT_WIDTH * std::mem::size_of::<f32>());

        let cube_count = out_len.div_ceil(256) as u32;
        unsafe {
            quaternion_apply_kernel::launch_unchecked::<f32, CudaRuntime>(
                &self.client,
                CubeCount::Static(cube_count, 1, 1),
                CubeDim::new(256, 1, 1),
                ArrayArg::from_raw_parts::<f32>(&quats_gpu, quats.len() * QUAT_WIDTH, 1),
                ArrayArg::from_raw_parts::<f32>(&points_gpu, points.len() * POINT_WIDTH, 1),
                ScalarArg::new(qs as u32),
                ScalarArg::new(ps as u32),
                ScalarArg::new(out_len as u32),
                ArrayArg::from_raw_parts::<f32>(&out_gpu, out_len * POINT_WIDTH, 1),
            );
        }

        let bytes = self.client.read_one(out_gpu.binding());
        Ok(f32::from_bytes(&bytes).to_vec())
    }

    /// Flip each quaternion's sign so the scalar component is nonnegative.
    pub fn standardize_quaternion(&self, batch: QuatBatch) -> Result<Vec<f32>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let n = batch.len();
        let input_gpu = self.client.create(f32::as_bytes(batch.as_slice()));
        let out_gpu = self
            .client
            .empty(n * QUAT_WIDTH * std::mem::size_of::<f32>());

        let cube_count = n.div_ceil(256) as u32;
        unsafe {
            standardize_quaternion_kernel::launch_unchecked::<f32, CudaRuntime>(
                &self.client,
                CubeCount::Static(cube_count, 1, 1),
                CubeDim::new(256, 1, 1),
                ArrayArg::from_raw_parts::<f32>(&input_gpu, n * QUAT_WIDTH, 1),
                ScalarArg::new(n as u32),
                ArrayArg::from_raw_parts::<f32>(&out_gpu, n * QUAT_WIDTH, 1),
            );
        }

        let bytes = self.client.read_one(out_gpu.binding());
        Ok(f32::from_bytes(&bytes).to_vec())
    }

    /// Elementwise dual-quaternion product.
    pub fn dual_quaternion_mul(&self, lhs: DualQuatBatch, rhs: DualQuatBatch) -> Result<Vec<f32>> {
        let (out_len, ls, rs) = broadcast_pair(lhs.len(), rhs.len())?;
        if out_len == 0 {
            return Ok(Vec::new());
        }

        let mut timing = DispatchTiming::default();

        let timer = Timer::start();
        let lhs_gpu = self.client.create(f32::as_bytes(lhs.as_slice()));
        let rhs_gpu = self.client.create(f32::as_bytes(rhs.as_slice()));
        let out_gpu = self
            .client
            .empty(out_len * DUAL_QUAT_WIDTH * std::mem::size_of::<f32>());
        timing.upload_ms = timer.elapsed_ms();

        let timer = Timer::start();
        let cube_count = out_len.div_ceil(256) as u32;
        unsafe {
            dual_quaternion_mul_kernel::launch_unchecked::<f32, CudaRuntime>(
                &self.client,
                CubeCount::Static(cube_count, 1, 1),
                CubeDim::new(256, 1, 1),
                ArrayArg::from_raw_parts::<f32>(&lhs_gpu, lhs.len() * DUAL_QUAT_WIDTH, 1),
                ArrayArg::from_raw_parts::<f32>(&rhs_gpu, rhs.len() * DUAL_QUAT_WIDTH, 1),
                ScalarArg::new(ls as u32),
                ScalarArg::new(rs as u32),
                ScalarArg::new(out_len as u32),
                ArrayArg::from_raw_parts::<f32>(&out_gpu, out_len * DUAL_QUAT_WIDTH, 1),
            );
        }
        timing.launch_ms = timer.elapsed_ms();

        let timer = Timer::start();
        let bytes = self.client.read_one(out_gpu.binding());
        timing.readback_ms = timer.elapsed_ms();

        tracing::trace!(
            elems = out_len,
            upload_ms = timing.upload_ms,
            launch_ms = timing.launch_ms,
            readback_ms = timing.readback_ms,
            "dual_quaternion_mul dispatch"
        );

        Ok(f32::from_bytes(&bytes).to_vec())
    }

    /// Quaternion conjugate of both parts, elementwise.
    pub fn dual_quaternion_conjugate(&self, batch: DualQuatBatch) -> Result<Vec<f32>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let n = batch.len();
        let input_gpu = self.client.create(f32::as_bytes(batch.as_slice()));
        let out_gpu = self
            .client
            .empty(n * DUAL_QUAT_WIDTH * std::mem::size_of::<f32>());

        let cube_count = n.div_ceil(256) as u32;
        unsafe {
            dual_quaternion_conjugate_kernel::launch_unchecked::<f32, CudaRuntime>(
                &self.client,
                CubeCount::Static(cube_count, 1, 1),
                CubeDim::new(256, 1, 1),
                ArrayArg::from_raw_parts::<f32>(&input_gpu, n * DUAL_QUAT_WIDTH, 1),
                ScalarArg::new(n as u32),
                ArrayArg::from_raw_parts::<f32>(&out_gpu, n * DUAL_QUAT_WIDTH, 1),
            );
        }

        let bytes = self.client.read_one(out_gpu.binding());
        Ok(f32::from_bytes(&bytes).to_vec())
    }

    /// Normalize each element to a canonical unit dual quaternion.
    ///
    /// Degenerate elements (real-part norm below
    /// [`DEGENERATE_EPS`](crate::ops::DEGENERATE_EPS)) clamp to the
    /// identity, matching the CPU path.
    pub fn dual_quaternion_normalize(&self, batch: DualQuatBatch) -> Result<Vec<f32>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let n = batch.len();
        let input_gpu = self.client.create(f32::as_bytes(batch.as_slice()));
        let out_gpu = self
            .client
            .empty(n * DUAL_QUAT_WIDTH * std::mem::size_of::<f32>());

        let cube_count = n.div_ceil(256) as u32;
        unsafe {
            dual_quaternion_normalize_kernel::launch_unchecked::<f32, CudaRuntime>(
                &self.client,
                CubeCount::Static(cube_count, 1, 1),
                CubeDim::new(256, 1, 1),
                ArrayArg::from_raw_parts::<f32>(&input_gpu, n * DUAL_QUAT_WIDTH, 1),
                ScalarArg::new(DEGENERATE_EPS),
                ScalarArg::new(n as u32),
                ArrayArg::from_raw_parts::<f32>(&out_gpu, n * DUAL_QUAT_WIDTH, 1),
            );
        }

        let bytes = self.client.read_one(out_gpu.binding());
        Ok(f32::from_bytes(&bytes).to_vec())
    }

    /// Apply each rigid transform to a point batch.
    pub fn dual_quaternion_apply(
        &self,
        dquats: DualQuatBatch,
        points: PointBatch,
    ) -> Result<Vec<f32>> {
        let (out_len, ds, ps) = broadcast_pair(dquats.len(), points.len())?;
        if out_len == 0 {
            return Ok(Vec::new());
        }

        let mut timing = DispatchTiming::default();

        let timer = Timer::start();
        let dquats_gpu = self.client.create(f32::as_bytes(dquats.as_slice()));
        let points_gpu = self.client.create(f32::as_bytes(points.as_slice()));
        let out_gpu = self
            .client
            .empty(out_len * POINT_WIDTH * std::mem::size_of::<f32>());
        timing.upload_ms = timer.elapsed_ms();

        let timer = Timer::start();
        let cube_count = out_len.div_ceil(256) as u32;
        unsafe {
            dual_quaternion_apply_kernel::launch_unchecked::<f32, CudaRuntime>(
                &self.client,
                CubeCount::Static(cube_count, 1, 1),
                CubeDim::new(256, 1, 1),
                ArrayArg::from_raw_parts::<f32>(&dquats_gpu, dquats.len() * DUAL_QUAT_WIDTH, 1),
                ArrayArg::from_raw_parts::<f32>(&points_gpu, points.len() * POINT_WIDTH, 1),
                ScalarArg::new(ds as u32),
                ScalarArg::new(ps as u32),
                ScalarArg::new(out_len as u32),
                ArrayArg::from_raw_parts::<f32>(&out_gpu, out_len * POINT_WIDTH, 1),
            );
        }
        timing.launch_ms = timer.elapsed_ms();

        let timer = Timer::start();
        let bytes = self.client.read_one(out_gpu.binding());
        timing.readback_ms = timer.elapsed_ms();

        tracing::trace!(
            elems = out_len,
            upload_ms = timing.upload_ms,
            launch_ms = timing.launch_ms,
            readback_ms = timing.readback_ms,
            "dual_quaternion_apply dispatch"
        );

        Ok(f32::from_bytes(&bytes).to_vec())
    }

    /// Build dual quaternions from rotations and translations.
    pub fn from_rotation_translation(
        &self,
        quats: QuatBatch,
        trans: PointBatch,
    ) -> Result<Vec<f32>> {
        let (out_len, qs, ts) = broadcast_pair(quats.len(), trans.len())?;
        if out_len == 0 {
            return Ok(Vec::new());
        }

        let quats_gpu = self.client.create(f32::as_bytes(quats.as_slice()));
        let trans_gpu = self.client.create(f32::as_bytes(trans.as_slice()));
        let out_gpu = self
            .client
            .empty(out_len * DUAL_QUAT_WIDTH * std::mem::size_of::<f32>());

        let cube_count = out_len.div_ceil(256) as u32;
        unsafe {
            from_rotation_translation_kernel::launch_unchecked::<f32, CudaRuntime>(
                &self.client,
                CubeCount::Static(cube_count, 1, 1),
                CubeDim::new(256, 1, 1),
                ArrayArg::from_raw_parts::<f32>(&quats_gpu, quats.len() * QUAT_WIDTH, 1),
                ArrayArg::from_raw_parts::<f32>(&trans_gpu, trans.len() * POINT_WIDTH, 1),
                ScalarArg::new(qs as u32),
                ScalarArg::new(ts as u32),
                ScalarArg::new(out_len as u32),
                ArrayArg::from_raw_parts::<f32>(&out_gpu, out_len * DUAL_QUAT_WIDTH, 1),
            );
        }

        let bytes = self.client.read_one(out_gpu.binding());
        Ok(f32::from_bytes(&bytes).to_vec())
    }

    /// Split dual quaternions into rotations and translations.
    ///
    /// Returns `(quats, translations)` as flat `[n * 4]` and `[n * 3]`.
    pub fn to_rotation_translation(&self, batch: DualQuatBatch) -> Result<(Vec<f32>, Vec<f32>)> {
        if batch.is_empty() {
            return Ok((Vec::new(), Vec::new()));
        }

        let n = batch.len();
        let input_gpu = self.client.create(f32::as_bytes(batch.as_slice()));
        let quats_gpu = self
            .client
            .empty(n * QUAT_WIDTH * std::mem::size_of::<f32>());
        let trans_gpu = self
            .client
            .empty(n * POINT_WIDTH * std::mem::size_of::<f32>());

        let cube_count = n.div_ceil(256) as u32;
        unsafe {
            to_rotation_translation_kernel::launch_unchecked::<f32, CudaRuntime>(
                &self.client,
                CubeCount::Static(cube_count, 1, 1),
                CubeDim::new(256, 1, 1),
                ArrayArg::from_raw_parts::<f32>(&input_gpu, n * DUAL_QUAT_WIDTH, 1),
                ScalarArg::new(n as u32),
                ArrayArg::from_raw_parts::<f32>(&quats_gpu, n * QUAT_WIDTH, 1),
                ArrayArg::from_raw_parts::<f32>(&trans_gpu, n * POINT_WIDTH, 1),
            );
        }

        let quat_bytes = self.client.read_one(quats_gpu.binding());
        let trans_bytes = self.client.read_one(trans_gpu.binding());
        Ok((
            f32::from_bytes(&quat_bytes).to_vec(),
            f32::from_bytes(&trans_bytes).to_vec(),
        ))
    }
}

/// Check if CUDA is available on this system.
pub fn is_cuda_available() -> bool {
    // Try to create a device - if it fails, CUDA is not available
    std::panic::catch_unwind(|| {
        let _device = CudaDevice::new(0);
    })
    .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::cpu;
    use crate::test_utils::{
        make_identity_dual_quats, make_random_points, make_random_unit_dual_quats,
        make_random_unit_quats, max_abs_diff,
    };

    /// Skip test at runtime if CUDA is not available.
    /// This allows GPU tests to run on machines with CUDA while
    /// gracefully skipping on machines without GPU.
    macro_rules! require_cuda {
        () => {
            if !is_cuda_available() {
                println!("Skipping test: CUDA not available");
                return;
            }
        };
    }

    fn dq(data: &[f32]) -> DualQuatBatch {
        DualQuatBatch::new(data, DUAL_QUAT_WIDTH).unwrap()
    }

    fn qb(data: &[f32]) -> QuatBatch {
        QuatBatch::new(data, QUAT_WIDTH).unwrap()
    }

    fn pb(data: &[f32]) -> PointBatch {
        PointBatch::new(data, POINT_WIDTH).unwrap()
    }

    #[test]
    fn test_cuda_availability() {
        let _available = is_cuda_available();
        println!("CUDA available: {_available}");
    }

    #[test]
    fn test_runtime_creation_reports_device_errors() {
        if is_cuda_available() {
            GpuRuntime::new().expect("runtime creation should succeed with CUDA present");
        } else {
            assert!(GpuRuntime::new().is_err());
        }
    }

    #[test]
    fn test_identity_transform_gpu() {
        require_cuda!();

        let runtime = GpuRuntime::new().expect("Failed to create GPU runtime");

        let id = make_identity_dual_quats(1);
        let points = vec![1.0f32, 0.0, 0.0];

        let out = runtime.dual_quaternion_apply(dq(&id), pb(&points)).unwrap();
        assert!(max_abs_diff(&out, &points) < 1e-6);
    }

    #[test]
    fn test_cpu_vs_gpu_dual_quaternion_mul() {
        require_cuda!();

        let runtime = GpuRuntime::new().expect("Failed to create GPU runtime");

        let a = make_random_unit_dual_quats(300, 21);
        let b = make_random_unit_dual_quats(300, 22);

        let cpu_out = cpu::dual_quaternion_mul(dq(&a), dq(&b)).unwrap();
        let gpu_out = runtime.dual_quaternion_mul(dq(&a), dq(&b)).unwrap();

        assert_eq!(cpu_out.len(), gpu_out.len());
        assert!(max_abs_diff(&cpu_out, &gpu_out) < 1e-5);
    }

    #[test]
    fn test_cpu_vs_gpu_quaternion_mul_broadcast() {
        require_cuda!();

        let runtime = GpuRuntime::new().expect("Failed to create GPU runtime");

        let a = make_random_unit_quats(1, 23);
        let b = make_random_unit_quats(100, 24);

        let cpu_out = cpu::quaternion_mul(qb(&a), qb(&b)).unwrap();
        let gpu_out = runtime.quaternion_mul(qb(&a), qb(&b)).unwrap();

        assert!(max_abs_diff(&cpu_out, &gpu_out) < 1e-5);
    }

    #[test]
    fn test_cpu_vs_gpu_conjugates() {
        require_cuda!();

        let runtime = GpuRuntime::new().expect("Failed to create GPU runtime");

        let quats = make_random_unit_quats(128, 25);
        let cpu_out = cpu::quaternion_conjugate(qb(&quats));
        let gpu_out = runtime.quaternion_conjugate(qb(&quats)).unwrap();
        assert!(max_abs_diff(&cpu_out, &gpu_out) < 1e-6);

        let dquats = make_random_unit_dual_quats(128, 26);
        let cpu_out = cpu::dual_quaternion_conjugate(dq(&dquats));
        let gpu_out = runtime.dual_quaternion_conjugate(dq(&dquats)).unwrap();
        assert!(max_abs_diff(&cpu_out, &gpu_out) < 1e-6);
    }

    #[test]
    fn test_cpu_vs_gpu_normalize() {
        require_cuda!();

        let runtime = GpuRuntime::new().expect("Failed to create GPU runtime");

        // Scaled and perturbed inputs, plus one degenerate element.
        let mut batch = make_random_unit_dual_quats(64, 27);
        for (i, row) in batch.chunks_exact_mut(DUAL_QUAT_WIDTH).enumerate() {
            let k = 0.5 + (i as f32) * 0.1;
            for v in row.iter_mut() {
                *v *= k;
            }
        }
        batch.extend_from_slice(&[0.0, 0.0, 0.0, 0.0, 0.5, 0.0, 0.1, 0.0]);

        let cpu_out = cpu::dual_quaternion_normalize(dq(&batch));
        let gpu_out = runtime.dual_quaternion_normalize(dq(&batch)).unwrap();

        assert!(max_abs_diff(&cpu_out, &gpu_out) < 1e-5);
        // Degenerate element clamps to identity on both paths.
        let last = &gpu_out[gpu_out.len() - DUAL_QUAT_WIDTH..];
        assert_eq!(last, [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_cpu_vs_gpu_apply() {
        require_cuda!();

        let runtime = GpuRuntime::new().expect("Failed to create GPU runtime");

        let dquats = make_random_unit_dual_quats(200, 28);
        let points = make_random_points(200, 3.0, 29);

        let cpu_out = cpu::dual_quaternion_apply(dq(&dquats), pb(&points)).unwrap();
        let gpu_out = runtime.dual_quaternion_apply(dq(&dquats), pb(&points)).unwrap();

        assert!(max_abs_diff(&cpu_out, &gpu_out) < 1e-4);
    }

    #[test]
    fn test_cpu_vs_gpu_quaternion_apply() {
        require_cuda!();

        let runtime = GpuRuntime::new().expect("Failed to create GPU runtime");

        let quats = make_random_unit_quats(200, 30);
        let points = make_random_points(200, 3.0, 31);

        let cpu_out = cpu::quaternion_apply(qb(&quats), pb(&points)).unwrap();
        let gpu_out = runtime.quaternion_apply(qb(&quats), pb(&points)).unwrap();

        assert!(max_abs_diff(&cpu_out, &gpu_out) < 1e-5);
    }

    #[test]
    fn test_cpu_vs_gpu_rotation_translation_round_trip() {
        require_cuda!();

        let runtime = GpuRuntime::new().expect("Failed to create GPU runtime");

        let quats = make_random_unit_quats(64, 32);
        let trans = make_random_points(64, 5.0, 33);

        let gpu_dq = runtime
            .from_rotation_translation(qb(&quats), pb(&trans))
            .unwrap();
        let cpu_dq = cpu::from_rotation_translation(qb(&quats), pb(&trans)).unwrap();
        assert!(max_abs_diff(&gpu_dq, &cpu_dq) < 1e-5);

        let (q_back, t_back) = runtime.to_rotation_translation(dq(&gpu_dq)).unwrap();
        assert!(max_abs_diff(&q_back, &quats) < 1e-5);
        assert!(max_abs_diff(&t_back, &trans) < 1e-4);
    }

    #[test]
    fn test_cpu_vs_gpu_standardize() {
        require_cuda!();

        let runtime = GpuRuntime::new().expect("Failed to create GPU runtime");

        let mut quats = make_random_unit_quats(100, 34);
        // Force a mix of signs.
        for (i, row) in quats.chunks_exact_mut(QUAT_WIDTH).enumerate() {
            if i % 2 == 0 && row[0] > 0.0 {
                for v in row.iter_mut() {
                    *v = -*v;
                }
            }
        }

        let cpu_out = cpu::standardize_quaternion(qb(&quats));
        let gpu_out = runtime.standardize_quaternion(qb(&quats)).unwrap();
        assert!(max_abs_diff(&cpu_out, &gpu_out) < 1e-6);
        assert!(gpu_out.chunks_exact(QUAT_WIDTH).all(|q| q[0] >= 0.0));
    }

    #[test]
    fn test_gpu_length_mismatch_is_rejected() {
        require_cuda!();

        let runtime = GpuRuntime::new().expect("Failed to create GPU runtime");

        let a = make_random_unit_dual_quats(4, 35);
        let b = make_random_unit_dual_quats(3, 36);
        assert!(runtime.dual_quaternion_mul(dq(&a), dq(&b)).is_err());
    }
}
