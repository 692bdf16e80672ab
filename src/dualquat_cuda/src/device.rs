//! Runtime device capability probe.
//!
//! The capability of the target device is queried once at process start
//! through the CUDA driver and cached in an explicit descriptor, so a
//! single compiled artifact serves every device generation at or above
//! the minimum. Nothing is baked in at build time.

use cudarc::driver::sys::CUdevice_attribute;
use cudarc::driver::CudaContext;
use once_cell::sync::OnceCell;

use crate::error::{DualQuatError, Result};

/// Minimum supported compute capability (sm_53).
///
/// This is the floor for native half-precision arithmetic, which the
/// kernels assume is available on every device they run on.
pub const MIN_COMPUTE_CAPABILITY: (i32, i32) = (5, 3);

static DEFAULT_DEVICE: OnceCell<DeviceDescriptor> = OnceCell::new();

/// Identity and capability of a compute device, fixed for the process.
#[derive(Debug, Clone)]
pub struct DeviceDescriptor {
    /// CUDA device ordinal.
    pub ordinal: usize,
    /// Device name as reported by the driver.
    pub name: String,
    /// Compute capability major version.
    pub major: i32,
    /// Compute capability minor version.
    pub minor: i32,
}

impl DeviceDescriptor {
    /// Probe the device at `ordinal` through the CUDA driver.
    ///
    /// Fails with `EnvironmentUnavailable` when the driver or device is
    /// missing, and with `UnsupportedDevice` when the device is older
    /// than [`MIN_COMPUTE_CAPABILITY`].
    pub fn probe(ordinal: usize) -> Result<Self> {
        let ctx = CudaContext::new(ordinal)
            .map_err(|e| DualQuatError::EnvironmentUnavailable(e.to_string()))?;

        let name = ctx
            .name()
            .map_err(|e| DualQuatError::EnvironmentUnavailable(e.to_string()))?;
        let major = ctx
            .attribute(CUdevice_attribute::CU_DEVICE_ATTRIBUTE_COMPUTE_CAPABILITY_MAJOR)
            .map_err(|e| DualQuatError::EnvironmentUnavailable(e.to_string()))?;
        let minor = ctx
            .attribute(CUdevice_attribute::CU_DEVICE_ATTRIBUTE_COMPUTE_CAPABILITY_MINOR)
            .map_err(|e| DualQuatError::EnvironmentUnavailable(e.to_string()))?;

        if (major, minor) < MIN_COMPUTE_CAPABILITY {
            return Err(DualQuatError::UnsupportedDevice {
                major,
                minor,
                required_major: MIN_COMPUTE_CAPABILITY.0,
                required_minor: MIN_COMPUTE_CAPABILITY.1,
            });
        }

        tracing::debug!(ordinal, %name, major, minor, "probed CUDA device");

        Ok(Self {
            ordinal,
            name,
            major,
            minor,
        })
    }

    /// Probe device 0 once and cache the result for the process lifetime.
    pub fn get() -> Result<&'static Self> {
        DEFAULT_DEVICE.get_or_try_init(|| Self::probe(0))
    }

    /// Compute capability as a `(major, minor)` pair.
    pub fn compute_capability(&self) -> (i32, i32) {
        (self.major, self.minor)
    }

    /// Whether the device has native half-precision arithmetic.
    ///
    /// Always true for supported devices; kept explicit so callers can
    /// report it.
    pub fn supports_native_half(&self) -> bool {
        (self.major, self.minor) >= (5, 3)
    }
}
