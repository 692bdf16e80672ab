//! Python extension module `_dualquat_cuda`.
//!
//! Thin adapter between NumPy arrays and the `dualquat_cuda` batch views.
//! The device is probed at import time: importing this module on a machine
//! without a compatible CUDA device raises immediately instead of failing
//! on first use.

use numpy::ndarray::Array2;
use numpy::{PyArray2, PyReadonlyArray2};
use once_cell::sync::OnceCell;
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use dualquat_cuda::{
    DeviceDescriptor, DualQuatBatch, DualQuatError, GpuRuntime, PointBatch, QuatBatch,
    DUAL_QUAT_WIDTH, POINT_WIDTH, QUAT_WIDTH,
};

static RUNTIME: OnceCell<GpuRuntime> = OnceCell::new();

fn map_err(e: DualQuatError) -> PyErr {
    match e {
        DualQuatError::ShapeMismatch { .. }
        | DualQuatError::RaggedBuffer { .. }
        | DualQuatError::BatchLenMismatch { .. } => PyValueError::new_err(e.to_string()),
        DualQuatError::UnsupportedDevice { .. } | DualQuatError::EnvironmentUnavailable(_) => {
            PyRuntimeError::new_err(e.to_string())
        }
    }
}

fn runtime() -> PyResult<&'static GpuRuntime> {
    RUNTIME.get_or_try_init(|| GpuRuntime::new().map_err(map_err))
}

fn to_array2(py: Python<'_>, data: Vec<f32>, width: usize) -> PyResult<&PyArray2<f32>> {
    let rows = data.len() / width;
    let arr = Array2::from_shape_vec((rows, width), data)
        .map_err(|e| PyRuntimeError::new_err(e.to_string()))?;
    Ok(PyArray2::from_owned_array(py, arr))
}

fn dual_quat_batch<'a>(arr: &'a PyReadonlyArray2<'a, f32>) -> PyResult<DualQuatBatch<'a>> {
    let trailing = arr.shape()[1];
    DualQuatBatch::new(arr.as_slice()?, trailing).map_err(map_err)
}

fn quat_batch<'a>(arr: &'a PyReadonlyArray2<'a, f32>) -> PyResult<QuatBatch<'a>> {
    let trailing = arr.shape()[1];
    QuatBatch::new(arr.as_slice()?, trailing).map_err(map_err)
}

fn point_batch<'a>(arr: &'a PyReadonlyArray2<'a, f32>) -> PyResult<PointBatch<'a>> {
    let trailing = arr.shape()[1];
    PointBatch::new(arr.as_slice()?, trailing).map_err(map_err)
}

#[pyfunction]
fn quaternion_mul<'py>(
    py: Python<'py>,
    lhs: PyReadonlyArray2<'py, f32>,
    rhs: PyReadonlyArray2<'py, f32>,
) -> PyResult<&'py PyArray2<f32>> {
    let out = runtime()?
        .quaternion_mul(quat_batch(&lhs)?, quat_batch(&rhs)?)
        .map_err(map_err)?;
    to_array2(py, out, QUAT_WIDTH)
}

#[pyfunction]
fn quaternion_conjugate<'py>(
    py: Python<'py>,
    input: PyReadonlyArray2<'py, f32>,
) -> PyResult<&'py PyArray2<f32>> {
    let out = runtime()?
        .quaternion_conjugate(quat_batch(&input)?)
        .map_err(map_err)?;
    to_array2(py, out, QUAT_WIDTH)
}

#[pyfunction]
fn quaternion_apply<'py>(
    py: Python<'py>,
    quats: PyReadonlyArray2<'py, f32>,
    points: PyReadonlyArray2<'py, f32>,
) -> PyResult<&'py PyArray2<f32>> {
    let out = runtime()?
        .quaternion_apply(quat_batch(&quats)?, point_batch(&points)?)
        .map_err(map_err)?;
    to_array2(py, out, POINT_WIDTH)
}

#[pyfunction]
fn standardize_quaternion<'py>(
    py: Python<'py>,
    input: PyReadonlyArray2<'py, f32>,
) -> PyResult<&'py PyArray2<f32>> {
    let out = runtime()?
        .standardize_quaternion(quat_batch(&input)?)
        .map_err(map_err)?;
    to_array2(py, out, QUAT_WIDTH)
}

#[pyfunction]
fn dual_quaternion_mul<'py>(
    py: Python<'py>,
    lhs: PyReadonlyArray2<'py, f32>,
    rhs: PyReadonlyArray2<'py, f32>,
) -> PyResult<&'py PyArray2<f32>> {
    let out = runtime()?
        .dual_quaternion_mul(dual_quat_batch(&lhs)?, dual_quat_batch(&rhs)?)
        .map_err(map_err)?;
    to_array2(py, out, DUAL_QUAT_WIDTH)
}

#[pyfunction]
fn dual_quaternion_conjugate<'py>(
    py: Python<'py>,
    input: PyReadonlyArray2<'py, f32>,
) -> PyResult<&'py PyArray2<f32>> {
    let out = runtime()?
        .dual_quaternion_conjugate(dual_quat_batch(&input)?)
        .map_err(map_err)?;
    to_array2(py, out, DUAL_QUAT_WIDTH)
}

#[pyfunction]
fn dual_quaternion_normalize<'py>(
    py: Python<'py>,
    input: PyReadonlyArray2<'py, f32>,
) -> PyResult<&'py PyArray2<f32>> {
    let out = runtime()?
        .dual_quaternion_normalize(dual_quat_batch(&input)?)
        .map_err(map_err)?;
    to_array2(py, out, DUAL_QUAT_WIDTH)
}

#[pyfunction]
fn dual_quaternion_apply<'py>(
    py: Python<'py>,
    dquats: PyReadonlyArray2<'py, f32>,
    points: PyReadonlyArray2<'py, f32>,
) -> PyResult<&'py PyArray2<f32>> {
    let out = runtime()?
        .dual_quaternion_apply(dual_quat_batch(&dquats)?, point_batch(&points)?)
        .map_err(map_err)?;
    to_array2(py, out, POINT_WIDTH)
}

#[pyfunction]
fn from_rotation_translation<'py>(
    py: Python<'py>,
    quats: PyReadonlyArray2<'py, f32>,
    trans: PyReadonlyArray2<'py, f32>,
) -> PyResult<&'py PyArray2<f32>> {
    let out = runtime()?
        .from_rotation_translation(quat_batch(&quats)?, point_batch(&trans)?)
        .map_err(map_err)?;
    to_array2(py, out, DUAL_QUAT_WIDTH)
}

#[pyfunction]
fn to_rotation_translation<'py>(
    py: Python<'py>,
    input: PyReadonlyArray2<'py, f32>,
) -> PyResult<(&'py PyArray2<f32>, &'py PyArray2<f32>)> {
    let (quats, trans) = runtime()?
        .to_rotation_translation(dual_quat_batch(&input)?)
        .map_err(map_err)?;
    Ok((
        to_array2(py, quats, QUAT_WIDTH)?,
        to_array2(py, trans, POINT_WIDTH)?,
    ))
}

/// Name and compute capability of the probed device.
#[pyfunction]
fn device_info() -> PyResult<(String, i32, i32)> {
    let desc = DeviceDescriptor::get().map_err(map_err)?;
    Ok((desc.name.clone(), desc.major, desc.minor))
}

#[pymodule]
fn _dualquat_cuda(_py: Python, m: &PyModule) -> PyResult<()> {
    // Fail at import when no compatible device is present.
    DeviceDescriptor::get().map_err(map_err)?;

    m.add_function(wrap_pyfunction!(quaternion_mul, m)?)?;
    m.add_function(wrap_pyfunction!(quaternion_conjugate, m)?)?;
    m.add_function(wrap_pyfunction!(quaternion_apply, m)?)?;
    m.add_function(wrap_pyfunction!(standardize_quaternion, m)?)?;
    m.add_function(wrap_pyfunction!(dual_quaternion_mul, m)?)?;
    m.add_function(wrap_pyfunction!(dual_quaternion_conjugate, m)?)?;
    m.add_function(wrap_pyfunction!(dual_quaternion_normalize, m)?)?;
    m.add_function(wrap_pyfunction!(dual_quaternion_apply, m)?)?;
    m.add_function(wrap_pyfunction!(from_rotation_translation, m)?)?;
    m.add_function(wrap_pyfunction!(to_rotation_translation, m)?)?;
    m.add_function(wrap_pyfunction!(device_info, m)?)?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    Ok(())
}
