//! CubeCL CUDA kernels for the batched operations.
//!
//! One thread processes one batch element; there is no synchronization or
//! shared mutable state between elements, so launch geometry never affects
//! results.
//!
//! # GPU Memory Layout
//!
//! - Dual quaternions: [N, 8] flattened to [N * 8], real part first
//! - Quaternions: [N, 4] flattened to [N * 4], scalar first
//! - Points: [N, 3] flattened to [N * 3]
//!
//! Binary kernels take a per-side row stride (0 or 1): a stride of 0
//! broadcasts a length-1 batch across the other operand.
//!
//! The Hamilton product and point rotation are written out longhand in
//! each kernel that needs them; the cube macro does not expand helper
//! functions with multi-value returns.

use cubecl::prelude::*;

/// Elementwise Hamilton product of two quaternion batches.
#[cube(launch_unchecked)]
pub fn quaternion_mul_kernel<F: Float>(
    // Left operand [N * 4] (or [4] when broadcast)
    lhs: &Array<F>,
    // Right operand [N * 4] (or [4] when broadcast)
    rhs: &Array<F>,
    // Row stride per side: 1 = indexed, 0 = broadcast
    lhs_stride: u32,
    rhs_stride: u32,
    // Number of output elements
    num_elems: u32,
    // Output [N * 4]
    out: &mut Array<F>,
) {
    let idx = ABSOLUTE_POS;

    if idx >= num_elems {
        terminate!();
    }

    let lb = idx * lhs_stride * 4;
    let rb = idx * rhs_stride * 4;

    let aw = lhs[lb];
    let ax = lhs[lb + 1];
    let ay = lhs[lb + 2];
    let az = lhs[lb + 3];
    let bw = rhs[rb];
    let bx = rhs[rb + 1];
    let by = rhs[rb + 2];
    let bz = rhs[rb + 3];

    let ob = idx * 4;
    out[ob] = aw * bw - ax * bx - ay * by - az * bz;
    out[ob + 1] = aw * bx + ax * bw + ay * bz - az * by;
    out[ob + 2] = aw * by - ax * bz + ay * bw + az * bx;
    out[ob + 3] = aw * bz + ax * by - ay * bx + az * bw;
}

/// Elementwise quaternion conjugate.
#[cube(launch_unchecked)]
pub fn quaternion_conjugate_kernel<F: Float>(
    input: &Array<F>,
    num_elems: u32,
    out: &mut Array<F>,
) {
    let idx = ABSOLUTE_POS;

    if idx >= num_elems {
        terminate!();
    }

    let base = idx * 4;
    out[base] = input[base];
    out[base + 1] = -input[base + 1];
    out[base + 2] = -input[base + 2];
    out[base + 3] = -input[base + 3];
}

/// Rotate a point batch by a unit-quaternion batch:
/// `t = 2 qv × p`, `p' = p + w t + qv × t`.
#[cube(launch_unchecked)]
pub fn quaternion_apply_kernel<F: Float>(
    // Unit quaternions [N * 4]
    quats: &Array<F>,
    // Points [N * 3]
    points: &Array<F>,
    quat_stride: u32,
    point_stride: u32,
    num_elems: u32,
    // Output points [N * 3]
    out: &mut Array<F>,
) {
    let idx = ABSOLUTE_POS;

    if idx >= num_elems {
        terminate!();
    }

    let qb = idx * quat_stride * 4;
    let pb = idx * point_stride * 3;

    let qw = quats[qb];
    let qx = quats[qb + 1];
    let qy = quats[qb + 2];
    let qz = quats[qb + 3];
    let px = points[pb];
    let py = points[pb + 1];
    let pz = points[pb + 2];

    let two = F::new(2.0);
    let tx = (qy * pz - qz * py) * two;
    let ty = (qz * px - qx * pz) * two;
    let tz = (qx * py - qy * px) * two;

    let ob = idx * 3;
    out[ob] = px + qw * tx + qy * tz - qz * ty;
    out[ob + 1] = py + qw * ty + qz * tx - qx * tz;
    out[ob + 2] = pz + qw * tz + qx * ty - qy * tx;
}

/// Flip sign so the scalar component is nonnegative.
#[cube(launch_unchecked)]
pub fn standardize_quaternion_kernel<F: Float>(
    input: &Array<F>,
    num_elems: u32,
    out: &mut Array<F>,
) {
    let idx = ABSOLUTE_POS;

    if idx >= num_elems {
        terminate!();
    }

    let base = idx * 4;
    let w = input[base];

    if w < F::new(0.0) {
        out[base] = -w;
        out[base + 1] = -input[base + 1];
        out[base + 2] = -input[base + 2];
        out[base + 3] = -input[base + 3];
    } else {
        out[base] = w;
        out[base + 1] = input[base + 1];
        out[base + 2] = input[base + 2];
        out[base + 3] = input[base + 3];
    }
}

/// Elementwise dual-quaternion product:
/// `(r1 + ε d1)(r2 + ε d2) = r1 r2 + ε (r1 d2 + d1 r2)`.
#[cube(launch_unchecked)]
pub fn dual_quaternion_mul_kernel<F: Float>(
    lhs: &Array<F>,
    rhs: &Array<F>,
    lhs_stride: u32,
    rhs_stride: u32,
    num_elems: u32,
    out: &mut Array<F>,
) {
    let idx = ABSOLUTE_POS;

    if idx >= num_elems {
        terminate!();
    }

    let lb = idx * lhs_stride * 8;
    let rb = idx * rhs_stride * 8;

    let arw = lhs[lb];
    let arx = lhs[lb + 1];
    let ary = lhs[lb + 2];
    let arz = lhs[lb + 3];
    let adw = lhs[lb + 4];
    let adx = lhs[lb + 5];
    let ady = lhs[lb + 6];
    let adz = lhs[lb + 7];

    let brw = rhs[rb];
    let brx = rhs[rb + 1];
    let bry = rhs[rb + 2];
    let brz = rhs[rb + 3];
    let bdw = rhs[rb + 4];
    let bdx = rhs[rb + 5];
    let bdy = rhs[rb + 6];
    let bdz = rhs[rb + 7];

    let ob = idx * 8;

    // r1 r2
    out[ob] = arw * brw - arx * brx - ary * bry - arz * brz;
    out[ob + 1] = arw * brx + arx * brw + ary * brz - arz * bry;
    out[ob + 2] = arw * bry - arx * brz + ary * brw + arz * brx;
    out[ob + 3] = arw * brz + arx * bry - ary * brx + arz * brw;

    // r1 d2 + d1 r2
    out[ob + 4] = (arw * bdw - arx * bdx - ary * bdy - arz * bdz)
        + (adw * brw - adx * brx - ady * bry - adz * brz);
    out[ob + 5] = (arw * bdx + arx * bdw + ary * bdz - arz * bdy)
        + (adw * brx + adx * brw + ady * brz - adz * bry);
    out[ob + 6] = (arw * bdy - arx * bdz + ary * bdw + arz * bdx)
        + (adw * bry - adx * brz + ady * brw + adz * brx);
    out[ob + 7] = (arw * bdz + arx * bdy - ary * bdx + arz * bdw)
        + (adw * brz + adx * bry - ady * brx + adz * brw);
}

/// Quaternion conjugate of both parts.
#[cube(launch_unchecked)]
pub fn dual_quaternion_conjugate_kernel<F: Float>(
    input: &Array<F>,
    num_elems: u32,
    out: &mut Array<F>,
) {
    let idx = ABSOLUTE_POS;

    if idx >= num_elems {
        terminate!();
    }

    let base = idx * 8;
    out[base] = input[base];
    out[base + 1] = -input[base + 1];
    out[base + 2] = -input[base + 2];
    out[base + 3] = -input[base + 3];
    out[base + 4] = input[base + 4];
    out[base + 5] = -input[base + 5];
    out[base + 6] = -input[base + 6];
    out[base + 7] = -input[base + 7];
}

/// Normalize each element to a canonical unit dual quaternion.
///
/// Mirrors the CPU policy exactly: real-part norms below `eps` clamp to
/// the identity, the dual part is projected orthogonal to the real part,
/// and the sign is flipped so the real scalar component is nonnegative.
#[cube(launch_unchecked)]
pub fn dual_quaternion_normalize_kernel<F: Float>(
    input: &Array<F>,
    // Degenerate threshold on the real-part norm
    eps: F,
    num_elems: u32,
    out: &mut Array<F>,
) {
    let idx = ABSOLUTE_POS;

    if idx >= num_elems {
        terminate!();
    }

    let base = idx * 8;
    let rw = input[base];
    let rx = input[base + 1];
    let ry = input[base + 2];
    let rz = input[base + 3];

    let norm_sq = rw * rw + rx * rx + ry * ry + rz * rz;

    if norm_sq < eps * eps {
        out[base] = F::new(1.0);
        out[base + 1] = F::new(0.0);
        out[base + 2] = F::new(0.0);
        out[base + 3] = F::new(0.0);
        out[base + 4] = F::new(0.0);
        out[base + 5] = F::new(0.0);
        out[base + 6] = F::new(0.0);
        out[base + 7] = F::new(0.0);
    } else {
        let inv = F::new(1.0) / F::sqrt(norm_sq);

        let mut nrw = rw * inv;
        let mut nrx = rx * inv;
        let mut nry = ry * inv;
        let mut nrz = rz * inv;
        let mut ndw = input[base + 4] * inv;
        let mut ndx = input[base + 5] * inv;
        let mut ndy = input[base + 6] * inv;
        let mut ndz = input[base + 7] * inv;

        // Project the dual part orthogonal to the (now unit) real part.
        let dot = nrw * ndw + nrx * ndx + nry * ndy + nrz * ndz;
        ndw -= dot * nrw;
        ndx -= dot * nrx;
        ndy -= dot * nry;
        ndz -= dot * nrz;

        if nrw < F::new(0.0) {
            nrw = -nrw;
            nrx = -nrx;
            nry = -nry;
            nrz = -nrz;
            ndw = -ndw;
            ndx = -ndx;
            ndy = -ndy;
            ndz = -ndz;
        }

        out[base] = nrw;
        out[base + 1] = nrx;
        out[base + 2] = nry;
        out[base + 3] = nrz;
        out[base + 4] = ndw;
        out[base + 5] = ndx;
        out[base + 6] = ndy;
        out[base + 7] = ndz;
    }
}

/// Apply each rigid transform to a point: `p' = R p + t`,
/// `t = vec(2 d r*)`.
#[cube(launch_unchecked)]
pub fn dual_quaternion_apply_kernel<F: Float>(
    // Unit dual quaternions [N * 8]
    dquats: &Array<F>,
    // Points [N * 3]
    points: &Array<F>,
    dq_stride: u32,
    point_stride: u32,
    num_elems: u32,
    // Output points [N * 3]
    out: &mut Array<F>,
) {
    let idx = ABSOLUTE_POS;

    if idx >= num_elems {
        terminate!();
    }

    let db = idx * dq_stride * 8;
    let pb = idx * point_stride * 3;

    let rw = dquats[db];
    let rx = dquats[db + 1];
    let ry = dquats[db + 2];
    let rz = dquats[db + 3];

    let two = F::new(2.0);
    let dw = dquats[db + 4] * two;
    let dx = dquats[db + 5] * two;
    let dy = dquats[db + 6] * two;
    let dz = dquats[db + 7] * two;

    // t = vec((2 d) r*), with r* = (rw, -rx, -ry, -rz)
    let cx = -rx;
    let cy = -ry;
    let cz = -rz;
    let tx = dw * cx + dx * rw + dy * cz - dz * cy;
    let ty = dw * cy - dx * cz + dy * rw + dz * cx;
    let tz = dw * cz + dx * cy - dy * cx + dz * rw;

    let px = points[pb];
    let py = points[pb + 1];
    let pz = points[pb + 2];

    let ux = (ry * pz - rz * py) * two;
    let uy = (rz * px - rx * pz) * two;
    let uz = (rx * py - ry * px) * two;

    let ob = idx * 3;
    out[ob] = px + rw * ux + ry * uz - rz * uy + tx;
    out[ob + 1] = py + rw * uy + rz * ux - rx * uz + ty;
    out[ob + 2] = pz + rw * uz + rx * uy - ry * ux + tz;
}

/// Build dual quaternions from rotations and translations:
/// `real = q`, `dual = 0.5 (0, t) ⊗ q`.
#[cube(launch_unchecked)]
pub fn from_rotation_translation_kernel<F: Float>(
    // Unit quaternions [N * 4]
    quats: &Array<F>,
    // Translations [N * 3]
    trans: &Array<F>,
    quat_stride: u32,
    trans_stride: u32,
    num_elems: u32,
    // Output dual quaternions [N * 8]
    out: &mut Array<F>,
) {
    let idx = ABSOLUTE_POS;

    if idx >= num_elems {
        terminate!();
    }

    let qb = idx * quat_stride * 4;
    let tb = idx * trans_stride * 3;

    let qw = quats[qb];
    let qx = quats[qb + 1];
    let qy = quats[qb + 2];
    let qz = quats[qb + 3];

    let half = F::new(0.5);
    let hx = trans[tb] * half;
    let hy = trans[tb + 1] * half;
    let hz = trans[tb + 2] * half;

    let ob = idx * 8;
    out[ob] = qw;
    out[ob + 1] = qx;
    out[ob + 2] = qy;
    out[ob + 3] = qz;
    // (0, h) ⊗ q
    out[ob + 4] = -hx * qx - hy * qy - hz * qz;
    out[ob + 5] = hx * qw + hy * qz - hz * qy;
    out[ob + 6] = -hx * qz + hy * qw + hz * qx;
    out[ob + 7] = hx * qy - hy * qx + hz * qw;
}

/// Split dual quaternions into rotations and translations.
#[cube(launch_unchecked)]
pub fn to_rotation_translation_kernel<F: Float>(
    // Unit dual quaternions [N * 8]
    dquats: &Array<F>,
    num_elems: u32,
    // Output quaternions [N * 4]
    out_quats: &mut Array<F>,
    // Output translations [N * 3]
    out_trans: &mut Array<F>,
) {
    let idx = ABSOLUTE_POS;

    if idx >= num_elems {
        terminate!();
    }

    let base = idx * 8;
    let rw = dquats[base];
    let rx = dquats[base + 1];
    let ry = dquats[base + 2];
    let rz = dquats[base + 3];

    let two = F::new(2.0);
    let dw = dquats[base + 4] * two;
    let dx = dquats[base + 5] * two;
    let dy = dquats[base + 6] * two;
    let dz = dquats[base + 7] * two;

    let cx = -rx;
    let cy = -ry;
    let cz = -rz;

    let qb = idx * 4;
    out_quats[qb] = rw;
    out_quats[qb + 1] = rx;
    out_quats[qb + 2] = ry;
    out_quats[qb + 3] = rz;

    // t = vec((2 d) r*)
    let tb = idx * 3;
    out_trans[tb] = dw * cx + dx * rw + dy * cz - dz * cy;
    out_trans[tb + 1] = dw * cy - dx * cz + dy * rw + dz * cx;
    out_trans[tb + 2] = dw * cz + dx * cy - dy * cx + dz * rw;
}
