//! Test utilities: seeded generators for batches with known structure.
//!
//! Generators use a plain LCG so tests are reproducible without pulling a
//! random-number crate into the public dependency surface.

use crate::batch::{DUAL_QUAT_WIDTH, POINT_WIDTH, QUAT_WIDTH};

/// Seeded uniform generator over [0, 1).
fn lcg(seed: u64) -> impl FnMut() -> f32 {
    let mut state = seed;
    move || {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        // Top 31 bits of state, scaled by 2^-31.
        ((state >> 33) as f32) / ((1u64 << 31) as f32)
    }
}

/// Generate `n` random unit quaternions, flat `[n * 4]`, layout `[w,x,y,z]`.
///
/// Components are drawn uniformly from [-1, 1] and normalized; draws with
/// near-zero norm are rejected.
pub fn make_random_unit_quats(n: usize, seed: u64) -> Vec<f32> {
    let mut next = lcg(seed);
    let mut out = Vec::with_capacity(n * QUAT_WIDTH);

    for _ in 0..n {
        loop {
            let w = next() * 2.0 - 1.0;
            let x = next() * 2.0 - 1.0;
            let y = next() * 2.0 - 1.0;
            let z = next() * 2.0 - 1.0;

            let norm = (w * w + x * x + y * y + z * z).sqrt();
            if norm > 1e-3 {
                out.extend_from_slice(&[w / norm, x / norm, y / norm, z / norm]);
                break;
            }
        }
    }

    out
}

/// Generate `n` random points in `[-range, range]^3`, flat `[n * 3]`.
pub fn make_random_points(n: usize, range: f32, seed: u64) -> Vec<f32> {
    let mut next = lcg(seed);
    (0..n * POINT_WIDTH)
        .map(|_| (next() * 2.0 - 1.0) * range)
        .collect()
}

/// Generate `n` random unit dual quaternions, flat `[n * 8]`.
///
/// Each element is built from a random unit rotation and a random
/// translation in `[-5, 5]^3` via `dual = 0.5 * t ⊗ real`, so the screw
/// constraint holds by construction.
pub fn make_random_unit_dual_quats(n: usize, seed: u64) -> Vec<f32> {
    let quats = make_random_unit_quats(n, seed);
    let trans = make_random_points(n, 5.0, seed ^ 0x9e3779b97f4a7c15);

    let mut out = Vec::with_capacity(n * DUAL_QUAT_WIDTH);
    for i in 0..n {
        let q = &quats[i * QUAT_WIDTH..(i + 1) * QUAT_WIDTH];
        let t = &trans[i * POINT_WIDTH..(i + 1) * POINT_WIDTH];

        // dual = 0.5 * (0, t) ⊗ (w, x, y, z)
        let (qw, qx, qy, qz) = (q[0], q[1], q[2], q[3]);
        let (tx, ty, tz) = (t[0], t[1], t[2]);
        let dw = 0.5 * (-tx * qx - ty * qy - tz * qz);
        let dx = 0.5 * (tx * qw + ty * qz - tz * qy);
        let dy = 0.5 * (-tx * qz + ty * qw + tz * qx);
        let dz = 0.5 * (tx * qy - ty * qx + tz * qw);

        out.extend_from_slice(&[qw, qx, qy, qz, dw, dx, dy, dz]);
    }

    out
}

/// `n` copies of the identity dual quaternion, flat `[n * 8]`.
pub fn make_identity_dual_quats(n: usize) -> Vec<f32> {
    let mut out = vec![0.0f32; n * DUAL_QUAT_WIDTH];
    for row in out.chunks_exact_mut(DUAL_QUAT_WIDTH) {
        row[0] = 1.0;
    }
    out
}

/// Norm of the real (rotation) part of a dual-quaternion row.
pub fn real_part_norm(row: &[f32]) -> f32 {
    (row[0] * row[0] + row[1] * row[1] + row[2] * row[2] + row[3] * row[3]).sqrt()
}

/// Largest absolute componentwise difference between two slices.
pub fn max_abs_diff(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f32::max)
}
