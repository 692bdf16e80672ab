//! CPU reference implementation of the batched operations.
//!
//! Per-element math goes through nalgebra; batches are processed in
//! parallel with rayon. Element i of every output depends only on element
//! i of the inputs, so iteration order never affects results.
//!
//! Unit-norm invariants are trusted, not checked: `quaternion_apply` and
//! `dual_quaternion_apply` assume unit rotation parts, and only
//! `dual_quaternion_normalize` repairs a violated invariant.

use nalgebra::{DualQuaternion, Quaternion, UnitQuaternion, Vector3};
use rayon::prelude::*;

use crate::batch::{
    broadcast_pair, DualQuatBatch, PointBatch, QuatBatch, DUAL_QUAT_WIDTH, POINT_WIDTH, QUAT_WIDTH,
};
use crate::error::Result;

/// Real-part norms below this are treated as degenerate during
/// normalization and clamp to the canonical identity. This policy is
/// fixed: no NaN is ever produced by `dual_quaternion_normalize`.
pub const DEGENERATE_EPS: f32 = 1e-8;

#[inline]
fn quat_from(row: &[f32]) -> Quaternion<f32> {
    Quaternion::new(row[0], row[1], row[2], row[3])
}

#[inline]
fn write_quat(out: &mut [f32], q: &Quaternion<f32>) {
    out[0] = q.w;
    out[1] = q.i;
    out[2] = q.j;
    out[3] = q.k;
}

#[inline]
fn point_from(row: &[f32]) -> Vector3<f32> {
    Vector3::new(row[0], row[1], row[2])
}

#[inline]
fn write_point(out: &mut [f32], v: &Vector3<f32>) {
    out[0] = v.x;
    out[1] = v.y;
    out[2] = v.z;
}

#[inline]
fn dual_from(row: &[f32]) -> DualQuaternion<f32> {
    DualQuaternion::from_real_and_dual(quat_from(&row[..4]), quat_from(&row[4..]))
}

#[inline]
fn write_dual(out: &mut [f32], dq: &DualQuaternion<f32>) {
    write_quat(&mut out[..4], &dq.real);
    write_quat(&mut out[4..], &dq.dual);
}

/// Hamilton product of two quaternion batches, elementwise.
pub fn quaternion_mul(lhs: QuatBatch, rhs: QuatBatch) -> Result<Vec<f32>> {
    let (out_len, ls, rs) = broadcast_pair(lhs.len(), rhs.len())?;

    let mut out = vec![0.0f32; out_len * QUAT_WIDTH];
    out.par_chunks_exact_mut(QUAT_WIDTH)
        .enumerate()
        .for_each(|(i, o)| {
            let q = quat_from(lhs.row(i * ls)) * quat_from(rhs.row(i * rs));
            write_quat(o, &q);
        });

    Ok(out)
}

/// Quaternion conjugate, elementwise.
pub fn quaternion_conjugate(batch: QuatBatch) -> Vec<f32> {
    let mut out = vec![0.0f32; batch.len() * QUAT_WIDTH];
    out.par_chunks_exact_mut(QUAT_WIDTH)
        .enumerate()
        .for_each(|(i, o)| {
            write_quat(o, &quat_from(batch.row(i)).conjugate());
        });
    out
}

/// Rotate a point batch by a unit-quaternion batch: `p' = q p q*`.
pub fn quaternion_apply(quats: QuatBatch, points: PointBatch) -> Result<Vec<f32>> {
    let (out_len, qs, ps) = broadcast_pair(quats.len(), points.len())?;

    let mut out = vec![0.0f32; out_len * POINT_WIDTH];
    out.par_chunks_exact_mut(POINT_WIDTH)
        .enumerate()
        .for_each(|(i, o)| {
            let rot = UnitQuaternion::new_unchecked(quat_from(quats.row(i * qs)));
            let rotated = rot * point_from(points.row(i * ps));
            write_point(o, &rotated);
        });

    Ok(out)
}

/// Flip each quaternion's sign so the scalar component is nonnegative.
///
/// `q` and `-q` encode the same rotation; this picks the canonical
/// representative. Elements with `w == 0` are left unchanged.
pub fn standardize_quaternion(batch: QuatBatch) -> Vec<f32> {
    let mut out = vec![0.0f32; batch.len() * QUAT_WIDTH];
    out.par_chunks_exact_mut(QUAT_WIDTH)
        .enumerate()
        .for_each(|(i, o)| {
            let q = quat_from(batch.row(i));
            if q.w < 0.0 {
                write_quat(o, &-q);
            } else {
                write_quat(o, &q);
            }
        });
    out
}

/// Dual-quaternion product, elementwise.
///
/// The product of two unit dual quaternions is unit up to rounding; no
/// renormalization happens here.
pub fn dual_quaternion_mul(lhs: DualQuatBatch, rhs: DualQuatBatch) -> Result<Vec<f32>> {
    let (out_len, ls, rs) = broadcast_pair(lhs.len(), rhs.len())?;

    let mut out = vec![0.0f32; out_len * DUAL_QUAT_WIDTH];
    out.par_chunks_exact_mut(DUAL_QUAT_WIDTH)
        .enumerate()
        .for_each(|(i, o)| {
            let dq = dual_from(lhs.row(i * ls)) * dual_from(rhs.row(i * rs));
            write_dual(o, &dq);
        });

    Ok(out)
}

/// Quaternion conjugate of both parts, elementwise.
///
/// For a unit dual quaternion this is also its inverse.
pub fn dual_quaternion_conjugate(batch: DualQuatBatch) -> Vec<f32> {
    let mut out = vec![0.0f32; batch.len() * DUAL_QUAT_WIDTH];
    out.par_chunks_exact_mut(DUAL_QUAT_WIDTH)
        .enumerate()
        .for_each(|(i, o)| {
            let row = batch.row(i);
            write_quat(&mut o[..4], &quat_from(&row[..4]).conjugate());
            write_quat(&mut o[4..], &quat_from(&row[4..]).conjugate());
        });
    out
}

/// Normalize each element to a canonical unit dual quaternion.
///
/// Three steps per element:
/// 1. scale both parts by the inverse real-part norm,
/// 2. remove the dual component along the real part (screw constraint),
/// 3. flip sign so the real scalar component is nonnegative.
///
/// Step 3 makes the result invariant under scaling by any nonzero real,
/// including negative scales. Elements whose real-part norm is below
/// [`DEGENERATE_EPS`] clamp to the identity.
pub fn dual_quaternion_normalize(batch: DualQuatBatch) -> Vec<f32> {
    let mut out = vec![0.0f32; batch.len() * DUAL_QUAT_WIDTH];
    out.par_chunks_exact_mut(DUAL_QUAT_WIDTH)
        .enumerate()
        .for_each(|(i, o)| {
            let row = batch.row(i);
            let re = quat_from(&row[..4]);
            let du = quat_from(&row[4..]);

            let norm = re.norm();
            if norm < DEGENERATE_EPS {
                o[0] = 1.0;
                return;
            }

            let mut re_n = re / norm;
            let mut du_n = du / norm;
            du_n -= re_n * re_n.dot(&du_n);

            if re_n.w < 0.0 {
                re_n = -re_n;
                du_n = -du_n;
            }

            write_quat(&mut o[..4], &re_n);
            write_quat(&mut o[4..], &du_n);
        });
    out
}

/// Apply each rigid transform to a point: `p' = R p + t`.
///
/// The translation is recovered as the vector part of `2 d r*`.
pub fn dual_quaternion_apply(dquats: DualQuatBatch, points: PointBatch) -> Result<Vec<f32>> {
    let (out_len, ds, ps) = broadcast_pair(dquats.len(), points.len())?;

    let mut out = vec![0.0f32; out_len * POINT_WIDTH];
    out.par_chunks_exact_mut(POINT_WIDTH)
        .enumerate()
        .for_each(|(i, o)| {
            let row = dquats.row(i * ds);
            let re = quat_from(&row[..4]);
            let du = quat_from(&row[4..]);

            let t = (du * re.conjugate()) * 2.0;
            let rot = UnitQuaternion::new_unchecked(re);
            let p = rot * point_from(points.row(i * ps)) + Vector3::new(t.i, t.j, t.k);
            write_point(o, &p);
        });

    Ok(out)
}

/// Build dual quaternions from unit rotations and translations:
/// `real = q`, `dual = 0.5 (0, t) ⊗ q`.
pub fn from_rotation_translation(quats: QuatBatch, trans: PointBatch) -> Result<Vec<f32>> {
    let (out_len, qs, ts) = broadcast_pair(quats.len(), trans.len())?;

    let mut out = vec![0.0f32; out_len * DUAL_QUAT_WIDTH];
    out.par_chunks_exact_mut(DUAL_QUAT_WIDTH)
        .enumerate()
        .for_each(|(i, o)| {
            let q = quat_from(quats.row(i * qs));
            let t = point_from(trans.row(i * ts));

            let t_quat = Quaternion::new(0.0, t.x, t.y, t.z);
            let dual = (t_quat * q) * 0.5;

            write_quat(&mut o[..4], &q);
            write_quat(&mut o[4..], &dual);
        });

    Ok(out)
}

/// Split dual quaternions back into rotations and translations.
///
/// Returns `(quats, translations)` as flat `[n * 4]` and `[n * 3]`.
pub fn to_rotation_translation(batch: DualQuatBatch) -> (Vec<f32>, Vec<f32>) {
    let n = batch.len();
    let mut quats = vec![0.0f32; n * QUAT_WIDTH];
    let mut trans = vec![0.0f32; n * POINT_WIDTH];

    quats
        .par_chunks_exact_mut(QUAT_WIDTH)
        .zip(trans.par_chunks_exact_mut(POINT_WIDTH))
        .enumerate()
        .for_each(|(i, (q_out, t_out))| {
            let row = batch.row(i);
            let re = quat_from(&row[..4]);
            let du = quat_from(&row[4..]);

            let t = (du * re.conjugate()) * 2.0;
            write_quat(q_out, &re);
            t_out[0] = t.i;
            t_out[1] = t.j;
            t_out[2] = t.k;
        });

    (quats, trans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        make_identity_dual_quats, make_random_points, make_random_unit_dual_quats,
        make_random_unit_quats, max_abs_diff, real_part_norm,
    };

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
    fn test_mul_preserves_unit_real_norm() {
        let a = make_random_unit_dual_quats(64, 1);
        let b = make_random_unit_dual_quats(64, 2);

        let prod = dual_quaternion_mul(dq(&a), dq(&b)).unwrap();
        for row in prod.chunks_exact(DUAL_QUAT_WIDTH) {
            let norm = real_part_norm(row);
            assert!((norm - 1.0).abs() < 1e-5, "norm = {norm}");
        }
    }

    #[test]
    fn test_mul_identity_is_neutral() {
        let a = make_random_unit_dual_quats(16, 3);
        let id = make_identity_dual_quats(16);

        let left = dual_quaternion_mul(dq(&id), dq(&a)).unwrap();
        let right = dual_quaternion_mul(dq(&a), dq(&id)).unwrap();
        assert!(max_abs_diff(&left, &a) < 1e-6);
        assert!(max_abs_diff(&right, &a) < 1e-6);
    }

    #[test]
    fn test_conjugate_is_involution() {
        let a = make_random_unit_dual_quats(32, 4);
        let twice = dual_quaternion_conjugate(dq(&dual_quaternion_conjugate(dq(&a))));
        assert!(max_abs_diff(&twice, &a) < 1e-6);
    }

    #[test]
    fn test_quaternion_conjugate_is_involution() {
        let a = make_random_unit_quats(32, 5);
        let twice = quaternion_conjugate(qb(&quaternion_conjugate(qb(&a))));
        assert!(max_abs_diff(&twice, &a) < 1e-6);
    }

    #[test]
    fn test_mul_times_conjugate_is_identity() {
        let a = make_random_unit_dual_quats(32, 6);
        let conj = dual_quaternion_conjugate(dq(&a));
        let prod = dual_quaternion_mul(dq(&a), dq(&conj)).unwrap();

        let id = make_identity_dual_quats(32);
        assert!(max_abs_diff(&prod, &id) < 1e-4);
    }

    #[test]
    fn test_normalize_scale_invariance() {
        let a = make_random_unit_dual_quats(32, 7);
        let reference = dual_quaternion_normalize(dq(&a));

        for k in [2.5f32, 0.1, -3.0] {
            let scaled: Vec<f32> = a.iter().map(|v| v * k).collect();
            let normalized = dual_quaternion_normalize(dq(&scaled));
            assert!(
                max_abs_diff(&normalized, &reference) < 1e-4,
                "scale invariance failed for k = {k}"
            );
        }
    }

    #[test]
    fn test_normalize_restores_screw_constraint() {
        // Perturb the dual part so <real, dual> != 0, then normalize.
        let mut a = make_random_unit_dual_quats(32, 8);
        for row in a.chunks_exact_mut(DUAL_QUAT_WIDTH) {
            row[4] += 0.3;
            row[6] -= 0.1;
        }

        let normalized = dual_quaternion_normalize(dq(&a));
        for row in normalized.chunks_exact(DUAL_QUAT_WIDTH) {
            assert!((real_part_norm(row) - 1.0).abs() < 1e-5);
            let dot = row[0] * row[4] + row[1] * row[5] + row[2] * row[6] + row[3] * row[7];
            assert!(dot.abs() < 1e-5, "dot = {dot}");
        }
    }

    #[test]
    fn test_normalize_degenerate_clamps_to_identity() {
        let a = vec![0.0f32, 0.0, 0.0, 0.0, 0.3, 0.1, 0.0, 0.2];
        let normalized = dual_quaternion_normalize(dq(&a));
        assert_eq!(normalized, [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);

        // Tiny but nonzero real part is still degenerate.
        let b = vec![1e-10f32, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let normalized = dual_quaternion_normalize(dq(&b));
        assert_eq!(normalized[0], 1.0);
        assert!(normalized.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_identity_transform_fixes_points() {
        let id = make_identity_dual_quats(1);
        let points = vec![1.0f32, 0.0, 0.0];

        let out = dual_quaternion_apply(dq(&id), pb(&points)).unwrap();
        assert!(max_abs_diff(&out, &points) < 1e-6);
    }

    #[test]
    fn test_pure_translation_transform() {
        // Identity rotation, translation (1, 2, 3).
        let quats = vec![1.0f32, 0.0, 0.0, 0.0];
        let trans = vec![1.0f32, 2.0, 3.0];
        let dquat = from_rotation_translation(qb(&quats), pb(&trans)).unwrap();

        let points = vec![0.5f32, -0.5, 0.25];
        let out = dual_quaternion_apply(dq(&dquat), pb(&points)).unwrap();
        assert!(max_abs_diff(&out, &[1.5, 1.5, 3.25]) < 1e-6);
    }

    #[test]
    fn test_apply_matches_rotation_plus_translation() {
        let quats = make_random_unit_quats(16, 9);
        let trans = make_random_points(16, 5.0, 10);
        let points = make_random_points(16, 2.0, 11);

        let dquats = from_rotation_translation(qb(&quats), pb(&trans)).unwrap();
        let via_dual = dual_quaternion_apply(dq(&dquats), pb(&points)).unwrap();

        let rotated = quaternion_apply(qb(&quats), pb(&points)).unwrap();
        let expected: Vec<f32> = rotated
            .iter()
            .zip(trans.iter())
            .map(|(r, t)| r + t)
            .collect();

        assert!(max_abs_diff(&via_dual, &expected) < 1e-4);
    }

    #[test]
    fn test_rotation_translation_round_trip() {
        let quats = make_random_unit_quats(32, 12);
        let trans = make_random_points(32, 5.0, 13);

        let dquats = from_rotation_translation(qb(&quats), pb(&trans)).unwrap();
        let (q_back, t_back) = to_rotation_translation(dq(&dquats));

        assert!(max_abs_diff(&q_back, &quats) < 1e-5);
        assert!(max_abs_diff(&t_back, &trans) < 1e-4);
    }

    #[test]
    fn test_mul_is_composition_of_transforms() {
        // Applying a*b must equal applying b then a.
        let a = make_random_unit_dual_quats(8, 14);
        let b = make_random_unit_dual_quats(8, 15);
        let points = make_random_points(8, 2.0, 16);

        let ab = dual_quaternion_mul(dq(&a), dq(&b)).unwrap();
        let composed = dual_quaternion_apply(dq(&ab), pb(&points)).unwrap();

        let after_b = dual_quaternion_apply(dq(&b), pb(&points)).unwrap();
        let sequential = dual_quaternion_apply(dq(&a), pb(&after_b)).unwrap();

        assert!(max_abs_diff(&composed, &sequential) < 1e-3);
    }

    #[test]
    fn test_standardize_quaternion() {
        let a = vec![-0.5f32, 0.5, 0.5, -0.5, 0.5, 0.5, -0.5, 0.5];
        let out = standardize_quaternion(qb(&a));
        assert_eq!(&out[..4], [0.5, -0.5, -0.5, 0.5]);
        assert_eq!(&out[4..], [0.5, 0.5, -0.5, 0.5]);
    }

    #[test]
    fn test_broadcast_single_transform_over_points() {
        let quats = vec![1.0f32, 0.0, 0.0, 0.0];
        let trans = vec![1.0f32, 0.0, 0.0];
        let dquat = from_rotation_translation(qb(&quats), pb(&trans)).unwrap();

        let points = make_random_points(10, 2.0, 17);
        let out = dual_quaternion_apply(dq(&dquat), pb(&points)).unwrap();

        assert_eq!(out.len(), points.len());
        for (o, p) in out.chunks_exact(3).zip(points.chunks_exact(3)) {
            assert!((o[0] - (p[0] + 1.0)).abs() < 1e-6);
            assert!((o[1] - p[1]).abs() < 1e-6);
            assert!((o[2] - p[2]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_length_mismatch_is_rejected() {
        let a = make_random_unit_dual_quats(4, 18);
        let b = make_random_unit_dual_quats(3, 19);
        assert!(dual_quaternion_mul(dq(&a), dq(&b)).is_err());
    }

    #[test]
    fn test_empty_batches() -> anyhow::Result<()> {
        let empty: Vec<f32> = Vec::new();
        let out = dual_quaternion_mul(dq(&empty), dq(&empty))?;
        assert!(out.is_empty());
        assert!(dual_quaternion_normalize(dq(&empty)).is_empty());
        Ok(())
    }
}
