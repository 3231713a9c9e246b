use nalgebra::{Matrix3, Rotation3, UnitQuaternion};

use crate::messages::Quaternion;

/// Converts a row-major 3x3 rotation matrix to a unit quaternion.
///
/// The matrix is taken as-is (no re-orthonormalization); the quaternion is
/// normalized afterwards so drifted input still yields unit length.
pub fn rotation_to_quaternion(m: &[f32; 9]) -> Quaternion {
    let matrix = Matrix3::from_row_slice(&m.map(f64::from));
    let rotation = Rotation3::from_matrix_unchecked(matrix);
    let q = UnitQuaternion::from_rotation_matrix(&rotation).into_inner();

    let norm = q.norm();
    if !norm.is_finite() || norm == 0.0 {
        return Quaternion::IDENTITY;
    }
    let q = q / norm;

    Quaternion {
        w: q.w,
        x: q.i,
        y: q.j,
        z: q.k,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    const TOLERANCE: f64 = 1e-5;

    fn axis_angle(axis: [f64; 3], angle: f64) -> [f32; 9] {
        let len = (axis[0] * axis[0] + axis[1] * axis[1] + axis[2] * axis[2]).sqrt();
        let [x, y, z] = axis.map(|v| v / len);
        let (s, c) = angle.sin_cos();
        let t = 1.0 - c;
        [
            t * x * x + c,
            t * x * y - s * z,
            t * x * z + s * y,
            t * x * y + s * z,
            t * y * y + c,
            t * y * z - s * x,
            t * x * z - s * y,
            t * y * z + s * x,
            t * z * z + c,
        ]
        .map(|v| v as f32)
    }

    fn assert_round_trip(m: &[f32; 9]) {
        let q = rotation_to_quaternion(m);
        assert!((q.norm() - 1.0).abs() < TOLERANCE, "norm {}", q.norm());
        let back = UnitQuaternion::from_quaternion(nalgebra::Quaternion::new(q.w, q.x, q.y, q.z))
            .to_rotation_matrix();
        for row in 0..3 {
            for col in 0..3 {
                let orig = f64::from(m[row * 3 + col]);
                let rebuilt = back[(row, col)];
                assert!(
                    (orig - rebuilt).abs() < TOLERANCE,
                    "matrix {m:?} rebuilt as {back:?}"
                );
            }
        }
    }

    #[test]
    fn test_identity() {
        let q = rotation_to_quaternion(&crate::types::IDENTITY_ORIENTATION);
        assert_eq!(q, Quaternion::IDENTITY);
    }

    #[test]
    fn test_half_turns_use_diagonal_branches() {
        let about_x = rotation_to_quaternion(&[1.0, 0.0, 0.0, 0.0, -1.0, 0.0, 0.0, 0.0, -1.0]);
        assert!((about_x.x.abs() - 1.0).abs() < TOLERANCE);
        assert!(about_x.w.abs() < TOLERANCE);

        let about_y = rotation_to_quaternion(&[-1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, -1.0]);
        assert!((about_y.y.abs() - 1.0).abs() < TOLERANCE);

        let about_z = rotation_to_quaternion(&[-1.0, 0.0, 0.0, 0.0, -1.0, 0.0, 0.0, 0.0, 1.0]);
        assert!((about_z.z.abs() - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn test_quarter_turn_about_z() {
        let q = rotation_to_quaternion(&axis_angle([0.0, 0.0, 1.0], FRAC_PI_2));
        let half = FRAC_PI_2 / 2.0;
        assert!((q.w - half.cos()).abs() < TOLERANCE);
        assert!((q.z - half.sin()).abs() < TOLERANCE);
        assert!(q.x.abs() < TOLERANCE && q.y.abs() < TOLERANCE);
    }

    #[test]
    fn test_round_trip_over_many_rotations() {
        let axes = [
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 1.0, 0.0],
            [-1.0, 2.0, 0.5],
            [0.3, -0.7, -2.0],
        ];
        for axis in axes {
            for step in 0..=24 {
                let angle = -PI + step as f64 * (2.0 * PI / 24.0);
                assert_round_trip(&axis_angle(axis, angle));
            }
        }
    }

    #[test]
    fn test_near_half_turn_stays_accurate() {
        assert_round_trip(&axis_angle([0.2, 0.9, -0.4], PI - 1e-4));
        assert_round_trip(&axis_angle([1.0, 0.0, 1.0], PI));
    }

    #[test]
    fn test_drifted_matrix_still_gives_unit_quaternion() {
        let drifted = axis_angle([0.0, 1.0, 1.0], 1.0).map(|v| v * 1.002);
        let q = rotation_to_quaternion(&drifted);
        assert!((q.norm() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_conversion_is_deterministic() {
        let m = axis_angle([0.4, -0.1, 0.8], 2.3);
        let a = rotation_to_quaternion(&m);
        let b = rotation_to_quaternion(&m);
        assert_eq!(
            [a.w, a.x, a.y, a.z].map(f64::to_bits),
            [b.w, b.x, b.y, b.z].map(f64::to_bits)
        );
    }
}
