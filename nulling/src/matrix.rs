//! Small linear-algebra helpers for the rotating array.

use std::f64::consts::PI;

use nalgebra::Matrix2;

/// Rotation of the array after `time_s` seconds of a rotation with period
/// `rotation_period_s`.
///
/// Counter-clockwise by `2π·t/P` radians.
pub fn rotation_matrix_2d(time_s: f64, rotation_period_s: f64) -> Matrix2<f64> {
    let angle = 2.0 * PI * time_s / rotation_period_s;
    let (sin, cos) = angle.sin_cos();
    Matrix2::new(cos, -sin, sin, cos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector2;

    #[test]
    fn test_quarter_turn() {
        let rotated = rotation_matrix_2d(25.0, 100.0) * Vector2::new(1.0, 0.0);
        assert_relative_eq!(rotated.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(rotated.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_full_period_is_identity() {
        let m = rotation_matrix_2d(3600.0, 3600.0);
        assert_relative_eq!(m, Matrix2::identity(), epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_preserves_length() {
        let v = Vector2::new(3.0, -4.0);
        for step in 0..12 {
            let rotated = rotation_matrix_2d(step as f64, 7.3) * v;
            assert_relative_eq!(rotated.norm(), 5.0, epsilon = 1e-12);
        }
    }
}
