//! SE3 rigid-body transform used for object poses.
//!
//! Naming follows `T_target_source`: `t_world_cam * p_cam = p_world`.

use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Minimum quaternion norm accepted when normalizing raw message data.
const MIN_QUATERNION_NORM: f64 = 1e-9;

/// Rotation + translation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SE3 {
    pub rotation: UnitQuaternion<f64>,
    pub translation: Vector3<f64>,
}

impl SE3 {
    pub fn identity() -> Self {
        Self {
            rotation: UnitQuaternion::identity(),
            translation: Vector3::zeros(),
        }
    }

    pub fn new(rotation: UnitQuaternion<f64>, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    pub fn from_translation(translation: Vector3<f64>) -> Self {
        Self {
            rotation: UnitQuaternion::identity(),
            translation,
        }
    }

    /// Build from raw position and `[x, y, z, w]` quaternion components as
    /// they arrive on the wire.
    ///
    /// Returns `None` if any component is non-finite or the quaternion is
    /// too close to zero to normalize.
    pub fn try_from_parts(position: [f64; 3], orientation_xyzw: [f64; 4]) -> Option<Self> {
        if position.iter().chain(orientation_xyzw.iter()).any(|v| !v.is_finite()) {
            return None;
        }

        let [x, y, z, w] = orientation_xyzw;
        let q = Quaternion::new(w, x, y, z);
        if q.norm() < MIN_QUATERNION_NORM {
            return None;
        }

        Some(Self {
            rotation: UnitQuaternion::from_quaternion(q),
            translation: Vector3::new(position[0], position[1], position[2]),
        })
    }

    /// `self * other`: apply `other` first, then `self`.
    pub fn compose(&self, other: &SE3) -> SE3 {
        SE3 {
            rotation: self.rotation * other.rotation,
            translation: self.rotation * other.translation + self.translation,
        }
    }

    pub fn inverse(&self) -> SE3 {
        let rot_inv = self.rotation.inverse();
        SE3 {
            rotation: rot_inv,
            translation: -(rot_inv * self.translation),
        }
    }

    pub fn transform_point(&self, p: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * p + self.translation
    }
}

impl Default for SE3 {
    fn default() -> Self {
        Self::identity()
    }
}

impl std::ops::Mul for SE3 {
    type Output = SE3;

    fn mul(self, rhs: SE3) -> SE3 {
        self.compose(&rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_compose_with_inverse_is_identity() {
        let t = SE3::new(
            UnitQuaternion::from_euler_angles(0.1, -0.4, 1.2),
            Vector3::new(1.0, 2.0, 3.0),
        );
        let id = t.compose(&t.inverse());

        assert_relative_eq!(id.translation, Vector3::zeros(), epsilon = 1e-12);
        assert_relative_eq!(id.rotation.angle(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_transform_point() {
        let t = SE3::new(
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), std::f64::consts::FRAC_PI_2),
            Vector3::new(1.0, 0.0, 0.0),
        );
        let p = t.transform_point(&Vector3::new(1.0, 0.0, 0.0));

        assert_relative_eq!(p, Vector3::new(1.0, 1.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_try_from_parts_normalizes() {
        let pose = SE3::try_from_parts([0.0, 0.0, 0.0], [0.0, 0.0, 0.0, 2.0]).unwrap();
        assert_relative_eq!(pose.rotation.angle(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_try_from_parts_rejects_malformed() {
        assert!(SE3::try_from_parts([f64::NAN, 0.0, 0.0], [0.0, 0.0, 0.0, 1.0]).is_none());
        assert!(SE3::try_from_parts([0.0, 0.0, 0.0], [0.0, 0.0, 0.0, 0.0]).is_none());
        assert!(SE3::try_from_parts([0.0, 0.0, 0.0], [0.0, f64::INFINITY, 0.0, 1.0]).is_none());
    }
}
