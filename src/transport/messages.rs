//! Wire message types delivered by the transport.

use serde::{Deserialize, Serialize};

use crate::geometry::SE3;

/// Stamped object pose as published by the pose estimator.
///
/// Orientation components are raw `[x, y, z, w]` and may not be normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseStampedMsg {
    /// Frame the pose is expressed in, e.g. `kinect1_depth_optical_frame`.
    pub frame_id: String,
    /// Timestamp in nanoseconds.
    pub stamp_ns: u64,
    pub position: [f64; 3],
    pub orientation: [f64; 4],
}

impl PoseStampedMsg {
    pub fn from_pose(frame_id: impl Into<String>, stamp_ns: u64, pose: &SE3) -> Self {
        let q = pose.rotation.coords;
        Self {
            frame_id: frame_id.into(),
            stamp_ns,
            position: [pose.translation.x, pose.translation.y, pose.translation.z],
            orientation: [q.x, q.y, q.z, q.w],
        }
    }

    /// Decode the pose; `None` if the payload is malformed.
    pub fn pose(&self) -> Option<SE3> {
        SE3::try_from_parts(self.position, self.orientation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{UnitQuaternion, Vector3};

    #[test]
    fn test_orientation_is_xyzw() {
        let pose = SE3::new(
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.5),
            Vector3::new(1.0, 2.0, 3.0),
        );
        let msg = PoseStampedMsg::from_pose("kinect1", 7, &pose);

        assert_relative_eq!(msg.orientation[2], (0.25f64).sin(), epsilon = 1e-12);
        assert_relative_eq!(msg.orientation[3], (0.25f64).cos(), epsilon = 1e-12);

        let decoded = msg.pose().unwrap();
        assert_relative_eq!(decoded.translation, pose.translation, epsilon = 1e-12);
        assert_relative_eq!(decoded.rotation.angle_to(&pose.rotation), 0.0, epsilon = 1e-7);
    }
}
