//! Geometry utilities: SE3 poses, orientation distances, frame graphs.

pub mod frames;
pub mod se3;
pub mod so3;

pub use frames::FrameGraph;
pub use se3::SE3;
pub use so3::quat_angle_between;

/// Object pose: position + orientation expressed in some named frame.
pub type Pose = SE3;
