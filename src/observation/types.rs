//! Core value types: keys and observations.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::SE3;

/// Physical vantage point a detection stream comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Viewpoint {
    Right,
    Left,
}

impl Viewpoint {
    pub const ALL: [Viewpoint; 2] = [Viewpoint::Right, Viewpoint::Left];

    /// Two-digit code used in channel names (`00` for right, `01` for left).
    pub fn prefix_code(&self) -> &'static str {
        match self {
            Viewpoint::Right => "00",
            Viewpoint::Left => "01",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Viewpoint::Right => "right",
            Viewpoint::Left => "left",
        }
    }
}

impl fmt::Display for Viewpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Name of a trackable object type, e.g. `potted_meat_can`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectType(String);

impl ObjectType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Identifies one observation stream: `(viewpoint, object type)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObservationKey {
    pub viewpoint: Viewpoint,
    pub object_type: ObjectType,
}

impl ObservationKey {
    pub fn new(viewpoint: Viewpoint, object_type: ObjectType) -> Self {
        Self {
            viewpoint,
            object_type,
        }
    }
}

impl fmt::Display for ObservationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.viewpoint, self.object_type)
    }
}

/// One accepted detection.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Pose in the frame named by `source_frame_id`.
    pub pose: SE3,
    pub source_frame_id: String,
    /// Timestamp in nanoseconds.
    pub stamp_ns: u64,
}

impl Observation {
    pub fn new(pose: SE3, source_frame_id: impl Into<String>, stamp_ns: u64) -> Self {
        Self {
            pose,
            source_frame_id: source_frame_id.into(),
            stamp_ns,
        }
    }

    /// Age relative to `now_ns`, saturating at zero for stamps ahead of it.
    #[inline]
    pub fn age_ns(&self, now_ns: u64) -> u64 {
        now_ns.saturating_sub(self.stamp_ns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_equality_is_structural() {
        let a = ObservationKey::new(Viewpoint::Right, ObjectType::new("mug"));
        let b = ObservationKey::new(Viewpoint::Right, "mug".into());
        let c = ObservationKey::new(Viewpoint::Left, "mug".into());

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string(), "right/mug");
    }

    #[test]
    fn test_viewpoint_prefix_codes() {
        assert_eq!(Viewpoint::Right.prefix_code(), "00");
        assert_eq!(Viewpoint::Left.prefix_code(), "01");
    }

    #[test]
    fn test_viewpoint_deserializes_lowercase() {
        let vps: Vec<Viewpoint> = serde_yaml::from_str("[right, left]").unwrap();
        assert_eq!(vps, vec![Viewpoint::Right, Viewpoint::Left]);
    }

    #[test]
    fn test_age_saturates() {
        let obs = Observation::new(SE3::identity(), "kinect1", 100);
        assert_eq!(obs.age_ns(150), 50);
        assert_eq!(obs.age_ns(50), 0);
    }
}
