//! Static coordinate frame graph.
//!
//! Frames form a forest: every frame has at most one parent and stores
//! `T_parent_child`. A pose in frame `source` is expressed in frame `target`
//! by chaining through the common root:
//!
//! ```text
//! T_target_source = T_root_target⁻¹ · T_root_source
//! ```
//!
//! Frames that do not share a root are disconnected and yield
//! [`TransformError::NoPath`].

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::world::{TransformError, TransformService};

use super::SE3;

#[derive(Debug, Clone)]
struct Edge {
    parent: String,
    t_parent_child: SE3,
}

/// In-memory frame tree, safe to update while shared.
#[derive(Debug, Default)]
pub struct FrameGraph {
    edges: RwLock<HashMap<String, Edge>>,
}

impl FrameGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the transform of `child` relative to `parent`.
    pub fn set_transform(&self, parent: &str, child: &str, t_parent_child: SE3) {
        self.edges.write().insert(
            child.to_string(),
            Edge {
                parent: parent.to_string(),
                t_parent_child,
            },
        );
    }

    pub fn remove_frame(&self, child: &str) {
        self.edges.write().remove(child);
    }

    /// Walk from `frame` to its root, returning `(root, T_root_frame)`.
    fn chain_to_root(edges: &HashMap<String, Edge>, frame: &str) -> (String, SE3) {
        let mut current = frame;
        let mut t_root_frame = SE3::identity();

        // A well-formed forest never needs more hops than it has edges.
        for _ in 0..=edges.len() {
            match edges.get(current) {
                Some(edge) => {
                    t_root_frame = edge.t_parent_child.compose(&t_root_frame);
                    current = edge.parent.as_str();
                }
                None => break,
            }
        }

        (current.to_string(), t_root_frame)
    }

    /// Look up `T_target_source`.
    pub fn lookup(&self, target: &str, source: &str) -> Result<SE3, TransformError> {
        if target == source {
            return Ok(SE3::identity());
        }

        let edges = self.edges.read();
        let (root_source, t_root_source) = Self::chain_to_root(&edges, source);
        let (root_target, t_root_target) = Self::chain_to_root(&edges, target);

        if root_source != root_target {
            return Err(TransformError::NoPath {
                source_frame: source.to_string(),
                target_frame: target.to_string(),
            });
        }

        Ok(t_root_target.inverse().compose(&t_root_source))
    }
}

impl TransformService for FrameGraph {
    fn transform(&self, pose: &SE3, source: &str, target: &str) -> Result<SE3, TransformError> {
        let t_target_source = self.lookup(target, source)?;
        Ok(t_target_source.compose(pose))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{UnitQuaternion, Vector3};
    use std::f64::consts::FRAC_PI_2;

    fn sample_graph() -> FrameGraph {
        let graph = FrameGraph::new();
        graph.set_transform(
            "world",
            "kinect1_link",
            SE3::new(
                UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2),
                Vector3::new(1.0, 0.0, 0.5),
            ),
        );
        graph.set_transform(
            "kinect1_link",
            "kinect1_depth_optical_frame",
            SE3::from_translation(Vector3::new(0.0, 0.1, 0.0)),
        );
        graph
    }

    #[test]
    fn test_same_frame_is_identity() {
        let graph = FrameGraph::new();
        let t = graph.lookup("world", "world").unwrap();
        assert_eq!(t, SE3::identity());
    }

    #[test]
    fn test_chained_transform() {
        let graph = sample_graph();
        let pose = SE3::from_translation(Vector3::new(1.0, 0.0, 0.0));

        let world = graph
            .transform(&pose, "kinect1_depth_optical_frame", "world")
            .unwrap();

        // optical -> link: (1.0, 0.1, 0); link -> world: rotate 90° about z then shift.
        assert_relative_eq!(world.translation, Vector3::new(0.9, 1.0, 0.5), epsilon = 1e-12);
    }

    #[test]
    fn test_inverse_direction_round_trips() {
        let graph = sample_graph();
        let pose = SE3::from_translation(Vector3::new(0.3, -0.2, 2.0));

        let world = graph
            .transform(&pose, "kinect1_depth_optical_frame", "world")
            .unwrap();
        let back = graph
            .transform(&world, "world", "kinect1_depth_optical_frame")
            .unwrap();

        assert_relative_eq!(back.translation, pose.translation, epsilon = 1e-12);
    }

    #[test]
    fn test_disconnected_frames_have_no_path() {
        let graph = sample_graph();
        graph.set_transform("odom", "base_link", SE3::identity());

        let err = graph.lookup("world", "base_link").unwrap_err();
        assert!(matches!(err, TransformError::NoPath { .. }));
    }

    #[test]
    fn test_removed_frame_is_disconnected() {
        let graph = sample_graph();
        graph.remove_frame("kinect1_link");

        assert!(graph.lookup("world", "kinect1_depth_optical_frame").is_err());
    }
}
