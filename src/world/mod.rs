//! World-frame pose resolution.
//!
//! The coordinate transform service itself is external; this module defines
//! the narrow interface the core consumes and the resolver built on top of it.

mod resolver;

pub use resolver::WorldPoseResolver;

use crate::geometry::SE3;

/// Failure kinds reported by a transform service.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransformError {
    #[error("no transform path from {source_frame} to {target_frame}")]
    NoPath {
        source_frame: String,
        target_frame: String,
    },

    #[error("transform from {source_frame} to {target_frame} is stale")]
    Stale {
        source_frame: String,
        target_frame: String,
    },
}

/// Expresses a pose given in `source` in the `target` frame.
pub trait TransformService: Send + Sync {
    fn transform(&self, pose: &SE3, source: &str, target: &str) -> Result<SE3, TransformError>;
}
