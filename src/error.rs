//! Error types for the aggregation core.
//!
//! Ordinary "not enough evidence yet" outcomes are not errors; they are
//! reported through [`crate::detection::GateDecision`]. Everything here is a
//! fault the caller has to look at.

use crate::detection::RegistryError;
use crate::observation::{ObjectType, ObservationKey};
use crate::transport::TransportError;
use crate::world::TransformError;

pub type Result<T, E = AggregatorError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    /// More than one source frame inside a single evaluation window.
    #[error("ambiguous source frames for {key}: {frames:?}")]
    AmbiguousSourceFrame {
        key: ObservationKey,
        frames: Vec<String>,
    },

    #[error("unknown object type: {0}")]
    UnknownObjectType(ObjectType),

    #[error("pose unavailable for {key}: {source}")]
    TransformUnavailable {
        key: ObservationKey,
        #[source]
        source: TransformError,
    },

    #[error("tracking registry unavailable for {object_type}: {source}")]
    RegistryUnavailable {
        object_type: ObjectType,
        #[source]
        source: RegistryError,
    },

    #[error("failed to subscribe to {channel}: {source}")]
    TransportUnavailable {
        channel: String,
        #[source]
        source: TransportError,
    },

    #[error("deviation analysis requires at least one pose")]
    EmptyPoseSet,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AggregatorError {
    /// True for faults that a caller polling `detect` may reasonably retry
    /// later (external dependencies that were temporarily unreachable).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::TransformUnavailable { .. }
                | Self::RegistryUnavailable { .. }
                | Self::TransportUnavailable { .. }
        )
    }
}
