//! Interface to the tracking/administration registry.
//!
//! The registry owns the actual trackers. The core only needs to look up the
//! handles for an object type and poke them; it never caches them.

use std::sync::Arc;

use crate::observation::ObjectType;

/// Failure reported by a registry handle.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
    #[error("registry unavailable: {0}")]
    Unavailable(String),

    #[error("registry call rejected: {0}")]
    Rejected(String),
}

/// Controls continuous localization for one object.
pub trait ObjectAdministrator: Send + Sync {
    fn activate(&self) -> Result<(), RegistryError>;
    fn deactivate(&self) -> Result<(), RegistryError>;
}

/// The tracked entity for one object.
pub trait TrackedEntity: Send + Sync {
    /// One-shot "detect now" trigger.
    fn detect(&self) -> Result<(), RegistryError>;

    /// Stop localizing. Must be a no-op when not localizing.
    fn stop_localizing(&self) -> Result<(), RegistryError>;
}

/// Handles for one object type.
#[derive(Clone)]
pub struct RegistryEntry {
    pub administrator: Arc<dyn ObjectAdministrator>,
    pub entity: Arc<dyn TrackedEntity>,
}

/// Resolves object types to registry handles.
pub trait TrackingRegistry: Send + Sync {
    fn lookup(&self, object_type: &ObjectType) -> Option<RegistryEntry>;
}
