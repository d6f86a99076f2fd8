//! Evidence gating for tracker activation.
//!
//! - [`deviation`]: pairwise pose agreement statistics
//! - [`gate`]: windowed evidence check and registry calls
//! - [`registry`]: interface to the external tracking registry
//! - [`result`]: gate states and per-call decisions

pub mod deviation;
pub mod gate;
pub mod registry;
pub mod result;

pub use deviation::{DeviationSample, analyze};
pub use gate::DetectionGate;
pub use registry::{
    ObjectAdministrator, RegistryEntry, RegistryError, TrackedEntity, TrackingRegistry,
};
pub use result::{GateDecision, GateState, RejectReason};
