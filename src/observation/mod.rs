//! Observation buffering: keys, observations and the shared store.
//!
//! The store is the only shared mutable state in the crate. The subscription
//! multiplexer writes to it; the detection gate, world pose resolver and
//! diagnostics only read.

pub mod store;
pub mod types;

pub use store::{ObservationStore, RetentionPolicy};
pub use types::{ObjectType, Observation, ObservationKey, Viewpoint};
