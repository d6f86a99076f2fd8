pub mod clock;
pub mod config;
pub mod detection;
pub mod error;
pub mod geometry;
pub mod observation;
pub mod system;
pub mod transport;
pub mod world;

#[cfg(test)]
mod testing;

pub use config::AggregatorConfig;
pub use error::{AggregatorError, Result};
pub use system::PoseAggregator;
