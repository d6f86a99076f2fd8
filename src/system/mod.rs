//! Top-level orchestration.
//!
//! `PoseAggregator` owns the observation store and wires the subscription
//! multiplexer, detection gate and world pose resolver around it.

mod aggregator;

pub use aggregator::PoseAggregator;
