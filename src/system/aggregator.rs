//! PoseAggregator - top-level entry point.
//!
//! Owns the observation store and wires the multiplexer, detection gate and
//! world pose resolver around it. Producers are the transport's delivery
//! threads; every query method may be called concurrently from any number
//! of consumer threads.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::clock::Clock;
use crate::config::AggregatorConfig;
use crate::detection::{DetectionGate, GateDecision, TrackingRegistry};
use crate::error::{AggregatorError, Result};
use crate::geometry::SE3;
use crate::observation::{
    ObjectType, Observation, ObservationKey, ObservationStore, RetentionPolicy, Viewpoint,
};
use crate::transport::{MultiplexerStats, SubscriptionMultiplexer, Transport};
use crate::world::{TransformService, WorldPoseResolver};

pub struct PoseAggregator {
    config: AggregatorConfig,

    /// Shared per-key buffers (multiplexer writes, everything else reads).
    store: Arc<ObservationStore>,

    multiplexer: SubscriptionMultiplexer,

    gate: DetectionGate,

    resolver: WorldPoseResolver,
}

impl PoseAggregator {
    /// Validate `config`, create the store and subscribe to every
    /// configured channel on `transport`.
    pub fn new(
        config: AggregatorConfig,
        transport: &dyn Transport,
        registry: Arc<dyn TrackingRegistry>,
        transforms: Arc<dyn TransformService>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let primary = config
            .primary_viewpoint()
            .ok_or_else(|| AggregatorError::InvalidConfig("no primary viewpoint".into()))?;

        let store = Arc::new(ObservationStore::new(
            config.keys(),
            RetentionPolicy::from_config(&config),
            clock,
        ));
        let multiplexer = SubscriptionMultiplexer::new(&config, store.clone(), transport)?;
        let gate = DetectionGate::new(config.gate.clone(), primary, store.clone(), registry);
        let resolver = WorldPoseResolver::new(store.clone(), transforms, config.world_frame.clone());

        info!(
            "Pose aggregator ready: {} viewpoints, {} object types, primary={}",
            config.viewpoints.len(),
            config.object_types.len(),
            primary
        );

        Ok(Self {
            config,
            store,
            multiplexer,
            gate,
            resolver,
        })
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<ObservationStore> {
        &self.store
    }

    /// Time since the last accepted detection; `None` if never detected.
    pub fn time_since_last(&self, viewpoint: Viewpoint, object_type: &ObjectType) -> Option<Duration> {
        self.store
            .time_since_last(&ObservationKey::new(viewpoint, object_type.clone()))
    }

    /// Detections no older than `duration`, newest first.
    pub fn recent_observations(
        &self,
        viewpoint: Viewpoint,
        object_type: &ObjectType,
        duration: Duration,
    ) -> Vec<Observation> {
        self.store
            .recent_window(&ObservationKey::new(viewpoint, object_type.clone()), duration)
    }

    pub fn most_recent(&self, viewpoint: Viewpoint, object_type: &ObjectType) -> Option<Observation> {
        self.store
            .most_recent(&ObservationKey::new(viewpoint, object_type.clone()))
    }

    /// Latest detection for the key, expressed in the world frame.
    pub fn last_world_pose(
        &self,
        viewpoint: Viewpoint,
        object_type: &ObjectType,
    ) -> Result<Option<SE3>> {
        self.resolver
            .resolve_world_pose(&ObservationKey::new(viewpoint, object_type.clone()))
    }

    /// Evaluate recent evidence and activate tracking if sufficient.
    pub fn detect(&self, object_type: &ObjectType) -> Result<GateDecision> {
        self.gate.detect(object_type)
    }

    pub fn stop_tracking(&self, object_type: &ObjectType) -> Result<()> {
        self.gate.stop_tracking(object_type)
    }

    pub fn multiplexer_stats(&self) -> MultiplexerStats {
        self.multiplexer.stats()
    }

    /// Drop all subscriptions. Buffers stay readable.
    pub fn shutdown(&mut self) {
        if self.multiplexer.num_subscriptions() > 0 {
            self.multiplexer.close();
            info!("Pose aggregator unsubscribed");
        }
    }
}

impl Drop for PoseAggregator {
    fn drop(&mut self) {
        self.shutdown();
    }
}
