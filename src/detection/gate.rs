//! Detection gate: decides whether recent evidence justifies activating
//! tracking for an object, and issues the registry calls when it does.
//!
//! Every `detect` call is a fresh `Idle → Evaluating → {Activated, Rejected}`
//! pass over the current buffer contents. Nothing carries over between calls.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::GateConfig;
use crate::error::{AggregatorError, Result};
use crate::geometry::SE3;
use crate::observation::{ObjectType, ObservationKey, ObservationStore, Viewpoint};

use super::deviation::{DeviationSample, analyze};
use super::registry::{RegistryEntry, RegistryError, TrackingRegistry};
use super::result::{GateDecision, GateState, RejectReason};

pub struct DetectionGate {
    config: GateConfig,
    /// Only this viewpoint's buffer is evaluated.
    primary_viewpoint: Viewpoint,
    store: Arc<ObservationStore>,
    registry: Arc<dyn TrackingRegistry>,
}

impl DetectionGate {
    pub fn new(
        config: GateConfig,
        primary_viewpoint: Viewpoint,
        store: Arc<ObservationStore>,
        registry: Arc<dyn TrackingRegistry>,
    ) -> Self {
        Self {
            config,
            primary_viewpoint,
            store,
            registry,
        }
    }

    pub fn primary_viewpoint(&self) -> Viewpoint {
        self.primary_viewpoint
    }

    fn entry(&self, object_type: &ObjectType) -> Result<RegistryEntry> {
        self.registry
            .lookup(object_type)
            .ok_or_else(|| AggregatorError::UnknownObjectType(object_type.clone()))
    }

    /// Evaluate the trailing window for `object_type` and request tracking
    /// if the evidence is sufficient.
    ///
    /// A rejection is a normal outcome and is returned as `Ok`. Faults
    /// (unknown object, mixed source frames, registry failures) are errors.
    pub fn detect(&self, object_type: &ObjectType) -> Result<GateDecision> {
        let entry = self.entry(object_type)?;
        let key = ObservationKey::new(self.primary_viewpoint, object_type.clone());

        debug!("{}) gate {:?} -> {:?}", key, GateState::Idle, GateState::Evaluating);
        let decision = self.evaluate(&key, &entry)?;
        debug!("{}) gate {:?} -> {:?}", key, GateState::Evaluating, decision.state);

        Ok(decision)
    }

    fn evaluate(&self, key: &ObservationKey, entry: &RegistryEntry) -> Result<GateDecision> {
        let window = self.config.window();
        let expected = self.config.expected_detections();
        let required = self.config.required_detections();
        let observations = self.store.recent_window(key, window);
        let observed = observations.len();

        info!(
            "{}) observations={}, duration={}, rate={:.3}",
            key.object_type,
            observed,
            self.config.window_s,
            observed as f64 / self.config.window_s
        );

        if observations.is_empty()
            || (observed as f64) < required
        {
            debug!("{}) rejected: {} < {:.2} required", key, observed, required);
            return Ok(GateDecision::rejected(
                RejectReason::InsufficientEvidence,
                observed,
                expected,
                None,
            ));
        }

        let frames: BTreeSet<&str> = observations
            .iter()
            .map(|obs| obs.source_frame_id.as_str())
            .collect();
        if frames.len() != 1 {
            let frames: Vec<String> = frames.into_iter().map(str::to_string).collect();
            warn!("{}) observations span multiple source frames: {:?}", key, frames);
            return Err(AggregatorError::AmbiguousSourceFrame {
                key: key.clone(),
                frames,
            });
        }

        let poses: Vec<SE3> = observations.iter().map(|obs| obs.pose).collect();
        let deviation = analyze(&poses)?;
        info!(
            "{}) position deviation: {:.3} meters | orientation deviation: {:.3} degrees",
            key.object_type,
            deviation.position_deviation,
            deviation.orientation_deviation_deg()
        );

        if self.exceeds_deviation_bounds(&deviation) {
            debug!("{}) rejected: deviation above configured bounds", key);
            return Ok(GateDecision::rejected(
                RejectReason::DeviationExceeded,
                observed,
                expected,
                Some(deviation),
            ));
        }

        let unavailable = |source: RegistryError| AggregatorError::RegistryUnavailable {
            object_type: key.object_type.clone(),
            source,
        };
        entry.administrator.activate().map_err(unavailable)?;
        entry.entity.detect().map_err(unavailable)?;

        info!("{}) tracking activated", key.object_type);
        Ok(GateDecision::activated(observed, expected, deviation))
    }

    fn exceeds_deviation_bounds(&self, deviation: &DeviationSample) -> bool {
        let position = self
            .config
            .max_position_deviation_m
            .is_some_and(|max| deviation.position_deviation > max);
        let orientation = self
            .config
            .max_orientation_deviation_rad
            .is_some_and(|max| deviation.orientation_deviation > max);
        position || orientation
    }

    /// Stop localizing `object_type`. Safe to call when already stopped.
    pub fn stop_tracking(&self, object_type: &ObjectType) -> Result<()> {
        let entry = self.entry(object_type)?;
        let unavailable = |source: RegistryError| AggregatorError::RegistryUnavailable {
            object_type: object_type.clone(),
            source,
        };

        entry.entity.stop_localizing().map_err(unavailable)?;
        if self.config.deactivate_on_stop {
            entry.administrator.deactivate().map_err(unavailable)?;
        }
        debug!("{}) tracking stopped", object_type);
        Ok(())
    }
}
