//! Aggregator configuration.
//!
//! Loaded from YAML; every field has a default so a partial file (or none
//! at all) is valid.
//!
//! ```yaml
//! viewpoints: [right, left]
//! object_types: [potted_meat_can, sugar_box]
//! camera_frame_prefix: kinect
//! world_frame: world
//! gate:
//!   window_s: 5.0
//!   detections_per_sec: 0.6
//! ```

use std::collections::HashSet;
use std::fs::File;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{AggregatorError, Result};
use crate::observation::{ObjectType, ObservationKey, Viewpoint};

/// Placeholder for the viewpoint prefix code in `channel_template`.
pub const PREFIX_PLACEHOLDER: &str = "{prefix}";
/// Placeholder for the object type name in `channel_template`.
pub const OBJECT_PLACEHOLDER: &str = "{object}";

/// Detection gate parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Length of the trailing evaluation window in seconds.
    pub window_s: f64,

    /// Expected detection rate of the pose estimator.
    pub detections_per_sec: f64,

    /// Fraction of the expected detections required before activating.
    pub min_evidence_ratio: f64,

    /// Reject when the mean pairwise position deviation exceeds this (m).
    /// Unset means position spread never rejects.
    pub max_position_deviation_m: Option<f64>,

    /// Reject when the mean pairwise orientation deviation exceeds this (rad).
    pub max_orientation_deviation_rad: Option<f64>,

    /// Also deactivate the administrator when tracking is stopped.
    pub deactivate_on_stop: bool,
}

impl GateConfig {
    /// Evaluation window; saturates at `Duration::MAX`.
    pub fn window(&self) -> Duration {
        Duration::try_from_secs_f64(self.window_s.max(0.0)).unwrap_or(Duration::MAX)
    }

    pub fn expected_detections(&self) -> f64 {
        self.window_s * self.detections_per_sec
    }

    /// Observations needed in the window before the gate activates.
    pub fn required_detections(&self) -> f64 {
        self.min_evidence_ratio * self.expected_detections()
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            window_s: 5.0,
            detections_per_sec: 0.6,
            min_evidence_ratio: 0.5,
            max_position_deviation_m: None,
            max_orientation_deviation_rad: None,
            deactivate_on_stop: false,
        }
    }
}

/// Memory bounds for the observation store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    pub max_observations_per_key: usize,

    /// Retention horizon as a multiple of `gate.window_s`.
    pub retention_factor: f64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_observations_per_key: 256,
            retention_factor: 4.0,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Configured viewpoints; the first one is the primary viewpoint the
    /// detection gate evaluates.
    pub viewpoints: Vec<Viewpoint>,

    pub object_types: Vec<ObjectType>,

    /// Accepted messages must have a source frame starting with this.
    pub camera_frame_prefix: String,

    /// Frame world poses are resolved into.
    pub world_frame: String,

    /// Channel name template with `{prefix}` and `{object}` placeholders.
    pub channel_template: String,

    /// Delivery queue depth requested for every subscription.
    pub subscription_depth: usize,

    pub gate: GateConfig,

    pub retention: RetentionConfig,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            viewpoints: vec![Viewpoint::Right, Viewpoint::Left],
            object_types: Vec::new(),
            camera_frame_prefix: "kinect".to_string(),
            world_frame: "world".to_string(),
            channel_template: "/objects/prior_pose/{prefix}_{object}".to_string(),
            subscription_depth: 1,
            gate: GateConfig::default(),
            retention: RetentionConfig::default(),
        }
    }
}

impl AggregatorConfig {
    /// Load and validate a YAML configuration file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("Failed to open config {:?}", path))?;
        let config: Self = serde_yaml::from_reader(file)
            .with_context(|| format!("Failed to parse config {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(AggregatorError::InvalidConfig(msg));

        if self.viewpoints.is_empty() {
            return invalid("at least one viewpoint is required".into());
        }
        if self.viewpoints.iter().collect::<HashSet<_>>().len() != self.viewpoints.len() {
            return invalid("duplicate viewpoint".into());
        }
        if self.object_types.is_empty() {
            return invalid("at least one object type is required".into());
        }
        if self.object_types.iter().collect::<HashSet<_>>().len() != self.object_types.len() {
            return invalid("duplicate object type".into());
        }
        if !self.channel_template.contains(PREFIX_PLACEHOLDER)
            || !self.channel_template.contains(OBJECT_PLACEHOLDER)
        {
            return invalid(format!(
                "channel template {:?} must contain {} and {}",
                self.channel_template, PREFIX_PLACEHOLDER, OBJECT_PLACEHOLDER
            ));
        }
        if self.subscription_depth == 0 {
            return invalid("subscription_depth must be at least 1".into());
        }
        if !(self.gate.window_s.is_finite() && self.gate.window_s > 0.0) {
            return invalid(format!("window_s must be positive, got {}", self.gate.window_s));
        }
        if !(self.gate.detections_per_sec.is_finite() && self.gate.detections_per_sec > 0.0) {
            return invalid(format!(
                "detections_per_sec must be positive, got {}",
                self.gate.detections_per_sec
            ));
        }
        if !(0.0..=1.0).contains(&self.gate.min_evidence_ratio) {
            return invalid(format!(
                "min_evidence_ratio must be in [0, 1], got {}",
                self.gate.min_evidence_ratio
            ));
        }
        if !(self.retention.retention_factor >= 1.0) {
            // The store must retain at least one full evaluation window.
            return invalid(format!(
                "retention_factor must be >= 1, got {}",
                self.retention.retention_factor
            ));
        }
        let horizon_s = self.gate.window_s * self.retention.retention_factor;
        if Duration::try_from_secs_f64(horizon_s).is_err() || horizon_s * 1e9 > u64::MAX as f64 {
            return invalid(format!(
                "retention horizon of {} s is out of range",
                horizon_s
            ));
        }
        let required = self.gate.required_detections().ceil();
        if (self.retention.max_observations_per_key as f64) < required {
            // A smaller buffer could never hold enough evidence to activate.
            return invalid(format!(
                "max_observations_per_key ({}) is below the {} detections the gate requires",
                self.retention.max_observations_per_key, required
            ));
        }
        Ok(())
    }

    /// Viewpoint whose buffer the detection gate evaluates.
    pub fn primary_viewpoint(&self) -> Option<Viewpoint> {
        self.viewpoints.first().copied()
    }

    /// Every configured `(viewpoint, object type)` pair.
    pub fn keys(&self) -> Vec<ObservationKey> {
        self.viewpoints
            .iter()
            .flat_map(|vp| {
                self.object_types
                    .iter()
                    .map(move |ty| ObservationKey::new(*vp, ty.clone()))
            })
            .collect()
    }

    /// Channel name carrying detections for `key`.
    pub fn channel_name(&self, key: &ObservationKey) -> String {
        self.channel_template
            .replace(PREFIX_PLACEHOLDER, key.viewpoint.prefix_code())
            .replace(OBJECT_PLACEHOLDER, key.object_type.as_str())
    }

    pub fn has_object_type(&self, object_type: &ObjectType) -> bool {
        self.object_types.contains(object_type)
    }
}
