//! Per-key observation buffers shared between transport callbacks and
//! consumers.
//!
//! The key → buffer map is built once from configuration and never changes,
//! so lookups take no lock. Each buffer sits behind its own `RwLock`:
//! producers for one key never contend with readers of another.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::warn;

use crate::clock::{Clock, secs_to_ns};
use crate::config::AggregatorConfig;

use super::types::{Observation, ObservationKey};

/// Bounds applied to every buffer after each append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Hard cap on entries per key.
    pub capacity: usize,
    /// Entries older than this, measured from the newest stamp in the
    /// buffer, are evicted.
    pub horizon_ns: u64,
}

impl RetentionPolicy {
    pub fn from_config(config: &AggregatorConfig) -> Self {
        Self {
            capacity: config.retention.max_observations_per_key.max(1),
            horizon_ns: secs_to_ns(config.gate.window_s * config.retention.retention_factor),
        }
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            capacity: 256,
            horizon_ns: secs_to_ns(20.0),
        }
    }
}

/// Insertion-ordered history for one key; newest at the back.
#[derive(Debug, Default)]
struct ObservationBuffer {
    entries: VecDeque<Observation>,
    newest_stamp_ns: u64,
}

impl ObservationBuffer {
    fn push(&mut self, observation: Observation, policy: &RetentionPolicy) {
        self.newest_stamp_ns = self.newest_stamp_ns.max(observation.stamp_ns);
        self.entries.push_back(observation);

        while self.entries.len() > policy.capacity {
            self.entries.pop_front();
        }

        let newest = self.newest_stamp_ns;
        while let Some(front) = self.entries.front() {
            if self.entries.len() > 1 && newest.saturating_sub(front.stamp_ns) > policy.horizon_ns {
                self.entries.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Thread-safe store of observation buffers, one per configured key.
pub struct ObservationStore {
    buffers: HashMap<ObservationKey, RwLock<ObservationBuffer>>,
    policy: RetentionPolicy,
    clock: Arc<dyn Clock>,
}

impl ObservationStore {
    /// Create a store with an empty buffer for each of `keys`.
    pub fn new(
        keys: impl IntoIterator<Item = ObservationKey>,
        policy: RetentionPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let buffers = keys
            .into_iter()
            .map(|key| (key, RwLock::new(ObservationBuffer::default())))
            .collect();

        Self {
            buffers,
            policy,
            clock,
        }
    }

    /// Append an observation to the buffer for `key`.
    ///
    /// Observations for keys the store was not built with are dropped.
    pub fn record(&self, key: &ObservationKey, observation: Observation) {
        match self.buffers.get(key) {
            Some(buffer) => buffer.write().push(observation, &self.policy),
            None => warn!("Dropping observation for unconfigured key {}", key),
        }
    }

    /// Elapsed time since the most recent observation for `key`.
    ///
    /// `None` means nothing has been observed (infinitely stale).
    pub fn time_since_last(&self, key: &ObservationKey) -> Option<Duration> {
        let now_ns = self.clock.now_ns();
        let buffer = self.buffers.get(key)?.read();
        buffer
            .entries
            .back()
            .map(|obs| Duration::from_nanos(obs.age_ns(now_ns)))
    }

    /// Observations no older than `window`, newest first.
    ///
    /// Scans backward from the newest entry and stops at the first one older
    /// than `window`.
    pub fn recent_window(&self, key: &ObservationKey, window: Duration) -> Vec<Observation> {
        let now_ns = self.clock.now_ns();
        let window_ns = u64::try_from(window.as_nanos()).unwrap_or(u64::MAX);

        let Some(buffer) = self.buffers.get(key) else {
            return Vec::new();
        };
        let buffer = buffer.read();

        buffer
            .entries
            .iter()
            .rev()
            .take_while(|obs| obs.age_ns(now_ns) <= window_ns)
            .cloned()
            .collect()
    }

    pub fn most_recent(&self, key: &ObservationKey) -> Option<Observation> {
        self.buffers.get(key)?.read().entries.back().cloned()
    }

    /// Number of retained observations for `key`.
    pub fn len(&self, key: &ObservationKey) -> usize {
        self.buffers
            .get(key)
            .map(|buffer| buffer.read().entries.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self, key: &ObservationKey) -> bool {
        self.len(key) == 0
    }

    pub fn keys(&self) -> impl Iterator<Item = &ObservationKey> {
        self.buffers.keys()
    }

    pub fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}
