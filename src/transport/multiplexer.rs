//! Subscription multiplexer: one inbound channel per observation key.
//!
//! Each registration gets its own [`RouteContext`] holding the key it was
//! created for. The transport callback only forwards into that context, so
//! the channel → key mapping is fixed at construction and cannot alias
//! between registrations.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info, trace};

use crate::config::AggregatorConfig;
use crate::error::{AggregatorError, Result};
use crate::observation::{Observation, ObservationKey, ObservationStore};

use super::{PoseStampedMsg, Subscription, Transport};

/// What happened to one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Accepted,
    /// Source frame is not a camera frame (e.g. a world-frame echo).
    ForeignFrame,
    /// Pose payload could not be decoded.
    Malformed,
}

/// Snapshot of message counters across all routes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MultiplexerStats {
    pub accepted: u64,
    pub dropped_foreign_frame: u64,
    pub dropped_malformed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    accepted: AtomicU64,
    dropped_foreign_frame: AtomicU64,
    dropped_malformed: AtomicU64,
}

impl Counters {
    fn count(&self, delivery: Delivery) {
        let counter = match delivery {
            Delivery::Accepted => &self.accepted,
            Delivery::ForeignFrame => &self.dropped_foreign_frame,
            Delivery::Malformed => &self.dropped_malformed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> MultiplexerStats {
        MultiplexerStats {
            accepted: self.accepted.load(Ordering::Relaxed),
            dropped_foreign_frame: self.dropped_foreign_frame.load(Ordering::Relaxed),
            dropped_malformed: self.dropped_malformed.load(Ordering::Relaxed),
        }
    }
}

/// Per-registration state bound when the subscription is created.
struct RouteContext {
    key: ObservationKey,
    camera_prefix: Arc<str>,
    store: Arc<ObservationStore>,
    counters: Arc<Counters>,
}

impl RouteContext {
    fn deliver(&self, msg: PoseStampedMsg) -> Delivery {
        let delivery = self.route(msg);
        self.counters.count(delivery);
        delivery
    }

    fn route(&self, msg: PoseStampedMsg) -> Delivery {
        if !msg.frame_id.starts_with(&*self.camera_prefix) {
            trace!("{}) dropping message from frame {}", self.key, msg.frame_id);
            return Delivery::ForeignFrame;
        }

        let Some(pose) = msg.pose() else {
            debug!("{}) dropping malformed pose from {}", self.key, msg.frame_id);
            return Delivery::Malformed;
        };

        self.store
            .record(&self.key, Observation::new(pose, msg.frame_id, msg.stamp_ns));
        Delivery::Accepted
    }
}

/// Owns one subscription per configured `(viewpoint, object type)` pair.
pub struct SubscriptionMultiplexer {
    channels: HashMap<ObservationKey, String>,
    subscriptions: Vec<Subscription>,
    counters: Arc<Counters>,
}

impl SubscriptionMultiplexer {
    /// Subscribe to every configured key's channel on `transport`.
    pub fn new(
        config: &AggregatorConfig,
        store: Arc<ObservationStore>,
        transport: &dyn Transport,
    ) -> Result<Self> {
        let counters = Arc::new(Counters::default());
        let camera_prefix: Arc<str> = Arc::from(config.camera_frame_prefix.as_str());

        let mut channels = HashMap::new();
        let mut subscriptions = Vec::new();

        for key in config.keys() {
            let channel = config.channel_name(&key);
            let context = RouteContext {
                key: key.clone(),
                camera_prefix: camera_prefix.clone(),
                store: store.clone(),
                counters: counters.clone(),
            };

            let subscription = transport
                .subscribe(
                    &channel,
                    config.subscription_depth,
                    Box::new(move |msg| {
                        context.deliver(msg);
                    }),
                )
                .map_err(|source| AggregatorError::TransportUnavailable {
                    channel: channel.clone(),
                    source,
                })?;

            debug!("Subscribed {} to {}", key, channel);
            channels.insert(key, channel);
            subscriptions.push(subscription);
        }

        info!("Subscribed to {} pose channels", subscriptions.len());

        Ok(Self {
            channels,
            subscriptions,
            counters,
        })
    }

    /// Channel name `key` is subscribed on.
    pub fn channel_for(&self, key: &ObservationKey) -> Option<&str> {
        self.channels.get(key).map(String::as_str)
    }

    pub fn num_subscriptions(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn stats(&self) -> MultiplexerStats {
        self.counters.snapshot()
    }

    /// Drop all subscriptions; no further messages are recorded.
    pub fn close(&mut self) {
        self.subscriptions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::observation::{RetentionPolicy, Viewpoint};
    use crate::testing::ManualTransport;

    fn config() -> AggregatorConfig {
        AggregatorConfig {
            object_types: vec!["mug".into(), "bowl".into()],
            ..Default::default()
        }
    }

    fn msg(frame: &str, stamp_ns: u64) -> PoseStampedMsg {
        PoseStampedMsg {
            frame_id: frame.into(),
            stamp_ns,
            position: [0.1, 0.2, 0.3],
            orientation: [0.0, 0.0, 0.0, 1.0],
        }
    }

    fn setup() -> (Arc<ObservationStore>, ManualTransport, SubscriptionMultiplexer) {
        let config = config();
        let store = Arc::new(ObservationStore::new(
            config.keys(),
            RetentionPolicy::default(),
            Arc::new(ManualClock::new(10)),
        ));
        let transport = ManualTransport::default();
        let mux = SubscriptionMultiplexer::new(&config, store.clone(), &transport).unwrap();
        (store, transport, mux)
    }

    #[test]
    fn test_one_subscription_per_key() {
        let (_store, transport, mux) = setup();

        assert_eq!(mux.num_subscriptions(), 4);
        let mut channels = transport.channels();
        channels.sort();
        assert_eq!(
            channels,
            vec![
                "/objects/prior_pose/00_bowl",
                "/objects/prior_pose/00_mug",
                "/objects/prior_pose/01_bowl",
                "/objects/prior_pose/01_mug",
            ]
        );
        assert!(transport.depths().iter().all(|&d| d == 1));
    }

    #[test]
    fn test_routes_to_bound_key() {
        let (store, transport, mux) = setup();
        let left_mug = ObservationKey::new(Viewpoint::Left, "mug".into());
        let right_mug = ObservationKey::new(Viewpoint::Right, "mug".into());

        transport.deliver(
            mux.channel_for(&left_mug).unwrap(),
            msg("kinect2_depth_optical_frame", 5),
        );

        let obs = store.most_recent(&left_mug).unwrap();
        assert_eq!(obs.stamp_ns, 5);
        assert_eq!(obs.source_frame_id, "kinect2_depth_optical_frame");
        assert!(store.most_recent(&right_mug).is_none());
    }

    #[test]
    fn test_foreign_frame_is_dropped() {
        let (store, transport, mux) = setup();
        let key = ObservationKey::new(Viewpoint::Right, "bowl".into());

        transport.deliver(mux.channel_for(&key).unwrap(), msg("world", 5));

        assert_eq!(store.time_since_last(&key), None);
        assert_eq!(mux.stats().dropped_foreign_frame, 1);
        assert_eq!(mux.stats().accepted, 0);
    }

    #[test]
    fn test_malformed_pose_is_dropped() {
        let (store, transport, mux) = setup();
        let key = ObservationKey::new(Viewpoint::Right, "bowl".into());
        let mut bad = msg("kinect1_depth_optical_frame", 5);
        bad.orientation = [0.0; 4];

        transport.deliver(mux.channel_for(&key).unwrap(), bad);

        assert!(store.is_empty(&key));
        assert_eq!(mux.stats().dropped_malformed, 1);
    }

    #[test]
    fn test_close_stops_recording() {
        let (store, transport, mut mux) = setup();
        let key = ObservationKey::new(Viewpoint::Right, "mug".into());
        let channel = mux.channel_for(&key).unwrap().to_string();

        mux.close();
        transport.deliver(&channel, msg("kinect1_depth_optical_frame", 5));

        assert!(store.is_empty(&key));
    }
}
