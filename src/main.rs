use std::f64::consts::FRAC_PI_2;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use anyhow::{Result, bail};
use nalgebra::{UnitQuaternion, Vector3};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use pose_aggregator::clock::{Clock, SystemClock};
use pose_aggregator::config::AggregatorConfig;
use pose_aggregator::detection::{
    ObjectAdministrator, RegistryEntry, RegistryError, TrackedEntity, TrackingRegistry,
};
use pose_aggregator::geometry::{FrameGraph, SE3};
use pose_aggregator::observation::{ObjectType, ObservationKey};
use pose_aggregator::transport::{ChannelTransport, PoseStampedMsg};
use pose_aggregator::PoseAggregator;

const PUBLISH_PERIOD: Duration = Duration::from_millis(400);
const POLL_PERIOD: Duration = Duration::from_millis(500);
const MAX_POLLS: usize = 20;

/// Registry stand-in that only logs the calls it receives.
struct LoggingEntity {
    name: ObjectType,
    localizing: AtomicBool,
}

impl ObjectAdministrator for LoggingEntity {
    fn activate(&self) -> Result<(), RegistryError> {
        self.localizing.store(true, Ordering::SeqCst);
        info!("[registry] activate {}", self.name);
        Ok(())
    }

    fn deactivate(&self) -> Result<(), RegistryError> {
        info!("[registry] deactivate {}", self.name);
        Ok(())
    }
}

impl TrackedEntity for LoggingEntity {
    fn detect(&self) -> Result<(), RegistryError> {
        info!("[registry] detect {}", self.name);
        Ok(())
    }

    fn stop_localizing(&self) -> Result<(), RegistryError> {
        if self.localizing.swap(false, Ordering::SeqCst) {
            info!("[registry] stop localizing {}", self.name);
        }
        Ok(())
    }
}

struct LoggingRegistry {
    entities: Vec<Arc<LoggingEntity>>,
}

impl TrackingRegistry for LoggingRegistry {
    fn lookup(&self, object_type: &ObjectType) -> Option<RegistryEntry> {
        self.entities
            .iter()
            .find(|e| &e.name == object_type)
            .map(|e| RegistryEntry {
                administrator: e.clone(),
                entity: e.clone(),
            })
    }
}

fn load_config() -> Result<AggregatorConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            info!("Loading configuration from: {}", path);
            AggregatorConfig::from_path(path)
        }
        None => {
            let config = AggregatorConfig {
                object_types: vec!["potted_meat_can".into(), "sugar_box".into()],
                ..Default::default()
            };
            config.validate()?;
            Ok(config)
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = load_config()?;
    let Some(primary) = config.primary_viewpoint() else {
        bail!("configuration has no viewpoints");
    };

    // Camera mounted 1.2 m up, looking down the world x axis.
    let camera_frame = format!("{}1_depth_optical_frame", config.camera_frame_prefix);
    let frames = Arc::new(FrameGraph::new());
    frames.set_transform(
        &config.world_frame,
        &camera_frame,
        SE3::new(
            UnitQuaternion::from_euler_angles(-FRAC_PI_2, 0.0, -FRAC_PI_2),
            Vector3::new(0.0, 0.0, 1.2),
        ),
    );

    let registry = Arc::new(LoggingRegistry {
        entities: config
            .object_types
            .iter()
            .map(|name| {
                Arc::new(LoggingEntity {
                    name: name.clone(),
                    localizing: AtomicBool::new(false),
                })
            })
            .collect(),
    });

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let transport = Arc::new(ChannelTransport::new());
    let mut aggregator = PoseAggregator::new(
        config.clone(),
        transport.as_ref(),
        registry,
        frames,
        clock.clone(),
    )?;

    // Synthetic pose estimator publishing on the primary viewpoint only.
    let running = Arc::new(AtomicBool::new(true));
    let publisher = {
        let running = running.clone();
        let transport = transport.clone();
        let config = config.clone();
        let clock = clock.clone();
        let camera_frame = camera_frame.clone();
        thread::spawn(move || {
            let mut n = 0u64;
            while running.load(Ordering::SeqCst) {
                for (i, object_type) in config.object_types.iter().enumerate() {
                    let key = ObservationKey::new(primary, object_type.clone());
                    let jitter = ((n % 5) as f64 - 2.0) * 0.003;
                    let pose = SE3::new(
                        UnitQuaternion::from_euler_angles(0.0, jitter, 0.0),
                        Vector3::new(0.2 * i as f64 + jitter, 0.0, 1.0),
                    );
                    let msg = PoseStampedMsg::from_pose(&camera_frame, clock.now_ns(), &pose);
                    transport.publish(&config.channel_name(&key), msg);
                }
                n += 1;
                thread::sleep(PUBLISH_PERIOD);
            }
        })
    };

    let mut pending: Vec<ObjectType> = config.object_types.clone();
    let mut failed: Vec<ObjectType> = Vec::new();
    for poll in 0..MAX_POLLS {
        if pending.is_empty() {
            break;
        }
        thread::sleep(POLL_PERIOD);

        let mut still_pending = Vec::new();
        for object_type in pending {
            match aggregator.detect(&object_type) {
                Ok(decision) if decision.accepted() => {
                    let world = aggregator.last_world_pose(primary, &object_type)?;
                    if let Some(pose) = world {
                        let t = pose.translation;
                        info!(
                            "{} tracked at [{:.3}, {:.3}, {:.3}] in {}",
                            object_type, t.x, t.y, t.z, config.world_frame
                        );
                    }
                }
                Ok(decision) => {
                    info!(
                        "Poll {}: {} not ready ({}/{:.1} detections)",
                        poll, object_type, decision.observed, decision.expected
                    );
                    still_pending.push(object_type);
                }
                Err(e) if e.is_transient() => {
                    warn!("Detection for {} failed, retrying: {}", object_type, e);
                    still_pending.push(object_type);
                }
                Err(e) => {
                    error!("Detection for {} failed: {}", object_type, e);
                    failed.push(object_type);
                }
            }
        }
        pending = still_pending;
    }

    running.store(false, Ordering::SeqCst);
    let _ = publisher.join();

    for object_type in &config.object_types {
        aggregator.stop_tracking(object_type)?;
    }

    let stats = aggregator.multiplexer_stats();
    info!(
        "Done: accepted={}, dropped_foreign={}, dropped_malformed={}",
        stats.accepted, stats.dropped_foreign_frame, stats.dropped_malformed
    );

    aggregator.shutdown();
    transport.shutdown();

    if !pending.is_empty() || !failed.is_empty() {
        bail!(
            "objects never activated: {:?}, failed: {:?}",
            pending,
            failed
        );
    }
    Ok(())
}
