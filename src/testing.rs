//! Test doubles shared by unit tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use nalgebra::{UnitQuaternion, Vector3};
use parking_lot::Mutex;

use crate::detection::{
    ObjectAdministrator, RegistryEntry, RegistryError, TrackedEntity, TrackingRegistry,
};
use crate::geometry::SE3;
use crate::observation::ObjectType;
use crate::transport::{MessageHandler, PoseStampedMsg, Subscription, Transport, TransportError};

/// Slightly perturbed pose around (0.5, 0, 0.8); distinct for each `i`.
pub fn noisy_pose(i: usize) -> SE3 {
    let e = i as f64 * 0.002;
    SE3::new(
        UnitQuaternion::from_euler_angles(0.0, 0.0, 0.3 + e),
        Vector3::new(0.5 + e, -e, 0.8),
    )
}

/// Poll `cond` until it holds or two seconds pass.
pub fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    cond()
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CallCounts {
    pub activate: usize,
    pub deactivate: usize,
    pub detect: usize,
    pub stop_localizing: usize,
}

#[derive(Default)]
pub struct RecordingEntity {
    activate: AtomicUsize,
    deactivate: AtomicUsize,
    detect: AtomicUsize,
    stop_localizing: AtomicUsize,
    localizing: AtomicBool,
    fail_next_activate: AtomicBool,
}

impl ObjectAdministrator for RecordingEntity {
    fn activate(&self) -> Result<(), RegistryError> {
        if self.fail_next_activate.swap(false, Ordering::SeqCst) {
            return Err(RegistryError::Unavailable("injected failure".into()));
        }
        self.activate.fetch_add(1, Ordering::SeqCst);
        self.localizing.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn deactivate(&self) -> Result<(), RegistryError> {
        self.deactivate.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl TrackedEntity for RecordingEntity {
    fn detect(&self) -> Result<(), RegistryError> {
        self.detect.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop_localizing(&self) -> Result<(), RegistryError> {
        self.stop_localizing.fetch_add(1, Ordering::SeqCst);
        self.localizing.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Registry that counts every call per object type.
pub struct RecordingRegistry {
    entities: HashMap<String, Arc<RecordingEntity>>,
}

impl RecordingRegistry {
    pub fn new<'a>(object_types: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            entities: object_types
                .into_iter()
                .map(|name| (name.to_string(), Arc::new(RecordingEntity::default())))
                .collect(),
        }
    }

    pub fn calls(&self, object_type: &str) -> CallCounts {
        let entity = &self.entities[object_type];
        CallCounts {
            activate: entity.activate.load(Ordering::SeqCst),
            deactivate: entity.deactivate.load(Ordering::SeqCst),
            detect: entity.detect.load(Ordering::SeqCst),
            stop_localizing: entity.stop_localizing.load(Ordering::SeqCst),
        }
    }

    pub fn is_localizing(&self, object_type: &str) -> bool {
        self.entities[object_type].localizing.load(Ordering::SeqCst)
    }

    pub fn fail_next_activate(&self, object_type: &str) {
        self.entities[object_type]
            .fail_next_activate
            .store(true, Ordering::SeqCst);
    }

    pub fn total_calls(&self) -> usize {
        self.entities
            .keys()
            .map(|name| {
                let c = self.calls(name);
                c.activate + c.deactivate + c.detect + c.stop_localizing
            })
            .sum()
    }
}

impl TrackingRegistry for RecordingRegistry {
    fn lookup(&self, object_type: &ObjectType) -> Option<RegistryEntry> {
        self.entities.get(object_type.as_str()).map(|entity| RegistryEntry {
            administrator: entity.clone(),
            entity: entity.clone(),
        })
    }
}

struct ManualRoute {
    channel: String,
    depth: usize,
    active: Arc<AtomicBool>,
    handler: Arc<MessageHandler>,
}

/// Transport that delivers synchronously on the calling thread.
#[derive(Default)]
pub struct ManualTransport {
    routes: Mutex<Vec<ManualRoute>>,
}

impl ManualTransport {
    pub fn channels(&self) -> Vec<String> {
        self.routes.lock().iter().map(|r| r.channel.clone()).collect()
    }

    pub fn depths(&self) -> Vec<usize> {
        self.routes.lock().iter().map(|r| r.depth).collect()
    }

    /// Invoke every active handler on `channel`; returns how many ran.
    pub fn deliver(&self, channel: &str, msg: PoseStampedMsg) -> usize {
        let handlers: Vec<Arc<MessageHandler>> = self
            .routes
            .lock()
            .iter()
            .filter(|r| r.channel == channel && r.active.load(Ordering::SeqCst))
            .map(|r| r.handler.clone())
            .collect();

        for handler in &handlers {
            (handler.as_ref())(msg.clone());
        }
        handlers.len()
    }
}

impl Transport for ManualTransport {
    fn subscribe(
        &self,
        channel: &str,
        depth: usize,
        handler: MessageHandler,
    ) -> Result<Subscription, TransportError> {
        let active = Arc::new(AtomicBool::new(true));
        self.routes.lock().push(ManualRoute {
            channel: channel.to_string(),
            depth,
            active: active.clone(),
            handler: Arc::new(handler),
        });
        Ok(Subscription::new(channel, active))
    }
}
