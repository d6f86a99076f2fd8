//! In-process transport built on bounded crossbeam channels.
//!
//! Each subscription gets its own bounded queue and delivery thread, so a
//! slow handler on one channel never stalls another. When a queue is full
//! the oldest pending message is dropped, keeping the freshest `depth`
//! messages.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError, bounded};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use super::{MessageHandler, PoseStampedMsg, Subscription, Transport, TransportError};

/// Timeout for receiving messages on a delivery thread.
const RECV_TIMEOUT: Duration = Duration::from_millis(50);

struct Route {
    sender: Sender<PoseStampedMsg>,
    /// Second receiver on the same queue, used to evict the oldest message.
    overflow: Receiver<PoseStampedMsg>,
    active: Arc<AtomicBool>,
}

impl Route {
    fn push(&self, msg: PoseStampedMsg) -> bool {
        match self.sender.try_send(msg) {
            Ok(()) => true,
            Err(TrySendError::Full(msg)) => {
                let _ = self.overflow.try_recv();
                self.sender.try_send(msg).is_ok()
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Publish/subscribe bus living inside the current process.
pub struct ChannelTransport {
    routes: RwLock<HashMap<String, Vec<Route>>>,
    shutdown: Arc<AtomicBool>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl ChannelTransport {
    pub fn new() -> Self {
        Self {
            routes: RwLock::new(HashMap::new()),
            shutdown: Arc::new(AtomicBool::new(false)),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Publish `msg` on `channel`. Returns the number of live subscribers
    /// it was queued for.
    pub fn publish(&self, channel: &str, msg: PoseStampedMsg) -> usize {
        if self.shutdown.load(Ordering::SeqCst) {
            return 0;
        }

        let mut routes = self.routes.write();
        let Some(subscribers) = routes.get_mut(channel) else {
            return 0;
        };
        subscribers.retain(|route| route.active.load(Ordering::SeqCst));

        subscribers
            .iter()
            .filter(|route| route.push(msg.clone()))
            .count()
    }

    /// Number of live subscriptions on `channel`.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.routes
            .read()
            .get(channel)
            .map(|subs| {
                subs.iter()
                    .filter(|route| route.active.load(Ordering::SeqCst))
                    .count()
            })
            .unwrap_or(0)
    }

    /// Stop all delivery threads and wait for them to exit.
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        self.routes.write().clear();

        let workers: Vec<_> = self.workers.lock().drain(..).collect();
        for handle in workers {
            let _ = handle.join();
        }
        info!("Channel transport shut down");
    }

    fn spawn_delivery(
        channel: String,
        receiver: Receiver<PoseStampedMsg>,
        handler: MessageHandler,
        active: Arc<AtomicBool>,
        shutdown: Arc<AtomicBool>,
    ) -> JoinHandle<()> {
        thread::spawn(move || {
            debug!("Delivery thread for {} started", channel);
            loop {
                if shutdown.load(Ordering::SeqCst) || !active.load(Ordering::SeqCst) {
                    break;
                }

                match receiver.recv_timeout(RECV_TIMEOUT) {
                    Ok(msg) => {
                        if active.load(Ordering::SeqCst) {
                            handler(msg);
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            debug!("Delivery thread for {} exiting", channel);
        })
    }
}

impl Default for ChannelTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for ChannelTransport {
    fn subscribe(
        &self,
        channel: &str,
        depth: usize,
        handler: MessageHandler,
    ) -> Result<Subscription, TransportError> {
        if self.shutdown.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        if channel.is_empty() {
            return Err(TransportError::InvalidChannel(channel.to_string()));
        }

        let (sender, receiver) = bounded::<PoseStampedMsg>(depth.max(1));
        let active = Arc::new(AtomicBool::new(true));

        let handle = Self::spawn_delivery(
            channel.to_string(),
            receiver.clone(),
            handler,
            active.clone(),
            self.shutdown.clone(),
        );
        {
            let mut workers = self.workers.lock();
            workers.retain(|h| !h.is_finished());
            workers.push(handle);
        }

        self.routes
            .write()
            .entry(channel.to_string())
            .or_default()
            .push(Route {
                sender,
                overflow: receiver,
                active: active.clone(),
            });

        Ok(Subscription::new(channel, active))
    }
}

impl Drop for ChannelTransport {
    fn drop(&mut self) {
        self.shutdown();
    }
}
