//! Inbound pose transport.
//!
//! The pub/sub transport is an external collaborator. The core needs only
//! `subscribe`; [`ChannelTransport`] is a small in-process implementation for
//! simulation and tests.

pub mod channel;
pub mod messages;
pub mod multiplexer;

pub use channel::ChannelTransport;
pub use messages::PoseStampedMsg;
pub use multiplexer::{Delivery, MultiplexerStats, SubscriptionMultiplexer};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Callback invoked for every message delivered on a channel.
pub type MessageHandler = Box<dyn Fn(PoseStampedMsg) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    #[error("transport is shut down")]
    Closed,

    #[error("invalid channel name {0:?}")]
    InvalidChannel(String),
}

/// Live registration on a channel. Dropping it stops delivery.
#[derive(Debug)]
pub struct Subscription {
    channel: String,
    active: Arc<AtomicBool>,
}

impl Subscription {
    pub fn new(channel: impl Into<String>, active: Arc<AtomicBool>) -> Self {
        Self {
            channel: channel.into(),
            active,
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

/// Subscription side of a pub/sub transport.
pub trait Transport: Send + Sync {
    /// Register `handler` for `channel` with a delivery queue of `depth`.
    fn subscribe(
        &self,
        channel: &str,
        depth: usize,
        handler: MessageHandler,
    ) -> Result<Subscription, TransportError>;
}
