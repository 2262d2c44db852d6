//! Long-lived bidirectional channel to the progress backend.
//!
//! Sessions only see the [`Transport`] trait. [`WebSocketTransport`] is the
//! production implementation; tests use
//! [`MemoryTransport`](crate::testing::MemoryTransport).

mod backoff;
mod websocket;

pub use backoff::{BackoffConfig, JitterStrategy, ReconnectBackoff};
pub use websocket::WebSocketTransport;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::errors::TransportError;
use crate::protocol::{InboundEvent, OutboundRequest};

/// Broadcast channel capacity for inbound messages.
pub const CHANNEL_CAPACITY: usize = 256;

/// A message delivered to transport subscribers.
#[derive(Debug, Clone)]
pub enum ChannelMessage {
    /// A decoded inbound event.
    Event(InboundEvent),
    /// A frame that failed to decode and was dropped.
    Dropped {
        /// The decode error.
        error: String,
    },
    /// The connection dropped without being asked to.
    Closed {
        /// Why the connection ended.
        reason: String,
    },
}

/// A shared, reconnectable channel.
///
/// Implementations keep a single broadcast sender for their whole lifetime,
/// so receivers obtained from [`subscribe`](Self::subscribe) survive
/// reconnects.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Opens the connection. Succeeds immediately if already connected.
    async fn connect(&self) -> Result<(), TransportError>;

    /// Closes the connection. Does nothing if not connected.
    async fn disconnect(&self);

    /// Returns true while the connection is open.
    fn is_connected(&self) -> bool;

    /// Sends one request.
    async fn send(&self, request: &OutboundRequest) -> Result<(), TransportError>;

    /// Subscribes to inbound messages.
    fn subscribe(&self) -> broadcast::Receiver<ChannelMessage>;
}
