//! In-memory transport for session tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::broadcast;

use crate::errors::TransportError;
use crate::protocol::{parse_frame, InboundEvent, OutboundRequest};
use crate::transport::{ChannelMessage, Transport, CHANNEL_CAPACITY};

/// A [`Transport`] that records outbound requests and lets tests inject
/// inbound traffic.
///
/// ```
/// use pipesync::core::Scope;
/// use pipesync::protocol::OutboundRequest;
/// use pipesync::testing::MemoryTransport;
/// use pipesync::transport::Transport;
///
/// # tokio_test::block_on(async {
/// let transport = MemoryTransport::new();
/// transport.connect().await.unwrap();
/// transport
///     .send(&OutboundRequest::join_room(&Scope::user("u1")))
///     .await
///     .unwrap();
/// assert_eq!(transport.sent_names(), vec!["joinRoom"]);
/// # });
/// ```
#[derive(Debug)]
pub struct MemoryTransport {
    events: broadcast::Sender<ChannelMessage>,
    connected: AtomicBool,
    failing_connects: AtomicUsize,
    connect_attempts: AtomicUsize,
    disconnects: AtomicUsize,
    sent: Mutex<Vec<OutboundRequest>>,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransport {
    /// Creates a disconnected transport.
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            events,
            connected: AtomicBool::new(false),
            failing_connects: AtomicUsize::new(0),
            connect_attempts: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Makes the next `count` connect attempts fail.
    pub fn fail_next_connects(&self, count: usize) {
        self.failing_connects.store(count, Ordering::SeqCst);
    }

    /// Delivers an event to subscribers.
    pub fn inject(&self, event: InboundEvent) {
        let _ = self.events.send(ChannelMessage::Event(event));
    }

    /// Delivers a raw text frame, decoding it the way a real connection
    /// does.
    pub fn inject_frame(&self, text: &str) {
        let message = match parse_frame(text) {
            Ok(event) => ChannelMessage::Event(event),
            Err(e) => ChannelMessage::Dropped {
                error: e.to_string(),
            },
        };
        let _ = self.events.send(message);
    }

    /// Simulates the connection dropping on its own.
    pub fn drop_connection(&self, reason: &str) {
        self.connected.store(false, Ordering::SeqCst);
        let _ = self.events.send(ChannelMessage::Closed {
            reason: reason.to_string(),
        });
    }

    /// Returns every request sent so far.
    #[must_use]
    pub fn sent(&self) -> Vec<OutboundRequest> {
        self.sent.lock().clone()
    }

    /// Returns the wire names of every request sent so far.
    #[must_use]
    pub fn sent_names(&self) -> Vec<&'static str> {
        self.sent.lock().iter().map(OutboundRequest::name).collect()
    }

    /// Returns how many requests with the given wire name were sent.
    #[must_use]
    pub fn sent_count(&self, name: &str) -> usize {
        self.sent.lock().iter().filter(|r| r.name() == name).count()
    }

    /// Clears the recorded requests.
    pub fn clear_sent(&self) {
        self.sent.lock().clear();
    }

    /// Returns how many times `connect` was called.
    #[must_use]
    pub fn connect_attempts(&self) -> usize {
        self.connect_attempts.load(Ordering::SeqCst)
    }

    /// Returns how many times an open connection was closed by `disconnect`.
    #[must_use]
    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        self.connect_attempts.fetch_add(1, Ordering::SeqCst);

        let failing = self.failing_connects.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_connects.store(failing - 1, Ordering::SeqCst);
            return Err(TransportError::Connect("refused".to_string()));
        }

        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            self.disconnects.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn send(&self, request: &OutboundRequest) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        self.sent.lock().push(request.clone());
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ChannelMessage> {
        self.events.subscribe()
    }
}
