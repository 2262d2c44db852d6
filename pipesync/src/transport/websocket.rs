//! WebSocket transport built on tokio-tungstenite.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{ChannelMessage, Transport, CHANNEL_CAPACITY};
use crate::errors::TransportError;
use crate::protocol::{parse_frame, OutboundRequest};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long `disconnect` waits for the writer to flush a close frame.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Tasks and handles of one open connection.
struct Connection {
    outbound: mpsc::UnboundedSender<Message>,
    cancel: CancellationToken,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl Connection {
    async fn shutdown(self) {
        self.cancel.cancel();
        let _ = tokio::time::timeout(SHUTDOWN_GRACE, self.writer).await;
        self.reader.abort();
        let _ = self.reader.await;
    }
}

/// A [`Transport`] over one WebSocket connection.
///
/// A reader task decodes text frames into [`ChannelMessage::Event`]s and a
/// writer task drains an outbound queue, so `send` never waits on the
/// socket. Malformed frames are logged, counted and dropped.
pub struct WebSocketTransport {
    url: String,
    connect_timeout: Duration,
    events: broadcast::Sender<ChannelMessage>,
    connected: Arc<AtomicBool>,
    dropped_frames: Arc<AtomicU64>,
    connection: Mutex<Option<Connection>>,
}

impl WebSocketTransport {
    /// Creates a transport for `url` (e.g. `wss://host/progress`).
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            url: url.into(),
            connect_timeout: Duration::from_secs(10),
            events,
            connected: Arc::new(AtomicBool::new(false)),
            dropped_frames: Arc::new(AtomicU64::new(0)),
            connection: Mutex::new(None),
        }
    }

    /// Sets the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Returns the endpoint URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns how many inbound frames failed to decode.
    #[must_use]
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        let mut slot = self.connection.lock().await;
        if slot.is_some() && self.is_connected() {
            return Ok(());
        }
        if let Some(stale) = slot.take() {
            stale.shutdown().await;
        }

        let (ws, _response) =
            tokio::time::timeout(self.connect_timeout, connect_async(self.url.as_str()))
                .await
                .map_err(|_| {
                    TransportError::Connect(format!("Timed out connecting to {}", self.url))
                })?
                .map_err(|e| {
                    TransportError::Connect(format!("Failed to connect to {}: {e}", self.url))
                })?;

        let (sink, stream) = ws.split();
        let (outbound, queue) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        self.connected.store(true, Ordering::SeqCst);

        let writer = tokio::spawn(write_loop(
            sink,
            queue,
            cancel.clone(),
            Arc::clone(&self.connected),
        ));
        let reader = tokio::spawn(read_loop(
            stream,
            self.events.clone(),
            cancel.clone(),
            Arc::clone(&self.connected),
            Arc::clone(&self.dropped_frames),
        ));

        *slot = Some(Connection {
            outbound,
            cancel,
            reader,
            writer,
        });

        info!(url = %self.url, "Connected to progress backend");
        Ok(())
    }

    async fn disconnect(&self) {
        let connection = self.connection.lock().await.take();
        self.connected.store(false, Ordering::SeqCst);

        if let Some(connection) = connection {
            connection.shutdown().await;
            info!(url = %self.url, "Disconnected from progress backend");
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn send(&self, request: &OutboundRequest) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        let frame = request
            .to_frame()
            .map_err(|e| TransportError::Send(e.to_string()))?;

        let slot = self.connection.lock().await;
        let connection = slot.as_ref().ok_or(TransportError::NotConnected)?;
        connection
            .outbound
            .send(Message::Text(frame))
            .map_err(|_| TransportError::Send("writer task stopped".to_string()))?;

        debug!(event = request.name(), "Queued outbound request");
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ChannelMessage> {
        self.events.subscribe()
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.get_mut().take() {
            connection.cancel.cancel();
        }
    }
}

async fn write_loop(
    mut sink: SplitSink<WsStream, Message>,
    mut queue: mpsc::UnboundedReceiver<Message>,
    cancel: CancellationToken,
    connected: Arc<AtomicBool>,
) {
    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                let _ = sink.send(Message::Close(None)).await;
                let _ = sink.close().await;
                break;
            }
            next = queue.recv() => {
                let Some(message) = next else { break };
                if let Err(e) = sink.send(message).await {
                    warn!(error = %e, "WebSocket send failed");
                    connected.store(false, Ordering::SeqCst);
                    break;
                }
            }
        }
    }
}

async fn read_loop(
    mut stream: SplitStream<WsStream>,
    events: broadcast::Sender<ChannelMessage>,
    cancel: CancellationToken,
    connected: Arc<AtomicBool>,
    dropped_frames: Arc<AtomicU64>,
) {
    let reason = loop {
        let next = tokio::select! {
            () = cancel.cancelled() => return,
            next = stream.next() => next,
        };

        match next {
            Some(Ok(Message::Text(text))) => match parse_frame(&text) {
                Ok(event) => {
                    // No subscribers is not an error.
                    let _ = events.send(ChannelMessage::Event(event));
                }
                Err(e) => {
                    dropped_frames.fetch_add(1, Ordering::Relaxed);
                    warn!(error = %e, "Dropping malformed frame");
                    let _ = events.send(ChannelMessage::Dropped {
                        error: e.to_string(),
                    });
                }
            },
            Some(Ok(Message::Close(frame))) => {
                break frame.map_or_else(
                    || "closed by server".to_string(),
                    |f| f.reason.to_string(),
                );
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => break e.to_string(),
            None => break "stream ended".to_string(),
        }
    };

    info!(%reason, "WebSocket connection lost");
    connected.store(false, Ordering::SeqCst);
    cancel.cancel();
    let _ = events.send(ChannelMessage::Closed { reason });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Scope;
    use crate::protocol::InboundEvent;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    async fn listen() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        (listener, url)
    }

    #[tokio::test]
    async fn test_round_trip_with_server() {
        let (listener, url) = listen().await;

        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();

            let first = ws.next().await.unwrap().unwrap();
            ws.send(Message::Text("{not json".to_string())).await.unwrap();
            ws.send(Message::Text(
                r#"{"event":"noDataAvailable","data":{"userId":"u1"}}"#.to_string(),
            ))
            .await
            .unwrap();
            ws.close(None).await.unwrap();
            first.into_text().unwrap()
        });

        let transport = WebSocketTransport::new(url);
        let mut rx = transport.subscribe();
        transport.connect().await.unwrap();
        assert!(transport.is_connected());

        transport
            .send(&OutboundRequest::initialize(&Scope::user("u1")))
            .await
            .unwrap();

        assert!(matches!(rx.recv().await.unwrap(), ChannelMessage::Dropped { .. }));
        match rx.recv().await.unwrap() {
            ChannelMessage::Event(InboundEvent::NoDataAvailable(notice)) => {
                assert_eq!(notice.scope.user_id.as_deref(), Some("u1"));
            }
            other => panic!("Expected noDataAvailable, got {other:?}"),
        }
        assert!(matches!(rx.recv().await.unwrap(), ChannelMessage::Closed { .. }));
        assert!(!transport.is_connected());
        assert_eq!(transport.dropped_frames(), 1);

        let received = server.await.unwrap();
        assert_eq!(received, r#"{"event":"initialize","data":{"userId":"u1"}}"#);
    }

    #[tokio::test]
    async fn test_connect_failure() {
        let (listener, url) = listen().await;
        drop(listener);

        let transport = WebSocketTransport::new(url);
        assert!(matches!(
            transport.connect().await,
            Err(TransportError::Connect(_))
        ));
        assert!(!transport.is_connected());
        assert!(matches!(
            transport.send(&OutboundRequest::initialize(&Scope::user("u"))).await,
            Err(TransportError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let (listener, url) = listen().await;
        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();
            while let Some(Ok(_)) = ws.next().await {}
        });

        let transport = WebSocketTransport::new(url);
        transport.connect().await.unwrap();
        transport.connect().await.unwrap();

        transport.disconnect().await;
        transport.disconnect().await;
        assert!(!transport.is_connected());
    }
}
