//! State shared by every session of one manager.

use parking_lot::Mutex;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::rooms::RoomRegistry;
use crate::config::SyncConfig;
use crate::core::Scope;
use crate::errors::TransportError;
use crate::events::{names, EventSink};
use crate::graph::DependencyGraph;
use crate::protocol::OutboundRequest;
use crate::transport::Transport;

pub(super) struct Shared {
    pub(super) transport: Arc<dyn Transport>,
    pub(super) graph: Arc<DependencyGraph>,
    pub(super) config: SyncConfig,
    pub(super) sink: Arc<dyn EventSink>,
    pub(super) rooms: Mutex<RoomRegistry>,
    /// Serializes connects and reconnects.
    connect_lock: tokio::sync::Mutex<()>,
    /// Bumped every time the transport is (re)established.
    generation: AtomicU64,
    /// Carries the new generation to every actor once all rooms are joined.
    established: watch::Sender<u64>,
}

impl Shared {
    pub(super) fn new(
        transport: Arc<dyn Transport>,
        graph: Arc<DependencyGraph>,
        config: SyncConfig,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let (established, _) = watch::channel(0);
        Self {
            transport,
            graph,
            config,
            sink,
            rooms: Mutex::new(RoomRegistry::new()),
            connect_lock: tokio::sync::Mutex::new(()),
            generation: AtomicU64::new(0),
            established,
        }
    }

    pub(super) fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Subscribes to transport (re)establishment. Only generations bumped
    /// after this call are reported.
    pub(super) fn watch_established(&self) -> watch::Receiver<u64> {
        self.established.subscribe()
    }

    /// Connects the transport unless it is already connected.
    ///
    /// Returns true when this call established the connection. In that case
    /// every user was announced, every registered room joined and every
    /// live session notified.
    pub(super) async fn ensure_connected(&self) -> Result<bool, TransportError> {
        let _guard = self.connect_lock.lock().await;
        if self.transport.is_connected() {
            return Ok(false);
        }
        self.establish().await?;
        Ok(true)
    }

    /// Sends `initialize` and, for the first session of the room, `joinRoom`.
    pub(super) async fn announce(&self, scope: &Scope, join: bool) -> Result<(), TransportError> {
        self.transport
            .send(&OutboundRequest::initialize(scope))
            .await?;
        if join {
            self.transport.send(&OutboundRequest::join_room(scope)).await?;
        }
        Ok(())
    }

    /// Sends `leaveRoom` if the transport is up.
    pub(super) async fn leave(&self, scope: &Scope) {
        if !self.transport.is_connected() {
            return;
        }
        if let Err(e) = self.transport.send(&OutboundRequest::leave_room(scope)).await {
            warn!(scope = %scope, error = %e, "Failed to leave room");
        }
    }

    /// Sends `requestStatusRefresh` for `scope`.
    ///
    /// Returns false when the scope does not name a pipeline run or the
    /// transport is down.
    pub(super) async fn refresh(&self, scope: &Scope, reason: &'static str) -> bool {
        let Some(request) = OutboundRequest::refresh(scope) else {
            debug!(scope = %scope, "Scope has no pipeline run, skipping refresh");
            return false;
        };
        if !self.transport.is_connected() {
            debug!(scope = %scope, "Transport down, skipping refresh");
            return false;
        }

        match self.transport.send(&request).await {
            Ok(()) => {
                self.sink.try_emit(
                    names::REFRESH_REQUESTED,
                    Some(json!({ "scope": scope, "reason": reason })),
                );
                true
            }
            Err(e) => {
                warn!(scope = %scope, error = %e, "Refresh request failed");
                false
            }
        }
    }

    /// Tears the transport down and brings it back, re-announcing every
    /// user and re-joining every open room.
    ///
    /// `observed` is the generation the caller saw when it scheduled the
    /// reconnect. If the transport was established since then and is up,
    /// nothing is torn down and `Ok(false)` is returned.
    pub(super) async fn reconnect(&self, observed: u64) -> Result<bool, TransportError> {
        let _guard = self.connect_lock.lock().await;
        if self.generation() != observed && self.transport.is_connected() {
            debug!("Transport already re-established by another session");
            return Ok(false);
        }

        self.transport.disconnect().await;
        self.establish().await?;
        Ok(true)
    }

    /// Connects, announces every user, joins every registered room and
    /// publishes the new generation. Callers hold `connect_lock`.
    async fn establish(&self) -> Result<(), TransportError> {
        self.transport.connect().await?;

        let (users, rooms) = {
            let registry = self.rooms.lock();
            (registry.users(), registry.scopes())
        };
        for user in &users {
            self.transport
                .send(&OutboundRequest::initialize(&Scope::user(user.as_str())))
                .await?;
        }
        for room in &rooms {
            self.transport.send(&OutboundRequest::join_room(room)).await?;
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!(generation, rooms = rooms.len(), "Transport established");
        self.established.send_replace(generation);
        Ok(())
    }
}
