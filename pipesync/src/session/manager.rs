//! Session lifecycle.

use serde_json::json;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

use super::actor::{Command, Publishers, SessionActor};
use super::handle::{Session, Watchers};
use super::shared::Shared;
use super::timers::TimerGroup;
use super::ConnectionStatus;
use crate::config::SyncConfig;
use crate::core::Scope;
use crate::events::{names, EventSink, NoOpEventSink};
use crate::graph::DependencyGraph;
use crate::health::HealthMonitor;
use crate::observability::session_span;
use crate::reconcile::{ReconciledState, Reconciler};
use crate::transport::{ReconnectBackoff, Transport, WebSocketTransport};

/// Opens and closes synchronization sessions over one shared transport.
///
/// # Example
///
/// ```rust,ignore
/// let manager = SessionManager::websocket(SyncConfig::default(), Arc::new(catalog::script_production()));
/// let mut session = manager.open(Scope::pipeline_run("user", "script", "version")).await;
/// println!("{}%", session.overall_progress());
/// manager.close(&mut session).await;
/// ```
#[derive(Clone)]
pub struct SessionManager {
    shared: Arc<Shared>,
}

impl SessionManager {
    /// Creates a manager over `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, graph: Arc<DependencyGraph>, config: SyncConfig) -> Self {
        Self {
            shared: Arc::new(Shared::new(
                transport,
                graph,
                config,
                Arc::new(NoOpEventSink),
            )),
        }
    }

    /// Creates a manager over a WebSocket transport to `config.ws_url`.
    #[must_use]
    pub fn websocket(config: SyncConfig, graph: Arc<DependencyGraph>) -> Self {
        let transport = WebSocketTransport::new(config.ws_url.clone())
            .with_connect_timeout(config.connect_timeout());
        Self::new(Arc::new(transport), graph, config)
    }

    /// Sets the sink receiving structured synchronization events.
    ///
    /// Must be called before the first session is opened.
    #[must_use]
    pub fn with_event_sink(self, sink: Arc<dyn EventSink>) -> Self {
        let shared = &self.shared;
        Self {
            shared: Arc::new(Shared::new(
                Arc::clone(&shared.transport),
                Arc::clone(&shared.graph),
                shared.config.clone(),
                sink,
            )),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.shared.config
    }

    /// Returns the shared transport.
    #[must_use]
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.shared.transport
    }

    /// Returns the scopes with at least one open session.
    #[must_use]
    pub fn open_scopes(&self) -> Vec<Scope> {
        self.shared.rooms.lock().scopes()
    }

    /// Opens a session for `scope`.
    ///
    /// Connects the transport if needed, announces the user and joins the
    /// scope's room. Pipeline-run scopes request a status refresh after the
    /// initial refresh delay. A failed connect does not fail the open: the
    /// session starts disconnected and its health monitor schedules a
    /// reconnect.
    pub async fn open(&self, scope: Scope) -> Session {
        let shared = &self.shared;
        let id = Uuid::now_v7();
        let mut monitor = HealthMonitor::new(shared.config.thresholds(), Instant::now());
        monitor.mark_connecting();

        // Subscribe first so nothing sent in response to the join is missed.
        let events = shared.transport.subscribe();
        let first_in_room = shared.rooms.lock().join(&scope);

        let mut established = shared.watch_established();

        // A fresh connect announces and joins every registered room itself.
        let announced = match shared.ensure_connected().await {
            Ok(true) => Ok(()),
            Ok(false) => shared.announce(&scope, first_in_room).await,
            Err(e) => Err(e),
        };
        let connected = match announced {
            Ok(()) => {
                established.mark_unchanged();
                monitor.mark_joined(Instant::now());
                true
            }
            Err(e) => {
                warn!(scope = %scope, error = %e, "Could not join room, will retry");
                monitor.mark_disconnected();
                false
            }
        };

        let (state_tx, state_rx) = watch::channel(ReconciledState::default());
        let (connection_tx, connection_rx) = watch::channel(ConnectionStatus::now(connected));
        let (health_tx, health_rx) = watch::channel(monitor.state());
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();

        let cancel = CancellationToken::new();
        let timers = Arc::new(TimerGroup::child_of(&cancel));

        let tick_commands = commands_tx.clone();
        timers.spawn_every("health_tick", shared.config.tick_interval(), move || {
            let alive = tick_commands.send(Command::Tick).is_ok();
            async move { alive }
        });
        if scope.has_pipeline_run() {
            let refresh_commands = commands_tx.clone();
            timers.spawn_after(
                "initial_refresh",
                shared.config.initial_refresh_delay(),
                async move {
                    let _ = refresh_commands.send(Command::InitialRefresh);
                },
            );
        }

        let actor = SessionActor {
            reconciler: Reconciler::new(scope.clone(), Arc::clone(&shared.graph)),
            monitor,
            shared: Arc::clone(shared),
            timers: Arc::clone(&timers),
            backoff: ReconnectBackoff::new(shared.config.backoff.clone()),
            commands_tx: commands_tx.clone(),
            publishers: Publishers {
                state: state_tx,
                connection: connection_tx,
                health: health_tx,
            },
        };
        let handle = tokio::spawn(
            actor
                .run(events, established, commands_rx, cancel.clone())
                .instrument(session_span(id, &scope)),
        );

        info!(session_id = %id, scope = %scope, connected, "Session opened");
        shared.sink.try_emit(
            names::SESSION_OPENED,
            Some(json!({ "session_id": id, "scope": &scope })),
        );

        Session::new(
            id,
            scope,
            Arc::clone(&shared.graph),
            commands_tx,
            cancel,
            timers,
            handle,
            Watchers {
                state: state_rx,
                connection: connection_rx,
                health: health_rx,
            },
        )
    }

    /// Closes a session.
    ///
    /// Stops its actor and timers, leaves the room when no other session
    /// shares it and disconnects the transport when no session remains.
    /// Closing an already closed session does nothing.
    pub async fn close(&self, session: &mut Session) {
        if !session.shutdown().await {
            return;
        }

        let scope = session.scope().clone();
        let (last_in_room, none_left) = {
            let mut rooms = self.shared.rooms.lock();
            let last = rooms.leave(&scope);
            (last, rooms.is_empty())
        };

        if last_in_room {
            self.shared.leave(&scope).await;
        }
        if none_left {
            self.shared.transport.disconnect().await;
        }

        info!(session_id = %session.id(), scope = %scope, "Session closed");
        self.shared.sink.try_emit(
            names::SESSION_CLOSED,
            Some(json!({ "session_id": session.id(), "scope": &scope })),
        );
    }

    /// Re-joins the session's room, restarts its recency timers and requests
    /// a refresh. Returns false if the join could not be sent.
    pub async fn rejoin(&self, session: &Session) -> bool {
        session.rejoin().await
    }

    /// Asks the backend to re-emit a snapshot for the session's scope.
    ///
    /// Returns false when the scope does not name a pipeline run or the
    /// transport is not connected.
    pub async fn request_refresh(&self, session: &Session) -> bool {
        self.shared.refresh(session.scope(), "requested").await
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("connected", &self.shared.transport.is_connected())
            .field("open_scopes", &self.open_scopes().len())
            .finish()
    }
}
