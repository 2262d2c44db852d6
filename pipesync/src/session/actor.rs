//! The per-scope session actor.

use serde_json::json;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::shared::Shared;
use super::timers::TimerGroup;
use super::ConnectionStatus;
use crate::events::names;
use crate::health::{HealthAction, HealthMonitor, HealthState};
use crate::protocol::{InboundEvent, OutboundRequest};
use crate::reconcile::{ApplyOutcome, ReconciledState, Reconciler};
use crate::transport::{ChannelMessage, ReconnectBackoff};

/// Work delivered to an actor by timers and by the manager.
#[derive(Debug)]
pub(super) enum Command {
    /// Evaluate health thresholds.
    Tick,
    /// Send the initial status refresh.
    InitialRefresh,
    /// Perform a scheduled forced reconnect.
    Reconnect {
        /// Transport generation when the reconnect was scheduled.
        generation: u64,
    },
    /// Re-join the room and refresh.
    Rejoin {
        /// Whether `joinRoom` was sent.
        reply: oneshot::Sender<bool>,
    },
}

/// Publishing ends of a session's watch channels.
pub(super) struct Publishers {
    pub(super) state: watch::Sender<ReconciledState>,
    pub(super) connection: watch::Sender<ConnectionStatus>,
    pub(super) health: watch::Sender<HealthState>,
}

/// Owns the reconciled state and health monitor of one scope. Everything
/// touching them runs on this task, one message at a time.
pub(super) struct SessionActor {
    pub(super) reconciler: Reconciler,
    pub(super) monitor: HealthMonitor,
    pub(super) shared: Arc<Shared>,
    pub(super) timers: Arc<TimerGroup>,
    /// Delays for this session's own forced reconnects.
    pub(super) backoff: ReconnectBackoff,
    pub(super) commands_tx: mpsc::UnboundedSender<Command>,
    pub(super) publishers: Publishers,
}

impl SessionActor {
    pub(super) async fn run(
        mut self,
        mut events: broadcast::Receiver<ChannelMessage>,
        mut established: watch::Receiver<u64>,
        mut commands: mpsc::UnboundedReceiver<Command>,
        cancel: CancellationToken,
    ) {
        debug!("Session actor started");
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                Some(command) = commands.recv() => self.handle_command(command).await,
                Ok(()) = established.changed() => {
                    let generation = *established.borrow_and_update();
                    self.handle_established(generation).await;
                }
                message = events.recv() => match message {
                    Ok(ChannelMessage::Event(event)) => self.handle_event(event).await,
                    Ok(ChannelMessage::Dropped { error }) => {
                        self.shared
                            .sink
                            .try_emit(names::FRAME_DROPPED, Some(json!({ "error": error })));
                    }
                    Ok(ChannelMessage::Closed { reason }) => self.handle_closed(&reason),
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "Session fell behind the transport, requesting refresh");
                        self.shared.refresh(self.reconciler.scope(), "lagged").await;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
        debug!("Session actor stopped");
    }

    async fn handle_event(&mut self, event: InboundEvent) {
        if !self.reconciler.accepts(&event) {
            debug!(event = event.name(), "Ignoring event for another scope");
            return;
        }

        let now = Instant::now();
        let heartbeat = matches!(event, InboundEvent::PipelineHeartbeat(_));
        let outcome = self.reconciler.apply(event);

        if heartbeat {
            if let Some(action) = self.monitor.record_heartbeat(now) {
                self.perform(action).await;
            }
        } else {
            self.monitor.record_event(now);
        }

        match &outcome {
            ApplyOutcome::Settled { pending } => {
                self.monitor.set_settled(true);
                if !pending.is_empty() {
                    self.shared.sink.try_emit(
                        names::COMPLETE_DISCREPANCY,
                        Some(json!({
                            "scope": self.reconciler.scope(),
                            "pending": pending,
                        })),
                    );
                }
            }
            ApplyOutcome::ConnectionReported(connected) => self.publish_connection(*connected),
            ApplyOutcome::Discarded(reason) => debug!(?reason, "Event discarded"),
            _ => {}
        }

        if outcome.changed_state() {
            self.publishers
                .state
                .send_replace(self.reconciler.state().clone());
        }
        self.publish_health();
    }

    fn handle_closed(&mut self, reason: &str) {
        info!(reason, "Transport closed");
        self.monitor.mark_disconnected();
        self.publish_connection(false);
        self.publish_health();
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Tick => {
                for action in self.monitor.tick(Instant::now()) {
                    self.perform(action).await;
                }
            }
            Command::InitialRefresh => {
                self.shared.refresh(self.reconciler.scope(), "initial").await;
            }
            Command::Reconnect { generation } => self.reconnect(generation).await,
            Command::Rejoin { reply } => {
                let joined = self.rejoin().await;
                let _ = reply.send(joined);
            }
        }
        self.publish_health();
    }

    async fn perform(&mut self, action: HealthAction) {
        match action {
            HealthAction::ReportConnection(connected) => {
                let name = if connected { names::RECOVERED } else { names::STALE };
                self.shared
                    .sink
                    .try_emit(name, Some(json!({ "scope": self.reconciler.scope() })));
                self.publish_connection(connected);
            }
            HealthAction::RequestRefresh => {
                self.shared.refresh(self.reconciler.scope(), "silence").await;
            }
            HealthAction::ScheduleReconnect => self.schedule_reconnect(),
        }
    }

    /// The shared transport was (re)established and this session's room
    /// joined again, possibly on behalf of another session.
    async fn handle_established(&mut self, generation: u64) {
        debug!(generation, "Room joined on fresh transport");
        self.backoff.reset();
        self.monitor.mark_joined(Instant::now());
        self.publish_connection(true);
        self.publish_health();
        self.shared.refresh(self.reconciler.scope(), "reconnect").await;
    }

    fn schedule_reconnect(&mut self) {
        let delay = self.backoff.next_delay();
        let generation = self.shared.generation();
        info!(delay_ms = delay.as_millis() as u64, "Scheduling forced reconnect");
        self.shared.sink.try_emit(
            names::RECONNECT_SCHEDULED,
            Some(json!({
                "scope": self.reconciler.scope(),
                "delay_ms": delay.as_millis() as u64,
            })),
        );

        let commands = self.commands_tx.clone();
        self.timers.spawn_after("reconnect", delay, async move {
            let _ = commands.send(Command::Reconnect { generation });
        });
    }

    async fn reconnect(&mut self, generation: u64) {
        // Recency, connection and the refresh are handled once the new
        // generation is observed through `established`.
        match self.shared.reconnect(generation).await {
            Ok(true) => {
                self.shared.sink.try_emit(
                    names::RECONNECTED,
                    Some(json!({ "scope": self.reconciler.scope() })),
                );
            }
            Ok(false) => debug!("Reconnect skipped, transport already re-established"),
            Err(e) => {
                warn!(error = %e, "Forced reconnect failed");
                self.monitor.reconnect_failed();
                if !self.shared.transport.is_connected() {
                    self.monitor.mark_disconnected();
                }
                self.publish_connection(false);
                self.shared.sink.try_emit(
                    names::RECONNECT_FAILED,
                    Some(json!({
                        "scope": self.reconciler.scope(),
                        "error": e.to_string(),
                    })),
                );
            }
        }
    }

    async fn rejoin(&mut self) -> bool {
        let scope = self.reconciler.scope();
        if let Err(e) = self
            .shared
            .transport
            .send(&OutboundRequest::join_room(scope))
            .await
        {
            warn!(error = %e, "Rejoin failed");
            return false;
        }
        self.monitor.mark_joined(Instant::now());
        self.shared.refresh(self.reconciler.scope(), "rejoin").await;
        true
    }

    fn publish_connection(&self, connected: bool) {
        self.publishers.connection.send_if_modified(|current| {
            if current.connected == connected {
                return false;
            }
            *current = ConnectionStatus::now(connected);
            true
        });
    }

    fn publish_health(&self) {
        let state = self.monitor.state();
        self.publishers.health.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            *current = state;
            true
        });
    }
}
