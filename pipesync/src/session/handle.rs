//! The consumer-facing session handle.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::actor::Command;
use super::timers::TimerGroup;
use super::ConnectionStatus;
use crate::core::Scope;
use crate::graph::DependencyGraph;
use crate::health::HealthState;
use crate::progress::{self, StageProgressView};
use crate::reconcile::ReconciledState;

/// One open synchronization scope.
///
/// Obtained from [`SessionManager::open`](super::SessionManager::open) and
/// closed with [`SessionManager::close`](super::SessionManager::close).
/// Dropping a session without closing it cancels its actor and timers but
/// does not leave the room.
pub struct Session {
    id: Uuid,
    scope: Scope,
    graph: Arc<DependencyGraph>,
    commands: mpsc::UnboundedSender<Command>,
    cancel: CancellationToken,
    timers: Arc<TimerGroup>,
    actor: Option<JoinHandle<()>>,
    state: watch::Receiver<ReconciledState>,
    connection: watch::Receiver<ConnectionStatus>,
    health: watch::Receiver<HealthState>,
}

/// Receiving ends of a session's watch channels.
pub(super) struct Watchers {
    pub(super) state: watch::Receiver<ReconciledState>,
    pub(super) connection: watch::Receiver<ConnectionStatus>,
    pub(super) health: watch::Receiver<HealthState>,
}

impl Session {
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        id: Uuid,
        scope: Scope,
        graph: Arc<DependencyGraph>,
        commands: mpsc::UnboundedSender<Command>,
        cancel: CancellationToken,
        timers: Arc<TimerGroup>,
        actor: JoinHandle<()>,
        watchers: Watchers,
    ) -> Self {
        Self {
            id,
            scope,
            graph,
            commands,
            cancel,
            timers,
            actor: Some(actor),
            state: watchers.state,
            connection: watchers.connection,
            health: watchers.health,
        }
    }

    /// Returns the session id, unique per `open` call.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the scope.
    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Returns the dependency graph the session aggregates against.
    #[must_use]
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Returns a copy of the latest reconciled state.
    #[must_use]
    pub fn state(&self) -> ReconciledState {
        self.state.borrow().clone()
    }

    /// Returns the latest connection status.
    #[must_use]
    pub fn connection(&self) -> ConnectionStatus {
        self.connection.borrow().clone()
    }

    /// Returns the current health state.
    #[must_use]
    pub fn health(&self) -> HealthState {
        *self.health.borrow()
    }

    /// Subscribes to state changes.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ReconciledState> {
        self.state.clone()
    }

    /// Subscribes to connection status changes.
    #[must_use]
    pub fn watch_connection(&self) -> watch::Receiver<ConnectionStatus> {
        self.connection.clone()
    }

    /// Subscribes to health changes.
    #[must_use]
    pub fn watch_health(&self) -> watch::Receiver<HealthState> {
        self.health.clone()
    }

    /// Returns the percentage of the stage with the given label, or `None`
    /// for an unknown label.
    #[must_use]
    pub fn stage_progress(&self, label: &str) -> Option<u8> {
        let stage = self.graph.stage_by_label(label)?;
        let statuses = self.state.borrow().unit_statuses();
        Some(progress::stage_progress(&self.graph, stage, &statuses))
    }

    /// Returns the overall percentage.
    #[must_use]
    pub fn overall_progress(&self) -> u8 {
        let state = self.state.borrow();
        progress::overall_progress(
            &self.graph,
            state.reported_overall_progress(),
            &state.unit_statuses(),
        )
    }

    /// Returns one row per stage in topological order.
    #[must_use]
    pub fn stage_breakdown(&self) -> Vec<StageProgressView> {
        let statuses = self.state.borrow().unit_statuses();
        progress::stage_breakdown(&self.graph, &statuses)
    }

    /// Returns the number of timers still scheduled.
    #[must_use]
    pub fn outstanding_timers(&self) -> usize {
        self.timers.outstanding()
    }

    /// Returns true once the session has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(super) async fn rejoin(&self) -> bool {
        let (reply, response) = oneshot::channel();
        if self.commands.send(Command::Rejoin { reply }).is_err() {
            return false;
        }
        response.await.unwrap_or(false)
    }

    /// Stops the actor and every timer, waiting for all of them. Returns
    /// false if the session was already shut down.
    pub(super) async fn shutdown(&mut self) -> bool {
        let Some(actor) = self.actor.take() else {
            return false;
        };
        self.cancel.cancel();
        self.timers.shutdown().await;
        let _ = actor.await;
        true
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.timers.cancel();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("scope", &self.scope)
            .field("health", &self.health())
            .field("outstanding_timers", &self.outstanding_timers())
            .finish()
    }
}
