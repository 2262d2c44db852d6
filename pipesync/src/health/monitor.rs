//! The staleness state machine.

use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Connection health of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    /// No transport.
    Disconnected,
    /// Transport being established.
    Connecting,
    /// Room joined, nothing received yet.
    Joined,
    /// Events are flowing.
    Healthy,
    /// Heartbeats stopped; inferred locally, the transport may still be open.
    Stale,
    /// A forced reconnect is pending.
    Recovering,
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Joined => "joined",
            Self::Healthy => "healthy",
            Self::Stale => "stale",
            Self::Recovering => "recovering",
        };
        f.write_str(name)
    }
}

/// Corrective action requested by a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthAction {
    /// Publish a connection status to consumers.
    ReportConnection(bool),
    /// Ask the backend to re-emit a snapshot.
    RequestRefresh,
    /// Tear down and recreate the transport.
    ScheduleReconnect,
}

/// Silence thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthThresholds {
    /// Heartbeat silence after which the session is stale.
    pub heartbeat_stale: Duration,
    /// Event silence after which a refresh is requested.
    pub refresh_after: Duration,
    /// Event silence after which a reconnect is forced.
    pub reconnect_after: Duration,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            heartbeat_stale: Duration::from_secs(120),
            refresh_after: Duration::from_secs(180),
            reconnect_after: Duration::from_secs(300),
        }
    }
}

/// Recency tracker and escalation state machine.
#[derive(Debug, Clone)]
pub struct HealthMonitor {
    thresholds: HealthThresholds,
    state: HealthState,
    last_event: Instant,
    last_heartbeat: Option<Instant>,
    refresh_issued: bool,
    reconnect_pending: bool,
    stale_reported: bool,
    transport_connected: bool,
    settled: bool,
}

impl HealthMonitor {
    /// Creates a monitor in the `Disconnected` state.
    #[must_use]
    pub fn new(thresholds: HealthThresholds, now: Instant) -> Self {
        Self {
            thresholds,
            state: HealthState::Disconnected,
            last_event: now,
            last_heartbeat: None,
            refresh_issued: false,
            reconnect_pending: false,
            stale_reported: false,
            transport_connected: false,
            settled: false,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> HealthState {
        self.state
    }

    /// Returns true while a forced reconnect is scheduled or running.
    #[must_use]
    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_pending
    }

    /// Returns when the last event of any kind arrived.
    #[must_use]
    pub fn last_event(&self) -> Instant {
        self.last_event
    }

    /// Returns when the last heartbeat arrived.
    #[must_use]
    pub fn last_heartbeat(&self) -> Option<Instant> {
        self.last_heartbeat
    }

    /// Marks the transport as being established.
    pub fn mark_connecting(&mut self) {
        self.state = HealthState::Connecting;
    }

    /// Marks the transport as down.
    pub fn mark_disconnected(&mut self) {
        self.transport_connected = false;
        if !self.reconnect_pending {
            self.state = HealthState::Disconnected;
        }
    }

    /// Marks the room as (re-)joined and restarts every recency timer at
    /// `now`.
    pub fn mark_joined(&mut self, now: Instant) {
        self.last_event = now;
        if self.last_heartbeat.is_some() {
            self.last_heartbeat = Some(now);
        }
        self.refresh_issued = false;
        self.reconnect_pending = false;
        self.stale_reported = false;
        self.transport_connected = true;
        self.state = HealthState::Joined;
    }

    /// Clears the pending reconnect after a failed attempt so the next tick
    /// can schedule another one.
    pub fn reconnect_failed(&mut self) {
        self.reconnect_pending = false;
    }

    /// Sets whether the scope has settled. Settled scopes no longer refresh
    /// or reconnect because of inactivity.
    pub fn set_settled(&mut self, settled: bool) {
        self.settled = settled;
    }

    /// Records any received event.
    pub fn record_event(&mut self, now: Instant) {
        self.last_event = now;
        self.refresh_issued = false;
        if self.state == HealthState::Joined {
            self.state = HealthState::Healthy;
        }
    }

    /// Records a heartbeat. Returns a connection report when the heartbeat
    /// ends a stale period.
    pub fn record_heartbeat(&mut self, now: Instant) -> Option<HealthAction> {
        self.record_event(now);
        self.last_heartbeat = Some(now);

        if self.stale_reported {
            self.stale_reported = false;
            if self.state == HealthState::Stale {
                self.state = HealthState::Healthy;
            }
            info!("Heartbeat resumed after stale period");
            return Some(HealthAction::ReportConnection(true));
        }
        None
    }

    /// Evaluates the thresholds at `now`.
    pub fn tick(&mut self, now: Instant) -> Vec<HealthAction> {
        let mut actions = Vec::new();
        let event_silence = now.saturating_duration_since(self.last_event);

        if let Some(heartbeat) = self.last_heartbeat {
            let heartbeat_silence = now.saturating_duration_since(heartbeat);
            if heartbeat_silence > self.thresholds.heartbeat_stale && !self.stale_reported {
                warn!(silence_secs = heartbeat_silence.as_secs(), "No heartbeat, marking stale");
                self.stale_reported = true;
                if self.state != HealthState::Recovering {
                    self.state = HealthState::Stale;
                }
                actions.push(HealthAction::ReportConnection(false));
            }
        }

        if !self.settled {
            if event_silence > self.thresholds.refresh_after && !self.refresh_issued {
                debug!(silence_secs = event_silence.as_secs(), "Event silence, requesting refresh");
                self.refresh_issued = true;
                actions.push(HealthAction::RequestRefresh);
            }

            if event_silence > self.thresholds.reconnect_after && !self.reconnect_pending {
                warn!(silence_secs = event_silence.as_secs(), "Event silence, forcing reconnect");
                self.schedule_reconnect(&mut actions);
            }
        }

        if !self.transport_connected && !self.reconnect_pending {
            debug!("Transport down, scheduling reconnect");
            self.schedule_reconnect(&mut actions);
        }

        actions
    }

    fn schedule_reconnect(&mut self, actions: &mut Vec<HealthAction>) {
        self.reconnect_pending = true;
        self.state = HealthState::Recovering;
        actions.push(HealthAction::ScheduleReconnect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn joined_monitor() -> (HealthMonitor, Instant) {
        let start = Instant::now();
        let mut monitor = HealthMonitor::new(HealthThresholds::default(), start);
        monitor.mark_connecting();
        monitor.mark_joined(start);
        (monitor, start)
    }

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn test_escalation_scenario() {
        let (mut monitor, start) = joined_monitor();
        monitor.record_heartbeat(start);
        assert_eq!(monitor.state(), HealthState::Healthy);

        assert!(monitor.tick(start + secs(120)).is_empty());

        assert_eq!(
            monitor.tick(start + secs(121)),
            vec![HealthAction::ReportConnection(false)]
        );
        assert_eq!(monitor.state(), HealthState::Stale);
        assert!(monitor.tick(start + secs(150)).is_empty());

        assert_eq!(monitor.tick(start + secs(181)), vec![HealthAction::RequestRefresh]);
        assert!(monitor.tick(start + secs(240)).is_empty());

        assert_eq!(monitor.tick(start + secs(301)), vec![HealthAction::ScheduleReconnect]);
        assert_eq!(monitor.state(), HealthState::Recovering);
        assert!(monitor.reconnect_pending());
        assert!(monitor.tick(start + secs(400)).is_empty());
    }

    #[test]
    fn test_no_stale_without_heartbeat() {
        let (mut monitor, start) = joined_monitor();

        assert!(monitor.tick(start + secs(150)).is_empty());
        assert_eq!(monitor.tick(start + secs(181)), vec![HealthAction::RequestRefresh]);
    }

    #[test]
    fn test_event_rearms_refresh() {
        let (mut monitor, start) = joined_monitor();

        assert_eq!(monitor.tick(start + secs(181)), vec![HealthAction::RequestRefresh]);
        monitor.record_event(start + secs(200));
        assert!(monitor.tick(start + secs(300)).is_empty());
        assert_eq!(monitor.tick(start + secs(381)), vec![HealthAction::RequestRefresh]);
    }

    #[test]
    fn test_heartbeat_after_stale_reports_connected() {
        let (mut monitor, start) = joined_monitor();
        monitor.record_heartbeat(start);
        monitor.tick(start + secs(130));

        assert_eq!(
            monitor.record_heartbeat(start + secs(140)),
            Some(HealthAction::ReportConnection(true))
        );
        assert_eq!(monitor.state(), HealthState::Healthy);
        assert_eq!(monitor.record_heartbeat(start + secs(150)), None);
    }

    #[test]
    fn test_mark_joined_resets_timers() {
        let (mut monitor, start) = joined_monitor();
        monitor.record_heartbeat(start);
        monitor.tick(start + secs(301));
        assert!(monitor.reconnect_pending());

        let rejoin = start + secs(310);
        monitor.mark_joined(rejoin);
        assert!(!monitor.reconnect_pending());
        assert_eq!(monitor.last_event(), rejoin);
        assert_eq!(monitor.last_heartbeat(), Some(rejoin));
        assert!(monitor.tick(rejoin + secs(120)).is_empty());
        assert_eq!(
            monitor.tick(rejoin + secs(121)),
            vec![HealthAction::ReportConnection(false)]
        );
    }

    #[test]
    fn test_settled_scope_suppresses_inactivity_actions() {
        let (mut monitor, start) = joined_monitor();
        monitor.set_settled(true);

        assert!(monitor.tick(start + secs(1000)).is_empty());

        monitor.mark_disconnected();
        assert_eq!(monitor.tick(start + secs(1001)), vec![HealthAction::ScheduleReconnect]);
    }

    #[test]
    fn test_disconnected_transport_schedules_reconnect_once() {
        let start = Instant::now();
        let mut monitor = HealthMonitor::new(HealthThresholds::default(), start);

        assert_eq!(monitor.tick(start + secs(30)), vec![HealthAction::ScheduleReconnect]);
        assert!(monitor.tick(start + secs(60)).is_empty());

        monitor.reconnect_failed();
        assert_eq!(monitor.tick(start + secs(90)), vec![HealthAction::ScheduleReconnect]);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(HealthState::Recovering.to_string(), "recovering");
        assert_eq!(HealthState::Joined.to_string(), "joined");
    }
}
