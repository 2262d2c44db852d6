//! Connection health monitoring.
//!
//! A transport can look open while no events flow. The [`HealthMonitor`]
//! tracks when the last heartbeat and the last event of any kind arrived and,
//! on every periodic [`tick`](HealthMonitor::tick), escalates through
//! staleness, a refresh request and finally a forced reconnect.
//!
//! The monitor is a plain state machine driven by explicit instants; the
//! session actor owns the timers and performs the returned actions.

mod monitor;

pub use monitor::{HealthAction, HealthMonitor, HealthState, HealthThresholds};
