//! Channel sessions.
//!
//! A [`SessionManager`] owns one shared [`Transport`](crate::transport::Transport)
//! and opens one [`Session`] per watched [`Scope`](crate::core::Scope). Each
//! session runs an actor task that serializes everything touching its
//! reconciled state:
//!
//! ```text
//! transport ──broadcast──▶ actor ──▶ Reconciler ──watch──▶ Session
//!                            ▲  │
//!            TimerGroup ─────┘  └──▶ HealthMonitor ──actions──▶ transport
//! ```
//!
//! Room membership is reference counted across sessions of the same scope.
//! Closing a session cancels its actor and every timer before returning.

mod actor;
mod handle;
mod manager;
mod rooms;
mod shared;
mod timers;

pub use handle::Session;
pub use manager::SessionManager;
pub use rooms::RoomRegistry;
pub use timers::TimerGroup;

use serde::Serialize;

use crate::utils::{now_utc, Timestamp};

/// Whether a session currently considers itself connected.
///
/// Combines the transport state, server-side `connectionStatus` reports and
/// locally inferred staleness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    /// Connected or not.
    pub connected: bool,
    /// When this status was determined.
    pub timestamp: Timestamp,
}

impl ConnectionStatus {
    /// Creates a status stamped with the current time.
    #[must_use]
    pub fn now(connected: bool) -> Self {
        Self {
            connected,
            timestamp: now_utc(),
        }
    }
}
