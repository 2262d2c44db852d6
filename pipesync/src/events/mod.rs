//! Structured synchronization events.
//!
//! Session actors report notable transitions through an [`EventSink`]. The
//! sink is passed explicitly to the session manager; there is no
//! process-wide registry.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, RecordedEvent};

/// Event type names emitted by the session machinery.
pub mod names {
    /// A scope was opened.
    pub const SESSION_OPENED: &str = "sync.session_opened";
    /// A scope was closed.
    pub const SESSION_CLOSED: &str = "sync.session_closed";
    /// No heartbeat within the staleness threshold.
    pub const STALE: &str = "sync.stale";
    /// A heartbeat arrived after the scope was judged stale.
    pub const RECOVERED: &str = "sync.recovered";
    /// A status refresh was sent.
    pub const REFRESH_REQUESTED: &str = "sync.refresh_requested";
    /// A forced reconnect was scheduled.
    pub const RECONNECT_SCHEDULED: &str = "sync.reconnect_scheduled";
    /// A forced reconnect succeeded and rooms were re-joined.
    pub const RECONNECTED: &str = "sync.reconnected";
    /// A forced reconnect attempt failed.
    pub const RECONNECT_FAILED: &str = "sync.reconnect_failed";
    /// `pipelineComplete` arrived while the graph still had pending units.
    pub const COMPLETE_DISCREPANCY: &str = "sync.complete_discrepancy";
    /// An inbound frame could not be decoded.
    pub const FRAME_DROPPED: &str = "sync.frame_dropped";
}
