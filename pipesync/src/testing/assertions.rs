//! Test assertions for sessions and transports.

use super::MemoryTransport;
use crate::health::HealthState;
use crate::session::Session;

/// Asserts the exact sequence of request names sent over the transport.
pub fn assert_sent(transport: &MemoryTransport, expected: &[&str]) {
    let sent = transport.sent_names();
    assert_eq!(
        sent, expected,
        "Expected requests {expected:?}, got {sent:?}"
    );
}

/// Asserts that a stage of the session reports the given percentage.
pub fn assert_stage_progress(session: &Session, label: &str, expected: u8) {
    let actual = session.stage_progress(label);
    assert_eq!(
        actual,
        Some(expected),
        "Expected stage '{label}' at {expected}%, got {actual:?}"
    );
}

/// Asserts the session's health state.
pub fn assert_health(session: &Session, expected: HealthState) {
    let actual = session.health();
    assert_eq!(
        actual, expected,
        "Expected health {expected}, got {actual}"
    );
}
