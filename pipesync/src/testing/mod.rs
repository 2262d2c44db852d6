//! Testing utilities for pipesync sessions.
//!
//! This module provides:
//! - An in-memory transport that records requests and injects events
//! - Event fixtures with small-integer timestamps
//! - Assertions over sessions and sent requests

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{assert_health, assert_sent, assert_stage_progress};
pub use fixtures::{
    complete, function_update, heartbeat, heartbeat_with_units, progress_update, run_scope,
    scene_update, snapshot, status_update, ts, user_scope,
};
pub use mocks::MemoryTransport;
