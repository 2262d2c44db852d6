//! Event and scope fixtures.
//!
//! Timestamps are expressed as seconds after a fixed base instant so tests
//! can reason about ordering with small integers.

use chrono::DateTime;
use std::collections::HashMap;

use crate::core::{EventScope, Scope, UnitId, UnitStatus};
use crate::progress::UnitProgress;
use crate::protocol::{
    InboundEvent, PipelineHeartbeat, PipelineSnapshot, ProgressUpdate, SceneUpdate, StatusUpdate,
};
use crate::utils::Timestamp;

/// 2024-01-01T00:00:00Z
const BASE_SECONDS: i64 = 1_704_067_200;

/// Returns the base instant plus `seconds`.
#[must_use]
pub fn ts(seconds: i64) -> Timestamp {
    DateTime::from_timestamp(BASE_SECONDS + seconds, 0).unwrap_or_default()
}

/// The pipeline-run scope used by fixtures.
#[must_use]
pub fn run_scope() -> Scope {
    Scope::pipeline_run("user-1", "script-1", "version-1")
}

/// A user-wide scope for the fixture user.
#[must_use]
pub fn user_scope() -> Scope {
    Scope::user("user-1")
}

fn keys() -> EventScope {
    EventScope::from(&run_scope())
}

/// A `statusUpdate` for the fixture run.
#[must_use]
pub fn status_update(unit: &str, status: UnitStatus, at: i64) -> InboundEvent {
    InboundEvent::StatusUpdate(StatusUpdate {
        scope: keys(),
        unit_id: UnitId::from(unit),
        status,
        progress: None,
        message: None,
        timestamp: ts(at),
    })
}

/// A `functionUpdate` carrying no scope keys.
#[must_use]
pub fn function_update(unit: &str, status: UnitStatus, at: i64) -> InboundEvent {
    InboundEvent::FunctionUpdate(StatusUpdate {
        scope: EventScope {
            user_id: Some("user-1".to_string()),
            ..EventScope::default()
        },
        unit_id: UnitId::from(unit),
        status,
        progress: None,
        message: None,
        timestamp: ts(at),
    })
}

/// A `sceneUpdate` for the fixture run.
#[must_use]
pub fn scene_update(
    unit: &str,
    scene: &str,
    shot: Option<&str>,
    status: UnitStatus,
    at: i64,
) -> InboundEvent {
    InboundEvent::SceneUpdate(SceneUpdate {
        scope: keys(),
        unit_id: UnitId::from(unit),
        scene_id: scene.to_string(),
        shot_id: shot.map(String::from),
        status,
        progress: None,
        timestamp: ts(at),
    })
}

fn unit_map(units: &[(&str, UnitStatus)]) -> HashMap<UnitId, UnitProgress> {
    units
        .iter()
        .map(|(id, status)| (UnitId::from(*id), UnitProgress::new(*status)))
        .collect()
}

/// A `pipelineSnapshot` listing the given unit statuses.
#[must_use]
pub fn snapshot(units: &[(&str, UnitStatus)], at: i64) -> InboundEvent {
    InboundEvent::PipelineSnapshot(PipelineSnapshot {
        scope: keys(),
        overall_progress: None,
        stages: Vec::new(),
        units: Some(unit_map(units)),
        timestamp: ts(at),
    })
}

/// A `pipelineHeartbeat` with only a timestamp.
#[must_use]
pub fn heartbeat(at: i64) -> InboundEvent {
    InboundEvent::PipelineHeartbeat(PipelineHeartbeat {
        scope: keys(),
        timestamp: Some(ts(at)),
        ..PipelineHeartbeat::default()
    })
}

/// A `pipelineHeartbeat` carrying unit statuses.
#[must_use]
pub fn heartbeat_with_units(units: &[(&str, UnitStatus)], at: i64) -> InboundEvent {
    InboundEvent::PipelineHeartbeat(PipelineHeartbeat {
        scope: keys(),
        units: Some(unit_map(units)),
        timestamp: Some(ts(at)),
        ..PipelineHeartbeat::default()
    })
}

/// A `progressUpdate` with no stage reports.
#[must_use]
pub fn progress_update(overall: f64, at: i64) -> InboundEvent {
    InboundEvent::ProgressUpdate(ProgressUpdate {
        scope: keys(),
        overall_progress: overall,
        stages: Vec::new(),
        timestamp: ts(at),
    })
}

/// A `pipelineComplete` with only a timestamp.
#[must_use]
pub fn complete(at: i64) -> InboundEvent {
    InboundEvent::PipelineComplete(PipelineHeartbeat {
        scope: keys(),
        overall_progress: Some(100.0),
        timestamp: Some(ts(at)),
        ..PipelineHeartbeat::default()
    })
}
