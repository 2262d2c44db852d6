//! Events received from the backend.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

use crate::core::{EventScope, UnitId, UnitStatus};
use crate::progress::UnitProgress;
use crate::utils::timestamps::{deserialize_optional_timestamp, deserialize_timestamp};
use crate::utils::Timestamp;

/// Progress of one stage as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageReport {
    /// The stage label (e.g. "Script Analyst").
    pub name: String,
    /// The stage status, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<UnitStatus>,
    /// The stage percentage, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
}

/// A full replace-all capture of a scope's state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSnapshot {
    /// Scope keys of the pipeline run.
    #[serde(flatten)]
    pub scope: EventScope,
    /// Overall percentage.
    #[serde(default)]
    pub overall_progress: Option<f64>,
    /// Per-stage reports.
    #[serde(default)]
    pub stages: Vec<StageReport>,
    /// Per-unit progress.
    #[serde(
        default,
        deserialize_with = "deserialize_units",
        skip_serializing_if = "Option::is_none"
    )]
    pub units: Option<HashMap<UnitId, UnitProgress>>,
    /// When the backend captured the snapshot.
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: Timestamp,
}

/// A partial snapshot; every field is optional.
///
/// Also used as the payload of `pipelineComplete`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineHeartbeat {
    /// Scope keys of the pipeline run.
    #[serde(flatten)]
    pub scope: EventScope,
    /// Overall percentage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_progress: Option<f64>,
    /// Per-stage reports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stages: Option<Vec<StageReport>>,
    /// Per-unit progress.
    #[serde(
        default,
        deserialize_with = "deserialize_units",
        skip_serializing_if = "Option::is_none"
    )]
    pub units: Option<HashMap<UnitId, UnitProgress>>,
    /// When the backend emitted the heartbeat.
    #[serde(
        default,
        deserialize_with = "deserialize_optional_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<Timestamp>,
}

/// Overall and per-stage percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    /// Scope keys of the pipeline run.
    #[serde(flatten)]
    pub scope: EventScope,
    /// Overall percentage.
    pub overall_progress: f64,
    /// Per-stage reports.
    #[serde(default)]
    pub stages: Vec<StageReport>,
    /// When the backend computed the percentages.
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: Timestamp,
}

/// A status change of one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    /// Scope keys of the pipeline run.
    #[serde(flatten)]
    pub scope: EventScope,
    /// The unit whose status changed.
    #[serde(alias = "functionName")]
    pub unit_id: UnitId,
    /// The new status.
    #[serde(default)]
    pub status: UnitStatus,
    /// Unit-level percentage, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    /// Free-form message, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// When the status changed.
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: Timestamp,
}

/// A status change of one scene (or one shot within a scene) of a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneUpdate {
    /// Scope keys of the pipeline run.
    #[serde(flatten)]
    pub scope: EventScope,
    /// The unit the scene belongs to.
    pub unit_id: UnitId,
    /// The scene.
    pub scene_id: String,
    /// The shot within the scene, if the update is shot-level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shot_id: Option<String>,
    /// The new status.
    #[serde(default)]
    pub status: UnitStatus,
    /// Percentage, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    /// When the status changed.
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: Timestamp,
}

/// Server-side view of the connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionReport {
    /// Whether the server considers the client connected.
    pub connected: bool,
    /// When the status was reported.
    #[serde(
        default,
        deserialize_with = "deserialize_optional_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<Timestamp>,
}

/// The backend has nothing to report for the scope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoDataAvailable {
    /// Scope keys the request was for.
    #[serde(flatten)]
    pub scope: EventScope,
    /// Explanation, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A backend-side error notice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorNotice {
    /// Scope keys, when the error is scope-specific.
    #[serde(flatten)]
    pub scope: EventScope,
    /// Error message.
    #[serde(default)]
    pub message: String,
    /// Machine-readable code, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// All events the backend may send.
///
/// Serializes to the `{"event": ..., "data": ...}` frame shape; decoding goes
/// through [`parse_frame`](super::parse_frame) for precise error reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum InboundEvent {
    /// Full state replacement.
    PipelineSnapshot(PipelineSnapshot),
    /// Liveness plus partial state.
    PipelineHeartbeat(PipelineHeartbeat),
    /// Overall and per-stage percentages.
    ProgressUpdate(ProgressUpdate),
    /// Unit status change.
    StatusUpdate(StatusUpdate),
    /// Scene or shot status change.
    SceneUpdate(SceneUpdate),
    /// The pipeline run finished.
    PipelineComplete(PipelineHeartbeat),
    /// A user-level function status change.
    FunctionUpdate(StatusUpdate),
    /// Server-side connection status.
    ConnectionStatus(ConnectionReport),
    /// Nothing to report.
    NoDataAvailable(NoDataAvailable),
    /// Backend error notice.
    Error(ErrorNotice),
}

impl InboundEvent {
    /// Returns the wire name of the event.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::PipelineSnapshot(_) => "pipelineSnapshot",
            Self::PipelineHeartbeat(_) => "pipelineHeartbeat",
            Self::ProgressUpdate(_) => "progressUpdate",
            Self::StatusUpdate(_) => "statusUpdate",
            Self::SceneUpdate(_) => "sceneUpdate",
            Self::PipelineComplete(_) => "pipelineComplete",
            Self::FunctionUpdate(_) => "functionUpdate",
            Self::ConnectionStatus(_) => "connectionStatus",
            Self::NoDataAvailable(_) => "noDataAvailable",
            Self::Error(_) => "error",
        }
    }

    /// Returns the scope keys the event carries.
    #[must_use]
    pub fn scope(&self) -> EventScope {
        match self {
            Self::PipelineSnapshot(e) => e.scope.clone(),
            Self::PipelineHeartbeat(e) | Self::PipelineComplete(e) => e.scope.clone(),
            Self::ProgressUpdate(e) => e.scope.clone(),
            Self::StatusUpdate(e) | Self::FunctionUpdate(e) => e.scope.clone(),
            Self::SceneUpdate(e) => e.scope.clone(),
            Self::NoDataAvailable(e) => e.scope.clone(),
            Self::Error(e) => e.scope.clone(),
            Self::ConnectionStatus(_) => EventScope::default(),
        }
    }

    /// Returns the event timestamp, if it carries one.
    #[must_use]
    pub fn timestamp(&self) -> Option<Timestamp> {
        match self {
            Self::PipelineSnapshot(e) => Some(e.timestamp),
            Self::PipelineHeartbeat(e) | Self::PipelineComplete(e) => e.timestamp,
            Self::ProgressUpdate(e) => Some(e.timestamp),
            Self::StatusUpdate(e) | Self::FunctionUpdate(e) => Some(e.timestamp),
            Self::SceneUpdate(e) => Some(e.timestamp),
            Self::ConnectionStatus(e) => e.timestamp,
            Self::NoDataAvailable(_) | Self::Error(_) => None,
        }
    }

    /// Encodes the event as a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns a serialization error for non-finite percentages.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// A unit entry as sent on the wire: either a bare status or a full object.
#[derive(Deserialize)]
#[serde(untagged)]
enum UnitReport {
    Detailed(UnitProgress),
    Status(UnitStatus),
}

impl From<UnitReport> for UnitProgress {
    fn from(report: UnitReport) -> Self {
        match report {
            UnitReport::Detailed(progress) => progress,
            UnitReport::Status(status) => UnitProgress::new(status),
        }
    }
}

fn deserialize_units<'de, D>(d: D) -> Result<Option<HashMap<UnitId, UnitProgress>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<HashMap<UnitId, UnitReport>> = Option::deserialize(d)?;
    Ok(raw.map(|units| units.into_iter().map(|(id, r)| (id, r.into())).collect()))
}
