//! Wire protocol between the client and the progress backend.
//!
//! Every frame is a JSON text message of the shape
//! `{"event": "<name>", "data": {...}}` with camelCase field names. Inbound
//! frames are decoded into [`InboundEvent`] by [`parse_frame`]; outbound
//! requests are built with the [`OutboundRequest`] constructors.

mod inbound;
mod outbound;

pub use inbound::{
    ConnectionReport, ErrorNotice, InboundEvent, NoDataAvailable, PipelineHeartbeat,
    PipelineSnapshot, ProgressUpdate, SceneUpdate, StageReport, StatusUpdate,
};
pub use outbound::{Identity, OutboundRequest, RefreshRequest, RoomRequest};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::errors::FrameError;

#[derive(Deserialize)]
struct RawFrame {
    event: String,
    #[serde(default)]
    data: Value,
}

fn decode<T: DeserializeOwned>(event: &str, data: Value) -> Result<T, FrameError> {
    serde_json::from_value(data).map_err(|source| FrameError::Payload {
        event: event.to_string(),
        source,
    })
}

/// Parses one inbound text frame.
///
/// A missing or `null` `data` field is treated as an empty object, so
/// payload-less events such as `noDataAvailable` decode.
///
/// # Errors
///
/// Returns [`FrameError::Json`] for invalid JSON or a missing `event` field,
/// [`FrameError::UnknownEvent`] for unrecognized event names and
/// [`FrameError::Payload`] when a known event lacks required fields.
///
/// # Examples
///
/// ```
/// use pipesync::protocol::{parse_frame, InboundEvent};
///
/// let event = parse_frame(
///     r#"{"event":"statusUpdate","data":{"unitId":"scene_breakdown","status":"completed","timestamp":"2024-01-01T00:00:00Z"}}"#,
/// )
/// .unwrap();
/// assert!(matches!(event, InboundEvent::StatusUpdate(_)));
/// ```
pub fn parse_frame(text: &str) -> Result<InboundEvent, FrameError> {
    let RawFrame { event, data } = serde_json::from_str(text)?;
    let data = if data.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        data
    };

    let parsed = match event.as_str() {
        "pipelineSnapshot" => InboundEvent::PipelineSnapshot(decode(&event, data)?),
        "pipelineHeartbeat" => InboundEvent::PipelineHeartbeat(decode(&event, data)?),
        "progressUpdate" => InboundEvent::ProgressUpdate(decode(&event, data)?),
        "statusUpdate" => InboundEvent::StatusUpdate(decode(&event, data)?),
        "sceneUpdate" => InboundEvent::SceneUpdate(decode(&event, data)?),
        "pipelineComplete" => InboundEvent::PipelineComplete(decode(&event, data)?),
        "functionUpdate" => InboundEvent::FunctionUpdate(decode(&event, data)?),
        "connectionStatus" => InboundEvent::ConnectionStatus(decode(&event, data)?),
        "noDataAvailable" => InboundEvent::NoDataAvailable(decode(&event, data)?),
        "error" => InboundEvent::Error(decode(&event, data)?),
        _ => return Err(FrameError::UnknownEvent(event)),
    };
    Ok(parsed)
}
