//! Requests sent to the backend.

use serde::{Deserialize, Serialize};

use crate::core::Scope;

/// Payload of `initialize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// The user announcing itself.
    pub user_id: String,
}

/// Payload of `joinRoom` and `leaveRoom`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRequest {
    /// The user.
    pub user_id: String,
    /// The script, for pipeline-run rooms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_id: Option<String>,
    /// The script version, for pipeline-run rooms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
}

/// Payload of `requestStatusRefresh`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    /// The user.
    pub user_id: String,
    /// The script.
    pub script_id: String,
    /// The script version.
    pub version_id: String,
}

/// All requests the client may send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum OutboundRequest {
    /// Announces the client identity.
    Initialize(Identity),
    /// Subscribes to a scope's room.
    JoinRoom(RoomRequest),
    /// Unsubscribes from a scope's room.
    LeaveRoom(RoomRequest),
    /// Asks the backend to re-emit a snapshot.
    RequestStatusRefresh(RefreshRequest),
}

impl OutboundRequest {
    /// Builds `initialize` for the scope's user.
    #[must_use]
    pub fn initialize(scope: &Scope) -> Self {
        Self::Initialize(Identity {
            user_id: scope.user_id.clone(),
        })
    }

    /// Builds `joinRoom` for the scope.
    #[must_use]
    pub fn join_room(scope: &Scope) -> Self {
        Self::JoinRoom(room(scope))
    }

    /// Builds `leaveRoom` for the scope.
    #[must_use]
    pub fn leave_room(scope: &Scope) -> Self {
        Self::LeaveRoom(room(scope))
    }

    /// Builds `requestStatusRefresh`, or `None` when the scope does not name
    /// a pipeline run.
    #[must_use]
    pub fn refresh(scope: &Scope) -> Option<Self> {
        let (script_id, version_id) = scope.run_keys()?;
        Some(Self::RequestStatusRefresh(RefreshRequest {
            user_id: scope.user_id.clone(),
            script_id: script_id.to_string(),
            version_id: version_id.to_string(),
        }))
    }

    /// Returns the wire name of the request.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Initialize(_) => "initialize",
            Self::JoinRoom(_) => "joinRoom",
            Self::LeaveRoom(_) => "leaveRoom",
            Self::RequestStatusRefresh(_) => "requestStatusRefresh",
        }
    }

    /// Encodes the request as a JSON text frame.
    ///
    /// # Errors
    ///
    /// Serialization of these payloads does not fail in practice; the error
    /// is propagated rather than unwrapped.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

fn room(scope: &Scope) -> RoomRequest {
    RoomRequest {
        user_id: scope.user_id.clone(),
        script_id: scope.script_id.clone(),
        version_id: scope.version_id.clone(),
    }
}
