//! Error types for the pipesync engine.
//!
//! Only [`GraphError`] is fatal: it prevents a dependency graph from being
//! constructed at startup. Every other error in this module describes a
//! condition the session machinery absorbs locally (a dropped frame, a failed
//! connect attempt) and is surfaced to consumers, at most, as a connectivity
//! signal.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::utils::timestamps::TimestampError;

/// The umbrella error type for pipesync operations.
#[derive(Debug, Error)]
pub enum PipesyncError {
    /// The dependency graph failed validation.
    #[error("{0}")]
    Graph(#[from] GraphError),

    /// A transport operation failed.
    #[error("{0}")]
    Transport(#[from] TransportError),

    /// An inbound frame could not be decoded.
    #[error("{0}")]
    Frame(#[from] FrameError),

    /// Configuration could not be loaded.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// A timestamp could not be parsed.
    #[error("{0}")]
    Timestamp(#[from] TimestampError),
}

/// Diagnostic metadata attached to graph validation failures.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ErrorInfo {
    /// Error code (e.g., "GRAPH-001-CYCLE").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the declaration.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ErrorInfo {
    /// Creates a new error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Errors raised while constructing a dependency graph.
///
/// All variants are fatal: a graph that fails validation is never loaded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The prerequisite edges contain a cycle.
    #[error("Cycle detected in dependency graph: {}", path.join(" -> "))]
    Cycle {
        /// The units forming the cycle, first unit repeated at the end.
        path: Vec<String>,
    },

    /// A unit references an undeclared unit or stage.
    #[error("Unit '{unit}' references undeclared {kind} '{reference}'")]
    DanglingReference {
        /// The referencing unit.
        unit: String,
        /// What kind of thing was referenced ("unit" or "stage").
        kind: &'static str,
        /// The missing identifier.
        reference: String,
    },

    /// The same unit identifier was declared twice.
    #[error("Unit '{0}' is declared more than once")]
    DuplicateUnit(String),

    /// The same stage index was declared twice.
    #[error("Stage index {0} is declared more than once")]
    DuplicateStage(u32),

    /// Stage indices are not exactly `1..=N`.
    #[error("Stage indices must be contiguous from 1, found {found:?}")]
    NonContiguousStages {
        /// The declared indices, sorted.
        found: Vec<u32>,
    },

    /// A prerequisite belongs to a later stage than its dependent.
    #[error(
        "Unit '{unit}' (stage {unit_stage}) depends on '{prerequisite}' from later stage {prerequisite_stage}"
    )]
    StageOrderViolation {
        /// The dependent unit.
        unit: String,
        /// Stage index of the dependent unit.
        unit_stage: u32,
        /// The prerequisite unit.
        prerequisite: String,
        /// Stage index of the prerequisite unit.
        prerequisite_stage: u32,
    },

    /// No stages were declared.
    #[error("Dependency graph declares no stages")]
    Empty,
}

impl GraphError {
    /// Returns diagnostic metadata for this error.
    #[must_use]
    pub fn info(&self) -> ErrorInfo {
        match self {
            Self::Cycle { path } => ErrorInfo::new(
                "GRAPH-001-CYCLE",
                format!("Prerequisites form a cycle: {}", path.join(" -> ")),
            )
            .with_fix_hint("Remove one of the prerequisite edges in the cycle."),
            Self::DanglingReference {
                unit,
                kind,
                reference,
            } => ErrorInfo::new(
                "GRAPH-002-DANGLING",
                format!("Undeclared {kind} '{reference}'"),
            )
            .with_fix_hint("Declare the referenced item or fix the identifier.")
            .with_context_entry("unit", unit.clone()),
            Self::DuplicateUnit(unit) => {
                ErrorInfo::new("GRAPH-003-DUPLICATE", format!("Unit '{unit}' declared twice"))
            }
            Self::DuplicateStage(index) => ErrorInfo::new(
                "GRAPH-003-DUPLICATE",
                format!("Stage {index} declared twice"),
            ),
            Self::NonContiguousStages { .. } => {
                ErrorInfo::new("GRAPH-004-STAGES", "Stage indices are not 1..=N")
                    .with_fix_hint("Number stages 1, 2, 3, ... without gaps.")
            }
            Self::StageOrderViolation {
                unit, prerequisite, ..
            } => ErrorInfo::new(
                "GRAPH-005-ORDER",
                format!("'{unit}' depends on '{prerequisite}' from a later stage"),
            )
            .with_fix_hint("Move the prerequisite to an earlier stage or drop the edge."),
            Self::Empty => ErrorInfo::new("GRAPH-006-EMPTY", "No stages declared")
                .with_fix_hint("Declare at least one stage."),
        }
    }
}

/// Errors raised by a [`Transport`](crate::transport::Transport).
///
/// These never escape a session: the session actor turns them into a
/// `ConnectionStatus { connected: false }` signal and a reconnect attempt.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Failed to establish the connection.
    #[error("Connection error: {0}")]
    Connect(String),

    /// A request could not be written to the connection.
    #[error("Send error: {0}")]
    Send(String),

    /// The connection is not open.
    #[error("Transport is not connected")]
    NotConnected,
}

/// Errors raised while decoding an inbound frame.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The frame is not valid JSON or lacks the `event` field.
    #[error("Malformed frame: {0}")]
    Json(#[from] serde_json::Error),

    /// The frame names an event this client does not understand.
    #[error("Unknown event type: {0}")]
    UnknownEvent(String),

    /// The payload of a known event is missing required fields.
    #[error("Malformed '{event}' payload: {source}")]
    Payload {
        /// The event name.
        event: String,
        /// The underlying decode error.
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config '{path}': {source}")]
    Io {
        /// The path that was read.
        path: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration could not be parsed.
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_error_message() {
        let err = GraphError::Cycle {
            path: vec!["a".into(), "b".into(), "c".into(), "a".into()],
        };

        assert!(err.to_string().contains("a -> b -> c -> a"));
        assert_eq!(err.info().code, "GRAPH-001-CYCLE");
    }

    #[test]
    fn test_dangling_reference_info() {
        let err = GraphError::DanglingReference {
            unit: "shot_list".into(),
            kind: "unit",
            reference: "missing".into(),
        };

        let info = err.info();
        assert_eq!(info.code, "GRAPH-002-DANGLING");
        assert_eq!(info.context.get("unit"), Some(&"shot_list".to_string()));
        assert!(err.to_string().contains("undeclared unit 'missing'"));
    }

    #[test]
    fn test_umbrella_conversion() {
        let err: PipesyncError = GraphError::Empty.into();
        assert!(matches!(err, PipesyncError::Graph(GraphError::Empty)));

        let err: PipesyncError = TransportError::NotConnected.into();
        assert_eq!(err.to_string(), "Transport is not connected");
    }
}
