//! Unit status and processing kind enums.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a unit's work is laid out on the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingKind {
    /// One piece of work reported by a single status.
    #[default]
    Single,
    /// Fans out into generated sub-units (per scene, optionally per shot),
    /// each tracked independently.
    Batch,
}

impl fmt::Display for ProcessingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => write!(f, "single"),
            Self::Batch => write!(f, "batch"),
        }
    }
}

/// The reported status of a unit or sub-unit.
///
/// `Queued` doubles as the "no signal yet" state: unrecognized wire values
/// decode to it, and it does not count as a known status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    /// Waiting to run, or nothing reported yet.
    #[default]
    Queued,
    /// Currently running.
    Processing,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for UnitStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let status = match s.trim().to_ascii_lowercase().as_str() {
            "processing" | "running" | "in_progress" | "in-progress" | "started" | "active" => {
                Self::Processing
            }
            "completed" | "complete" | "done" | "success" | "succeeded" | "finished" => {
                Self::Completed
            }
            "failed" | "failure" | "error" | "errored" => Self::Failed,
            _ => Self::Queued,
        };
        Ok(status)
    }
}

impl<'de> Deserialize<'de> for UnitStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default())
    }
}

impl UnitStatus {
    /// Returns true if the status carries a real signal.
    #[must_use]
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Queued)
    }

    /// Returns true if the unit finished, successfully or not.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true if the unit finished successfully.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        assert_eq!(UnitStatus::Queued.to_string(), "queued");
        assert_eq!(UnitStatus::Processing.to_string(), "processing");
        assert_eq!(UnitStatus::Completed.to_string(), "completed");
        assert_eq!(UnitStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn test_status_aliases() {
        assert_eq!("Processing".parse::<UnitStatus>().unwrap(), UnitStatus::Processing);
        assert_eq!("in_progress".parse::<UnitStatus>().unwrap(), UnitStatus::Processing);
        assert_eq!("COMPLETE".parse::<UnitStatus>().unwrap(), UnitStatus::Completed);
        assert_eq!("error".parse::<UnitStatus>().unwrap(), UnitStatus::Failed);
        assert_eq!("pending".parse::<UnitStatus>().unwrap(), UnitStatus::Queued);
        assert_eq!("whatever".parse::<UnitStatus>().unwrap(), UnitStatus::Queued);
    }

    #[test]
    fn test_status_known() {
        assert!(!UnitStatus::Queued.is_known());
        assert!(UnitStatus::Processing.is_known());
        assert!(UnitStatus::Failed.is_terminal());
        assert!(!UnitStatus::Processing.is_terminal());
    }

    #[test]
    fn test_status_deserialize_null_and_unknown() {
        let status: UnitStatus = serde_json::from_str("null").unwrap();
        assert_eq!(status, UnitStatus::Queued);

        let status: UnitStatus = serde_json::from_str(r#""Done""#).unwrap();
        assert_eq!(status, UnitStatus::Completed);
    }

    #[test]
    fn test_status_serialize() {
        let json = serde_json::to_string(&UnitStatus::Completed).unwrap();
        assert_eq!(json, r#""completed""#);
    }

    #[test]
    fn test_kind_serialize() {
        let kind: ProcessingKind = serde_json::from_str(r#""batch""#).unwrap();
        assert_eq!(kind, ProcessingKind::Batch);
        assert_eq!(ProcessingKind::default().to_string(), "single");
    }
}
