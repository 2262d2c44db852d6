//! Unit and stage declarations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

use crate::core::{ProcessingKind, UnitId};
use crate::errors::ConfigError;

/// Declaration of one analysis unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitDecl {
    /// The unique unit identifier.
    pub id: UnitId,
    /// Index of the stage the unit belongs to.
    pub stage: u32,
    /// How the unit's work is laid out on the backend.
    #[serde(default)]
    pub kind: ProcessingKind,
    /// Units that must complete before this one is meaningful.
    #[serde(default)]
    pub prerequisites: BTreeSet<UnitId>,
}

impl UnitDecl {
    /// Creates a single-kind unit declaration with no prerequisites.
    #[must_use]
    pub fn new(id: impl Into<UnitId>, stage: u32) -> Self {
        Self {
            id: id.into(),
            stage,
            kind: ProcessingKind::Single,
            prerequisites: BTreeSet::new(),
        }
    }

    /// Sets the processing kind.
    #[must_use]
    pub fn with_kind(mut self, kind: ProcessingKind) -> Self {
        self.kind = kind;
        self
    }

    /// Adds prerequisites.
    #[must_use]
    pub fn with_prerequisites<I, U>(mut self, prerequisites: I) -> Self
    where
        I: IntoIterator<Item = U>,
        U: Into<UnitId>,
    {
        self.prerequisites
            .extend(prerequisites.into_iter().map(Into::into));
        self
    }
}

/// Declaration of one reporting stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDecl {
    /// The 1-based stage index.
    pub index: u32,
    /// Human-readable label (e.g. "Script Analyst").
    pub label: String,
}

/// A validated stage with its member units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stage {
    /// The 1-based stage index.
    pub index: u32,
    /// Human-readable label.
    pub label: String,
    /// Member units in declaration order.
    pub units: Vec<UnitId>,
}

/// Graph declarations as configuration data.
///
/// ```json
/// {
///   "stages": [{"index": 1, "label": "Script Analyst"}],
///   "units": [{"id": "scene_breakdown", "stage": 1, "prerequisites": []}]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Declared stages.
    #[serde(default)]
    pub stages: Vec<StageDecl>,
    /// Declared units.
    #[serde(default)]
    pub units: Vec<UnitDecl>,
}

impl GraphConfig {
    /// Parses graph declarations from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` on malformed JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads graph declarations from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_decl_builder() {
        let unit = UnitDecl::new("shot_list", 3)
            .with_kind(ProcessingKind::Batch)
            .with_prerequisites(["scene_breakdown", "visual_style", "scene_breakdown"]);

        assert_eq!(unit.kind, ProcessingKind::Batch);
        assert_eq!(unit.prerequisites.len(), 2);
    }

    #[test]
    fn test_config_from_json_defaults() {
        let config = GraphConfig::from_json(
            r#"{
                "stages": [{"index": 1, "label": "Script Analyst"}],
                "units": [{"id": "scene_breakdown", "stage": 1}]
            }"#,
        )
        .unwrap();

        assert_eq!(config.stages[0].label, "Script Analyst");
        assert_eq!(config.units[0].kind, ProcessingKind::Single);
        assert!(config.units[0].prerequisites.is_empty());
    }

    #[test]
    fn test_config_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        std::fs::write(
            &path,
            r#"{"stages": [{"index": 1, "label": "A"}], "units": []}"#,
        )
        .unwrap();

        let config = GraphConfig::load(&path).unwrap();
        assert_eq!(config.stages.len(), 1);

        let missing = GraphConfig::load(dir.path().join("missing.json"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
