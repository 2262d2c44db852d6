//! Stage and overall progress aggregation.
//!
//! Everything here is a pure function of a [`DependencyGraph`] and a map of
//! unit progress, so it can be exercised directly with synthetic inputs.
//!
//! [`DependencyGraph`]: crate::graph::DependencyGraph

mod aggregate;

pub use aggregate::{overall_progress, stage_breakdown, stage_progress, StageProgressView};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::{UnitId, UnitStatus};

/// Progress inputs keyed by unit.
pub type UnitStatuses = HashMap<UnitId, UnitProgress>;

/// The reported progress of one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitProgress {
    /// The unit's own status.
    #[serde(default)]
    pub status: UnitStatus,
    /// Generated sub-units (e.g. per scene), when the unit fans out.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_units: Vec<SubUnitProgress>,
}

impl UnitProgress {
    /// Creates progress for a unit without sub-units.
    #[must_use]
    pub fn new(status: UnitStatus) -> Self {
        Self {
            status,
            sub_units: Vec::new(),
        }
    }

    /// Adds sub-units.
    #[must_use]
    pub fn with_sub_units(mut self, sub_units: Vec<SubUnitProgress>) -> Self {
        self.sub_units = sub_units;
        self
    }

    /// Returns true if the unit or any of its sub-units carries a real signal.
    #[must_use]
    pub fn is_known(&self) -> bool {
        self.status.is_known() || self.sub_units.iter().any(SubUnitProgress::is_known)
    }

    /// Returns true if the unit is done.
    ///
    /// A unit with sub-units is done once every leaf sub-unit completed, even
    /// if its own status was never updated.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        if self.status.is_completed() {
            return true;
        }
        !self.sub_units.is_empty() && self.sub_units.iter().all(SubUnitProgress::is_completed)
    }
}

/// The reported progress of one sub-unit, optionally with nested children
/// (e.g. per-shot children of a per-scene sub-unit).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubUnitProgress {
    /// Sub-unit identifier (scene or shot id).
    pub id: String,
    /// The sub-unit's own status.
    #[serde(default)]
    pub status: UnitStatus,
    /// Nested children.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SubUnitProgress>,
}

impl SubUnitProgress {
    /// Creates a leaf sub-unit.
    #[must_use]
    pub fn new(id: impl Into<String>, status: UnitStatus) -> Self {
        Self {
            id: id.into(),
            status,
            children: Vec::new(),
        }
    }

    /// Adds nested children.
    #[must_use]
    pub fn with_children(mut self, children: Vec<SubUnitProgress>) -> Self {
        self.children = children;
        self
    }

    fn is_known(&self) -> bool {
        self.status.is_known() || self.children.iter().any(Self::is_known)
    }

    fn is_completed(&self) -> bool {
        if self.children.is_empty() {
            self.status.is_completed()
        } else {
            self.children.iter().all(Self::is_completed)
        }
    }

    /// Visits every leaf (a sub-unit without children).
    pub(crate) fn for_each_leaf(&self, f: &mut impl FnMut(&SubUnitProgress)) {
        if self.children.is_empty() {
            f(self);
        } else {
            for child in &self.children {
                child.for_each_leaf(f);
            }
        }
    }
}
