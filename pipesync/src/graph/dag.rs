//! Immutable dependency graph of analysis units.
//!
//! A [`DependencyGraph`] is only obtainable through
//! [`GraphBuilder::build`](super::GraphBuilder::build), so every instance is
//! acyclic, has no dangling references and numbers its stages `1..=N`.

use std::collections::{BTreeSet, HashMap, HashSet};

use super::{GraphBuilder, GraphConfig, Stage, UnitDecl};
use crate::core::{ProcessingKind, UnitId};
use crate::errors::GraphError;

/// A validated, read-only graph of units, stages and prerequisite edges.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// Stages sorted by index.
    stages: Vec<Stage>,
    /// Unit declarations by id.
    units: HashMap<UnitId, UnitDecl>,
    /// Units in topological order (prerequisites first).
    unit_order: Vec<UnitId>,
}

impl DependencyGraph {
    pub(super) fn new(
        stages: Vec<Stage>,
        units: HashMap<UnitId, UnitDecl>,
        declaration_order: &[UnitId],
    ) -> Self {
        let unit_order = topological_sort(&units, declaration_order);
        Self {
            stages,
            units,
            unit_order,
        }
    }

    /// Validates configuration data and builds a graph from it.
    ///
    /// # Errors
    ///
    /// Returns a [`GraphError`] when the declarations fail validation.
    pub fn from_config(config: GraphConfig) -> Result<Self, GraphError> {
        GraphBuilder::from_config(config).build()
    }

    /// Returns the direct prerequisites of a unit, or `None` for an unknown unit.
    #[must_use]
    pub fn prerequisites_of(&self, unit: &str) -> Option<&BTreeSet<UnitId>> {
        self.units.get(unit).map(|decl| &decl.prerequisites)
    }

    /// Returns the stage a unit belongs to.
    #[must_use]
    pub fn stage_of(&self, unit: &str) -> Option<&Stage> {
        let decl = self.units.get(unit)?;
        self.stage(decl.stage)
    }

    /// Returns the stages in dependency-respecting order.
    ///
    /// Because prerequisites never live in a later stage, ascending index
    /// order is already topological.
    #[must_use]
    pub fn topological_stage_order(&self) -> &[Stage] {
        &self.stages
    }

    /// Returns all stages sorted by index.
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Returns the stage with the given 1-based index.
    #[must_use]
    pub fn stage(&self, index: u32) -> Option<&Stage> {
        let pos = usize::try_from(index).ok()?.checked_sub(1)?;
        self.stages.get(pos)
    }

    /// Returns the stage with the given label.
    #[must_use]
    pub fn stage_by_label(&self, label: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.label == label)
    }

    /// Returns a unit declaration.
    #[must_use]
    pub fn unit(&self, unit: &str) -> Option<&UnitDecl> {
        self.units.get(unit)
    }

    /// Returns the processing kind of a unit.
    #[must_use]
    pub fn kind_of(&self, unit: &str) -> Option<ProcessingKind> {
        self.units.get(unit).map(|decl| decl.kind)
    }

    /// Returns the declarations of the units in a stage, in declaration order.
    pub fn units_in_stage(&self, index: u32) -> impl Iterator<Item = &UnitDecl> + '_ {
        self.stage(index)
            .into_iter()
            .flat_map(|stage| stage.units.iter())
            .filter_map(|id| self.units.get(id))
    }

    /// Returns all units in a deterministic topological order.
    #[must_use]
    pub fn unit_order(&self) -> &[UnitId] {
        &self.unit_order
    }

    /// Returns the number of declared units.
    #[must_use]
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Returns units that have not completed but whose prerequisites all have.
    ///
    /// Results follow [`unit_order`](Self::unit_order).
    pub fn ready_units<F>(&self, is_completed: F) -> Vec<&UnitId>
    where
        F: Fn(&UnitId) -> bool,
    {
        self.unit_order
            .iter()
            .filter(|id| !is_completed(id))
            .filter(|id| {
                self.units
                    .get(*id)
                    .is_some_and(|decl| decl.prerequisites.iter().all(|p| is_completed(p)))
            })
            .collect()
    }

    /// Returns true if every prerequisite of every unit in the stage is completed.
    ///
    /// Unknown stage indices are never ready.
    pub fn is_stage_ready<F>(&self, index: u32, is_completed: F) -> bool
    where
        F: Fn(&UnitId) -> bool,
    {
        let Some(stage) = self.stage(index) else {
            return false;
        };
        stage
            .units
            .iter()
            .filter_map(|id| self.units.get(id))
            .flat_map(|decl| decl.prerequisites.iter())
            .all(|p| is_completed(p))
    }

    /// Returns units that are not completed, in topological order.
    pub fn pending_units<F>(&self, is_completed: F) -> Vec<&UnitId>
    where
        F: Fn(&UnitId) -> bool,
    {
        self.unit_order.iter().filter(|id| !is_completed(id)).collect()
    }
}

/// Orders units so that prerequisites come first.
///
/// Units are visited in declaration order and prerequisites in sorted order,
/// so the result is stable for a given declaration.
fn topological_sort(units: &HashMap<UnitId, UnitDecl>, declaration_order: &[UnitId]) -> Vec<UnitId> {
    fn visit<'a>(
        node: &'a UnitId,
        units: &'a HashMap<UnitId, UnitDecl>,
        visited: &mut HashSet<&'a UnitId>,
        result: &mut Vec<UnitId>,
    ) {
        if !visited.insert(node) {
            return;
        }
        if let Some(decl) = units.get(node) {
            for prerequisite in &decl.prerequisites {
                visit(prerequisite, units, visited, result);
            }
        }
        result.push(node.clone());
    }

    let mut result = Vec::with_capacity(units.len());
    let mut visited = HashSet::new();
    for id in declaration_order {
        visit(id, units, &mut visited, &mut result);
    }
    result
}
