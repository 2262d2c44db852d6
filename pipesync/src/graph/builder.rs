//! Dependency graph builder with validation.

use std::collections::{HashMap, HashSet};

use super::{DependencyGraph, GraphConfig, Stage, StageDecl, UnitDecl};
use crate::core::{ProcessingKind, UnitId};
use crate::errors::GraphError;

/// Builder for creating validated dependency graphs.
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    stages: Vec<StageDecl>,
    units: Vec<UnitDecl>,
}

impl GraphBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder pre-populated from configuration data.
    #[must_use]
    pub fn from_config(config: GraphConfig) -> Self {
        Self {
            stages: config.stages,
            units: config.units,
        }
    }

    /// Declares a stage.
    #[must_use]
    pub fn stage(mut self, index: u32, label: impl Into<String>) -> Self {
        self.stages.push(StageDecl {
            index,
            label: label.into(),
        });
        self
    }

    /// Declares a unit.
    #[must_use]
    pub fn unit(
        mut self,
        id: impl Into<UnitId>,
        stage: u32,
        kind: ProcessingKind,
        prerequisites: &[&str],
    ) -> Self {
        self.units.push(
            UnitDecl::new(id, stage)
                .with_kind(kind)
                .with_prerequisites(prerequisites.iter().copied()),
        );
        self
    }

    /// Declares a unit from a full declaration.
    #[must_use]
    pub fn unit_decl(mut self, decl: UnitDecl) -> Self {
        self.units.push(decl);
        self
    }

    /// Validates the declarations and builds the graph.
    ///
    /// # Errors
    ///
    /// Returns a [`GraphError`] if stages are empty, duplicated or not
    /// numbered `1..=N`, if a unit is duplicated, if any reference is
    /// dangling, if prerequisites form a cycle, or if a prerequisite lives in
    /// a later stage than its dependent.
    pub fn build(self) -> Result<DependencyGraph, GraphError> {
        let stages = self.validate_stages()?;
        let units = self.validate_units(&stages)?;

        detect_cycles(&self.units, &units)?;
        check_stage_order(&self.units, &units)?;

        let order: Vec<UnitId> = self.units.iter().map(|u| u.id.clone()).collect();
        Ok(DependencyGraph::new(stages, units, &order))
    }

    fn validate_stages(&self) -> Result<Vec<Stage>, GraphError> {
        if self.stages.is_empty() {
            return Err(GraphError::Empty);
        }

        let mut seen = HashSet::new();
        for decl in &self.stages {
            if !seen.insert(decl.index) {
                return Err(GraphError::DuplicateStage(decl.index));
            }
        }

        let mut indices: Vec<u32> = seen.into_iter().collect();
        indices.sort_unstable();
        let contiguous = indices
            .iter()
            .enumerate()
            .all(|(pos, &index)| index as usize == pos + 1);
        if !contiguous {
            return Err(GraphError::NonContiguousStages { found: indices });
        }

        let mut stages: Vec<Stage> = self
            .stages
            .iter()
            .map(|decl| Stage {
                index: decl.index,
                label: decl.label.clone(),
                units: self
                    .units
                    .iter()
                    .filter(|u| u.stage == decl.index)
                    .map(|u| u.id.clone())
                    .collect(),
            })
            .collect();
        stages.sort_by_key(|s| s.index);
        Ok(stages)
    }

    fn validate_units(&self, stages: &[Stage]) -> Result<HashMap<UnitId, UnitDecl>, GraphError> {
        let mut units = HashMap::with_capacity(self.units.len());

        for decl in &self.units {
            if units.contains_key(&decl.id) {
                return Err(GraphError::DuplicateUnit(decl.id.to_string()));
            }
            if !stages.iter().any(|s| s.index == decl.stage) {
                return Err(GraphError::DanglingReference {
                    unit: decl.id.to_string(),
                    kind: "stage",
                    reference: decl.stage.to_string(),
                });
            }
            units.insert(decl.id.clone(), decl.clone());
        }

        for decl in &self.units {
            if let Some(missing) = decl
                .prerequisites
                .iter()
                .find(|p| !units.contains_key(*p))
            {
                return Err(GraphError::DanglingReference {
                    unit: decl.id.to_string(),
                    kind: "unit",
                    reference: missing.to_string(),
                });
            }
        }

        Ok(units)
    }
}

fn check_stage_order(
    declared: &[UnitDecl],
    units: &HashMap<UnitId, UnitDecl>,
) -> Result<(), GraphError> {
    for decl in declared {
        for prerequisite in &decl.prerequisites {
            let prerequisite_stage = units[prerequisite].stage;
            if prerequisite_stage > decl.stage {
                return Err(GraphError::StageOrderViolation {
                    unit: decl.id.to_string(),
                    unit_stage: decl.stage,
                    prerequisite: prerequisite.to_string(),
                    prerequisite_stage,
                });
            }
        }
    }
    Ok(())
}

/// Detects cycles in the prerequisite edges.
///
/// Units are visited in declaration order so the reported path is stable.
fn detect_cycles(
    declared: &[UnitDecl],
    units: &HashMap<UnitId, UnitDecl>,
) -> Result<(), GraphError> {
    let mut visited = HashSet::new();
    let mut rec_stack = HashSet::new();
    let mut path = Vec::new();

    for decl in declared {
        if !visited.contains(&decl.id) {
            if let Some(cycle) = dfs_cycle(&decl.id, units, &mut visited, &mut rec_stack, &mut path)
            {
                return Err(GraphError::Cycle { path: cycle });
            }
        }
    }

    Ok(())
}

fn dfs_cycle<'a>(
    node: &'a UnitId,
    units: &'a HashMap<UnitId, UnitDecl>,
    visited: &mut HashSet<&'a UnitId>,
    rec_stack: &mut HashSet<&'a UnitId>,
    path: &mut Vec<&'a UnitId>,
) -> Option<Vec<String>> {
    visited.insert(node);
    rec_stack.insert(node);
    path.push(node);

    if let Some(decl) = units.get(node) {
        for prerequisite in &decl.prerequisites {
            if !visited.contains(prerequisite) {
                if let Some(cycle) = dfs_cycle(prerequisite, units, visited, rec_stack, path) {
                    return Some(cycle);
                }
            } else if rec_stack.contains(prerequisite) {
                let start = path.iter().position(|n| *n == prerequisite).unwrap_or(0);
                let mut cycle: Vec<String> = path[start..].iter().map(ToString::to_string).collect();
                cycle.push(prerequisite.to_string());
                return Some(cycle);
            }
        }
    }

    path.pop();
    rec_stack.remove(node);
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use ProcessingKind::{Batch, Single};

    #[test]
    fn test_build_simple_graph() {
        let graph = GraphBuilder::new()
            .stage(1, "Script Analyst")
            .stage(2, "Creative Director")
            .unit("scene_breakdown", 1, Single, &[])
            .unit("visual_style", 2, Single, &["scene_breakdown"])
            .build()
            .unwrap();

        assert_eq!(graph.unit_count(), 2);
        assert_eq!(graph.stages().len(), 2);
    }

    #[test]
    fn test_cycle_rejected() {
        let result = GraphBuilder::new()
            .stage(1, "Only")
            .unit("A", 1, Single, &["B"])
            .unit("B", 1, Single, &["C"])
            .unit("C", 1, Single, &["A"])
            .build();

        match result {
            Err(GraphError::Cycle { path }) => {
                assert_eq!(path, vec!["A", "B", "C", "A"]);
            }
            other => panic!("Expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_cycle_across_stages_reported_as_cycle() {
        let result = GraphBuilder::new()
            .stage(1, "One")
            .stage(2, "Two")
            .unit("A", 1, Single, &["B"])
            .unit("B", 2, Single, &["A"])
            .build();

        assert!(matches!(result, Err(GraphError::Cycle { .. })));
    }

    #[test]
    fn test_self_dependency_is_cycle() {
        let result = GraphBuilder::new()
            .stage(1, "Only")
            .unit("A", 1, Single, &["A"])
            .build();

        assert!(matches!(result, Err(GraphError::Cycle { path }) if path == vec!["A", "A"]));
    }

    #[test]
    fn test_dangling_unit_reference() {
        let result = GraphBuilder::new()
            .stage(1, "Only")
            .unit("A", 1, Single, &["ghost"])
            .build();

        assert_eq!(
            result.unwrap_err(),
            GraphError::DanglingReference {
                unit: "A".into(),
                kind: "unit",
                reference: "ghost".into(),
            }
        );
    }

    #[test]
    fn test_dangling_stage_reference() {
        let result = GraphBuilder::new()
            .stage(1, "Only")
            .unit("A", 2, Single, &[])
            .build();

        assert!(matches!(
            result,
            Err(GraphError::DanglingReference { kind: "stage", .. })
        ));
    }

    #[test]
    fn test_stage_order_violation() {
        let result = GraphBuilder::new()
            .stage(1, "One")
            .stage(2, "Two")
            .unit("early", 1, Single, &["late"])
            .unit("late", 2, Batch, &[])
            .build();

        assert!(matches!(
            result,
            Err(GraphError::StageOrderViolation {
                unit_stage: 1,
                prerequisite_stage: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_stage_validation() {
        assert_eq!(GraphBuilder::new().build().unwrap_err(), GraphError::Empty);

        let duplicate = GraphBuilder::new().stage(1, "A").stage(1, "B").build();
        assert_eq!(duplicate.unwrap_err(), GraphError::DuplicateStage(1));

        let gap = GraphBuilder::new().stage(1, "A").stage(3, "C").build();
        assert_eq!(
            gap.unwrap_err(),
            GraphError::NonContiguousStages { found: vec![1, 3] }
        );
    }

    #[test]
    fn test_duplicate_unit() {
        let result = GraphBuilder::new()
            .stage(1, "A")
            .unit("x", 1, Single, &[])
            .unit("x", 1, Batch, &[])
            .build();

        assert_eq!(result.unwrap_err(), GraphError::DuplicateUnit("x".into()));
    }

    #[test]
    fn test_multiple_roots_allowed() {
        let graph = GraphBuilder::new()
            .stage(1, "A")
            .unit("root1", 1, Single, &[])
            .unit("root2", 1, Single, &[])
            .unit("join", 1, Single, &["root1", "root2"])
            .build()
            .unwrap();

        assert_eq!(graph.prerequisites_of("join").map(|p| p.len()), Some(2));
    }
}
