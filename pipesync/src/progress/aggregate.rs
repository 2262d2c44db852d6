//! Percentage computations.

use serde::Serialize;

use super::{UnitProgress, UnitStatuses};
use crate::core::ProcessingKind;
use crate::graph::{DependencyGraph, Stage};

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    total: u32,
    completed: u32,
}

impl Tally {
    fn count(&mut self, completed: bool) {
        self.total += 1;
        if completed {
            self.completed += 1;
        }
    }

    fn percentage(self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let pct = (f64::from(self.completed) / f64::from(self.total) * 100.0).round();
        // Clamped to 0..=100 before the cast.
        pct.clamp(0.0, 100.0) as u8
    }
}

fn tally_unit(tally: &mut Tally, kind: ProcessingKind, progress: &UnitProgress) {
    if kind == ProcessingKind::Batch && !progress.sub_units.is_empty() {
        for sub_unit in &progress.sub_units {
            sub_unit.for_each_leaf(&mut |leaf| {
                if leaf.status.is_known() {
                    tally.count(leaf.status.is_completed());
                }
            });
        }
    } else if progress.status.is_known() {
        tally.count(progress.status.is_completed());
    }
}

/// Computes the completion percentage of a stage.
///
/// Units without a known status are left out of the count. Batch units that
/// report sub-units are counted at leaf granularity instead of as a single
/// unit. A stage where nothing has reported yet is at 0, never 100.
///
/// # Examples
///
/// ```
/// use pipesync::core::{UnitId, UnitStatus};
/// use pipesync::graph::catalog;
/// use pipesync::progress::{stage_progress, UnitProgress, UnitStatuses};
///
/// let graph = catalog::script_production();
/// let stage = graph.stage(1).unwrap();
///
/// let mut statuses = UnitStatuses::new();
/// statuses.insert(UnitId::from("script_structure"), UnitProgress::new(UnitStatus::Completed));
/// statuses.insert(UnitId::from("scene_breakdown"), UnitProgress::new(UnitStatus::Processing));
///
/// assert_eq!(stage_progress(&graph, stage, &statuses), 50);
/// ```
#[must_use]
pub fn stage_progress(graph: &DependencyGraph, stage: &Stage, statuses: &UnitStatuses) -> u8 {
    let mut tally = Tally::default();
    let mut all_unknown = true;

    for id in &stage.units {
        let Some(progress) = statuses.get(id) else {
            continue;
        };
        if !progress.is_known() {
            continue;
        }
        all_unknown = false;
        let kind = graph.kind_of(id.as_str()).unwrap_or_default();
        tally_unit(&mut tally, kind, progress);
    }

    if all_unknown {
        return 0;
    }
    tally.percentage()
}

/// Returns the overall percentage for a scope.
///
/// The last value reported by the backend wins; without one, the stages are
/// averaged with equal weight.
#[must_use]
pub fn overall_progress(
    graph: &DependencyGraph,
    reported: Option<u8>,
    statuses: &UnitStatuses,
) -> u8 {
    if let Some(reported) = reported {
        return reported.min(100);
    }

    let stages = graph.stages();
    if stages.is_empty() {
        return 0;
    }
    let sum: u32 = stages
        .iter()
        .map(|stage| u32::from(stage_progress(graph, stage, statuses)))
        .sum();
    let count = u32::try_from(stages.len()).unwrap_or(u32::MAX);
    (f64::from(sum) / f64::from(count)).round().clamp(0.0, 100.0) as u8
}

/// One row of a per-stage progress report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageProgressView {
    /// The 1-based stage index.
    pub index: u32,
    /// The stage label.
    pub label: String,
    /// Completion percentage.
    pub percentage: u8,
    /// Whether every prerequisite of every member unit has completed.
    pub ready: bool,
}

/// Computes a progress row for every stage, in stage order.
#[must_use]
pub fn stage_breakdown(graph: &DependencyGraph, statuses: &UnitStatuses) -> Vec<StageProgressView> {
    let is_completed = |id: &crate::core::UnitId| statuses.get(id).is_some_and(UnitProgress::is_completed);

    graph
        .topological_stage_order()
        .iter()
        .map(|stage| StageProgressView {
            index: stage.index,
            label: stage.label.clone(),
            percentage: stage_progress(graph, stage, statuses),
            ready: graph.is_stage_ready(stage.index, is_completed),
        })
        .collect()
}
