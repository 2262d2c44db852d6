//! The reconciled per-scope state.

use std::collections::HashMap;

use serde::Serialize;

use super::update_log::{IncrementalUpdate, UpdateLog};
use crate::core::UnitId;
use crate::progress::{SubUnitProgress, UnitProgress, UnitStatuses};
use crate::protocol::{SceneUpdate, StageReport};
use crate::utils::Timestamp;

/// A unit entry taken from a snapshot or heartbeat.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaseUnit {
    /// The reported progress.
    pub progress: UnitProgress,
    /// Timestamp of the event that carried it, when known.
    pub timestamp: Option<Timestamp>,
}

/// Everything a session knows about its scope.
///
/// Snapshots and heartbeats populate the base fields; incremental updates
/// accumulate in an ordered log and are overlaid by
/// [`unit_statuses`](Self::unit_statuses).
#[derive(Debug, Clone, Default)]
pub struct ReconciledState {
    pub(super) overall_progress: Option<f64>,
    pub(super) progress_timestamp: Option<Timestamp>,
    pub(super) stages: Vec<StageReport>,
    pub(super) stages_timestamp: Option<Timestamp>,
    pub(super) units: HashMap<UnitId, BaseUnit>,
    pub(super) updates: UpdateLog,
    pub(super) last_snapshot_timestamp: Option<Timestamp>,
    pub(super) last_heartbeat_timestamp: Option<Timestamp>,
    pub(super) settled: bool,
    pub(super) server_connected: Option<bool>,
}

impl ReconciledState {
    /// Returns the last overall percentage reported by the backend.
    #[must_use]
    pub fn reported_overall_progress(&self) -> Option<u8> {
        self.overall_progress
            .filter(|p| p.is_finite())
            .map(|p| p.round().clamp(0.0, 100.0) as u8)
    }

    /// Returns the last reported per-stage reports.
    #[must_use]
    pub fn stage_reports(&self) -> &[StageReport] {
        &self.stages
    }

    /// Returns the units as carried by snapshots and heartbeats, before
    /// incremental updates are applied.
    #[must_use]
    pub fn base_units(&self) -> &HashMap<UnitId, BaseUnit> {
        &self.units
    }

    /// Returns the timestamp of the last applied snapshot.
    #[must_use]
    pub fn last_snapshot_timestamp(&self) -> Option<Timestamp> {
        self.last_snapshot_timestamp
    }

    /// Returns the timestamp carried by the last heartbeat, if it had one.
    #[must_use]
    pub fn last_heartbeat_timestamp(&self) -> Option<Timestamp> {
        self.last_heartbeat_timestamp
    }

    /// Returns true once `pipelineComplete` arrived for the scope.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.settled
    }

    /// Returns the connection status last reported by the server.
    #[must_use]
    pub fn server_connected(&self) -> Option<bool> {
        self.server_connected
    }

    /// Returns the number of buffered incremental records.
    #[must_use]
    pub fn update_count(&self) -> usize {
        self.updates.len()
    }

    /// Returns up to `limit` of the most recent distinct-key updates, oldest
    /// first.
    #[must_use]
    pub fn recent_updates(&self, limit: usize) -> Vec<&IncrementalUpdate> {
        let skip = self.updates.len().saturating_sub(limit);
        self.updates.iter().skip(skip).collect()
    }

    /// Derives the per-unit progress the aggregator consumes.
    ///
    /// For every unit, whichever of the base entry and the incremental
    /// records carries the newer timestamp wins. A base entry without a
    /// timestamp loses to any incremental record.
    #[must_use]
    pub fn unit_statuses(&self) -> UnitStatuses {
        let mut statuses: UnitStatuses = self
            .units
            .iter()
            .map(|(id, base)| (id.clone(), base.progress.clone()))
            .collect();

        for update in self.updates.iter() {
            let base_ts = self.units.get(update.unit_id()).and_then(|b| b.timestamp);
            if base_ts.is_some_and(|ts| ts >= update.timestamp()) {
                continue;
            }

            let entry = statuses.entry(update.unit_id().clone()).or_default();
            match update {
                IncrementalUpdate::Status(status) => entry.status = status.status,
                IncrementalUpdate::Scene(scene) => fold_scene(entry, scene),
            }
        }

        statuses
    }
}

fn find_or_insert<'a>(list: &'a mut Vec<SubUnitProgress>, id: &str) -> &'a mut SubUnitProgress {
    let pos = match list.iter().position(|s| s.id == id) {
        Some(pos) => pos,
        None => {
            list.push(SubUnitProgress::new(id, crate::core::UnitStatus::Queued));
            list.len() - 1
        }
    };
    &mut list[pos]
}

fn fold_scene(unit: &mut UnitProgress, update: &SceneUpdate) {
    let scene = find_or_insert(&mut unit.sub_units, &update.scene_id);
    match &update.shot_id {
        Some(shot_id) => find_or_insert(&mut scene.children, shot_id).status = update.status,
        None => scene.status = update.status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EventScope, UnitStatus};
    use crate::protocol::StatusUpdate;
    use crate::testing::ts;
    use pretty_assertions::assert_eq;

    fn log_status(state: &mut ReconciledState, unit: &str, status: UnitStatus, at: i64) {
        let update = IncrementalUpdate::Status(StatusUpdate {
            scope: EventScope::default(),
            unit_id: UnitId::from(unit),
            status,
            progress: None,
            message: None,
            timestamp: ts(at),
        });
        state.updates.upsert(update.key(), update, IncrementalUpdate::timestamp);
    }

    fn base(state: &mut ReconciledState, unit: &str, status: UnitStatus, at: Option<i64>) {
        state.units.insert(
            UnitId::from(unit),
            BaseUnit {
                progress: UnitProgress::new(status),
                timestamp: at.map(ts),
            },
        );
    }

    #[test]
    fn test_overlay_respects_base_timestamp() {
        let mut state = ReconciledState::default();
        base(&mut state, "shot_list", UnitStatus::Completed, Some(50));
        base(&mut state, "visual_style", UnitStatus::Queued, None);
        log_status(&mut state, "shot_list", UnitStatus::Processing, 40);
        log_status(&mut state, "visual_style", UnitStatus::Processing, 10);

        let statuses = state.unit_statuses();
        assert_eq!(statuses[&UnitId::from("shot_list")].status, UnitStatus::Completed);
        assert_eq!(statuses[&UnitId::from("visual_style")].status, UnitStatus::Processing);
    }

    #[test]
    fn test_recent_updates_limit() {
        let mut state = ReconciledState::default();
        log_status(&mut state, "a", UnitStatus::Processing, 1);
        log_status(&mut state, "b", UnitStatus::Processing, 2);
        log_status(&mut state, "c", UnitStatus::Processing, 3);

        let recent: Vec<_> = state
            .recent_updates(2)
            .into_iter()
            .map(|u| u.unit_id().to_string())
            .collect();
        assert_eq!(recent, vec!["b", "c"]);
        assert_eq!(state.update_count(), 3);
        assert_eq!(state.reported_overall_progress(), None);
    }
}
