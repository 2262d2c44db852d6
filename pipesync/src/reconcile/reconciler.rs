//! Event application.

use std::sync::Arc;

use tracing::{debug, warn};

use super::update_log::{IncrementalUpdate, Upsert};
use super::state::{BaseUnit, ReconciledState};
use crate::core::{Scope, UnitId};
use crate::graph::DependencyGraph;
use crate::progress::UnitProgress;
use crate::protocol::{InboundEvent, PipelineHeartbeat, PipelineSnapshot, ProgressUpdate};
use crate::utils::Timestamp;

/// Why an event left the state untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// A record at least as new exists for the same key.
    Duplicate,
    /// The event is older than the last applied snapshot.
    Superseded,
    /// The event does not apply to this kind of scope.
    NotApplicable,
}

/// What applying an event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// A snapshot replaced the state.
    Replaced,
    /// A heartbeat was merged.
    Merged,
    /// An incremental or progress update was recorded.
    Accepted,
    /// The event was dropped.
    Discarded(DiscardReason),
    /// The run completed. `pending` lists units the graph does not yet see
    /// as completed.
    Settled {
        /// Units not completed at the time of completion.
        pending: Vec<UnitId>,
    },
    /// The server reported its view of the connection.
    ConnectionReported(bool),
    /// The event only proves liveness.
    Liveness,
}

impl ApplyOutcome {
    /// Returns true if the state may have changed.
    #[must_use]
    pub fn changed_state(&self) -> bool {
        matches!(
            self,
            Self::Replaced
                | Self::Merged
                | Self::Accepted
                | Self::Settled { .. }
                | Self::ConnectionReported(_)
        )
    }
}

/// Folds inbound events into one [`ReconciledState`].
///
/// Events are applied one at a time; callers serialize access per scope.
#[derive(Debug, Clone)]
pub struct Reconciler {
    scope: Scope,
    graph: Arc<DependencyGraph>,
    state: ReconciledState,
}

impl Reconciler {
    /// Creates a reconciler with empty state.
    #[must_use]
    pub fn new(scope: Scope, graph: Arc<DependencyGraph>) -> Self {
        Self {
            scope,
            graph,
            state: ReconciledState::default(),
        }
    }

    /// Returns the scope.
    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> &ReconciledState {
        &self.state
    }

    /// Returns true if the event's scope keys do not conflict with ours.
    #[must_use]
    pub fn accepts(&self, event: &InboundEvent) -> bool {
        self.scope.accepts(&event.scope())
    }

    /// Applies one event.
    pub fn apply(&mut self, event: InboundEvent) -> ApplyOutcome {
        match event {
            InboundEvent::PipelineSnapshot(snapshot) => self.apply_snapshot(snapshot),
            InboundEvent::PipelineHeartbeat(heartbeat) => {
                self.merge_heartbeat(heartbeat);
                ApplyOutcome::Merged
            }
            InboundEvent::PipelineComplete(heartbeat) => self.complete(heartbeat),
            InboundEvent::ProgressUpdate(update) => self.apply_progress(update),
            InboundEvent::StatusUpdate(update) => {
                self.apply_incremental(IncrementalUpdate::Status(update))
            }
            InboundEvent::SceneUpdate(update) => {
                self.apply_incremental(IncrementalUpdate::Scene(update))
            }
            InboundEvent::FunctionUpdate(update) => {
                if self.scope.has_pipeline_run() {
                    debug!(scope = %self.scope, unit = %update.unit_id, "Ignoring function update for pipeline-run scope");
                    ApplyOutcome::Discarded(DiscardReason::NotApplicable)
                } else {
                    self.apply_incremental(IncrementalUpdate::Status(update))
                }
            }
            InboundEvent::ConnectionStatus(report) => {
                self.state.server_connected = Some(report.connected);
                ApplyOutcome::ConnectionReported(report.connected)
            }
            InboundEvent::NoDataAvailable(notice) => {
                debug!(scope = %self.scope, message = ?notice.message, "No data available");
                ApplyOutcome::Liveness
            }
            InboundEvent::Error(notice) => {
                warn!(
                    scope = %self.scope,
                    code = ?notice.code,
                    "Backend reported an error: {}",
                    notice.message
                );
                ApplyOutcome::Liveness
            }
        }
    }

    fn is_superseded(&self, timestamp: Timestamp) -> bool {
        self.state
            .last_snapshot_timestamp
            .is_some_and(|snapshot| timestamp < snapshot)
    }

    fn apply_snapshot(&mut self, snapshot: PipelineSnapshot) -> ApplyOutcome {
        if self.is_superseded(snapshot.timestamp) {
            debug!(scope = %self.scope, "Discarding snapshot older than the current one");
            return ApplyOutcome::Discarded(DiscardReason::Superseded);
        }

        let timestamp = snapshot.timestamp;
        let state = &mut self.state;
        state.updates.clear();
        state.overall_progress = snapshot.overall_progress;
        state.progress_timestamp = Some(timestamp);
        state.stages = snapshot.stages;
        state.stages_timestamp = Some(timestamp);
        state.units = snapshot
            .units
            .unwrap_or_default()
            .into_iter()
            .map(|(id, progress)| (id, base_unit(progress, Some(timestamp))))
            .collect();
        state.last_snapshot_timestamp = Some(timestamp);

        debug!(scope = %self.scope, units = state.units.len(), "Applied snapshot");
        ApplyOutcome::Replaced
    }

    fn merge_heartbeat(&mut self, heartbeat: PipelineHeartbeat) {
        if let Some(ts) = heartbeat.timestamp {
            let last = &mut self.state.last_heartbeat_timestamp;
            *last = Some(last.map_or(ts, |current| current.max(ts)));
            if self.is_superseded(ts) {
                return;
            }
        }

        let timestamp = heartbeat.timestamp;
        let state = &mut self.state;

        if let Some(overall) = heartbeat.overall_progress {
            let newer = match (timestamp, state.progress_timestamp) {
                (Some(incoming), Some(current)) => incoming > current,
                _ => true,
            };
            if newer {
                state.overall_progress = Some(overall);
                if timestamp.is_some() {
                    state.progress_timestamp = timestamp;
                }
            }
        }
        if let Some(stages) = heartbeat.stages {
            if !is_older(timestamp, state.stages_timestamp) {
                state.stages = stages;
                state.stages_timestamp = timestamp.or(state.stages_timestamp);
            }
        }
        if let Some(units) = heartbeat.units {
            for (id, progress) in units {
                let current = state.units.get(&id).and_then(|unit| unit.timestamp);
                if is_older(timestamp, current) {
                    debug!(scope = %self.scope, unit = %id, "Keeping newer unit entry over heartbeat");
                    continue;
                }
                state.units.insert(id, base_unit(progress, timestamp));
            }
        }
    }

    fn complete(&mut self, heartbeat: PipelineHeartbeat) -> ApplyOutcome {
        self.merge_heartbeat(heartbeat);
        self.state.settled = true;

        let statuses = self.state.unit_statuses();
        let pending: Vec<UnitId> = self
            .graph
            .pending_units(|id| statuses.get(id).is_some_and(UnitProgress::is_completed))
            .into_iter()
            .cloned()
            .collect();

        if !pending.is_empty() {
            warn!(
                scope = %self.scope,
                pending = ?pending,
                "Pipeline reported complete while units are still pending"
            );
        }
        ApplyOutcome::Settled { pending }
    }

    fn apply_progress(&mut self, update: ProgressUpdate) -> ApplyOutcome {
        if self.is_superseded(update.timestamp) {
            return ApplyOutcome::Discarded(DiscardReason::Superseded);
        }
        if self
            .state
            .progress_timestamp
            .is_some_and(|current| current >= update.timestamp)
        {
            return ApplyOutcome::Discarded(DiscardReason::Duplicate);
        }

        self.state.overall_progress = Some(update.overall_progress);
        self.state.progress_timestamp = Some(update.timestamp);
        let stages_newer = !is_older(Some(update.timestamp), self.state.stages_timestamp);
        if !update.stages.is_empty() && stages_newer {
            self.state.stages = update.stages;
            self.state.stages_timestamp = Some(update.timestamp);
        }
        ApplyOutcome::Accepted
    }

    fn apply_incremental(&mut self, update: IncrementalUpdate) -> ApplyOutcome {
        if self.is_superseded(update.timestamp()) {
            debug!(scope = %self.scope, unit = %update.unit_id(), "Discarding update older than snapshot");
            return ApplyOutcome::Discarded(DiscardReason::Superseded);
        }

        match self.state.updates.offer(update) {
            Upsert::Inserted | Upsert::Replaced => ApplyOutcome::Accepted,
            Upsert::Stale => ApplyOutcome::Discarded(DiscardReason::Duplicate),
        }
    }
}

/// True when `incoming` must not replace an entry stamped `current`: the
/// entry is timestamped and the incoming value is not strictly newer.
fn is_older(incoming: Option<Timestamp>, current: Option<Timestamp>) -> bool {
    match (incoming, current) {
        (Some(incoming), Some(current)) => incoming <= current,
        (None, Some(_)) => true,
        (_, None) => false,
    }
}

fn base_unit(progress: UnitProgress, timestamp: Option<Timestamp>) -> BaseUnit {
    BaseUnit {
        progress,
        timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EventScope, UnitStatus};
    use crate::graph::catalog;
    use crate::protocol::{ConnectionReport, SceneUpdate, StageReport, StatusUpdate};
    use crate::utils::parse_timestamp;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn ts(secs: i64) -> Timestamp {
        parse_timestamp(&(1_704_067_200 + secs).to_string()).unwrap()
    }

    fn reconciler() -> Reconciler {
        Reconciler::new(
            Scope::pipeline_run("u1", "s1", "v1"),
            Arc::new(catalog::script_production()),
        )
    }

    fn status(unit: &str, status: UnitStatus, at: i64) -> InboundEvent {
        InboundEvent::StatusUpdate(StatusUpdate {
            scope: EventScope::default(),
            unit_id: UnitId::from(unit),
            status,
            progress: None,
            message: None,
            timestamp: ts(at),
        })
    }

    fn scene(unit: &str, scene_id: &str, shot: Option<&str>, status: UnitStatus, at: i64) -> InboundEvent {
        InboundEvent::SceneUpdate(SceneUpdate {
            scope: EventScope::default(),
            unit_id: UnitId::from(unit),
            scene_id: scene_id.to_string(),
            shot_id: shot.map(str::to_string),
            status,
            progress: None,
            timestamp: ts(at),
        })
    }

    fn snapshot(units: &[(&str, UnitStatus)], at: i64) -> InboundEvent {
        InboundEvent::PipelineSnapshot(PipelineSnapshot {
            scope: EventScope::default(),
            overall_progress: Some(10.0),
            stages: Vec::new(),
            units: Some(
                units
                    .iter()
                    .map(|(id, s)| (UnitId::from(*id), UnitProgress::new(*s)))
                    .collect(),
            ),
            timestamp: ts(at),
        })
    }

    fn unit_status(r: &Reconciler, unit: &str) -> Option<UnitStatus> {
        r.state().unit_statuses().get(unit).map(|p| p.status)
    }

    #[test]
    fn test_timestamp_wins_over_arrival_order() {
        let mut r = reconciler();

        assert_eq!(r.apply(status("scene_breakdown", UnitStatus::Completed, 10)), ApplyOutcome::Accepted);
        assert_eq!(
            r.apply(status("scene_breakdown", UnitStatus::Processing, 5)),
            ApplyOutcome::Discarded(DiscardReason::Duplicate)
        );
        assert_eq!(unit_status(&r, "scene_breakdown"), Some(UnitStatus::Completed));
    }

    #[test]
    fn test_duplicate_is_idempotent() {
        let mut r = reconciler();
        let event = status("tone_analysis", UnitStatus::Processing, 3);

        r.apply(event.clone());
        let before = r.state().unit_statuses();
        assert_eq!(r.apply(event), ApplyOutcome::Discarded(DiscardReason::Duplicate));

        assert_eq!(r.state().unit_statuses(), before);
        assert_eq!(r.state().update_count(), 1);
    }

    #[test]
    fn test_snapshot_supersedes_older_updates() {
        let mut r = reconciler();
        r.apply(status("visual_style", UnitStatus::Processing, 5));

        assert_eq!(
            r.apply(snapshot(&[("visual_style", UnitStatus::Completed)], 10)),
            ApplyOutcome::Replaced
        );
        assert_eq!(r.state().update_count(), 0);

        assert_eq!(
            r.apply(status("visual_style", UnitStatus::Failed, 8)),
            ApplyOutcome::Discarded(DiscardReason::Superseded)
        );
        assert_eq!(unit_status(&r, "visual_style"), Some(UnitStatus::Completed));

        assert_eq!(r.apply(status("visual_style", UnitStatus::Failed, 12)), ApplyOutcome::Accepted);
        assert_eq!(unit_status(&r, "visual_style"), Some(UnitStatus::Failed));
    }

    #[test]
    fn test_older_snapshot_is_discarded() {
        let mut r = reconciler();
        r.apply(snapshot(&[("script_structure", UnitStatus::Completed)], 20));

        assert_eq!(
            r.apply(snapshot(&[("script_structure", UnitStatus::Processing)], 10)),
            ApplyOutcome::Discarded(DiscardReason::Superseded)
        );
        assert_eq!(unit_status(&r, "script_structure"), Some(UnitStatus::Completed));
    }

    #[test]
    fn test_heartbeat_shallow_merge() {
        let mut r = reconciler();
        r.apply(snapshot(
            &[
                ("script_structure", UnitStatus::Completed),
                ("scene_breakdown", UnitStatus::Processing),
            ],
            10,
        ));

        let mut units = HashMap::new();
        units.insert(UnitId::from("scene_breakdown"), UnitProgress::new(UnitStatus::Completed));
        let outcome = r.apply(InboundEvent::PipelineHeartbeat(PipelineHeartbeat {
            units: Some(units),
            timestamp: Some(ts(15)),
            ..PipelineHeartbeat::default()
        }));

        assert_eq!(outcome, ApplyOutcome::Merged);
        assert_eq!(unit_status(&r, "scene_breakdown"), Some(UnitStatus::Completed));
        assert_eq!(unit_status(&r, "script_structure"), Some(UnitStatus::Completed));
        assert_eq!(r.state().reported_overall_progress(), Some(10));
        assert_eq!(r.state().last_heartbeat_timestamp(), Some(ts(15)));

        let empty = r.apply(InboundEvent::PipelineHeartbeat(PipelineHeartbeat::default()));
        assert_eq!(empty, ApplyOutcome::Merged);
        assert_eq!(r.state().base_units().len(), 2);
    }

    #[test]
    fn test_newer_update_beats_older_heartbeat_unit() {
        let mut r = reconciler();
        r.apply(snapshot(&[("audio_generation", UnitStatus::Processing)], 10));
        r.apply(status("audio_generation", UnitStatus::Completed, 20));

        let mut units = HashMap::new();
        units.insert(UnitId::from("character_profiles"), UnitProgress::new(UnitStatus::Completed));
        r.apply(InboundEvent::PipelineHeartbeat(PipelineHeartbeat {
            units: Some(units),
            timestamp: Some(ts(30)),
            ..PipelineHeartbeat::default()
        }));

        assert_eq!(unit_status(&r, "audio_generation"), Some(UnitStatus::Completed));
    }

    #[test]
    fn test_scene_updates_fold_into_sub_units() {
        let mut r = reconciler();
        r.apply(scene("video_generation", "1", None, UnitStatus::Completed, 1));
        r.apply(scene("video_generation", "2", Some("a"), UnitStatus::Completed, 2));
        r.apply(scene("video_generation", "2", Some("b"), UnitStatus::Processing, 3));
        r.apply(scene("video_generation", "2", Some("b"), UnitStatus::Completed, 4));

        let statuses = r.state().unit_statuses();
        let video = &statuses[&UnitId::from("video_generation")];
        assert_eq!(video.sub_units.len(), 2);
        assert_eq!(video.sub_units[1].children.len(), 2);
        assert!(video.is_completed());
        assert_eq!(r.state().update_count(), 3);
    }

    #[test]
    fn test_progress_update_ordering() {
        let mut r = reconciler();
        let progress = |value: f64, at: i64| {
            InboundEvent::ProgressUpdate(ProgressUpdate {
                scope: EventScope::default(),
                overall_progress: value,
                stages: Vec::new(),
                timestamp: ts(at),
            })
        };

        assert_eq!(r.apply(progress(30.0, 5)), ApplyOutcome::Accepted);
        assert_eq!(
            r.apply(progress(20.0, 4)),
            ApplyOutcome::Discarded(DiscardReason::Duplicate)
        );
        assert_eq!(r.state().reported_overall_progress(), Some(30));
    }

    #[test]
    fn test_function_update_only_for_user_scope() {
        let mut run = reconciler();
        let InboundEvent::StatusUpdate(update) = status("tone_analysis", UnitStatus::Completed, 1) else {
            unreachable!()
        };
        assert_eq!(
            run.apply(InboundEvent::FunctionUpdate(update.clone())),
            ApplyOutcome::Discarded(DiscardReason::NotApplicable)
        );

        let mut user = Reconciler::new(Scope::user("u1"), Arc::new(catalog::script_production()));
        assert_eq!(user.apply(InboundEvent::FunctionUpdate(update)), ApplyOutcome::Accepted);
        assert_eq!(unit_status(&user, "tone_analysis"), Some(UnitStatus::Completed));
    }

    #[test]
    fn test_complete_flags_pending_units() {
        let mut r = reconciler();
        r.apply(snapshot(&[("script_structure", UnitStatus::Completed)], 1));

        let ApplyOutcome::Settled { pending } =
            r.apply(InboundEvent::PipelineComplete(PipelineHeartbeat::default()))
        else {
            panic!("Expected settled outcome");
        };

        assert!(r.state().is_settled());
        assert_eq!(pending.len(), 9);
        assert!(!pending.contains(&UnitId::from("script_structure")));
        // State is not rewritten to completed.
        assert_eq!(unit_status(&r, "final_assembly"), None);

        assert_eq!(r.apply(status("final_assembly", UnitStatus::Completed, 5)), ApplyOutcome::Accepted);
    }

    #[test]
    fn test_complete_without_discrepancy() {
        let mut r = reconciler();
        let graph = catalog::script_production();
        let all: Vec<(&str, UnitStatus)> = graph
            .unit_order()
            .iter()
            .map(|id| (id.as_str(), UnitStatus::Completed))
            .collect();
        r.apply(snapshot(&all, 1));

        assert_eq!(
            r.apply(InboundEvent::PipelineComplete(PipelineHeartbeat::default())),
            ApplyOutcome::Settled { pending: vec![] }
        );
    }

    #[test]
    fn test_connection_and_liveness_events() {
        let mut r = reconciler();

        let outcome = r.apply(InboundEvent::ConnectionStatus(ConnectionReport {
            connected: false,
            timestamp: None,
        }));
        assert_eq!(outcome, ApplyOutcome::ConnectionReported(false));
        assert_eq!(r.state().server_connected(), Some(false));

        assert_eq!(
            r.apply(InboundEvent::NoDataAvailable(Default::default())),
            ApplyOutcome::Liveness
        );
        assert_eq!(r.apply(InboundEvent::Error(Default::default())), ApplyOutcome::Liveness);
        assert!(!ApplyOutcome::Liveness.changed_state());
    }

    #[test]
    fn test_scope_filter() {
        let r = reconciler();
        let mut foreign = status("visual_style", UnitStatus::Completed, 1);
        if let InboundEvent::StatusUpdate(update) = &mut foreign {
            update.scope.version_id = Some("v2".into());
        }

        assert!(!r.accepts(&foreign));
        assert!(r.accepts(&status("visual_style", UnitStatus::Completed, 1)));
    }

    #[test]
    fn test_recent_updates_order() {
        let mut r = reconciler();
        r.apply(status("a", UnitStatus::Processing, 1));
        r.apply(status("b", UnitStatus::Processing, 2));
        r.apply(status("c", UnitStatus::Processing, 3));
        r.apply(status("a", UnitStatus::Completed, 4));

        let recent: Vec<&str> = r
            .state()
            .recent_updates(2)
            .into_iter()
            .map(|u| u.unit_id().as_str())
            .collect();
        assert_eq!(recent, vec!["b", "c"]);
        assert_eq!(r.state().recent_updates(10).len(), 3);
    }

    fn heartbeat_units(units: &[(&str, UnitStatus)], at: i64) -> InboundEvent {
        InboundEvent::PipelineHeartbeat(PipelineHeartbeat {
            units: Some(
                units
                    .iter()
                    .map(|(id, s)| (UnitId::from(*id), UnitProgress::new(*s)))
                    .collect(),
            ),
            timestamp: Some(ts(at)),
            ..PipelineHeartbeat::default()
        })
    }

    fn stage_report(label: &str, progress: f64) -> StageReport {
        StageReport {
            name: label.to_string(),
            status: None,
            progress: Some(progress),
        }
    }

    /// Every ordering of `items`.
    fn orderings<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
        if items.len() <= 1 {
            return vec![items.to_vec()];
        }
        let mut all = Vec::new();
        for i in 0..items.len() {
            let mut rest = items.to_vec();
            let first = rest.remove(i);
            for mut tail in orderings(&rest) {
                tail.insert(0, first.clone());
                all.push(tail);
            }
        }
        all
    }

    #[test]
    fn test_late_heartbeat_keeps_newer_unit_entry() {
        let mut r = reconciler();
        r.apply(heartbeat_units(&[("shot_list", UnitStatus::Completed)], 20));
        r.apply(heartbeat_units(
            &[("shot_list", UnitStatus::Processing), ("tone_analysis", UnitStatus::Processing)],
            15,
        ));

        assert_eq!(unit_status(&r, "shot_list"), Some(UnitStatus::Completed));
        assert_eq!(unit_status(&r, "tone_analysis"), Some(UnitStatus::Processing));
        assert_eq!(r.state().last_heartbeat_timestamp(), Some(ts(20)));

        r.apply(heartbeat_units(&[("shot_list", UnitStatus::Failed)], 25));
        assert_eq!(unit_status(&r, "shot_list"), Some(UnitStatus::Failed));
    }

    #[test]
    fn test_late_heartbeat_keeps_newer_stage_reports() {
        let mut r = reconciler();
        r.apply(InboundEvent::PipelineHeartbeat(PipelineHeartbeat {
            stages: Some(vec![stage_report("Script Analyst", 80.0)]),
            timestamp: Some(ts(20)),
            ..PipelineHeartbeat::default()
        }));
        r.apply(InboundEvent::PipelineHeartbeat(PipelineHeartbeat {
            stages: Some(vec![stage_report("Script Analyst", 30.0)]),
            timestamp: Some(ts(10)),
            ..PipelineHeartbeat::default()
        }));

        assert_eq!(r.state().stage_reports()[0].progress, Some(80.0));
    }

    #[test]
    fn test_status_updates_in_any_order() {
        let events = [
            (UnitStatus::Queued, 1),
            (UnitStatus::Processing, 4),
            (UnitStatus::Failed, 2),
            (UnitStatus::Completed, 3),
        ];

        for order in orderings(&events) {
            let mut r = reconciler();
            for (status_value, at) in &order {
                r.apply(status("shot_list", *status_value, *at));
            }
            assert_eq!(
                unit_status(&r, "shot_list"),
                Some(UnitStatus::Processing),
                "order {order:?}"
            );
        }
    }

    #[test]
    fn test_heartbeats_and_updates_in_any_order() {
        let events = vec![
            status("shot_list", UnitStatus::Processing, 10),
            heartbeat_units(&[("shot_list", UnitStatus::Failed)], 12),
            status("shot_list", UnitStatus::Completed, 14),
            heartbeat_units(&[("shot_list", UnitStatus::Processing)], 11),
        ];

        for order in orderings(&events) {
            let mut r = reconciler();
            for event in order {
                r.apply(event);
            }
            assert_eq!(unit_status(&r, "shot_list"), Some(UnitStatus::Completed));
        }

        let newest_is_heartbeat = vec![
            status("shot_list", UnitStatus::Completed, 10),
            heartbeat_units(&[("shot_list", UnitStatus::Failed)], 16),
            status("shot_list", UnitStatus::Processing, 13),
        ];
        for order in orderings(&newest_is_heartbeat) {
            let mut r = reconciler();
            for event in order {
                r.apply(event);
            }
            assert_eq!(unit_status(&r, "shot_list"), Some(UnitStatus::Failed));
        }
    }
}
