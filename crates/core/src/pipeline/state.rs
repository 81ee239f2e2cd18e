//! The shared, mutable record of a pipeline's current run.
//!
//! Every transition is a single method call made while holding the write
//! lock, so readers never observe a half-applied field group.

use chrono::Utc;
use uuid::Uuid;

use super::types::{RunStatus, StatusSnapshot, STAGE_FINISHED, STAGE_STARTING};

/// Message published when a run fails.
pub const FAILURE_MESSAGE: &str = "Pipeline run failed";

/// Current state of one pipeline kind.
///
/// Writers are the trigger gate (queue, reset) and the single active runner.
/// Runner-side transitions carry the run id they belong to and are ignored
/// when it no longer matches the admitted run.
#[derive(Debug, Clone, Default)]
pub struct PipelineState {
    snapshot: StatusSnapshot,
    run_id: Option<Uuid>,
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.snapshot.clone()
    }

    pub fn status(&self) -> RunStatus {
        self.snapshot.status
    }

    /// Id of the most recently admitted run.
    pub fn run_id(&self) -> Option<Uuid> {
        self.run_id
    }

    fn owns(&self, run_id: Uuid) -> bool {
        self.run_id == Some(run_id)
    }

    fn is_running(&self, run_id: Uuid) -> bool {
        self.owns(run_id) && self.snapshot.status == RunStatus::Running
    }

    /// Admits a new run: clears the previous run and marks the pipeline queued.
    pub(crate) fn queue(&mut self, run_id: Uuid, message: String) {
        self.snapshot = StatusSnapshot {
            status: RunStatus::Queued,
            message: Some(message),
            ..Default::default()
        };
        self.run_id = Some(run_id);
    }

    /// Moves the queued run to running.
    ///
    /// Returns false when `run_id` is no longer the queued run (it was reset).
    pub(crate) fn begin(&mut self, run_id: Uuid, message: String) -> bool {
        if !self.owns(run_id) || self.snapshot.status != RunStatus::Queued {
            return false;
        }
        self.snapshot = StatusSnapshot {
            status: RunStatus::Running,
            current_stage: Some(STAGE_STARTING.to_string()),
            progress: 0,
            message: Some(message),
            started_at: Some(Utc::now()),
            finished_at: None,
            error: None,
        };
        true
    }

    /// Publishes a new stage with its progress floor.
    pub(crate) fn enter_stage(&mut self, run_id: Uuid, label: &str, floor: u8, message: String) {
        if !self.is_running(run_id) {
            return;
        }
        self.snapshot.current_stage = Some(label.to_string());
        self.snapshot.message = Some(message);
        self.raise(floor);
    }

    pub(crate) fn set_message(&mut self, run_id: Uuid, message: String) {
        if self.is_running(run_id) {
            self.snapshot.message = Some(message);
        }
    }

    /// Raises progress; never lowers it.
    pub(crate) fn advance(&mut self, run_id: Uuid, progress: u8) {
        if self.is_running(run_id) {
            self.raise(progress);
        }
    }

    fn raise(&mut self, progress: u8) {
        self.snapshot.progress = self.snapshot.progress.max(progress.min(100));
    }

    pub(crate) fn complete(&mut self, run_id: Uuid, message: String) -> bool {
        if !self.is_running(run_id) {
            return false;
        }
        self.snapshot.status = RunStatus::Completed;
        self.snapshot.current_stage = Some(STAGE_FINISHED.to_string());
        self.snapshot.progress = 100;
        self.snapshot.message = Some(message);
        self.snapshot.finished_at = Some(Utc::now());
        true
    }

    /// Marks the run failed. Applies to a queued or running run.
    pub(crate) fn fail(&mut self, run_id: Uuid, error: String) -> bool {
        if !self.owns(run_id) || !self.snapshot.status.is_in_flight() {
            return false;
        }
        self.snapshot.status = RunStatus::Failed;
        self.snapshot.message = Some(FAILURE_MESSAGE.to_string());
        self.snapshot.error = Some(error);
        self.snapshot.finished_at = Some(Utc::now());
        true
    }

    /// Back to idle defaults.
    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running_state() -> (PipelineState, Uuid) {
        let mut state = PipelineState::new();
        let run_id = Uuid::new_v4();
        state.queue(run_id, "queued".to_string());
        assert!(state.begin(run_id, "starting".to_string()));
        (state, run_id)
    }

    /// error is set iff failed; finished_at is set iff terminal.
    fn assert_invariants(snapshot: &StatusSnapshot) {
        assert_eq!(
            snapshot.error.is_some(),
            snapshot.status == RunStatus::Failed
        );
        assert_eq!(snapshot.finished_at.is_some(), snapshot.status.is_terminal());
    }

    #[test]
    fn test_queue_clears_previous_run() {
        let (mut state, run_id) = running_state();
        state.advance(run_id, 40);
        state.fail(run_id, "boom".to_string());

        let next = Uuid::new_v4();
        state.queue(next, "queued again".to_string());
        let snapshot = state.snapshot();
        assert_eq!(snapshot.status, RunStatus::Queued);
        assert_eq!(snapshot.progress, 0);
        assert!(snapshot.current_stage.is_none());
        assert!(snapshot.started_at.is_none());
        assert_eq!(state.run_id(), Some(next));
        assert_invariants(&snapshot);
    }

    #[test]
    fn test_begin_requires_matching_queued_run() {
        let mut state = PipelineState::new();
        let run_id = Uuid::new_v4();
        assert!(!state.begin(run_id, "x".to_string()));

        state.queue(run_id, "queued".to_string());
        assert!(!state.begin(Uuid::new_v4(), "x".to_string()));
        assert!(state.begin(run_id, "x".to_string()));
        // Already running
        assert!(!state.begin(run_id, "x".to_string()));

        let snapshot = state.snapshot();
        assert_eq!(snapshot.status, RunStatus::Running);
        assert_eq!(snapshot.current_stage.as_deref(), Some(STAGE_STARTING));
        assert!(snapshot.started_at.is_some());
        assert_invariants(&snapshot);
    }

    #[test]
    fn test_progress_never_decreases() {
        let (mut state, run_id) = running_state();
        state.enter_stage(run_id, "prediccion", 30, "predict".to_string());
        state.advance(run_id, 50);
        state.enter_stage(run_id, "late", 20, "lower floor".to_string());
        assert_eq!(state.snapshot().progress, 50);
        state.advance(run_id, 10);
        assert_eq!(state.snapshot().progress, 50);
        state.advance(run_id, 250);
        assert_eq!(state.snapshot().progress, 100);
    }

    #[test]
    fn test_complete_sets_terminal_fields() {
        let (mut state, run_id) = running_state();
        assert!(state.complete(run_id, "done".to_string()));

        let snapshot = state.snapshot();
        assert_eq!(snapshot.status, RunStatus::Completed);
        assert_eq!(snapshot.progress, 100);
        assert_eq!(snapshot.current_stage.as_deref(), Some(STAGE_FINISHED));
        assert!(snapshot.finished_at.unwrap() >= snapshot.started_at.unwrap());
        assert_invariants(&snapshot);
    }

    #[test]
    fn test_fail_keeps_stage_and_progress() {
        let (mut state, run_id) = running_state();
        state.enter_stage(run_id, "subir_documentos", 55, "publish".to_string());
        assert!(state.fail(run_id, "subir_documentos: publish failed".to_string()));

        let snapshot = state.snapshot();
        assert_eq!(snapshot.status, RunStatus::Failed);
        assert_eq!(snapshot.progress, 55);
        assert_eq!(snapshot.current_stage.as_deref(), Some("subir_documentos"));
        assert_eq!(snapshot.message.as_deref(), Some(FAILURE_MESSAGE));
        assert_invariants(&snapshot);
    }

    #[test]
    fn test_stale_run_cannot_write() {
        let (mut state, old_run) = running_state();
        state.fail(old_run, "first failure".to_string());
        state.reset();
        let new_run = Uuid::new_v4();
        state.queue(new_run, "queued".to_string());

        state.enter_stage(old_run, "stale", 90, "stale".to_string());
        assert!(!state.complete(old_run, "stale".to_string()));
        assert!(!state.fail(old_run, "stale".to_string()));

        let snapshot = state.snapshot();
        assert_eq!(snapshot.status, RunStatus::Queued);
        assert_eq!(snapshot.progress, 0);
    }

    #[test]
    fn test_reset_restores_idle_defaults() {
        let (mut state, run_id) = running_state();
        state.complete(run_id, "done".to_string());
        state.reset();
        assert_eq!(state.snapshot(), StatusSnapshot::default());
        assert!(state.run_id().is_none());
    }
}
