//! Trigger gate, status reader and reset for one pipeline kind.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::collaborators::Collaborators;
use crate::config::PipelinesConfig;
use crate::metrics::PIPELINE_TRIGGERS;

use super::plan::StagePlan;
use super::runner::PipelineRunner;
use super::state::PipelineState;
use super::types::{PipelineError, PipelineKind, RunStatus, StatusSnapshot};

/// Owns the state of one pipeline kind and schedules its runs.
///
/// At most one run is in flight (queued or running) at any time. The check and
/// the transition to queued happen under one write lock, so concurrent
/// triggers admit exactly one run.
pub struct PipelineController {
    kind: PipelineKind,
    state: Arc<RwLock<PipelineState>>,
    runner: Arc<PipelineRunner>,
}

impl PipelineController {
    pub fn new(
        plan: StagePlan,
        collaborators: Collaborators,
        step_timeout: Option<Duration>,
    ) -> Self {
        let kind = plan.kind();
        let state = Arc::new(RwLock::new(PipelineState::new()));
        let runner = PipelineRunner::new(plan, collaborators, Arc::clone(&state))
            .with_step_timeout(step_timeout);
        Self {
            kind,
            state,
            runner: Arc::new(runner),
        }
    }

    /// Builds the controller for `kind` from the pipeline section of the config.
    pub fn from_config(
        kind: PipelineKind,
        config: &PipelinesConfig,
        collaborators: Collaborators,
    ) -> Self {
        let timeout_secs = match kind {
            PipelineKind::Invoice => config.invoice.stage_timeout_secs,
            PipelineKind::Training => config.training.stage_timeout_secs,
        };
        let step_timeout = (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs));
        Self::new(StagePlan::for_kind(kind, config), collaborators, step_timeout)
    }

    pub fn kind(&self) -> PipelineKind {
        self.kind
    }

    pub fn stage_labels(&self) -> Vec<&'static str> {
        self.runner.plan().labels()
    }

    /// Admits a new run unless one is already queued or running.
    ///
    /// Returns the queued snapshot; the run itself executes in the background.
    pub async fn start(&self) -> Result<StatusSnapshot, PipelineError> {
        let run_id = Uuid::new_v4();
        let snapshot = {
            let mut state = self.state.write().await;
            let status = state.status();
            if status.is_in_flight() {
                PIPELINE_TRIGGERS
                    .with_label_values(&[self.kind.as_str(), "rejected"])
                    .inc();
                warn!(pipeline = %self.kind, %status, "Trigger rejected, run already in flight");
                return Err(PipelineError::Conflict {
                    pipeline: self.kind,
                    action: "start",
                    status,
                });
            }
            state.queue(
                run_id,
                format!("{} run added to the execution queue", self.kind.title()),
            );
            state.snapshot()
        };

        PIPELINE_TRIGGERS
            .with_label_values(&[self.kind.as_str(), "admitted"])
            .inc();
        info!(pipeline = %self.kind, %run_id, "Pipeline run queued");

        self.spawn_run(run_id);
        Ok(snapshot)
    }

    /// Runs in the background; a panic inside the run marks it failed.
    fn spawn_run(&self, run_id: Uuid) {
        let runner = Arc::clone(&self.runner);
        let state = Arc::clone(&self.state);
        let kind = self.kind;

        tokio::spawn(async move {
            let run = tokio::spawn(async move { runner.run(run_id).await });
            if let Err(e) = run.await {
                let reason = if e.is_panic() {
                    format!("run panicked: {}", panic_message(e.into_panic()))
                } else {
                    "run was cancelled".to_string()
                };
                error!(pipeline = %kind, %run_id, "Pipeline run aborted: {}", reason);
                state.write().await.fail(run_id, reason);
            }
        });
    }

    pub async fn status(&self) -> StatusSnapshot {
        self.state.read().await.snapshot()
    }

    /// Returns the pipeline to idle. Refused while a run is executing.
    ///
    /// Resetting a queued run abandons it before it starts.
    pub async fn reset(&self) -> Result<StatusSnapshot, PipelineError> {
        let mut state = self.state.write().await;
        let status = state.status();
        if status == RunStatus::Running {
            warn!(pipeline = %self.kind, "Reset rejected, run is executing");
            return Err(PipelineError::Conflict {
                pipeline: self.kind,
                action: "reset",
                status,
            });
        }
        state.reset();
        info!(pipeline = %self.kind, previous = %status, "Pipeline state reset");
        Ok(state.snapshot())
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_extracts_payload() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new("kaboom".to_string())), "kaboom");
        assert_eq!(panic_message(Box::new(42u32)), "unknown panic");
    }
}
