//! Ordered stage executor.

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::collaborators::{CollaboratorError, Collaborators};
use crate::metrics::{
    COLLABORATOR_CALLS, COLLABORATOR_CALL_DURATION, PIPELINE_RUNS, PIPELINE_RUN_DURATION,
    STAGE_DURATION,
};

use super::plan::{Operation, StagePlan};
use super::state::PipelineState;
use super::types::PipelineKind;

/// A collaborator fault attributed to the stage it happened in.
#[derive(Debug, Error)]
#[error("{stage}: {source}")]
pub struct StageFailure {
    pub stage: &'static str,
    #[source]
    pub source: CollaboratorError,
}

/// How a scheduled run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Failed(String),
    /// The queued run was reset before it started.
    Abandoned,
}

/// Executes a [`StagePlan`] once per admitted run, publishing progress into the
/// shared [`PipelineState`].
///
/// Collaborator faults never escape [`PipelineRunner::run`]; they end the run
/// in the failed state.
pub struct PipelineRunner {
    kind: PipelineKind,
    plan: StagePlan,
    collaborators: Collaborators,
    state: Arc<RwLock<PipelineState>>,
    step_timeout: Option<Duration>,
}

impl PipelineRunner {
    pub fn new(
        plan: StagePlan,
        collaborators: Collaborators,
        state: Arc<RwLock<PipelineState>>,
    ) -> Self {
        Self {
            kind: plan.kind(),
            plan,
            collaborators,
            state,
            step_timeout: None,
        }
    }

    /// Bounds every collaborator call. `None` waits indefinitely.
    pub fn with_step_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.step_timeout = timeout;
        self
    }

    pub fn plan(&self) -> &StagePlan {
        &self.plan
    }

    /// Runs the plan for the queued run `run_id`.
    pub async fn run(&self, run_id: Uuid) -> RunOutcome {
        let kind = self.kind;
        let admitted = self
            .state
            .write()
            .await
            .begin(run_id, format!("{} pipeline starting", kind.title()));
        if !admitted {
            info!(pipeline = %kind, %run_id, "Queued run was reset before it started");
            PIPELINE_RUNS
                .with_label_values(&[kind.as_str(), "abandoned"])
                .inc();
            return RunOutcome::Abandoned;
        }

        info!(pipeline = %kind, %run_id, "Pipeline run started");
        let started = Instant::now();

        let (outcome, result) = match self.execute(run_id).await {
            Ok(()) => {
                self.state.write().await.complete(
                    run_id,
                    format!("{} completed successfully", kind.title()),
                );
                info!(pipeline = %kind, %run_id, "Pipeline run completed");
                (RunOutcome::Completed, "completed")
            }
            Err(failure) => {
                let description = failure.to_string();
                error!(pipeline = %kind, %run_id, stage = failure.stage, "Pipeline run failed: {}", description);
                self.state.write().await.fail(run_id, description.clone());
                (RunOutcome::Failed(description), "failed")
            }
        };

        PIPELINE_RUNS.with_label_values(&[kind.as_str(), result]).inc();
        PIPELINE_RUN_DURATION
            .with_label_values(&[kind.as_str(), result])
            .observe(started.elapsed().as_secs_f64());

        outcome
    }

    async fn execute(&self, run_id: Uuid) -> Result<(), StageFailure> {
        for stage in self.plan.stages() {
            self.state
                .write()
                .await
                .enter_stage(run_id, stage.label, stage.floor, stage.message.clone());
            info!(pipeline = %self.kind, stage = stage.label, "{}", stage.message);

            let stage_started = Instant::now();
            for step in &stage.steps {
                if let Some(message) = &step.message {
                    self.state
                        .write()
                        .await
                        .set_message(run_id, message.clone());
                    info!(pipeline = %self.kind, stage = stage.label, "{}", message);
                }

                self.invoke(&step.operation)
                    .await
                    .map_err(|source| StageFailure {
                        stage: stage.label,
                        source,
                    })?;

                self.state.write().await.advance(run_id, step.ceiling);
            }

            STAGE_DURATION
                .with_label_values(&[self.kind.as_str(), stage.label])
                .observe(stage_started.elapsed().as_secs_f64());
        }
        Ok(())
    }

    /// Invokes one collaborator operation within the step time budget.
    async fn invoke(&self, operation: &Operation) -> Result<(), CollaboratorError> {
        let name = operation.name();
        let started = Instant::now();

        let result = match self.step_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.dispatch(operation)).await {
                Ok(result) => result,
                Err(_) => Err(CollaboratorError::Timeout {
                    operation: name.to_string(),
                    timeout_secs: limit.as_secs(),
                }),
            },
            None => self.dispatch(operation).await,
        };

        let status = match &result {
            Ok(()) => "success",
            Err(CollaboratorError::Timeout { .. }) => "timeout",
            Err(_) => "error",
        };
        COLLABORATOR_CALLS.with_label_values(&[name, status]).inc();
        COLLABORATOR_CALL_DURATION
            .with_label_values(&[name])
            .observe(started.elapsed().as_secs_f64());

        if let Err(e) = &result {
            warn!(pipeline = %self.kind, operation = name, "Collaborator call failed: {}", e);
        }
        result
    }

    async fn dispatch(&self, operation: &Operation) -> Result<(), CollaboratorError> {
        let c = &self.collaborators;
        match operation {
            Operation::Fetch { collection } => c.storage.fetch(collection).await,
            Operation::ArchiveCurrentPeriod => c.storage.archive_current_period().await,
            Operation::Predict => c.inference.predict().await,
            Operation::Publish {
                local_folder,
                remote_folder,
            } => c.storage.publish(local_folder, remote_folder).await,
            Operation::Recognize { category } => c.recognizer.recognize(*category).await,
            Operation::RemoveLocalFolder { name } => c.cleanup.remove_local_folder(name).await,
            Operation::PurgeRemote {
                folder,
                max_age,
                permanent,
            } => c.storage.purge_remote(folder, *max_age, *permanent).await,
            Operation::Preprocess => {
                let report = c.inference.preprocess().await?;
                info!(
                    pipeline = %self.kind,
                    "Preprocessing completed: {} training samples, {} test samples",
                    report.train_samples, report.test_samples
                );
                Ok(())
            }
            Operation::PersistPreprocessed => c.inference.persist_preprocessed().await,
            Operation::Train => c.inference.train().await,
        }
    }
}
