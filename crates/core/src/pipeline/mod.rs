//! Single-flight pipeline orchestration.
//!
//! A [`PipelineController`] admits at most one run per [`PipelineKind`],
//! executes its [`StagePlan`] in the background and exposes the run's
//! [`StatusSnapshot`] to concurrent readers.

mod controller;
mod plan;
mod runner;
mod state;
mod types;

pub use controller::PipelineController;
pub use plan::{Operation, StagePlan, StageSpec, Step};
pub use runner::{PipelineRunner, RunOutcome, StageFailure};
pub use state::{PipelineState, FAILURE_MESSAGE};
pub use types::{
    PipelineError, PipelineKind, RunStatus, StatusSnapshot, STAGE_FINISHED, STAGE_STARTING,
};
