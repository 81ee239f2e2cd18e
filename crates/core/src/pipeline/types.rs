//! Types for the pipeline state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stage label published while a run is being set up.
pub const STAGE_STARTING: &str = "iniciando";

/// Stage label published once a run has completed.
pub const STAGE_FINISHED: &str = "finalizado";

/// The two pipeline kinds served by this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineKind {
    /// Monthly invoice processing.
    Invoice,
    /// Classification model training.
    Training,
}

impl PipelineKind {
    pub const ALL: [PipelineKind; 2] = [Self::Invoice, Self::Training];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invoice => "invoice",
            Self::Training => "training",
        }
    }

    /// HTTP path segment the pipeline is served under.
    pub fn route(&self) -> &'static str {
        match self {
            Self::Invoice => "procesar_facturas",
            Self::Training => "train_model",
        }
    }

    /// Human readable name used in status messages.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Invoice => "Invoice processing",
            Self::Training => "Model training",
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a pipeline.
///
/// Valid transitions:
/// - `Idle` -> `Queued` (trigger)
/// - `Queued` -> `Running` (runner picks the run up)
/// - `Running` -> `Completed` | `Failed`
/// - `Queued` | `Completed` | `Failed` -> `Idle` (reset)
///
/// The serialized values are the ones status pollers already understand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunStatus {
    #[default]
    #[serde(rename = "inactivo")]
    Idle,
    #[serde(rename = "en_cola")]
    Queued,
    #[serde(rename = "ejecutando")]
    Running,
    #[serde(rename = "completado")]
    Completed,
    #[serde(rename = "error")]
    Failed,
}

impl RunStatus {
    pub const ALL: [RunStatus; 5] = [
        Self::Idle,
        Self::Queued,
        Self::Running,
        Self::Completed,
        Self::Failed,
    ];

    /// Whether a run has been admitted and has not finished yet.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Queued | Self::Running)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of a pipeline's state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    #[serde(rename = "estado")]
    pub status: RunStatus,
    /// Label of the active stage.
    #[serde(rename = "etapa_actual")]
    pub current_stage: Option<String>,
    /// Percentage, 0-100.
    #[serde(rename = "progreso")]
    pub progress: u8,
    #[serde(rename = "mensaje")]
    pub message: Option<String>,
    #[serde(rename = "inicio")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(rename = "fin")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Fault description, only set when the run failed.
    pub error: Option<String>,
}

/// Errors returned synchronously by trigger and reset.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A run is in progress.
    #[error("cannot {action} the {pipeline} pipeline while a run is {status}")]
    Conflict {
        pipeline: PipelineKind,
        action: &'static str,
        status: RunStatus,
    },
}

impl PipelineError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
