//! Fixed stage sequences of the invoice and training pipelines.
//!
//! Each stage publishes its label, progress floor and message before its first
//! collaborator call; each step raises progress to its ceiling once its call
//! returned success.

use std::time::Duration;

use crate::collaborators::DocumentCategory;
use crate::config::{InvoicePipelineConfig, PipelinesConfig, TrainingPipelineConfig};

use super::types::PipelineKind;

/// One collaborator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Fetch {
        collection: String,
    },
    ArchiveCurrentPeriod,
    Predict,
    Publish {
        local_folder: String,
        remote_folder: String,
    },
    Recognize {
        category: DocumentCategory,
    },
    RemoveLocalFolder {
        name: String,
    },
    PurgeRemote {
        folder: String,
        max_age: Duration,
        permanent: bool,
    },
    Preprocess,
    PersistPreprocessed,
    Train,
}

impl Operation {
    /// Operation name used in logs, metrics and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fetch { .. } => "fetch",
            Self::ArchiveCurrentPeriod => "archive",
            Self::Predict => "predict",
            Self::Publish { .. } => "publish",
            Self::Recognize { .. } => "recognize",
            Self::RemoveLocalFolder { .. } => "remove_local_folder",
            Self::PurgeRemote { .. } => "purge_remote",
            Self::Preprocess => "preprocess",
            Self::PersistPreprocessed => "persist_preprocessed",
            Self::Train => "train",
        }
    }
}

/// A collaborator call with the progress reached once it succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub operation: Operation,
    /// Replaces the stage message right before the call.
    pub message: Option<String>,
    pub ceiling: u8,
}

/// A named stage of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSpec {
    pub label: &'static str,
    pub floor: u8,
    pub message: String,
    pub steps: Vec<Step>,
}

impl StageSpec {
    pub fn new(label: &'static str, floor: u8, message: impl Into<String>) -> Self {
        Self {
            label,
            floor,
            message: message.into(),
            steps: Vec::new(),
        }
    }

    pub fn step(mut self, operation: Operation, ceiling: u8) -> Self {
        self.steps.push(Step {
            operation,
            message: None,
            ceiling,
        });
        self
    }

    pub fn step_with_message(
        mut self,
        operation: Operation,
        message: impl Into<String>,
        ceiling: u8,
    ) -> Self {
        self.steps.push(Step {
            operation,
            message: Some(message.into()),
            ceiling,
        });
        self
    }
}

/// Ordered stages of one pipeline kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePlan {
    kind: PipelineKind,
    stages: Vec<StageSpec>,
}

impl StagePlan {
    pub fn new(kind: PipelineKind, stages: Vec<StageSpec>) -> Self {
        Self { kind, stages }
    }

    pub fn for_kind(kind: PipelineKind, config: &PipelinesConfig) -> Self {
        match kind {
            PipelineKind::Invoice => Self::invoice(&config.invoice),
            PipelineKind::Training => Self::training(&config.training),
        }
    }

    /// download -> archive -> predict -> publish -> OCR -> local cleanup -> remote cleanup
    pub fn invoice(config: &InvoicePipelineConfig) -> Self {
        let period = config.period_folder.clone();
        let corrective = DocumentCategory::Corrective;
        let preventive = DocumentCategory::Preventive;

        let stages = vec![
            StageSpec::new(
                "descarga_drive",
                10,
                format!("Downloading '{}' from remote storage", period),
            )
            .step(
                Operation::Fetch {
                    collection: period.clone(),
                },
                15,
            ),
            StageSpec::new(
                "subir_historico",
                20,
                "Archiving the current period into the historical folder",
            )
            .step(Operation::ArchiveCurrentPeriod, 25),
            StageSpec::new("prediccion", 30, "Classifying invoices")
                .step(Operation::Predict, 50),
            StageSpec::new(
                "subir_documentos",
                55,
                "Publishing preventive and corrective documents",
            )
            .step(publish(preventive), 57)
            .step(publish(corrective), 60),
            StageSpec::new("procesamiento_ocr", 65, "Running OCR on corrective invoices")
                .step(
                    Operation::Recognize {
                        category: corrective,
                    },
                    70,
                )
                .step_with_message(
                    Operation::Recognize {
                        category: preventive,
                    },
                    "Running OCR on preventive invoices",
                    75,
                ),
            StageSpec::new("limpieza_local", 80, "Removing transient local folders")
                .step(remove(preventive.code()), 82)
                .step(remove(corrective.code()), 84)
                .step(remove(&period), 86),
            StageSpec::new("limpieza_drive", 90, "Purging transient remote files").step(
                Operation::PurgeRemote {
                    folder: period,
                    max_age: Duration::from_secs(config.retention_hours.saturating_mul(3600)),
                    permanent: config.permanent_purge,
                },
                95,
            ),
        ];

        Self::new(PipelineKind::Invoice, stages)
    }

    /// download -> preprocess -> train -> cleanup
    pub fn training(config: &TrainingPipelineConfig) -> Self {
        let stages = vec![
            StageSpec::new("descarga_drive", 10, "Downloading training data")
                .step(
                    Operation::Fetch {
                        collection: config.test_folder.clone(),
                    },
                    20,
                )
                .step(
                    Operation::Fetch {
                        collection: config.train_folder.clone(),
                    },
                    30,
                ),
            StageSpec::new(
                "preprocesamiento",
                40,
                "Preprocessing training and test data",
            )
            .step(Operation::Preprocess, 60)
            .step_with_message(
                Operation::PersistPreprocessed,
                "Saving preprocessed data",
                70,
            ),
            StageSpec::new("entrenamiento", 80, "Training the classification model")
                .step(Operation::Train, 90),
            StageSpec::new("limpieza", 95, "Removing temporary files")
                .step(remove(&config.test_folder), 95)
                .step(remove(&config.train_folder), 95)
                .step(remove(&config.preprocessed_folder), 100),
        ];

        Self::new(PipelineKind::Training, stages)
    }

    pub fn kind(&self) -> PipelineKind {
        self.kind
    }

    pub fn stages(&self) -> &[StageSpec] {
        &self.stages
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.label).collect()
    }
}

fn publish(category: DocumentCategory) -> Operation {
    Operation::Publish {
        local_folder: category.code().to_string(),
        remote_folder: category.remote_folder().to_string(),
    }
}

fn remove(name: &str) -> Operation {
    Operation::RemoveLocalFolder {
        name: name.to_string(),
    }
}
