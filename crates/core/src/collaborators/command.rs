//! Collaborators backed by external commands.
//!
//! Storage, inference and recognition live outside this service (drive
//! client, model code, OCR engine). Each operation maps to one configured
//! program; operation arguments are appended to the configured arguments and
//! the process runs inside the workspace directory. A zero exit status is
//! success, anything else is a failed operation.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::{CommandSpec, CommandsConfig};

use super::error::CollaboratorError;
use super::traits::{Inference, OrderStore, Recognizer, StorageTransfer};
use super::types::{DocumentCategory, PreprocessReport, RecognizedOrder};

/// Maximum number of stderr characters carried into an error.
const STDERR_TAIL_CHARS: usize = 500;

/// Runs configured commands for the storage, inference and recognition
/// collaborators.
pub struct CommandCollaborator {
    commands: CommandsConfig,
    working_dir: PathBuf,
    order_store: Option<Arc<dyn OrderStore>>,
}

impl CommandCollaborator {
    pub fn new(commands: CommandsConfig, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            commands,
            working_dir: working_dir.into(),
            order_store: None,
        }
    }

    /// Persist orders printed by the recognize command into `store`.
    pub fn with_order_store(mut self, store: Arc<dyn OrderStore>) -> Self {
        self.order_store = Some(store);
        self
    }

    /// Runs the command for `operation` and returns its stdout.
    async fn run(
        &self,
        operation: &str,
        spec: Option<&CommandSpec>,
        extra_args: &[&str],
    ) -> Result<String, CollaboratorError> {
        let spec = spec.ok_or_else(|| {
            CollaboratorError::Configuration(format!("commands.{} is not configured", operation))
        })?;

        debug!(
            "Running {} command: {} {:?} {:?}",
            operation, spec.program, spec.args, extra_args
        );

        let output = Command::new(&spec.program)
            .args(&spec.args)
            .args(extra_args)
            .envs(&spec.env)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                CollaboratorError::failed(
                    operation,
                    format!("could not start '{}': {}", spec.program, e),
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CollaboratorError::failed(
                operation,
                format!("exited with {}: {}", output.status, stderr_tail(&stderr)),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn store_orders(
        &self,
        category: DocumentCategory,
        orders: Vec<RecognizedOrder>,
    ) -> Result<(), CollaboratorError> {
        let Some(store) = &self.order_store else {
            warn!(
                "No order store configured, discarding {} recognized {} orders",
                orders.len(),
                category
            );
            return Ok(());
        };

        for order in &orders {
            store
                .replace_order_lines(
                    order.order_id,
                    &order.date,
                    &order.items,
                    &order.quantities,
                    &order.totals,
                    category,
                )
                .await?;
            store
                .upsert_order_total(order.order_id, &order.total, category)
                .await?;
        }
        info!("Stored {} recognized {} orders", orders.len(), category);
        Ok(())
    }
}

/// Keeps the last `STDERR_TAIL_CHARS` characters of a process' stderr.
fn stderr_tail(stderr: &str) -> String {
    let trimmed = stderr.trim();
    let count = trimmed.chars().count();
    if count <= STDERR_TAIL_CHARS {
        return trimmed.to_string();
    }
    trimmed.chars().skip(count - STDERR_TAIL_CHARS).collect()
}

/// Parses the JSON object lines of a command's stdout, ignoring plain log lines.
fn parse_json_lines<T: serde::de::DeserializeOwned>(
    operation: &str,
    stdout: &str,
) -> Result<Vec<T>, CollaboratorError> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with('{'))
        .map(|line| {
            serde_json::from_str(line).map_err(|e| {
                CollaboratorError::failed(operation, format!("unreadable output line: {}", e))
            })
        })
        .collect()
}

#[async_trait]
impl StorageTransfer for CommandCollaborator {
    async fn fetch(&self, collection: &str) -> Result<(), CollaboratorError> {
        self.run("fetch", self.commands.fetch.as_ref(), &[collection])
            .await
            .map(|_| ())
    }

    async fn publish(
        &self,
        local_folder: &str,
        remote_folder: &str,
    ) -> Result<(), CollaboratorError> {
        self.run(
            "publish",
            self.commands.publish.as_ref(),
            &[local_folder, remote_folder],
        )
        .await
        .map(|_| ())
    }

    async fn archive_current_period(&self) -> Result<(), CollaboratorError> {
        self.run("archive", self.commands.archive.as_ref(), &[])
            .await
            .map(|_| ())
    }

    async fn purge_remote(
        &self,
        folder: &str,
        max_age: Duration,
        permanent: bool,
    ) -> Result<(), CollaboratorError> {
        let max_age_secs = max_age.as_secs().to_string();
        let mode = if permanent { "permanent" } else { "trash" };
        self.run(
            "purge_remote",
            self.commands.purge_remote.as_ref(),
            &[folder, max_age_secs.as_str(), mode],
        )
        .await
        .map(|_| ())
    }
}

#[async_trait]
impl Inference for CommandCollaborator {
    async fn predict(&self) -> Result<(), CollaboratorError> {
        self.run("predict", self.commands.predict.as_ref(), &[])
            .await
            .map(|_| ())
    }

    async fn preprocess(&self) -> Result<PreprocessReport, CollaboratorError> {
        let stdout = self
            .run("preprocess", self.commands.preprocess.as_ref(), &[])
            .await?;
        let report = parse_json_lines::<PreprocessReport>("preprocess", &stdout)?
            .pop()
            .unwrap_or_default();
        info!(
            "Preprocessing produced {} training and {} test samples",
            report.train_samples, report.test_samples
        );
        Ok(report)
    }

    async fn persist_preprocessed(&self) -> Result<(), CollaboratorError> {
        self.run(
            "persist_preprocessed",
            self.commands.persist_preprocessed.as_ref(),
            &[],
        )
        .await
        .map(|_| ())
    }

    async fn train(&self) -> Result<(), CollaboratorError> {
        self.run("train", self.commands.train.as_ref(), &[])
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl Recognizer for CommandCollaborator {
    async fn recognize(&self, category: DocumentCategory) -> Result<(), CollaboratorError> {
        let stdout = self
            .run("recognize", self.commands.recognize.as_ref(), &[category.code()])
            .await?;
        let orders = parse_json_lines::<RecognizedOrder>("recognize", &stdout)?;
        self.store_orders(category, orders).await
    }
}
