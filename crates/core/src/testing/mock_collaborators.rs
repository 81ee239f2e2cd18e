//! Scriptable stand-in for every pipeline collaborator.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};

use crate::collaborators::{
    CollaboratorError, Collaborators, DocumentCategory, Inference, LocalCleanup,
    PreprocessReport, Recognizer, StorageTransfer,
};

/// A recorded collaborator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Operation name, as reported by `Operation::name`.
    pub operation: &'static str,
    /// Main argument of the call, if any (folder, collection or category).
    pub argument: Option<String>,
}

impl RecordedCall {
    /// `operation` or `operation:argument`.
    pub fn label(&self) -> String {
        match &self.argument {
            Some(arg) => format!("{}:{}", self.operation, arg),
            None => self.operation.to_string(),
        }
    }
}

/// Mock implementation of all collaborator traits.
///
/// Provides controllable behavior for testing:
/// - Record every call in order
/// - Fail or panic on a chosen operation
/// - Delay every call, or hold one operation until released
///
/// # Example
///
/// ```rust,ignore
/// use invoicer_core::testing::MockCollaborators;
///
/// let mock = Arc::new(MockCollaborators::new());
/// mock.fail_on("publish", "quota exceeded").await;
///
/// let controller = PipelineController::new(plan, mock.collaborators(), None);
/// controller.start().await?;
/// ```
#[derive(Default)]
pub struct MockCollaborators {
    calls: Arc<RwLock<Vec<RecordedCall>>>,
    failures: Arc<RwLock<HashMap<&'static str, String>>>,
    panics: Arc<RwLock<HashSet<&'static str>>>,
    gates: Arc<RwLock<HashMap<&'static str, watch::Sender<bool>>>>,
    delay: Arc<RwLock<Option<Duration>>>,
    preprocess_report: Arc<RwLock<PreprocessReport>>,
}

impl std::fmt::Debug for MockCollaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockCollaborators")
            .field("calls", &"<calls>")
            .field("failures", &"<failures>")
            .field("gates", &"<gates>")
            .finish()
    }
}

impl MockCollaborators {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bundles this mock as every collaborator of a pipeline.
    pub fn collaborators(self: &Arc<Self>) -> Collaborators {
        Collaborators {
            storage: self.clone(),
            inference: self.clone(),
            recognizer: self.clone(),
            cleanup: self.clone(),
        }
    }

    /// Every call to `operation` fails with `reason`.
    pub async fn fail_on(&self, operation: &'static str, reason: impl Into<String>) {
        self.failures.write().await.insert(operation, reason.into());
    }

    /// Every call to `operation` panics.
    pub async fn panic_on(&self, operation: &'static str) {
        self.panics.write().await.insert(operation);
    }

    /// Every call sleeps this long before returning.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    pub async fn set_preprocess_report(&self, report: PreprocessReport) {
        *self.preprocess_report.write().await = report;
    }

    /// Calls to `operation` block until [`release`](Self::release) is called.
    pub async fn hold(&self, operation: &'static str) {
        let (tx, _rx) = watch::channel(false);
        self.gates.write().await.insert(operation, tx);
    }

    /// Lets held calls to `operation` proceed.
    pub async fn release(&self, operation: &'static str) {
        if let Some(tx) = self.gates.write().await.remove(operation) {
            tx.send_replace(true);
        }
    }

    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.read().await.clone()
    }

    /// Call labels in order, e.g. `publish:preventivos`.
    pub async fn call_labels(&self) -> Vec<String> {
        self.calls.read().await.iter().map(RecordedCall::label).collect()
    }

    pub async fn call_count(&self, operation: &str) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    /// Waits until `operation` has been called at least once.
    pub async fn wait_for_call(&self, operation: &str, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.call_count(operation).await > 0 {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    async fn record(
        &self,
        operation: &'static str,
        argument: Option<String>,
    ) -> Result<(), CollaboratorError> {
        self.calls.write().await.push(RecordedCall {
            operation,
            argument,
        });

        let gate = self.gates.read().await.get(operation).map(|tx| tx.subscribe());
        if let Some(mut rx) = gate {
            let _ = rx.wait_for(|open| *open).await;
        }

        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.panics.read().await.contains(operation) {
            panic!("mock {} panicked", operation);
        }

        match self.failures.read().await.get(operation) {
            Some(reason) => Err(CollaboratorError::failed(operation, reason.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl StorageTransfer for MockCollaborators {
    async fn fetch(&self, collection: &str) -> Result<(), CollaboratorError> {
        self.record("fetch", Some(collection.to_string())).await
    }

    async fn publish(&self, _local_folder: &str, remote_folder: &str) -> Result<(), CollaboratorError> {
        self.record("publish", Some(remote_folder.to_string())).await
    }

    async fn archive_current_period(&self) -> Result<(), CollaboratorError> {
        self.record("archive", None).await
    }

    async fn purge_remote(
        &self,
        folder: &str,
        _max_age: Duration,
        _permanent: bool,
    ) -> Result<(), CollaboratorError> {
        self.record("purge_remote", Some(folder.to_string())).await
    }
}

#[async_trait]
impl Inference for MockCollaborators {
    async fn predict(&self) -> Result<(), CollaboratorError> {
        self.record("predict", None).await
    }

    async fn preprocess(&self) -> Result<PreprocessReport, CollaboratorError> {
        self.record("preprocess", None).await?;
        Ok(self.preprocess_report.read().await.clone())
    }

    async fn persist_preprocessed(&self) -> Result<(), CollaboratorError> {
        self.record("persist_preprocessed", None).await
    }

    async fn train(&self) -> Result<(), CollaboratorError> {
        self.record("train", None).await
    }
}

#[async_trait]
impl Recognizer for MockCollaborators {
    async fn recognize(&self, category: DocumentCategory) -> Result<(), CollaboratorError> {
        self.record("recognize", Some(category.code().to_string())).await
    }
}

#[async_trait]
impl LocalCleanup for MockCollaborators {
    async fn remove_local_folder(&self, name: &str) -> Result<(), CollaboratorError> {
        self.record("remove_local_folder", Some(name.to_string())).await
    }
}
