//! Capability contracts the pipeline runner calls through.
//!
//! Every operation is all-or-nothing: `Ok` means the unit of work is done,
//! any `Err` aborts the run. Implementations may log or retry internally.

use async_trait::async_trait;
use std::time::Duration;

use super::error::CollaboratorError;
use super::types::{DocumentCategory, PreprocessReport};

/// Remote document storage.
#[async_trait]
pub trait StorageTransfer: Send + Sync {
    /// Downloads a remote collection into the local workspace.
    async fn fetch(&self, collection: &str) -> Result<(), CollaboratorError>;

    /// Uploads a local folder into a remote folder.
    async fn publish(&self, local_folder: &str, remote_folder: &str)
        -> Result<(), CollaboratorError>;

    /// Moves the current period's documents into the historical store.
    async fn archive_current_period(&self) -> Result<(), CollaboratorError>;

    /// Removes remote files in `folder` younger than `max_age`.
    ///
    /// When `permanent` is false files go to the provider's trash.
    async fn purge_remote(
        &self,
        folder: &str,
        max_age: Duration,
        permanent: bool,
    ) -> Result<(), CollaboratorError>;
}

/// Classification model.
#[async_trait]
pub trait Inference: Send + Sync {
    /// Classifies the downloaded invoices and extracts their fields.
    async fn predict(&self) -> Result<(), CollaboratorError>;

    /// Prepares the training and test sets.
    async fn preprocess(&self) -> Result<PreprocessReport, CollaboratorError>;

    /// Writes the output of the last `preprocess` call to disk.
    async fn persist_preprocessed(&self) -> Result<(), CollaboratorError>;

    /// Trains the classification model.
    async fn train(&self) -> Result<(), CollaboratorError>;
}

/// Optical character recognition over one category folder.
#[async_trait]
pub trait Recognizer: Send + Sync {
    async fn recognize(&self, category: DocumentCategory) -> Result<(), CollaboratorError>;
}

/// Removal of transient local folders.
#[async_trait]
pub trait LocalCleanup: Send + Sync {
    async fn remove_local_folder(&self, name: &str) -> Result<(), CollaboratorError>;
}

/// Relational store for extracted order data.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts the order total, or updates it if the order already exists.
    async fn upsert_order_total(
        &self,
        order_id: i64,
        total: &str,
        category: DocumentCategory,
    ) -> Result<(), CollaboratorError>;

    /// Replaces every line of an order with the given items.
    async fn replace_order_lines(
        &self,
        order_id: i64,
        date: &str,
        items: &[String],
        quantities: &[String],
        totals: &[String],
        category: DocumentCategory,
    ) -> Result<(), CollaboratorError>;
}
