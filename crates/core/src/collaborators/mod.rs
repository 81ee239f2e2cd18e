//! External capabilities the pipeline runner calls through.
//!
//! The runner only sees the traits in this module:
//! - [`StorageTransfer`]: remote document storage (fetch, publish, archive, purge)
//! - [`Inference`]: classification model (predict, preprocess, train)
//! - [`Recognizer`]: OCR over a document category
//! - [`LocalCleanup`]: removal of transient local folders
//! - [`OrderStore`]: relational persistence of recognized orders
//!
//! Shipped adapters run external commands ([`CommandCollaborator`]), remove
//! folders from the workspace ([`FsLocalCleanup`]) and store orders in SQLite
//! ([`SqliteOrderStore`]).

mod command;
mod error;
mod fs_cleanup;
mod sqlite_orders;
mod traits;
mod types;

use std::sync::Arc;

pub use command::CommandCollaborator;
pub use error::CollaboratorError;
pub use fs_cleanup::FsLocalCleanup;
pub use sqlite_orders::{parse_amount, SqliteOrderStore};
pub use traits::{Inference, LocalCleanup, OrderStore, Recognizer, StorageTransfer};
pub use types::{DocumentCategory, PreprocessReport, RecognizedOrder};

/// The set of collaborators one pipeline runner works with.
#[derive(Clone)]
pub struct Collaborators {
    pub storage: Arc<dyn StorageTransfer>,
    pub inference: Arc<dyn Inference>,
    pub recognizer: Arc<dyn Recognizer>,
    pub cleanup: Arc<dyn LocalCleanup>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
