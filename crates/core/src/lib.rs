pub mod collaborators;
pub mod config;
pub mod metrics;
pub mod pipeline;
pub mod testing;

pub use collaborators::{
    CollaboratorError, Collaborators, CommandCollaborator, DocumentCategory, FsLocalCleanup,
    Inference, LocalCleanup, OrderStore, Recognizer, SqliteOrderStore, StorageTransfer,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use pipeline::{
    PipelineController, PipelineError, PipelineKind, RunStatus, StagePlan, StatusSnapshot,
};
