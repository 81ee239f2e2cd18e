use std::sync::Arc;

use invoicer_core::{Config, PipelineController, PipelineKind, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    invoice: Option<Arc<PipelineController>>,
    training: Option<Arc<PipelineController>>,
}

impl AppState {
    pub fn new(
        config: Config,
        invoice: Option<Arc<PipelineController>>,
        training: Option<Arc<PipelineController>>,
    ) -> Self {
        Self {
            config,
            invoice,
            training,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    /// Controller for `kind`, if that pipeline is enabled.
    pub fn controller(&self, kind: PipelineKind) -> Option<&Arc<PipelineController>> {
        match kind {
            PipelineKind::Invoice => self.invoice.as_ref(),
            PipelineKind::Training => self.training.as_ref(),
        }
    }

    /// Controllers of every enabled pipeline.
    pub fn controllers(&self) -> impl Iterator<Item = &Arc<PipelineController>> {
        self.invoice.iter().chain(self.training.iter())
    }
}
