//! Test doubles and helpers for exercising pipelines without external tools.
//!
//! # Example
//!
//! ```rust,ignore
//! use invoicer_core::testing::{wait_for_terminal, MockCollaborators};
//!
//! let mock = Arc::new(MockCollaborators::new());
//! let controller = PipelineController::new(plan, mock.collaborators(), None);
//! controller.start().await?;
//! let snapshot = wait_for_terminal(&controller, Duration::from_secs(5)).await;
//! ```

mod mock_collaborators;

pub use mock_collaborators::{MockCollaborators, RecordedCall};

use std::time::Duration;

use crate::pipeline::{PipelineController, RunStatus, StatusSnapshot};

/// Polls until the controller reports `status`, returning the last snapshot seen.
pub async fn wait_for_status(
    controller: &PipelineController,
    status: RunStatus,
    timeout: Duration,
) -> StatusSnapshot {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let snapshot = controller.status().await;
        if snapshot.status == status || tokio::time::Instant::now() >= deadline {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Polls until the current run completes or fails.
pub async fn wait_for_terminal(
    controller: &PipelineController,
    timeout: Duration,
) -> StatusSnapshot {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let snapshot = controller.status().await;
        if snapshot.status.is_terminal() || tokio::time::Instant::now() >= deadline {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
