//! Filesystem-backed local cleanup.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

use super::error::CollaboratorError;
use super::traits::LocalCleanup;

/// Removes transient folders living directly under the workspace directory.
#[derive(Debug, Clone)]
pub struct FsLocalCleanup {
    root: PathBuf,
}

impl FsLocalCleanup {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `name` under the workspace, rejecting anything that escapes it.
    fn resolve(&self, name: &str) -> Result<PathBuf, CollaboratorError> {
        let relative = Path::new(name);
        let is_plain = !name.trim().is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !is_plain {
            return Err(CollaboratorError::InvalidInput(format!(
                "'{}' is not a folder name inside the workspace",
                name
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl LocalCleanup for FsLocalCleanup {
    async fn remove_local_folder(&self, name: &str) -> Result<(), CollaboratorError> {
        let path = self.resolve(name)?;

        let metadata = match fs::metadata(&path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Folder '{}' does not exist at {:?}, nothing to remove", name, path);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        if !metadata.is_dir() {
            return Err(CollaboratorError::failed(
                "remove_local_folder",
                format!("{:?} is not a directory", path),
            ));
        }

        fs::remove_dir_all(&path).await?;
        info!("Removed local folder '{}'", name);
        Ok(())
    }
}
