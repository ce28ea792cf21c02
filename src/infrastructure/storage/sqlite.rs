use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::domain::storage::{BackendKind, ConnectionConfig, StorageBackend};
use crate::error::HarnessResult;
use crate::infrastructure::workspace::TemporaryWorkspace;

/// Embedded single-file engine. The application creates the file itself.
pub struct SqliteBackend {
    workspace: TemporaryWorkspace,
    file: PathBuf,
}

impl SqliteBackend {
    pub fn new(temp_root: &Path) -> HarnessResult<Self> {
        let workspace = TemporaryWorkspace::create(temp_root, "selfoss-sqlite-")?;
        let file = workspace.join("selfoss.db");
        Ok(Self { workspace, file })
    }

    pub fn workspace(&self) -> &Path {
        self.workspace.path()
    }
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    async fn start(&mut self) -> HarnessResult<()> {
        tracing::info!(file = %self.file.display(), "Using embedded storage");
        Ok(())
    }

    async fn stop(&mut self) -> HarnessResult<()> {
        self.workspace.close()
    }

    fn config(&self) -> ConnectionConfig {
        ConnectionConfig::EmbeddedFile {
            file: self.file.clone(),
        }
    }
}
