use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::error::HarnessResult;

/// A scratch directory owned by one fixture component.
///
/// Every workspace gets a unique name under the configured root, so fixtures
/// running in parallel never share data directories or sockets. The tree is
/// removed on `close` or, failing that, on drop.
#[derive(Debug)]
pub struct TemporaryWorkspace {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl TemporaryWorkspace {
    pub fn create(root: &Path, prefix: &str) -> HarnessResult<Self> {
        fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new().prefix(prefix).tempdir_in(root)?;
        let path = dir.path().to_path_buf();

        tracing::debug!(path = %path.display(), "Created temporary workspace");

        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn join(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.path.join(relative)
    }

    /// Creates a subdirectory (and parents) inside the workspace
    pub fn create_dir(&self, relative: impl AsRef<Path>) -> HarnessResult<PathBuf> {
        let dir = self.join(relative);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    #[cfg(unix)]
    pub fn restrict(&self, relative: impl AsRef<Path>, mode: u32) -> HarnessResult<()> {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(self.join(relative), fs::Permissions::from_mode(mode))?;
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.dir.is_some()
    }

    /// Deletes the tree. Calling it again is a no-op.
    pub fn close(&mut self) -> HarnessResult<()> {
        if let Some(dir) = self.dir.take() {
            tracing::debug!(path = %self.path.display(), "Removing temporary workspace");
            dir.close()?;
        }
        Ok(())
    }
}
