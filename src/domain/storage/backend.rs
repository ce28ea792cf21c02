use async_trait::async_trait;

use super::model::{BackendKind, ConnectionConfig};
use crate::error::HarnessResult;

/// An ephemeral storage engine provisioned for a single fixture.
///
/// Implementations allocate their workspace when constructed. `stop` must be
/// safe to call after a failed or skipped `start`, and must remove the
/// workspace even when the engine refuses to shut down.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Brings the engine up and creates the application role and database.
    async fn start(&mut self) -> HarnessResult<()>;

    async fn stop(&mut self) -> HarnessResult<()>;

    /// Snapshot of the settings the application needs to connect.
    fn config(&self) -> ConnectionConfig;
}
