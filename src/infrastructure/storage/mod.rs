pub mod admin;
#[cfg(unix)]
pub mod mysql;
#[cfg(unix)]
pub mod postgres;
pub mod sqlite;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::domain::storage::{BackendKind, StorageBackend};
use crate::error::{HarnessError, HarnessResult};

#[cfg(unix)]
pub use mysql::MySqlBackend;
#[cfg(unix)]
pub use postgres::PostgresBackend;
pub use sqlite::SqliteBackend;

/// Inputs every backend factory receives
#[derive(Debug, Clone)]
pub struct BackendOptions {
    pub temp_root: PathBuf,
    pub ready_timeout: Duration,
}

pub type BackendFactory = fn(&BackendOptions) -> HarnessResult<Box<dyn StorageBackend>>;

/// Maps configuration strings to backend constructors
pub struct BackendRegistry {
    factories: BTreeMap<String, BackendFactory>,
}

impl BackendRegistry {
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, factory: BackendFactory) -> &mut Self {
        self.factories.insert(name.into(), factory);
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Builds the backend registered under `name`, allocating its workspace
    pub fn create(
        &self,
        name: &str,
        options: &BackendOptions,
    ) -> HarnessResult<Box<dyn StorageBackend>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| HarnessError::UnknownBackend(name.to_string()))?;
        tracing::debug!(backend = %name, "Creating storage backend");
        factory(options)
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(BackendKind::Sqlite.as_str(), |options| {
            Ok(Box::new(SqliteBackend::new(&options.temp_root)?))
        });
        #[cfg(unix)]
        {
            registry
                .register(BackendKind::MySql.as_str(), |options| {
                    Ok(Box::new(MySqlBackend::new(options)?))
                })
                .register(BackendKind::PostgreSql.as_str(), |options| {
                    Ok(Box::new(PostgresBackend::new(options)?))
                });
        }
        registry
    }
}
