use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::HarnessError;

/// Storage engines a fixture can be provisioned with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Sqlite,
    #[serde(rename = "mysql")]
    MySql,
    #[serde(rename = "postgresql")]
    PostgreSql,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::MySql => "mysql",
            Self::PostgreSql => "postgresql",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sqlite" => Ok(Self::Sqlite),
            "mysql" => Ok(Self::MySql),
            "postgresql" => Ok(Self::PostgreSql),
            other => Err(HarnessError::UnknownBackend(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerEngine {
    #[serde(rename = "mysql")]
    MySql,
    #[serde(rename = "pgsql")]
    PostgreSql,
}

impl ServerEngine {
    /// Value of the application's `db_type` setting
    pub fn db_type(&self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::PostgreSql => "pgsql",
        }
    }
}

/// How a networked engine is reached. Both are private to the fixture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerEndpoint {
    /// Path of the unix socket file (MySQL)
    Socket(PathBuf),
    /// Directory holding the unix socket (PostgreSQL)
    SocketDir(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerConnection {
    pub engine: ServerEngine,
    pub endpoint: ServerEndpoint,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub database: String,
}

/// Connection settings a backend hands to the application
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConnectionConfig {
    EmbeddedFile { file: PathBuf },
    NetworkedServer(ServerConnection),
}

impl ConnectionConfig {
    pub fn db_type(&self) -> &'static str {
        match self {
            Self::EmbeddedFile { .. } => "sqlite",
            Self::NetworkedServer(server) => server.engine.db_type(),
        }
    }

    /// Flattens the config into the application's lower-case storage keys
    pub fn settings(&self) -> Vec<(&'static str, String)> {
        let mut settings = vec![("db_type", self.db_type().to_string())];

        match self {
            Self::EmbeddedFile { file } => {
                settings.push(("db_file", file.display().to_string()));
            }
            Self::NetworkedServer(server) => {
                match &server.endpoint {
                    ServerEndpoint::Socket(path) => {
                        settings.push(("db_socket", path.display().to_string()))
                    }
                    ServerEndpoint::SocketDir(dir) => {
                        settings.push(("db_host", dir.display().to_string()))
                    }
                }
                settings.push(("db_username", server.username.clone()));
                if let Some(password) = &server.password {
                    settings.push(("db_password", password.clone()));
                }
                settings.push(("db_database", server.database.clone()));
            }
        }

        settings
    }
}
