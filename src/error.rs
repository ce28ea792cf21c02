use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

/// Main harness error type
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown storage backend type: {0}")]
    UnknownBackend(String),

    #[error("Provisioning failed: {0}")]
    Provisioning(String),

    #[error("Failed to spawn {program}: {source}")]
    ProcessSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Process {program} exited prematurely ({status})")]
    ProcessExited { program: String, status: String },

    #[error("Timed out after {waited:?} waiting for {component}")]
    ReadinessTimeout { component: String, waited: Duration },

    #[error("HTTP {status}: {text}")]
    Http {
        status: StatusCode,
        body: Option<Value>,
        text: String,
    },

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Password hashing failed: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarnessError {
    /// HTTP status of an API error, if this is one
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Request(err) => err.status(),
            _ => None,
        }
    }

    /// Parsed JSON body of an API error, if the application sent one
    pub fn body(&self) -> Option<&Value> {
        match self {
            Self::Http { body, .. } => body.as_ref(),
            _ => None,
        }
    }

    pub fn is_forbidden(&self) -> bool {
        self.status() == Some(StatusCode::FORBIDDEN)
    }

    /// Errors raised while bringing a fixture up. These abort the fixture.
    pub fn is_setup_failure(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::UnknownBackend(_)
                | Self::Provisioning(_)
                | Self::ProcessSpawn { .. }
                | Self::ProcessExited { .. }
                | Self::ReadinessTimeout { .. }
        )
    }
}

/// Custom result type for the harness
pub type HarnessResult<T> = Result<T, HarnessError>;
