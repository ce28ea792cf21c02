use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::domain::feed::{DEFAULT_FEED_LENGTH, MAX_FEED_LENGTH};
use crate::domain::storage::BackendKind;
use crate::error::{HarnessError, HarnessResult};

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Registry key of the storage backend ("sqlite", "mysql", "postgresql")
    pub storage_backend: String,
    /// Root of the application checkout (where `run.php` lives)
    pub app_root: PathBuf,
    pub php_binary: PathBuf,
    pub php_ini: Option<PathBuf>,
    pub host: String,
    /// 0 lets the OS pick a free port
    pub app_port: u16,
    pub feed_port: u16,
    pub username: String,
    pub password: String,
    pub feed_length: usize,
    pub ready_timeout: Duration,
    /// Directory under which every fixture workspace is created
    pub temp_root: PathBuf,
    pub app_log_level: String,
    pub public: bool,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            storage_backend: BackendKind::default().as_str().to_string(),
            app_root: PathBuf::from("."),
            php_binary: PathBuf::from("php"),
            php_ini: None,
            host: "127.0.0.1".to_string(),
            app_port: 0,
            feed_port: 0,
            username: "admin".to_string(),
            password: "hunter2".to_string(),
            feed_length: DEFAULT_FEED_LENGTH,
            ready_timeout: Duration::from_secs(30),
            temp_root: env::temp_dir(),
            app_log_level: "DEBUG".to_string(),
            public: true,
            log_format: LogFormat::Pretty,
        }
    }
}

impl HarnessConfig {
    pub fn from_env() -> HarnessResult<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let config = HarnessConfig {
            storage_backend: env::var("SELFOSS_TEST_STORAGE_BACKEND")
                .map(|s| s.trim().to_lowercase())
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.storage_backend),
            app_root: env::var("SELFOSS_TEST_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.app_root),
            php_binary: env::var("SELFOSS_TEST_PHP")
                .map(PathBuf::from)
                .unwrap_or(defaults.php_binary),
            php_ini: env::var("SELFOSS_TEST_PHP_INI").ok().map(PathBuf::from),
            host: env::var("SELFOSS_TEST_HOST").unwrap_or(defaults.host),
            app_port: parse_var("SELFOSS_TEST_APP_PORT", defaults.app_port)?,
            feed_port: parse_var("SELFOSS_TEST_FEED_PORT", defaults.feed_port)?,
            username: env::var("SELFOSS_TEST_USERNAME").unwrap_or(defaults.username),
            password: env::var("SELFOSS_TEST_PASSWORD").unwrap_or(defaults.password),
            feed_length: parse_var("SELFOSS_TEST_FEED_LENGTH", defaults.feed_length)?,
            ready_timeout: Duration::from_secs(parse_var(
                "SELFOSS_TEST_READY_TIMEOUT_SECS",
                defaults.ready_timeout.as_secs(),
            )?),
            temp_root: env::var("SELFOSS_TEST_TMPDIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.temp_root),
            app_log_level: env::var("SELFOSS_TEST_APP_LOG_LEVEL")
                .unwrap_or(defaults.app_log_level),
            public: env::var("SELFOSS_TEST_PUBLIC")
                .map(|s| matches!(s.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.public),
            log_format: env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .parse::<String>()
                .map(|s| match s.as_str() {
                    "json" => LogFormat::Json,
                    _ => LogFormat::Pretty,
                })
                .unwrap_or(LogFormat::Pretty),
        };

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> HarnessResult<()> {
        if self.feed_length == 0 || self.feed_length > MAX_FEED_LENGTH {
            return Err(HarnessError::Config(format!(
                "feed length must be between 1 and {}, got {}",
                MAX_FEED_LENGTH, self.feed_length
            )));
        }
        if self.username.is_empty() {
            return Err(HarnessError::Config("admin username is empty".to_string()));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> HarnessResult<T> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| HarnessError::Config(format!("{} has an invalid value: {}", name, raw))),
        Err(_) => Ok(default),
    }
}
