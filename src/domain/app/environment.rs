use std::collections::BTreeMap;
use std::path::Path;

use super::credentials::AdminCredentials;
use crate::domain::storage::ConnectionConfig;

/// Prefix of every configuration variable the application reads
pub const ENV_PREFIX: &str = "SELFOSS_";

/// Subdirectories the application expects under its data directory
pub const DATA_SUBDIRS: [&str; 4] = ["sqlite", "cache", "thumbnails", "favicons"];

pub fn env_key(setting: &str) -> String {
    format!("{}{}", ENV_PREFIX, setting.to_uppercase())
}

/// The complete configuration handed to the application process.
///
/// Built once per spawn and passed straight to the child; the harness never
/// writes to its own process environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppEnvironment {
    vars: BTreeMap<String, String>,
}

impl AppEnvironment {
    pub fn builder() -> AppEnvironmentBuilder {
        AppEnvironmentBuilder::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct AppEnvironmentBuilder {
    vars: BTreeMap<String, String>,
}

impl AppEnvironmentBuilder {
    pub fn setting(mut self, name: &str, value: impl Into<String>) -> Self {
        self.vars.insert(env_key(name), value.into());
        self
    }

    pub fn data_dir(self, dir: &Path) -> Self {
        self.setting("datadir", dir.display().to_string())
    }

    pub fn logger(self, level: &str) -> Self {
        self.setting("logger_destination", "error_log")
            .setting("logger_level", level)
    }

    /// Username plus an already-hashed password; plaintext never lands here
    pub fn admin(self, credentials: &AdminCredentials, password_digest: String) -> Self {
        self.setting("username", credentials.username.clone())
            .setting("password", password_digest)
    }

    pub fn public(self, public: bool) -> Self {
        self.setting("public", if public { "1" } else { "0" })
    }

    pub fn storage(mut self, storage: &ConnectionConfig) -> Self {
        for (key, value) in storage.settings() {
            self = self.setting(key, value);
        }
        self
    }

    pub fn build(self) -> AppEnvironment {
        AppEnvironment { vars: self.vars }
    }
}
