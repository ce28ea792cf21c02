pub mod credentials;
pub mod environment;

pub use credentials::AdminCredentials;
pub use environment::{env_key, AppEnvironment, DATA_SUBDIRS, ENV_PREFIX};
