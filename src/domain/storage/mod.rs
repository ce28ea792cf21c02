pub mod backend;
pub mod model;

pub use backend::StorageBackend;
pub use model::{BackendKind, ConnectionConfig, ServerConnection, ServerEndpoint, ServerEngine};
