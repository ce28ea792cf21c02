pub mod config;
pub mod db;
pub mod http;
pub mod process;
pub mod readiness;
pub mod storage;
pub mod workspace;
