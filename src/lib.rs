//! Disposable integration-test environments for the selfoss feed reader.
//!
//! A [`fixture::Fixture`] provisions a storage backend, runs the application
//! under PHP's built-in server and serves a synthetic feed, so scenarios can
//! drive the application through [`client::ApiClient`] without touching the
//! network.

pub mod client;
pub mod controllers;
pub mod domain;
pub mod error;
pub mod fixture;
pub mod infrastructure;

pub use error::{HarnessError, HarnessResult};
