//! One disposable environment per test case.
//!
//! Startup order is storage backend, application, synthetic feed server,
//! then a readiness poll of the application. Teardown runs in exactly the
//! reverse order and always visits every component, also when startup
//! failed halfway or the scenario panicked.

use futures::FutureExt;
use std::future::Future;
use std::net::{SocketAddr, TcpListener};
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use uuid::Uuid;

use crate::client::ApiClient;
use crate::domain::app::AdminCredentials;
use crate::domain::storage::{BackendKind, StorageBackend};
use crate::error::{HarnessError, HarnessResult};
use crate::infrastructure::config::HarnessConfig;
use crate::infrastructure::http::FeedServer;
use crate::infrastructure::process::{AppProcess, AppSettings};
use crate::infrastructure::readiness::wait_until_ready;
use crate::infrastructure::storage::{BackendOptions, BackendRegistry};

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// What a scenario gets to see of a running fixture
#[derive(Debug, Clone)]
pub struct FixtureEnv {
    pub id: Uuid,
    pub backend: BackendKind,
    pub app_url: String,
    pub feed_url: String,
    pub credentials: AdminCredentials,
    pub feed_length: usize,
}

impl FixtureEnv {
    /// A fresh, anonymous API client for the application
    pub fn client(&self) -> HarnessResult<ApiClient> {
        ApiClient::new(&self.app_url)
    }
}

#[derive(Default)]
struct Components {
    backend: Option<Box<dyn StorageBackend>>,
    app: Option<AppProcess>,
    feed: Option<FeedServer>,
}

impl Components {
    /// Stops everything that exists, newest first. Every step runs; the first
    /// error is returned afterwards.
    async fn shutdown(&mut self, fixture: Uuid) -> HarnessResult<()> {
        let mut first_error = None;

        if let Some(mut feed) = self.feed.take() {
            if let Err(e) = feed.stop().await {
                tracing::error!(%fixture, error = %e, "Failed to stop feed server");
                first_error.get_or_insert(e);
            }
        }
        if let Some(mut app) = self.app.take() {
            if let Err(e) = app.stop().await {
                tracing::error!(%fixture, error = %e, "Failed to stop application");
                first_error.get_or_insert(e);
            }
        }
        if let Some(mut backend) = self.backend.take() {
            if let Err(e) = backend.stop().await {
                tracing::error!(%fixture, backend = %backend.kind(), error = %e, "Failed to stop storage backend");
                first_error.get_or_insert(e);
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}

pub struct Fixture {
    env: FixtureEnv,
    components: Components,
}

impl Fixture {
    pub async fn start(config: &HarnessConfig) -> HarnessResult<Self> {
        Self::start_with(config, &BackendRegistry::default()).await
    }

    /// Starts a fixture resolving the backend through `registry`
    pub async fn start_with(config: &HarnessConfig, registry: &BackendRegistry) -> HarnessResult<Self> {
        config.validate()?;

        let id = Uuid::new_v4();
        let mut components = Components::default();

        tracing::info!(fixture = %id, backend = %config.storage_backend, "Starting fixture");

        match launch(id, config, registry, &mut components).await {
            Ok(env) => {
                tracing::info!(fixture = %id, app_url = %env.app_url, feed_url = %env.feed_url, "Fixture ready");
                Ok(Self { env, components })
            }
            Err(err) => {
                tracing::error!(fixture = %id, error = %err, "Fixture startup failed, tearing down");
                if let Err(teardown) = components.shutdown(id).await {
                    tracing::warn!(fixture = %id, error = %teardown, "Teardown after failed startup was incomplete");
                }
                Err(err)
            }
        }
    }

    pub fn env(&self) -> &FixtureEnv {
        &self.env
    }

    /// Tears the fixture down in reverse startup order
    pub async fn teardown(mut self) -> HarnessResult<()> {
        tracing::info!(fixture = %self.env.id, "Tearing down fixture");
        self.components.shutdown(self.env.id).await
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        let components = &self.components;
        if components.feed.is_some() || components.app.is_some() || components.backend.is_some() {
            tracing::warn!(fixture = %self.env.id, "Fixture dropped without teardown");
        }
    }
}

async fn launch(
    id: Uuid,
    config: &HarnessConfig,
    registry: &BackendRegistry,
    components: &mut Components,
) -> HarnessResult<FixtureEnv> {
    let options = BackendOptions {
        temp_root: config.temp_root.clone(),
        ready_timeout: config.ready_timeout,
    };
    let backend = components
        .backend
        .insert(registry.create(&config.storage_backend, &options)?);
    backend.start().await?;
    let backend_kind = backend.kind();
    let storage = backend.config();

    let credentials = AdminCredentials::new(config.username.clone(), config.password.clone());
    let app = components.app.insert(AppProcess::new(AppSettings {
        root: config.app_root.clone(),
        credentials: credentials.clone(),
        php_binary: config.php_binary.clone(),
        php_ini: config.php_ini.clone(),
        temp_root: config.temp_root.clone(),
        log_level: config.app_log_level.clone(),
        public: config.public,
    }));
    let address = reserve_address(&config.host, config.app_port)?;
    app.start(address, storage).await?;
    let app_url = format!("http://{}", address);

    let feed = components.feed.insert(
        FeedServer::start(&config.host, config.feed_port, config.feed_length).await?,
    );
    let feed_url = feed.feed_url();

    let app: &AppProcess = components
        .app
        .as_ref()
        .ok_or_else(|| HarnessError::Config("application missing after launch".to_string()))?;
    let probe = reqwest::Client::builder().timeout(PROBE_TIMEOUT).build()?;
    wait_until_ready("application", config.ready_timeout, || {
        let alive = app.ensure_alive();
        let request = probe.get(&app_url).send();
        async move {
            alive?;
            // Any HTTP answer means the server is accepting connections.
            Ok(request.await.is_ok())
        }
    })
    .await?;

    tracing::debug!(fixture = %id, %address, "Application answered readiness probe");

    Ok(FixtureEnv {
        id,
        backend: backend_kind,
        app_url,
        feed_url,
        credentials,
        feed_length: config.feed_length,
    })
}

/// Picks a concrete address for the application. Port 0 asks the OS for a
/// free port, which is released again just before the child binds it.
fn reserve_address(host: &str, port: u16) -> HarnessResult<SocketAddr> {
    let listener = TcpListener::bind((host, port))?;
    Ok(listener.local_addr()?)
}

/// Runs `scenario` against a fresh fixture and tears it down afterwards,
/// whatever the scenario did. A panicking scenario is resumed after teardown.
pub async fn run_scenario<F, Fut, T>(config: &HarnessConfig, scenario: F) -> HarnessResult<T>
where
    F: FnOnce(FixtureEnv) -> Fut,
    Fut: Future<Output = T>,
{
    let fixture = Fixture::start(config).await?;
    let outcome = AssertUnwindSafe(scenario(fixture.env().clone()))
        .catch_unwind()
        .await;
    let teardown = fixture.teardown().await;

    match outcome {
        Ok(value) => teardown.map(|_| value),
        Err(panic) => {
            if let Err(e) = teardown {
                tracing::error!(error = %e, "Teardown failed after scenario panic");
            }
            std::panic::resume_unwind(panic)
        }
    }
}
