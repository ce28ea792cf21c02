use once_cell::sync::Lazy;
use selfoss_harness::client::ApiClient;
use selfoss_harness::fixture::{Fixture, FixtureEnv};
use selfoss_harness::infrastructure::config::HarnessConfig;
use selfoss_harness::infrastructure::http::FeedServer;
use test_context::AsyncTestContext;


use fake_app::FakeAppServer;

pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "hunter2";
pub const FEED_LENGTH: usize = 20;

// Route harness logs through the test writer once per test binary
static TRACING: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "selfoss_harness=debug".into()),
        )
        .with_test_writer()
        .try_init();
});

pub fn init_tracing() {
    Lazy::force(&TRACING);
}

/// Checks if a command is available on the system PATH.
pub fn command_available(cmd: &str) -> bool {
    std::process::Command::new("which")
        .arg(cmd)
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

/// Configuration for running the real application, if this machine can.
///
/// Needs `SELFOSS_TEST_ROOT` to point at a checkout containing `run.php` and a
/// PHP interpreter on the PATH.
pub fn real_app_config() -> Option<HarnessConfig> {
    let config = HarnessConfig::from_env().ok()?;
    let php = config.php_binary.display().to_string();
    if config.app_root.join("run.php").is_file() && command_available(&php) {
        Some(config)
    } else {
        eprintln!("skipping: selfoss checkout or PHP interpreter not available");
        None
    }
}

/// Fake application plus the synthetic feed, both in-process
pub struct FakeAppContext {
    pub client: ApiClient,
    pub app: FakeAppServer,
    pub feed: FeedServer,
}

impl FakeAppContext {
    /// A second client with its own (anonymous) cookie jar
    pub fn anonymous_client(&self) -> ApiClient {
        ApiClient::new(&self.app.base_url()).expect("Failed to build client")
    }
}

impl AsyncTestContext for FakeAppContext {
    fn setup() -> impl std::future::Future<Output = Self> + Send {
        async {
            init_tracing();

            let feed = FeedServer::start("127.0.0.1", 0, FEED_LENGTH)
                .await
                .expect("Failed to start feed server");
            let app = FakeAppServer::start(USERNAME, PASSWORD)
                .await
                .expect("Failed to start fake application");
            let client = ApiClient::new(&app.base_url()).expect("Failed to build client");

            Self { client, app, feed }
        }
    }

    fn teardown(mut self) -> impl std::future::Future<Output = ()> + Send {
        async move {
            self.app.stop().await;
            self.feed.stop().await.expect("Failed to stop feed server");
        }
    }
}

/// A complete fixture around the real application, when available
pub struct FixtureContext {
    pub fixture: Option<Fixture>,
}

impl FixtureContext {
    pub fn env(&self) -> Option<&FixtureEnv> {
        self.fixture.as_ref().map(Fixture::env)
    }
}

impl AsyncTestContext for FixtureContext {
    fn setup() -> impl std::future::Future<Output = Self> + Send {
        async {
            init_tracing();

            let fixture = match real_app_config() {
                Some(config) => Some(
                    Fixture::start(&config)
                        .await
                        .expect("Failed to start fixture"),
                ),
                None => None,
            };

            Self { fixture }
        }
    }

    fn teardown(self) -> impl std::future::Future<Output = ()> + Send {
        async {
            if let Some(fixture) = self.fixture {
                fixture.teardown().await.expect("Fixture teardown failed");
            }
        }
    }
}
