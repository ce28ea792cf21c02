use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use selfoss_harness::fixture::Fixture;
use selfoss_harness::infrastructure::config::{HarnessConfig, LogFormat};
use selfoss_harness::infrastructure::http::FeedServer;
use selfoss_harness::infrastructure::storage::{BackendOptions, BackendRegistry};

#[derive(Parser)]
#[command(name = "selfoss-harness", about = "Disposable selfoss test environments")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a storage server for purposes of testing until interrupted
    Storage {
        /// Database backend to start (defaults to SELFOSS_TEST_STORAGE_BACKEND)
        backend: Option<String>,
    },
    /// Serve the synthetic numbers feed until interrupted
    Feed {
        #[arg(long)]
        port: Option<u16>,
        #[arg(long)]
        length: Option<usize>,
    },
    /// Bring up a complete fixture and keep it running until interrupted
    Fixture,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = HarnessConfig::from_env()?;

    // Initialize logging
    init_logging(&config);

    match cli.command {
        Command::Storage { backend } => {
            if let Some(backend) = backend {
                config.storage_backend = backend;
            }
            run_storage(&config).await
        }
        Command::Feed { port, length } => {
            let port = port.unwrap_or(config.feed_port);
            let length = length.unwrap_or(config.feed_length);
            run_feed(&config.host, port, length).await
        }
        Command::Fixture => run_fixture(&config).await,
    }
}

async fn run_storage(config: &HarnessConfig) -> anyhow::Result<()> {
    let options = BackendOptions {
        temp_root: config.temp_root.clone(),
        ready_timeout: config.ready_timeout,
    };
    let mut backend = BackendRegistry::default().create(&config.storage_backend, &options)?;

    if let Err(e) = backend.start().await {
        backend.stop().await.ok();
        return Err(e).context("failed to start storage backend");
    }

    println!("{}", serde_json::to_string_pretty(&backend.config())?);

    shutdown_signal().await;
    backend.stop().await?;
    Ok(())
}

async fn run_feed(host: &str, port: u16, length: usize) -> anyhow::Result<()> {
    let mut server = FeedServer::start(host, port, length).await?;
    println!("{}", server.feed_url());

    shutdown_signal().await;
    server.stop().await?;
    Ok(())
}

async fn run_fixture(config: &HarnessConfig) -> anyhow::Result<()> {
    let fixture = Fixture::start(config).await?;
    let env = fixture.env();
    println!("application: {}", env.app_url);
    println!("feed:        {}", env.feed_url);
    println!("backend:     {}", env.backend);

    shutdown_signal().await;
    fixture.teardown().await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

fn init_logging(config: &HarnessConfig) {
    if config.log_format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "selfoss_harness=debug,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "selfoss_harness=debug,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}
