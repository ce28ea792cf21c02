use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::controllers::feed::{serve_feed, FeedState};
use crate::error::{HarnessError, HarnessResult};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Router answering every GET with the synthetic numbers feed
pub fn feed_router(length: usize) -> Router {
    Router::new()
        .route("/", get(serve_feed))
        .route("/*path", get(serve_feed))
        .with_state(FeedState { length })
        .layer(TraceLayer::new_for_http())
}

/// The synthetic upstream feed server, running on its own task.
///
/// The shutdown handle exists as soon as `start` returns, so `stop` can never
/// race the server coming up.
pub struct FeedServer {
    address: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<std::io::Result<()>>>,
}

impl FeedServer {
    pub async fn start(host: &str, port: u16, length: usize) -> HarnessResult<Self> {
        let listener = TcpListener::bind((host, port)).await?;
        let address = listener.local_addr()?;
        let (shutdown, signal) = oneshot::channel::<()>();

        let app = feed_router(length);
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    // A dropped sender counts as a stop request.
                    let _ = signal.await;
                })
                .await
        });

        tracing::info!(%address, length, "Synthetic feed server listening");

        Ok(Self {
            address,
            shutdown: Some(shutdown),
            task: Some(task),
        })
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.address)
    }

    pub fn feed_url(&self) -> String {
        format!("{}/fibonacci.xml", self.base_url())
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stops the server, aborting it if connections linger past a short grace
    pub async fn stop(&mut self) -> HarnessResult<()> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        let Some(mut task) = self.task.take() else {
            return Ok(());
        };

        let result = match tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await {
            Ok(Ok(served)) => served.map_err(HarnessError::from),
            Ok(Err(join_error)) if join_error.is_cancelled() => Ok(()),
            Ok(Err(join_error)) => Err(HarnessError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                join_error.to_string(),
            ))),
            Err(_) => {
                tracing::warn!(address = %self.address, "Feed server did not drain in time, aborting");
                task.abort();
                let _ = task.await;
                Ok(())
            }
        };

        tracing::info!(address = %self.address, "Synthetic feed server stopped");
        result
    }
}

impl Drop for FeedServer {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
