use backon::{BackoffBuilder, ExponentialBuilder};
use std::future::Future;
use std::time::{Duration, Instant};

use crate::error::{HarnessError, HarnessResult};

const MIN_DELAY: Duration = Duration::from_millis(50);
const MAX_DELAY: Duration = Duration::from_secs(1);

/// Polls `probe` with exponential backoff until it reports ready.
///
/// The probe returns `Ok(true)` once the component is up and `Ok(false)` while
/// it is still coming up. An `Err` aborts the wait immediately. Waiting
/// longer than `timeout` fails with [`HarnessError::ReadinessTimeout`].
pub async fn wait_until_ready<F, Fut>(
    component: &str,
    timeout: Duration,
    mut probe: F,
) -> HarnessResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = HarnessResult<bool>>,
{
    let started = Instant::now();
    let mut delays = ExponentialBuilder::default()
        .with_min_delay(MIN_DELAY)
        .with_max_delay(MAX_DELAY)
        .without_max_times()
        .build();

    for attempt in 1usize.. {
        if probe().await? {
            tracing::info!(
                component = %component,
                attempt,
                elapsed_ms = %started.elapsed().as_millis(),
                "Component is ready"
            );
            return Ok(());
        }

        let elapsed = started.elapsed();
        if elapsed >= timeout {
            break;
        }

        let delay = delays
            .next()
            .unwrap_or(MAX_DELAY)
            .min(timeout.saturating_sub(elapsed));
        tracing::debug!(
            component = %component,
            attempt,
            backoff_ms = %delay.as_millis(),
            "Component not ready yet"
        );
        tokio::time::sleep(delay).await;
    }

    tracing::error!(component = %component, timeout = ?timeout, "Timed out waiting for component");
    Err(HarnessError::ReadinessTimeout {
        component: component.to_string(),
        waited: started.elapsed(),
    })
}
