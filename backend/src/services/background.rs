use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Runs a side effect on the tokio runtime, detached from the request that triggered it.
///
/// The task is cut off after `timeout`. Failures and timeouts are logged under `task` and
/// never propagated; the handle resolves to whether the side effect completed successfully.
pub fn spawn_best_effort<F, E>(task: &'static str, timeout: Duration, fut: F) -> JoinHandle<bool>
where
    F: Future<Output = Result<(), E>> + Send + 'static,
    E: Display + Send + 'static,
{
    tokio::spawn(async move {
        match tokio::time::timeout(timeout, fut).await {
            Ok(Ok(())) => {
                tracing::debug!(task, "Background task completed");
                true
            }
            Ok(Err(e)) => {
                tracing::warn!(task, error = %e, "Background task failed");
                false
            }
            Err(_) => {
                tracing::warn!(
                    task,
                    timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    "Background task timed out"
                );
                false
            }
        }
    })
}
