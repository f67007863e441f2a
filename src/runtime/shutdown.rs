use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const PERIODIC_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

pub(super) struct ShutdownContext {
    pub(super) periodic_shutdown: CancellationToken,
    pub(super) periodic_handle: JoinHandle<()>,
}

/// Cancel the sync task and wait (bounded) for the in-flight cycle.
///
/// Cancellation aborts a cycle between sub-ranges or during a backoff sleep;
/// an abandoned cycle commits nothing, so the watermark stays consistent.
pub(super) async fn graceful_shutdown(context: ShutdownContext) {
    let ShutdownContext {
        periodic_shutdown,
        mut periodic_handle,
    } = context;

    tracing::info!("Shutting down gracefully...");

    periodic_shutdown.cancel();
    wait_for_shutdown_task(
        "access_log_sync",
        PERIODIC_SHUTDOWN_TIMEOUT,
        &mut periodic_handle,
        true,
    )
    .await;

    tracing::info!("Shutdown complete");
}

async fn wait_for_shutdown_task(
    task: &str,
    timeout: Duration,
    handle: &mut JoinHandle<()>,
    abort_on_timeout: bool,
) {
    match tokio::time::timeout(timeout, &mut *handle).await {
        Ok(Ok(())) => {}
        Ok(Err(error)) => tracing::error!(task, error = ?error, "Shutdown task panicked"),
        Err(_) if abort_on_timeout => {
            tracing::warn!(
                task,
                timeout_secs = timeout.as_secs(),
                "Shutdown timeout reached, aborting task"
            );
            handle.abort();
            let _ = handle.await;
        }
        Err(_) => tracing::warn!(
            task,
            timeout_secs = timeout.as_secs(),
            "Shutdown timeout reached"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn stuck_task_is_aborted_after_timeout() {
        let mut handle = tokio::spawn(std::future::pending::<()>());

        wait_for_shutdown_task("stuck", Duration::from_secs(1), &mut handle, true).await;

        assert!(handle.is_finished());
    }

    #[tokio::test]
    async fn cooperative_task_exits_on_cancel() {
        let periodic_shutdown = CancellationToken::new();
        let periodic_handle = tokio::spawn({
            let shutdown = periodic_shutdown.clone();
            async move { shutdown.cancelled().await }
        });

        graceful_shutdown(ShutdownContext {
            periodic_shutdown: periodic_shutdown.clone(),
            periodic_handle,
        })
        .await;

        assert!(periodic_shutdown.is_cancelled());
    }
}
