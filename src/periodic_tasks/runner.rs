use std::{future::Future, time::Duration};

use tokio_util::sync::CancellationToken;

/// Drive `run_once` until `shutdown` fires. Each run returns the delay
/// before the next one; an in-flight run is never interrupted here.
pub(crate) async fn run_with_shutdown<F, Fut>(
    task_name: &'static str,
    shutdown: CancellationToken,
    mut run_once: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = Duration>,
{
    while !shutdown.is_cancelled() {
        let delay = run_once().await;
        iam_observability::record_task_cadence(task_name, delay);

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.cancelled() => break,
        }
    }
    tracing::info!(task = task_name, "Periodic task shutting down");
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn runs_until_cancelled() {
        let runs = Arc::new(AtomicUsize::new(0));
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn({
            let runs = Arc::clone(&runs);
            let shutdown = shutdown.clone();
            async move {
                run_with_shutdown("test_task", shutdown, || {
                    runs.fetch_add(1, Ordering::SeqCst);
                    async { Duration::from_secs(10) }
                })
                .await;
            }
        });

        tokio::time::sleep(Duration::from_secs(25)).await;
        shutdown.cancel();
        handle.await.unwrap();

        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn cancelled_token_skips_first_run() {
        let shutdown = CancellationToken::new();
        shutdown.cancel();
        let mut runs = 0;

        run_with_shutdown("test_task", shutdown, || {
            runs += 1;
            async { Duration::ZERO }
        })
        .await;

        assert_eq!(runs, 0);
    }
}
