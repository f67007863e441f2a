use iam_blockchain::RemoteEventSource;
use tokio::{select, signal::unix::SignalKind};
use tokio_util::sync::CancellationToken;

use super::shutdown;
use crate::periodic_tasks::SyncTask;

/// Run the periodic sync (when enabled) until SIGINT or SIGTERM.
pub(crate) async fn run<S>(sync_task: Option<SyncTask<S>>)
where
    S: RemoteEventSource + 'static,
{
    let periodic_shutdown = CancellationToken::new();
    let periodic_handle = tokio::task::spawn({
        let shutdown = periodic_shutdown.clone();
        async move {
            match sync_task {
                Some(task) => task.run(shutdown).await,
                None => {
                    tracing::info!("Periodic sync disabled; serving cached data only");
                    shutdown.cancelled().await;
                }
            }
        }
    });

    let ctrl_c = tokio::signal::ctrl_c();
    let mut sigterm = tokio::signal::unix::signal(SignalKind::terminate())
        .expect("Failed to install SIGTERM handler");

    select! {
        _ = ctrl_c => tracing::info!("Received SIGINT, initiating shutdown..."),
        _ = sigterm.recv() => tracing::info!("Received SIGTERM, initiating shutdown..."),
    }

    shutdown::graceful_shutdown(shutdown::ShutdownContext {
        periodic_shutdown,
        periodic_handle,
    })
    .await;
}
