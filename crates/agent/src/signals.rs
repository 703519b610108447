use application::packet_pipeline::PipelineCommand;
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

// ── Shutdown ────────────────────────────────────────────────────────

/// Token cancelled on the first SIGINT or SIGTERM. The pipeline stops
/// pulling chunks and drains what it already classified.
pub fn create_shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        let name = shutdown_signal().await;
        info!(signal = name, "shutdown requested, draining pipeline");
        trigger.cancel();
    });

    token
}

async fn shutdown_signal() -> &'static str {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => "SIGINT",
        () = terminate => "SIGTERM",
    }
}

// ── Burst boundary ──────────────────────────────────────────────────

/// Forward every SIGUSR1 to the pipeline as a burst quota reset until
/// `cancel` fires or the pipeline is gone.
#[cfg(unix)]
pub fn spawn_quota_reset_listener(
    commands: mpsc::Sender<PipelineCommand>,
    cancel: CancellationToken,
) {
    use signal::unix::{SignalKind, signal as unix_signal};

    let mut usr1 = match unix_signal(SignalKind::user_defined1()) {
        Ok(stream) => stream,
        Err(e) => {
            warn!(error = %e, "SIGUSR1 handler unavailable, external quota resets disabled");
            return;
        }
    };

    tokio::spawn(async move {
        info!("send SIGUSR1 to reset the burst quota");
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                received = usr1.recv() => {
                    if received.is_none() || !forward_reset(&commands).await {
                        break;
                    }
                }
            }
        }
    });
}

#[cfg(not(unix))]
pub fn spawn_quota_reset_listener(
    _commands: mpsc::Sender<PipelineCommand>,
    _cancel: CancellationToken,
) {
    warn!("external quota resets need SIGUSR1, which this platform lacks");
}

/// Returns `false` once the pipeline stopped accepting commands.
async fn forward_reset(commands: &mpsc::Sender<PipelineCommand>) -> bool {
    match commands.send(PipelineCommand::ResetQuota).await {
        Ok(()) => {
            info!("burst quota reset requested");
            true
        }
        Err(_) => {
            warn!("pipeline stopped, ignoring quota reset");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reset_is_forwarded_as_pipeline_command() {
        let (tx, mut rx) = mpsc::channel(1);
        assert!(forward_reset(&tx).await);
        assert_eq!(rx.recv().await, Some(PipelineCommand::ResetQuota));
    }

    #[tokio::test]
    async fn reset_after_pipeline_stop_is_refused() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        assert!(!forward_reset(&tx).await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn listener_stops_on_cancel() {
        let (tx, mut rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        spawn_quota_reset_listener(tx, cancel.clone());
        cancel.cancel();
        // listener task drops its sender once it sees the cancellation
        let closed = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv()).await;
        assert_eq!(closed.unwrap(), None);
    }
}
