//! Shutdown signal handling.

use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::health::{HealthEscalator, HealthStatus};

/// Resolve on SIGINT or SIGTERM, after marking the process `Down` and
/// cancelling `token`.
pub async fn shutdown_signal(health: HealthEscalator, token: CancellationToken) {
    shutdown_on(os_signal(), health, token).await;
}

/// Wait for `signal`, then mark the process `Down` and cancel `token`.
pub async fn shutdown_on<F>(signal: F, health: HealthEscalator, token: CancellationToken)
where
    F: Future<Output = ()>,
{
    signal.await;
    health.raise(HealthStatus::Down).await;
    token.cancel();
    info!("shutting down, draining in-flight requests");
}

async fn os_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received ctrl-c"),
        () = terminate => info!("received SIGTERM"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn signal_marks_down_and_cancels() {
        let health = HealthEscalator::new();
        let token = CancellationToken::new();
        shutdown_on(std::future::ready(()), health.clone(), token.clone()).await;
        assert_eq!(health.get().await, HealthStatus::Down);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn down_overrides_critical() {
        let health = HealthEscalator::new();
        health.raise(HealthStatus::Critical).await;
        shutdown_on(std::future::ready(()), health.clone(), CancellationToken::new()).await;
        assert_eq!(health.get().await, HealthStatus::Down);
    }

    #[tokio::test]
    async fn nothing_happens_before_the_signal() {
        let health = HealthEscalator::new();
        let token = CancellationToken::new();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let task = tokio::spawn(shutdown_on(
            async {
                let _ = rx.await;
            },
            health.clone(),
            token.clone(),
        ));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(health.get().await, HealthStatus::Healthy);
        assert!(!token.is_cancelled());

        tx.send(()).unwrap();
        task.await.unwrap();
        assert_eq!(health.get().await, HealthStatus::Down);
        assert!(token.is_cancelled());
    }
}
