//! OS signal handling.
//!
//! # Responsibilities
//! - Wait for SIGINT (Ctrl+C) or SIGTERM from the supervisor
//! - Resolve a future the async tiers use for graceful shutdown
//!
//! # Design Decisions
//! - A handler that fails to install is logged and never fires

use std::future::Future;

use crate::lifecycle::Shutdown;

/// Wait for a termination signal.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
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

/// Resolve on either an OS signal or an in-process [`Shutdown`] trigger.
pub fn shutdown_or_trigger(shutdown: Option<&Shutdown>) -> impl Future<Output = ()> + Send + 'static {
    let mut receiver = shutdown.map(Shutdown::subscribe);
    async move {
        match receiver.as_mut() {
            Some(receiver) => {
                tokio::select! {
                    _ = shutdown_signal() => {},
                    _ = receiver.recv() => {
                        tracing::info!("Shutdown triggered");
                    },
                }
            }
            None => shutdown_signal().await,
        }
    }
}
