// Signal handling module
//
// - SIGTERM: graceful shutdown
// - SIGINT:  graceful shutdown (Ctrl+C)
//
// Non-Unix platforms only get Ctrl+C.

use log::{error, info};

/// Resolves once the process was asked to stop.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to register Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to register SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("SIGINT received, initiating graceful shutdown"),
        () = terminate => info!("SIGTERM received, initiating graceful shutdown"),
    }
}
