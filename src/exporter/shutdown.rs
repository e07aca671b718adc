use tracing::{error, info};

/// Resolves on SIGINT or SIGTERM (Ctrl+C elsewhere).
///
/// If a handler can't be installed the error is logged and the server keeps
/// running until the other signal arrives.
pub async fn shutdown_signal_handler() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let sigint = async {
            match signal(SignalKind::interrupt()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(err) => {
                    error!(error = %err, "failed to install SIGINT handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        let sigterm = async {
            match signal(SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(err) => {
                    error!(error = %err, "failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        tokio::select! {
            () = sigint => info!("received SIGINT"),
            () = sigterm => info!("received SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("received Ctrl+C");
    }
}
