use tokio_util::sync::CancellationToken;

/// Returns a token that is cancelled when SIGINT or SIGTERM arrives.
///
/// The console `exit` command cancels the same token, so every shutdown
/// path drains the coordinator the same way.
pub fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let signalled = token.clone();

    tokio::spawn(async move {
        let sigterm = async {
            #[cfg(unix)]
            {
                use tokio::signal::unix::{signal, SignalKind};
                match signal(SignalKind::terminate()) {
                    Ok(mut stream) => {
                        stream.recv().await;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Unable to install SIGTERM handler");
                        std::future::pending::<()>().await;
                    }
                }
            }
            #[cfg(not(unix))]
            std::future::pending::<()>().await;
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupt received, shutting down");
            }
            _ = sigterm => {
                tracing::info!("SIGTERM received, shutting down");
            }
        }

        signalled.cancel();
    });

    token
}
