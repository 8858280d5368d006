use std::process::ExitCode;

/// Exit status after an interrupt or terminate signal (128 + SIGINT).
pub const INTERRUPTED_EXIT: u8 = 130;

/// Resolves on Ctrl-C, or SIGTERM on unix, returning the signal name.
pub async fn shutdown_signal() -> &'static str {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            // No handler could be installed; never resolve.
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}

pub fn interrupted() -> ExitCode {
    ExitCode::from(INTERRUPTED_EXIT)
}
