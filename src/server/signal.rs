// Signal handling module
//
// Supported signals:
// - SIGINT:  Graceful shutdown (Ctrl+C)
// - SIGTERM: Graceful shutdown (Unix only)

use std::sync::Arc;
use tokio::sync::Notify;

use crate::error::ServerError;
use crate::logger;

/// Register shutdown signal handlers and forward the first one to `shutdown`.
///
/// Handlers are registered before this returns, so a registration failure
/// surfaces as a startup error. `notify_one` stores a permit, so a signal
/// arriving before the accept loop starts waiting is not lost.
#[cfg(unix)]
pub fn start_signal_handler(shutdown: Arc<Notify>) -> Result<(), ServerError> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt()).map_err(ServerError::Signal)?;
    let mut sigterm = signal(SignalKind::terminate()).map_err(ServerError::Signal)?;

    tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => logger::log_signal("SIGINT"),
            _ = sigterm.recv() => logger::log_signal("SIGTERM"),
        }
        shutdown.notify_one();
    });

    Ok(())
}

/// Non-Unix fallback - only handles Ctrl+C
#[cfg(not(unix))]
pub fn start_signal_handler(shutdown: Arc<Notify>) -> Result<(), ServerError> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                logger::log_signal("Ctrl+C");
                shutdown.notify_one();
            }
            Err(e) => logger::log_error(&format!("Failed to listen for Ctrl+C: {e}")),
        }
    });

    Ok(())
}
