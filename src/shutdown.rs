use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

/// Install a shutdown handler that listens for SIGTERM and SIGINT.
///
/// Returns a `CancellationToken` that is cancelled when either signal is
/// received. `component` names what is stopping in the log line, e.g. the
/// dashboard of `cronlock web`.
pub fn install_shutdown_handler(component: &'static str) -> std::io::Result<CancellationToken> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!(component, signal = "SIGTERM", "Stopping on signal");
            }
            _ = sigint.recv() => {
                tracing::info!(component, signal = "SIGINT", "Stopping on signal");
            }
        }

        token_clone.cancel();
    });

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn token_stays_live_until_signalled() {
        let token = install_shutdown_handler("test").unwrap();
        tokio::task::yield_now().await;
        assert!(!token.is_cancelled());
    }
}
