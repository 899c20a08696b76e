//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGTERM, SIGINT, SIGHUP)
//! - Translate signals to shutdown or reload
//!
//! # Design Decisions
//! - Registration happens up front so its failure reaches the caller
//! - SIGHUP triggers a rule reload, not shutdown
//! - Non-unix targets only get Ctrl+C

use crate::lifecycle::shutdown::Shutdown;

/// Registered signal streams, ready to be driven by [`Signals::run`].
#[derive(Debug)]
pub struct Signals {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
    #[cfg(unix)]
    hangup: tokio::signal::unix::Signal,
}

impl Signals {
    /// Install the handlers. Must be called inside a Tokio runtime.
    #[cfg(unix)]
    pub fn register() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
            hangup: signal(SignalKind::hangup())?,
        })
    }

    #[cfg(not(unix))]
    pub fn register() -> std::io::Result<Self> {
        Ok(Self {})
    }

    /// Wait for a shutdown signal, then trigger `shutdown`.
    ///
    /// `on_reload` runs on every SIGHUP.
    #[cfg(unix)]
    pub async fn run<F: Fn()>(mut self, shutdown: Shutdown, on_reload: F) {
        loop {
            tokio::select! {
                _ = self.interrupt.recv() => break,
                _ = self.terminate.recv() => break,
                received = self.hangup.recv() => {
                    if received.is_none() {
                        tracing::error!("SIGHUP stream closed, reload by signal disabled");
                        break;
                    }
                    tracing::info!("SIGHUP received, reloading rules");
                    on_reload();
                }
            }
        }
        tracing::info!("Shutdown signal received");
        shutdown.trigger();
    }

    #[cfg(not(unix))]
    pub async fn run<F: Fn()>(self, shutdown: Shutdown, _on_reload: F) {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C, shutting down");
        } else {
            tracing::info!("Shutdown signal received");
        }
        shutdown.trigger();
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::process::Command;
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_sighup_reloads_without_shutting_down() {
        let signals = Signals::register().unwrap();
        let shutdown = Shutdown::new();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let task = tokio::spawn(signals.run(shutdown.clone(), move || {
            let _ = tx.send(());
        }));

        let status = Command::new("kill")
            .args(["-HUP", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(!shutdown.is_triggered());
        task.abort();
    }
}
