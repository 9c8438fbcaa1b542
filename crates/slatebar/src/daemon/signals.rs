//! OS signal listener

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Lifecycle request for the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    /// Re-read the config and restart all workers
    Reload,
    /// Stop all workers and exit
    Terminate,
}

/// Install signal handlers and forward them as [`ControlSignal`]s.
///
/// `SIGUSR2` reloads; `SIGTERM` and `SIGINT` terminate. Handlers are
/// installed before this returns so installation failures surface here.
#[cfg(unix)]
pub fn spawn_signal_listener(tx: mpsc::Sender<ControlSignal>) -> Result<JoinHandle<()>> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigusr2 =
        signal(SignalKind::user_defined2()).context("Failed to create SIGUSR2 handler")?;
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
    let mut sigint =
        signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;

    Ok(tokio::spawn(async move {
        loop {
            let signal = tokio::select! {
                _ = sigusr2.recv() => {
                    info!("Received SIGUSR2");
                    ControlSignal::Reload
                }
                _ = sigterm.recv() => {
                    info!("Received SIGTERM");
                    ControlSignal::Terminate
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT (Ctrl+C)");
                    ControlSignal::Terminate
                }
            };
            if tx.send(signal).await.is_err() {
                debug!("Control receiver closed, stopping signal listener");
                return;
            }
        }
    }))
}

/// Install signal handlers and forward them as [`ControlSignal`]s.
///
/// Only Ctrl+C is available here; it terminates.
#[cfg(not(unix))]
pub fn spawn_signal_listener(tx: mpsc::Sender<ControlSignal>) -> Result<JoinHandle<()>> {
    Ok(tokio::spawn(async move {
        loop {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            info!("Received Ctrl+C");
            if tx.send(ControlSignal::Terminate).await.is_err() {
                debug!("Control receiver closed, stopping signal listener");
                return;
            }
        }
    }))
}
