//! Bounded waits for worker and click-handler tasks

use futures_util::future::join_all;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{info, warn};

/// How a generation's tasks ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Every task finished within the timeout
    Stopped,
    /// Some tasks were still running and have been abandoned
    TimedOut,
}

/// How the whole process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    Graceful,
    TimedOut,
    /// A second terminate request arrived while draining
    Forced,
}

impl ShutdownOutcome {
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Graceful | Self::TimedOut => 0,
            Self::Forced => 1,
        }
    }
}

impl From<StopOutcome> for ShutdownOutcome {
    fn from(outcome: StopOutcome) -> Self {
        match outcome {
            StopOutcome::Stopped => Self::Graceful,
            StopOutcome::TimedOut => Self::TimedOut,
        }
    }
}

/// Wait for already-cancelled tasks to finish.
///
/// Tasks still running after `shutdown_timeout` are detached, not aborted:
/// the caller moves on and they are left to finish on their own.
pub async fn wait_for_tasks(tasks: Vec<JoinHandle<()>>, shutdown_timeout: Duration) -> StopOutcome {
    let total = tasks.len();
    if total == 0 {
        return StopOutcome::Stopped;
    }
    info!(
        "Waiting for {} task(s) to stop (timeout: {:?})",
        total, shutdown_timeout
    );

    match timeout(shutdown_timeout, join_all(tasks)).await {
        Ok(results) => {
            let panicked = results.iter().filter(|r| r.is_err()).count();
            if panicked > 0 {
                warn!("{} task(s) ended abnormally", panicked);
            }
            info!("All {} task(s) stopped", total);
            StopOutcome::Stopped
        }
        Err(_) => {
            warn!(
                "Tasks still running after {:?}; abandoning them",
                shutdown_timeout
            );
            StopOutcome::TimedOut
        }
    }
}
