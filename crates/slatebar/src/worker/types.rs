use crate::manager::{ManagerId, UpdateSignal};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::trace;

/// Worker metadata: identity and capabilities
#[derive(Debug, Clone)]
pub struct WorkerMetadata {
    pub name: &'static str,
    pub description: &'static str,
    pub capabilities: Vec<Capability>,
}

impl WorkerMetadata {
    pub fn has(&self, cap: Capability) -> bool {
        self.capabilities.contains(&cap)
    }
}

/// Optional behaviour a worker opts into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    /// Worker reads settings from its `[[blocks]]` entry
    Configurable,
    /// Worker wants click events routed to `handle_event`
    ClickEvents,
}

/// Worker errors with structured variants
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("unknown worker {name:?}")]
    Unknown { name: String },

    #[error("worker config error: {message}")]
    Config { message: String },

    #[error("worker runtime error: {message}")]
    Runtime {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("event handler error: {message}")]
    Event { message: String },
}

impl WorkerError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime {
            message: message.into(),
            source: None,
        }
    }

    pub fn runtime_with<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Runtime {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Handle a worker uses to announce that its state changed.
///
/// Each Manager hands its worker a sender already bound to the Manager's
/// identity, so a worker cannot invalidate anybody else's cache.
#[derive(Debug, Clone)]
pub struct UpdateSender {
    id: ManagerId,
    tx: mpsc::UnboundedSender<UpdateSignal>,
}

impl UpdateSender {
    pub fn new(id: ManagerId, tx: mpsc::UnboundedSender<UpdateSignal>) -> Self {
        Self { id, tx }
    }

    pub fn id(&self) -> &ManagerId {
        &self.id
    }

    /// Request a re-render. Returns false once the generation is gone.
    pub fn notify(&self) -> bool {
        let sent = self.tx.send(UpdateSignal::Changed(self.id.clone())).is_ok();
        if !sent {
            trace!(id = %self.id, "update channel closed, dropping notification");
        }
        sent
    }

    pub(crate) fn fail(&self, reason: String) -> bool {
        self.tx
            .send(UpdateSignal::Failed {
                id: self.id.clone(),
                reason,
            })
            .is_ok()
    }
}

/// Deserialize a worker's settings table into its typed config.
pub fn settings_from_table<T>(settings: &toml::Table) -> Result<T, WorkerError>
where
    T: serde::de::DeserializeOwned,
{
    toml::Value::Table(settings.clone())
        .try_into()
        .map_err(|e: toml::de::Error| WorkerError::config(e.message().to_string()))
}
