//! One configuration's lifetime of managers and tasks

use super::shutdown::{StopOutcome, wait_for_tasks};
use super::watcher::{ConfigChanged, watch_config};
use crate::manager::{BlockDefaults, BlockManager, IdentityAllocator, UpdateSignal};
use crate::worker::{ErasedWorker, WorkerRegistry};
use crate::workers::StaticText;
use slatebar_core::config::{BarConfig, ConfigError, load_config_file};
use slatebar_core::{Block, ClickEvent};
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Default wait for workers when no config could be loaded
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(3000);

/// Orchestrator-level overrides that apply to every generation
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    /// Takes precedence over `shutdown_timeout_ms` from the config
    pub shutdown_timeout: Option<Duration>,
    /// When false, the config file is never watched
    pub watch_config: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            shutdown_timeout: None,
            watch_config: true,
        }
    }
}

/// Something a generation's own channels produced
#[derive(Debug)]
pub enum GenerationEvent {
    Update(UpdateSignal),
    ConfigChanged(ConfigChanged),
}

/// Managers, tasks and channels built from one load of the config.
pub struct Generation {
    managers: Vec<BlockManager>,
    cancel: CancellationToken,
    workers: Vec<JoinHandle<()>>,
    handlers: Vec<JoinHandle<()>>,
    updates_tx: mpsc::UnboundedSender<UpdateSignal>,
    updates_rx: mpsc::UnboundedReceiver<UpdateSignal>,
    config_changes: Option<mpsc::Receiver<ConfigChanged>>,
    shutdown_timeout: Duration,
}

impl Generation {
    /// Load the config and build one manager per configured block.
    ///
    /// Never fails: a config that cannot be loaded becomes a single error
    /// block, and an entry that cannot be built becomes an error block in
    /// its own slot.
    pub fn load(
        registry: &WorkerRegistry,
        ids: &mut IdentityAllocator,
        config_path: Option<&Path>,
        options: &GenerationOptions,
    ) -> Self {
        let loaded = match config_path {
            Some(path) => load_config_file(path),
            None => Err(ConfigError::NotFound),
        };
        Self::from_config(registry, ids, loaded, config_path, options)
    }

    /// Build from an already-loaded config (or the error loading it).
    pub fn from_config(
        registry: &WorkerRegistry,
        ids: &mut IdentityAllocator,
        loaded: Result<BarConfig, ConfigError>,
        config_path: Option<&Path>,
        options: &GenerationOptions,
    ) -> Self {
        let cancel = CancellationToken::new();
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let mut managers = Vec::new();

        let (watch_enabled, config_timeout) = match loaded {
            Ok(config) => {
                let defaults = BlockDefaults::from_config(&config);
                for entry in &config.blocks {
                    let id = ids.allocate(&entry.name);
                    let built = registry.build(&entry.name, &entry.settings);
                    let worker: Box<dyn ErasedWorker> = match built {
                        Ok(worker) => worker,
                        Err(e) => {
                            warn!(id = %id, error = %e, "Failed to build block");
                            Box::new(StaticText::error(format!("{}: {e}", entry.name)))
                        }
                    };
                    managers.push(BlockManager::new(
                        id,
                        worker,
                        defaults.clone(),
                        entry.on_click.clone(),
                    ));
                }
                info!("Built {} block manager(s)", managers.len());
                (config.watch_config, config.shutdown_timeout())
            }
            Err(e) => {
                error!("Failed to load config: {}", e);
                managers.push(BlockManager::new(
                    ids.allocate("static"),
                    Box::new(StaticText::error(format!("Error loading the config: {e}"))),
                    BlockDefaults::default(),
                    None,
                ));
                (true, DEFAULT_SHUTDOWN_TIMEOUT)
            }
        };

        let config_changes = match config_path {
            Some(path) if options.watch_config && watch_enabled => {
                match watch_config(path, cancel.child_token()) {
                    Ok(rx) => Some(rx),
                    Err(e) => {
                        warn!("Config watcher unavailable: {:#}", e);
                        None
                    }
                }
            }
            _ => None,
        };

        Self {
            managers,
            cancel,
            workers: Vec::new(),
            handlers: Vec::new(),
            updates_tx,
            updates_rx,
            config_changes,
            shutdown_timeout: options.shutdown_timeout.unwrap_or(config_timeout),
        }
    }

    /// Spawn every manager's worker task.
    pub fn start(&mut self) {
        for manager in &mut self.managers {
            let task = manager.start(self.updates_tx.clone(), self.cancel.child_token());
            self.workers.push(task);
        }
        debug!("Started {} worker task(s)", self.workers.len());
    }

    pub fn managers(&self) -> &[BlockManager] {
        &self.managers
    }

    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    pub fn is_watching(&self) -> bool {
        self.config_changes.is_some()
    }

    /// Wait for the next update signal or config change.
    pub async fn next_event(&mut self) -> GenerationEvent {
        tokio::select! {
            Some(signal) = self.updates_rx.recv() => GenerationEvent::Update(signal),
            Some(change) = recv_change(&mut self.config_changes) => {
                GenerationEvent::ConfigChanged(change)
            }
        }
    }

    /// Invalidate the manager the signal is addressed to.
    pub fn apply(&mut self, signal: &UpdateSignal) {
        if !self.managers.iter_mut().any(|m| m.invalidate(signal)) {
            debug!(id = %signal.id(), "Update for unknown manager");
        }
    }

    /// Apply every signal already queued; returns how many there were.
    pub fn apply_pending(&mut self) -> usize {
        let mut count = 0;
        while let Ok(signal) = self.updates_rx.try_recv() {
            self.apply(&signal);
            count += 1;
        }
        count
    }

    /// Full status line in configured order
    pub fn render(&mut self) -> Vec<Block> {
        let mut blocks = Vec::new();
        for manager in &mut self.managers {
            blocks.extend_from_slice(manager.render());
        }
        blocks
    }

    /// Route a click to every manager that owns the clicked block.
    pub fn dispatch(&mut self, event: &ClickEvent) -> usize {
        self.handlers.retain(|h| !h.is_finished());
        let mut routed = 0;
        for manager in &self.managers {
            if !manager.matches_event(event) {
                continue;
            }
            routed += 1;
            if let Some(handle) = manager.handle_event(event, self.cancel.child_token()) {
                self.handlers.push(handle);
            }
        }
        if routed == 0 {
            debug!(name = %event.name, "Click on unknown block");
        }
        routed
    }

    /// Cancel all tasks and wait for them up to `shutdown_timeout`.
    pub async fn stop(mut self, shutdown_timeout: Duration) -> StopOutcome {
        self.cancel.cancel();
        let mut tasks = std::mem::take(&mut self.workers);
        tasks.append(&mut self.handlers);
        wait_for_tasks(tasks, shutdown_timeout).await
    }
}

impl Drop for Generation {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn recv_change(rx: &mut Option<mpsc::Receiver<ConfigChanged>>) -> Option<ConfigChanged> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
