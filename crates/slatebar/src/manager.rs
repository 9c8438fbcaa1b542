//! Block managers: one per configured worker instance
//!
//! A manager owns the identity of its worker, spawns the worker task behind
//! a failure barrier, caches the last rendered blocks and routes clicks.

use crate::worker::{Capability, ErasedWorker, UpdateSender};
use futures_util::FutureExt;
use slatebar_core::config::BarConfig;
use slatebar_core::protocol::Markup;
use slatebar_core::{Block, ClickEvent};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info_span, warn};

/// Color of the synthetic block shown for a failed worker
pub const ERROR_COLOR: &str = "#ff0000";

/// Identity of a manager: `<name>:<ordinal>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ManagerId {
    name: String,
    ordinal: u32,
}

impl ManagerId {
    pub fn new(name: impl Into<String>, ordinal: u32) -> Self {
        Self {
            name: name.into(),
            ordinal,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }

    /// True when `block_name` was produced by this manager
    /// (`"<name>:<ordinal>:<suffix>"`).
    pub fn owns_block(&self, block_name: &str) -> bool {
        block_name.starts_with(&format!("{self}:"))
    }
}

impl fmt::Display for ManagerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.ordinal)
    }
}

/// Hands out identities from per-name counters.
///
/// The orchestrator keeps one allocator for the life of the process, so an
/// identity is never handed out twice, not even across reloads.
#[derive(Debug, Default)]
pub struct IdentityAllocator {
    counters: HashMap<String, u32>,
}

impl IdentityAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, base: &str) -> ManagerId {
        let name = base.replace(':', "_");
        let counter = self.counters.entry(name.clone()).or_insert(0);
        let id = ManagerId::new(name, *counter);
        *counter += 1;
        id
    }
}

/// Message on a generation's update channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateSignal {
    /// Worker state changed; re-render it
    Changed(ManagerId),
    /// Worker task ended with an error or a panic
    Failed { id: ManagerId, reason: String },
}

impl UpdateSignal {
    pub fn id(&self) -> &ManagerId {
        match self {
            Self::Changed(id) => id,
            Self::Failed { id, .. } => id,
        }
    }
}

/// Bar-wide block settings applied when a worker leaves them unset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockDefaults {
    pub separator_block_width: Option<u32>,
    pub markup: Option<Markup>,
}

impl BlockDefaults {
    pub fn from_config(config: &BarConfig) -> Self {
        Self {
            separator_block_width: config.separator_width,
            markup: config.markup,
        }
    }

    fn apply(&self, block: &mut Block) {
        if block.separator_block_width.is_none() {
            block.separator_block_width = self.separator_block_width;
        }
        if block.markup.is_none() {
            block.markup = self.markup;
        }
    }
}

/// The block shown in place of a failed worker's output
pub fn error_block(id: &ManagerId) -> Block {
    Block::new(format!("E [{id}]"))
        .with_color(ERROR_COLOR)
        .with_name(format!("{id}:0"))
        .urgent()
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Wraps exactly one worker instance
pub struct BlockManager {
    id: ManagerId,
    worker: Arc<dyn ErasedWorker>,
    worker_name: &'static str,
    routes_clicks: bool,
    defaults: BlockDefaults,
    on_click: Option<String>,
    updates: Option<UpdateSender>,
    fault: Option<String>,
    cache: Option<Vec<Block>>,
}

impl BlockManager {
    pub fn new(
        id: ManagerId,
        worker: Box<dyn ErasedWorker>,
        defaults: BlockDefaults,
        on_click: Option<String>,
    ) -> Self {
        let metadata = worker.metadata();
        Self {
            id,
            worker: Arc::from(worker),
            worker_name: metadata.name,
            routes_clicks: metadata.has(Capability::ClickEvents),
            defaults,
            on_click,
            updates: None,
            fault: None,
            cache: None,
        }
    }

    pub fn id(&self) -> &ManagerId {
        &self.id
    }

    pub fn worker_name(&self) -> &'static str {
        self.worker_name
    }

    pub fn fault(&self) -> Option<&str> {
        self.fault.as_deref()
    }

    /// Spawn the worker's `run` loop.
    ///
    /// An `Err` or a panic inside the worker is logged and reported as
    /// exactly one [`UpdateSignal::Failed`]. The worker is not restarted.
    pub fn start(
        &mut self,
        update_tx: mpsc::UnboundedSender<UpdateSignal>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let updates = UpdateSender::new(self.id.clone(), update_tx);
        self.updates = Some(updates.clone());
        let worker = Arc::clone(&self.worker);
        let span = info_span!("worker", id = %self.id, kind = self.worker_name);

        tokio::spawn(
            async move {
                let outcome = AssertUnwindSafe(worker.run(updates.clone(), cancel))
                    .catch_unwind()
                    .await;
                let reason = match outcome {
                    Ok(Ok(())) => {
                        debug!("worker exited");
                        return;
                    }
                    Ok(Err(e)) => e.to_string(),
                    Err(panic) => {
                        format!("worker panicked: {}", panic_message(panic.as_ref()))
                    }
                };
                error!(%reason, "worker failed");
                updates.fail(reason);
            }
            .instrument(span),
        )
    }

    /// Current blocks, computing them if the cache was invalidated.
    pub fn render(&mut self) -> &[Block] {
        if self.cache.is_none() {
            let blocks = self.compute();
            self.cache = Some(blocks);
        }
        match &self.cache {
            Some(blocks) => blocks.as_slice(),
            None => &[],
        }
    }

    fn compute(&mut self) -> Vec<Block> {
        if self.fault.is_some() {
            return vec![error_block(&self.id)];
        }

        let worker = &self.worker;
        match std::panic::catch_unwind(AssertUnwindSafe(|| worker.render())) {
            Ok(blocks) => blocks
                .into_iter()
                .enumerate()
                .map(|(index, mut block)| {
                    let suffix = block.name.take().unwrap_or_else(|| index.to_string());
                    block.name = Some(format!("{}:{}", self.id, suffix));
                    self.defaults.apply(&mut block);
                    block
                })
                .collect(),
            Err(panic) => {
                let reason = format!("render panicked: {}", panic_message(panic.as_ref()));
                error!(id = %self.id, %reason, "worker render failed");
                self.fault = Some(reason);
                vec![error_block(&self.id)]
            }
        }
    }

    /// Drop the cache if `signal` is addressed to this manager.
    pub fn invalidate(&mut self, signal: &UpdateSignal) -> bool {
        if signal.id() != &self.id {
            return false;
        }
        if let UpdateSignal::Failed { reason, .. } = signal {
            self.fault = Some(reason.clone());
        }
        self.cache = None;
        true
    }

    pub fn matches_event(&self, event: &ClickEvent) -> bool {
        self.id.owns_block(&event.name)
    }

    /// Run the click action for `event` in its own task.
    ///
    /// The configured `on_click` command runs first, then the worker's own
    /// handler if it accepts click events. Failures are logged only.
    /// Returns `None` when there is nothing to run.
    pub fn handle_event(
        &self,
        event: &ClickEvent,
        cancel: CancellationToken,
    ) -> Option<JoinHandle<()>> {
        let command = self.on_click.clone();
        let forward = if self.routes_clicks {
            self.updates.clone()
        } else {
            None
        };
        if command.is_none() && forward.is_none() {
            return None;
        }

        let worker = Arc::clone(&self.worker);
        let event = event.clone();
        let span = info_span!("click", id = %self.id, button = %event.mouse_button());

        Some(tokio::spawn(
            async move {
                if let Some(command) = command {
                    run_click_command(&command, &event, &cancel).await;
                }
                let Some(updates) = forward else {
                    return;
                };
                let handler = worker.handle_event(&event, &updates, cancel.clone());
                let outcome = AssertUnwindSafe(handler).catch_unwind().await;
                match outcome {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => warn!(error = %e, "click handler failed"),
                    Err(panic) => {
                        warn!(panic = %panic_message(panic.as_ref()), "click handler panicked")
                    }
                }
            }
            .instrument(span),
        ))
    }
}

impl fmt::Debug for BlockManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockManager")
            .field("id", &self.id)
            .field("worker", &self.worker_name)
            .field("fault", &self.fault)
            .field("cached", &self.cache.is_some())
            .finish()
    }
}

/// Run a block's `on_click` shell command, killed on cancellation.
async fn run_click_command(command: &str, event: &ClickEvent, cancel: &CancellationToken) {
    let spawned = Command::new("sh")
        .arg("-c")
        .arg(command)
        .env("BUTTON", event.mouse_button().to_string())
        .env("X", event.x.to_string())
        .env("Y", event.y.to_string())
        .env("BLOCK_NAME", &event.name)
        .env("BLOCK_INSTANCE", event.instance.as_deref().unwrap_or(""))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn();

    let mut child = match spawned {
        Ok(child) => child,
        Err(e) => {
            warn!(error = %e, command, "failed to spawn on_click command");
            return;
        }
    };

    tokio::select! {
        status = child.wait() => match status {
            Ok(status) if status.success() => debug!(command, "on_click command finished"),
            Ok(status) => warn!(command, code = ?status.code(), "on_click command failed"),
            Err(e) => warn!(error = %e, command, "failed to wait for on_click command"),
        },
        _ = cancel.cancelled() => {
            debug!(command, "on_click command cancelled");
            let _ = child.kill().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::{Worker, WorkerError, WorkerMetadata};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Named {
        names: Vec<Option<&'static str>>,
        explode: AtomicBool,
        clicks: Mutex<u32>,
    }

    impl Named {
        fn new(names: Vec<Option<&'static str>>) -> Self {
            Self {
                names,
                explode: AtomicBool::new(false),
                clicks: Mutex::new(0),
            }
        }
    }

    impl Worker for Named {
        fn metadata(&self) -> WorkerMetadata {
            WorkerMetadata {
                name: "named",
                description: "test worker",
                capabilities: vec![Capability::ClickEvents],
            }
        }

        async fn run(
            &self,
            _updates: UpdateSender,
            cancel: CancellationToken,
        ) -> Result<(), WorkerError> {
            cancel.cancelled().await;
            Ok(())
        }

        fn render(&self) -> Vec<Block> {
            if self.explode.load(Ordering::SeqCst) {
                panic!("render exploded");
            }
            self.names
                .iter()
                .map(|name| {
                    let mut block = Block::new("x");
                    block.name = name.map(str::to_string);
                    block
                })
                .collect()
        }

        async fn handle_event(
            &self,
            _event: &ClickEvent,
            updates: &UpdateSender,
            _cancel: CancellationToken,
        ) -> Result<(), WorkerError> {
            *self.clicks.lock().unwrap() += 1;
            updates.notify();
            Ok(())
        }
    }

    fn manager(names: Vec<Option<&'static str>>) -> BlockManager {
        BlockManager::new(
            ManagerId::new("named", 0),
            Box::new(Named::new(names)),
            BlockDefaults::default(),
            None,
        )
    }

    #[test]
    fn test_allocator_counts_per_name() {
        let mut ids = IdentityAllocator::new();
        assert_eq!(ids.allocate("clock").to_string(), "clock:0");
        assert_eq!(ids.allocate("clock").to_string(), "clock:1");
        assert_eq!(ids.allocate("battery").to_string(), "battery:0");
        assert_eq!(ids.allocate("clock").to_string(), "clock:2");
    }

    #[test]
    fn test_allocator_sanitizes_colons() {
        let mut ids = IdentityAllocator::new();
        assert_eq!(ids.allocate("a:b").to_string(), "a_b:0");
    }

    #[test]
    fn test_owns_block() {
        let id = ManagerId::new("battery", 0);
        assert!(id.owns_block("battery:0:0"));
        assert!(id.owns_block("battery:0:BAT1"));
        assert!(!id.owns_block("battery:1:0"));
        assert!(!id.owns_block("battery:01:0"));
        assert!(!id.owns_block("battery:0"));
    }

    #[test]
    fn test_render_rewrites_names() {
        let mut m = manager(vec![None, Some("wifi"), None]);
        let names: Vec<_> = m
            .render()
            .iter()
            .map(|b| b.name.clone().unwrap_or_default())
            .collect();
        assert_eq!(names, vec!["named:0:0", "named:0:wifi", "named:0:2"]);
    }

    #[test]
    fn test_render_applies_defaults_without_overriding() {
        struct Preset;
        impl Worker for Preset {
            fn metadata(&self) -> WorkerMetadata {
                WorkerMetadata {
                    name: "preset",
                    description: "",
                    capabilities: vec![],
                }
            }
            async fn run(
                &self,
                _u: UpdateSender,
                _c: CancellationToken,
            ) -> Result<(), WorkerError> {
                Ok(())
            }
            fn render(&self) -> Vec<Block> {
                let mut own = Block::new("own");
                own.separator_block_width = Some(3);
                vec![own, Block::new("plain")]
            }
        }

        let defaults = BlockDefaults {
            separator_block_width: Some(15),
            markup: Some(Markup::Pango),
        };
        let mut m = BlockManager::new(
            ManagerId::new("preset", 0),
            Box::new(Preset),
            defaults,
            None,
        );
        let blocks = m.render();
        assert_eq!(blocks[0].separator_block_width, Some(3));
        assert_eq!(blocks[1].separator_block_width, Some(15));
        assert_eq!(blocks[1].markup, Some(Markup::Pango));
    }

    #[test]
    fn test_invalidate_only_own_identity() {
        let mut m = manager(vec![None]);
        m.render();
        assert!(!m.invalidate(&UpdateSignal::Changed(ManagerId::new("named", 1))));
        assert!(m.cache.is_some());
        assert!(m.invalidate(&UpdateSignal::Changed(ManagerId::new("named", 0))));
        assert!(m.cache.is_none());
    }

    #[test]
    fn test_failed_signal_yields_single_error_block() {
        let mut m = manager(vec![None, None]);
        assert_eq!(m.render().len(), 2);
        m.invalidate(&UpdateSignal::Failed {
            id: ManagerId::new("named", 0),
            reason: "boom".to_string(),
        });
        let blocks = m.render();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].full_text, "E [named:0]");
        assert_eq!(blocks[0].color.as_deref(), Some(ERROR_COLOR));
        assert_eq!(blocks[0].name.as_deref(), Some("named:0:0"));
        assert!(blocks[0].urgent);
        assert_eq!(m.fault(), Some("boom"));
    }

    #[test]
    fn test_render_panic_becomes_error_block() {
        let worker = Named::new(vec![None]);
        worker.explode.store(true, Ordering::SeqCst);
        let mut m = BlockManager::new(
            ManagerId::new("named", 3),
            Box::new(worker),
            BlockDefaults::default(),
            None,
        );
        let blocks = m.render();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].full_text, "E [named:3]");
        assert!(m.fault().unwrap().contains("render exploded"));
    }

    struct Faulty {
        panics: bool,
    }

    impl Worker for Faulty {
        fn metadata(&self) -> WorkerMetadata {
            WorkerMetadata {
                name: "faulty",
                description: "test worker",
                capabilities: vec![],
            }
        }

        async fn run(
            &self,
            _updates: UpdateSender,
            _cancel: CancellationToken,
        ) -> Result<(), WorkerError> {
            if self.panics {
                panic!("run exploded");
            }
            Err(WorkerError::runtime("sensor unplugged"))
        }

        fn render(&self) -> Vec<Block> {
            vec![Block::new("fine")]
        }
    }

    async fn failed_signals(panics: bool) -> Vec<UpdateSignal> {
        let mut m = BlockManager::new(
            ManagerId::new("faulty", 0),
            Box::new(Faulty { panics }),
            BlockDefaults::default(),
            None,
        );
        let (tx, mut rx) = mpsc::unbounded_channel();
        m.start(tx, CancellationToken::new()).await.unwrap();

        let mut signals = Vec::new();
        while let Ok(signal) = rx.try_recv() {
            signals.push(signal);
        }
        signals
    }

    #[tokio::test]
    async fn test_run_error_reports_exactly_one_failure() {
        let signals = failed_signals(false).await;
        assert_eq!(signals.len(), 1, "{signals:?}");
        match &signals[0] {
            UpdateSignal::Failed { id, reason } => {
                assert_eq!(id, &ManagerId::new("faulty", 0));
                assert!(reason.contains("sensor unplugged"), "{reason}");
            }
            other => panic!("expected a failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_run_panic_reports_exactly_one_failure() {
        let signals = failed_signals(true).await;
        assert_eq!(signals.len(), 1, "{signals:?}");
        match &signals[0] {
            UpdateSignal::Failed { id, reason } => {
                assert_eq!(id, &ManagerId::new("faulty", 0));
                assert!(reason.contains("run exploded"), "{reason}");
            }
            other => panic!("expected a failure, got {other:?}"),
        }
    }

    #[test]
    fn test_matches_event() {
        let m = manager(vec![None]);
        let hit = ClickEvent {
            name: "named:0:0".to_string(),
            ..Default::default()
        };
        let miss = ClickEvent {
            name: "named:1:0".to_string(),
            ..Default::default()
        };
        assert!(m.matches_event(&hit));
        assert!(!m.matches_event(&miss));
    }

    #[tokio::test]
    async fn test_click_reaches_worker_after_start() {
        let mut m = manager(vec![None]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let task = m.start(tx, cancel.clone());

        let event = ClickEvent {
            name: "named:0:0".to_string(),
            button: 1,
            ..Default::default()
        };
        m.handle_event(&event, cancel.clone()).unwrap().await.unwrap();
        assert_eq!(
            rx.recv().await,
            Some(UpdateSignal::Changed(ManagerId::new("named", 0)))
        );

        cancel.cancel();
        task.await.unwrap();
    }

    #[test]
    fn test_no_click_action_without_capability_or_command() {
        struct Plain;
        impl Worker for Plain {
            fn metadata(&self) -> WorkerMetadata {
                WorkerMetadata {
                    name: "plain",
                    description: "",
                    capabilities: vec![],
                }
            }
            async fn run(
                &self,
                _u: UpdateSender,
                _c: CancellationToken,
            ) -> Result<(), WorkerError> {
                Ok(())
            }
            fn render(&self) -> Vec<Block> {
                Vec::new()
            }
        }

        let m = BlockManager::new(
            ManagerId::new("plain", 0),
            Box::new(Plain),
            BlockDefaults::default(),
            None,
        );
        let handle = m.handle_event(&ClickEvent::default(), CancellationToken::new());
        assert!(handle.is_none());
    }
}
