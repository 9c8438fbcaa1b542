//! Main render loop

use super::generation::{Generation, GenerationEvent, GenerationOptions};
use super::shutdown::{ShutdownOutcome, StopOutcome};
use super::signals::ControlSignal;
use crate::codec::{BarWriter, ProtocolError};
use crate::manager::IdentityAllocator;
use crate::worker::WorkerRegistry;
use anyhow::{Context, Result};
use slatebar_core::{ClickEvent, Header};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Why a generation stopped serving
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    Reload,
    Drain,
}

/// Owns the worker registry, the identity allocator and the output stream,
/// and runs one generation at a time.
pub struct Orchestrator<W> {
    registry: WorkerRegistry,
    ids: IdentityAllocator,
    config_path: Option<PathBuf>,
    options: GenerationOptions,
    header: Header,
    writer: BarWriter<W>,
    events_open: bool,
    control_open: bool,
}

impl<W: AsyncWrite + Unpin + Send> Orchestrator<W> {
    /// `config_path` of `None` means no config file could be located; the
    /// bar then shows a single error block.
    pub fn new(registry: WorkerRegistry, config_path: Option<PathBuf>, out: W) -> Self {
        Self {
            registry,
            ids: IdentityAllocator::new(),
            config_path,
            options: GenerationOptions::default(),
            header: Header::default(),
            writer: BarWriter::new(out),
            events_open: true,
            control_open: true,
        }
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_shutdown_timeout(mut self, shutdown_timeout: Duration) -> Self {
        self.options.shutdown_timeout = Some(shutdown_timeout);
        self
    }

    pub fn with_header(mut self, header: Header) -> Self {
        self.header = header;
        self
    }

    /// Run until a terminate request or until the host stops reading.
    ///
    /// Click events arrive on `events`; a closed event channel only disables
    /// click dispatch. `control` carries reload and terminate requests.
    ///
    /// # Errors
    ///
    /// Fails only if the protocol header cannot be written.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<ClickEvent>,
        mut control: mpsc::Receiver<ControlSignal>,
    ) -> Result<ShutdownOutcome> {
        self.writer
            .write_header(&self.header)
            .await
            .context("Failed to write protocol header")?;

        let mut generation = self.next_generation();
        loop {
            match self.serve(&mut generation, &mut events, &mut control).await {
                Transition::Reload => {
                    info!("Reloading configuration");
                    let shutdown_timeout = generation.shutdown_timeout();
                    if generation.stop(shutdown_timeout).await == StopOutcome::TimedOut {
                        warn!("Previous generation did not stop in time; starting anyway");
                    }
                    generation = self.next_generation();
                }
                Transition::Drain => {
                    let outcome = self.drain(generation, &mut control).await;
                    info!("Shutdown complete: {:?}", outcome);
                    return Ok(outcome);
                }
            }
        }
    }

    fn next_generation(&mut self) -> Generation {
        let mut generation = Generation::load(
            &self.registry,
            &mut self.ids,
            self.config_path.as_deref(),
            &self.options,
        );
        generation.start();
        generation
    }

    async fn serve(
        &mut self,
        generation: &mut Generation,
        events: &mut mpsc::Receiver<ClickEvent>,
        control: &mut mpsc::Receiver<ControlSignal>,
    ) -> Transition {
        if self.emit(generation).await.is_err() {
            return Transition::Drain;
        }

        loop {
            tokio::select! {
                event = generation.next_event() => match event {
                    GenerationEvent::Update(signal) => {
                        generation.apply(&signal);
                        let coalesced = generation.apply_pending();
                        if coalesced > 0 {
                            debug!("Coalesced {} extra update(s)", coalesced);
                        }
                        if self.emit(generation).await.is_err() {
                            return Transition::Drain;
                        }
                    }
                    GenerationEvent::ConfigChanged(change) => {
                        info!("Config file changed: {}", change.path.display());
                        return Transition::Reload;
                    }
                },
                click = events.recv(), if self.events_open => match click {
                    Some(event) => {
                        generation.dispatch(&event);
                    }
                    None => {
                        info!("Host input closed; click events disabled");
                        self.events_open = false;
                    }
                },
                signal = control.recv(), if self.control_open => match signal {
                    Some(ControlSignal::Reload) => return Transition::Reload,
                    Some(ControlSignal::Terminate) => return Transition::Drain,
                    None => {
                        debug!("Control channel closed");
                        self.control_open = false;
                    }
                },
            }
        }
    }

    async fn emit(&mut self, generation: &mut Generation) -> Result<(), ProtocolError> {
        let blocks = generation.render();
        self.writer.write_blocks(&blocks).await.inspect_err(|e| {
            if e.is_broken_pipe() {
                info!("Host stopped reading output; shutting down");
            } else {
                error!("Failed to write status line: {}", e);
            }
        })
    }

    async fn drain(
        &mut self,
        generation: Generation,
        control: &mut mpsc::Receiver<ControlSignal>,
    ) -> ShutdownOutcome {
        let shutdown_timeout = generation.shutdown_timeout();
        info!("Stopping workers (timeout: {:?})", shutdown_timeout);

        let stop = generation.stop(shutdown_timeout);
        tokio::pin!(stop);
        loop {
            tokio::select! {
                outcome = &mut stop => return outcome.into(),
                signal = control.recv(), if self.control_open => match signal {
                    Some(ControlSignal::Terminate) => {
                        warn!("Second terminate request; exiting immediately");
                        return ShutdownOutcome::Forced;
                    }
                    Some(ControlSignal::Reload) => debug!("Ignoring reload during shutdown"),
                    None => self.control_open = false,
                },
            }
        }
    }
}
