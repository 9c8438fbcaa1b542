use super::{UpdateSender, WorkerError, WorkerMetadata};
use slatebar_core::{Block, ClickEvent};
use std::future::Future;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

/// Core worker trait. Every data source behind a block implements this.
///
/// Lifecycle: configure() → run() concurrently with render(), handle_event()
///
/// `run` and `render` both take `&self`: the worker keeps its mutable state
/// behind its own lock or atomics, updates it, then calls
/// [`UpdateSender::notify`]. `render` is only ever called from the render
/// loop.
///
/// Uses RPITIT (Return Position Impl Trait in Traits) with explicit Send bounds.
pub trait Worker: Send + Sync {
    /// Return worker identity and capabilities.
    fn metadata(&self) -> WorkerMetadata;

    /// Read settings from the `[[blocks]]` entry. Called once, before `run`.
    fn configure(&mut self, _settings: &toml::Table) -> Result<(), WorkerError> {
        Ok(())
    }

    /// Long-running producer loop. Must respect the cancellation token.
    /// Returning `Ok(())` is a normal exit, not a fault.
    fn run(
        &self,
        updates: UpdateSender,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<(), WorkerError>> + Send;

    /// Current blocks, in display order.
    fn render(&self) -> Vec<Block>;

    /// Handle a click on one of this worker's blocks. Only called when the
    /// worker declares [`super::Capability::ClickEvents`].
    fn handle_event(
        &self,
        _event: &ClickEvent,
        _updates: &UpdateSender,
        _cancel: CancellationToken,
    ) -> impl Future<Output = Result<(), WorkerError>> + Send {
        async { Ok(()) }
    }
}

/// Object-safe version of Worker for type erasure.
///
/// This trait is implemented automatically for all types that implement Worker.
/// Managers hold `Arc<dyn ErasedWorker>`.
pub trait ErasedWorker: Send + Sync {
    fn metadata(&self) -> WorkerMetadata;
    fn configure(&mut self, settings: &toml::Table) -> Result<(), WorkerError>;
    fn run<'a>(
        &'a self,
        updates: UpdateSender,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<(), WorkerError>> + Send + 'a>>;
    fn render(&self) -> Vec<Block>;
    fn handle_event<'a>(
        &'a self,
        event: &'a ClickEvent,
        updates: &'a UpdateSender,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<(), WorkerError>> + Send + 'a>>;
}

/// Blanket implementation of ErasedWorker for all Worker types.
impl<T: Worker> ErasedWorker for T {
    fn metadata(&self) -> WorkerMetadata {
        Worker::metadata(self)
    }

    fn configure(&mut self, settings: &toml::Table) -> Result<(), WorkerError> {
        Worker::configure(self, settings)
    }

    fn run<'a>(
        &'a self,
        updates: UpdateSender,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<(), WorkerError>> + Send + 'a>> {
        Box::pin(Worker::run(self, updates, cancel))
    }

    fn render(&self) -> Vec<Block> {
        Worker::render(self)
    }

    fn handle_event<'a>(
        &'a self,
        event: &'a ClickEvent,
        updates: &'a UpdateSender,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<(), WorkerError>> + Send + 'a>> {
        Box::pin(Worker::handle_event(self, event, updates, cancel))
    }
}
