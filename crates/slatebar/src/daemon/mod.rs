pub mod event_loop;
pub mod generation;
pub mod shutdown;
pub mod signals;
pub mod watcher;

pub use event_loop::Orchestrator;
pub use generation::{Generation, GenerationEvent, GenerationOptions};
pub use shutdown::{ShutdownOutcome, StopOutcome, wait_for_tasks};
pub use signals::{ControlSignal, spawn_signal_listener};
pub use watcher::{ConfigChanged, watch_config};
