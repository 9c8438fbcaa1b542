//! Built-in workers

pub mod clicks;
pub mod shell;
pub mod static_text;
pub mod time;

pub use clicks::Clicks;
pub use shell::Shell;
pub use static_text::StaticText;
pub use time::Time;

use crate::worker::WorkerRegistry;

/// Register every built-in worker
pub fn register_builtin(registry: &mut WorkerRegistry) {
    registry.register(StaticText::default);
    registry.register(Clicks::default);
    registry.register(Time::default);
    registry.register(Shell::default);
}
