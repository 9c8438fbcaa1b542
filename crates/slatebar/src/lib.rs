//! slatebar: a status-line daemon for i3bar and swaybar
//!
//! Runs one task per configured block, merges their output into the i3bar
//! JSON stream on stdout and routes click events from stdin back to the
//! block that was clicked.

pub mod codec;
pub mod daemon;
pub mod manager;
pub mod worker;
pub mod workers;

pub use daemon::{ControlSignal, Orchestrator, ShutdownOutcome};
pub use manager::{BlockManager, ManagerId, UpdateSignal};
pub use worker::{Capability, UpdateSender, Worker, WorkerError, WorkerMetadata, WorkerRegistry};
