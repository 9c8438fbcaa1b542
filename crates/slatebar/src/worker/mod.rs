//! The contract every block data source implements

pub mod registry;
pub mod traits;
pub mod types;

pub use registry::WorkerRegistry;
pub use traits::{ErasedWorker, Worker};
pub use types::{Capability, UpdateSender, WorkerError, WorkerMetadata, settings_from_table};
