//! Core types for slatebar
//!
//! This crate holds everything that does not need an async runtime:
//! the i3bar wire types, the format template engine, configuration
//! loading and logging setup. The daemon crate builds on top of it.

pub mod config;
pub mod logging;
pub mod protocol;
pub mod template;
pub mod text;

pub use protocol::{Block, ClickEvent, Header, MouseButton};
pub use template::{FormatTemplate, NamedArgs, Value};

// Re-export toml for worker settings access
pub use toml;
