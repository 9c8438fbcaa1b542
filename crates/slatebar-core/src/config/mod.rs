//! Configuration resolution
//!
//! The config file is located with priority:
//! 1. Command-line flag (passed as a parameter)
//! 2. `SLATEBAR_CONFIG`
//! 3. `~/.config/slatebar/config.toml`

mod discovery;
mod interval;
mod types;

pub use discovery::{CONFIG_ENV, ConfigError, discover_config_path, load_config_file, parse_config};
pub use interval::{Interval, parse_interval};
pub use types::{BarConfig, BlockConfig};
