//! Configuration types

use crate::protocol::Markup;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Complete bar configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarConfig {
    /// Pixels after every block, unless the worker sets its own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator_width: Option<u32>,
    /// Markup mode for every block, unless the worker sets its own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markup: Option<Markup>,
    /// Reload automatically when the config file changes (default: true)
    #[serde(default = "default_watch_config")]
    pub watch_config: bool,
    /// How long a reload or shutdown waits for workers to stop (default: 3000)
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
    /// Blocks, in display order: [[blocks]]
    #[serde(default)]
    pub blocks: Vec<BlockConfig>,
}

impl Default for BarConfig {
    fn default() -> Self {
        Self {
            separator_width: None,
            markup: None,
            watch_config: default_watch_config(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
            blocks: Vec::new(),
        }
    }
}

fn default_watch_config() -> bool {
    true
}

fn default_shutdown_timeout_ms() -> u64 {
    3000
}

impl BarConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

/// One `[[blocks]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockConfig {
    /// Registered worker name (e.g. "time", "shell")
    pub name: String,
    /// Shell command run on every click on this block
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_click: Option<String>,
    /// Worker-specific settings, handed to the worker's `configure`
    #[serde(flatten)]
    pub settings: toml::Table,
}

impl BlockConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            on_click: None,
            settings: toml::Table::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = BarConfig::default();
        assert!(config.watch_config);
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(3));
        assert!(config.blocks.is_empty());
        assert!(config.separator_width.is_none());
    }

    #[test]
    fn test_blocks_keep_order_and_settings() {
        let toml_str = r#"
separator_width = 12
markup = "pango"

[[blocks]]
name = "time"
layout = "%H:%M"
interval = "1s"

[[blocks]]
name = "shell"
command = "echo hi"
on_click = "notify-send clicked"

[[blocks]]
name = "time"
"#;

        let config: BarConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.separator_width, Some(12));
        assert_eq!(config.markup, Some(Markup::Pango));
        let names: Vec<_> = config.blocks.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["time", "shell", "time"]);

        let time = &config.blocks[0];
        assert_eq!(time.settings.get("layout").and_then(|v| v.as_str()), Some("%H:%M"));
        assert!(!time.settings.contains_key("name"));

        let shell = &config.blocks[1];
        assert_eq!(shell.on_click.as_deref(), Some("notify-send clicked"));
        assert!(!shell.settings.contains_key("on_click"));
    }

    #[test]
    fn test_config_serialization_round_trip() {
        let mut config = BarConfig::default();
        let mut block = BlockConfig::new("clicks");
        block
            .settings
            .insert("format".to_string(), toml::Value::String("{clicks}".to_string()));
        config.blocks.push(block);

        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: BarConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(deserialized.blocks.len(), 1);
        assert_eq!(deserialized.blocks[0].name, "clicks");
        assert_eq!(deserialized.shutdown_timeout_ms, config.shutdown_timeout_ms);
    }

    #[test]
    fn test_block_without_name_is_rejected() {
        let toml_str = r#"
[[blocks]]
command = "date"
"#;
        assert!(toml::from_str::<BarConfig>(toml_str).is_err());
    }
}
