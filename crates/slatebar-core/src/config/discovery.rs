//! Configuration discovery and loading

use super::types::BarConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "SLATEBAR_CONFIG";

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error
    #[error("TOML parsing error in {path}: {source}")]
    TomlParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// No explicit path, no env var, no platform config directory
    #[error("Configuration not found")]
    NotFound,
}

/// Locate the config file.
///
/// Priority (highest to lowest):
/// 1. Explicit path (`--config`)
/// 2. `SLATEBAR_CONFIG`
/// 3. `<config dir>/slatebar/config.toml`
///
/// The returned path need not exist yet; a missing file is reported by
/// [`load_config_file`] so the caller can still watch for its creation.
pub fn discover_config_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }

    dirs::config_dir()
        .map(|dir| dir.join("slatebar").join("config.toml"))
        .ok_or(ConfigError::NotFound)
}

/// Read and parse a config file
pub fn load_config_file(path: &Path) -> Result<BarConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config(&content).map_err(|source| ConfigError::TomlParse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), blocks = config.blocks.len(), "loaded config");
    Ok(config)
}

/// Parse config text
pub fn parse_config(content: &str) -> Result<BarConfig, toml::de::Error> {
    toml::from_str(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_explicit_path_wins() {
        // SAFETY: test-only env mutation, serialized with #[serial]
        unsafe {
            env::set_var(CONFIG_ENV, "/from/env.toml");
        }
        let path = discover_config_path(Some(Path::new("/from/flag.toml"))).unwrap();
        assert_eq!(path, PathBuf::from("/from/flag.toml"));
        unsafe {
            env::remove_var(CONFIG_ENV);
        }
    }

    #[test]
    #[serial]
    fn test_env_path() {
        unsafe {
            env::set_var(CONFIG_ENV, "/from/env.toml");
        }
        let path = discover_config_path(None).unwrap();
        assert_eq!(path, PathBuf::from("/from/env.toml"));
        unsafe {
            env::remove_var(CONFIG_ENV);
        }
    }

    #[test]
    #[serial]
    fn test_default_path_under_config_dir() {
        unsafe {
            env::remove_var(CONFIG_ENV);
        }
        if let Ok(path) = discover_config_path(None) {
            assert!(path.ends_with("slatebar/config.toml"));
        }
    }

    #[test]
    fn test_load_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
shutdown_timeout_ms = 500

[[blocks]]
name = "static"
text = "hello"
"#,
        )
        .unwrap();

        let config = load_config_file(&path).unwrap();
        assert_eq!(config.shutdown_timeout_ms, 500);
        assert_eq!(config.blocks.len(), 1);
        assert_eq!(config.blocks[0].name, "static");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = load_config_file(&temp_dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn test_malformed_config_is_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[[blocks]\nname = ").unwrap();

        let err = load_config_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse { .. }));
    }
}
