//! File system watcher for the config file

use anyhow::{Context, Result};
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{RecvTimeoutError, channel};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// The config file was written, replaced or removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigChanged {
    pub path: PathBuf,
}

/// Watch `config_path` until `cancel` fires.
///
/// The containing directory is watched rather than the file itself so that
/// editors which save by renaming a temp file over the original are still
/// noticed, and so a config that does not exist yet is picked up once it is
/// created. Bursts of events collapse into one pending notification.
///
/// Returns the receiving end of the change channel. The watcher thread exits
/// on cancellation or when the receiver is dropped.
pub fn watch_config(
    config_path: &Path,
    cancel: CancellationToken,
) -> Result<mpsc::Receiver<ConfigChanged>> {
    let dir = match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_name = config_path
        .file_name()
        .map(|name| name.to_os_string())
        .context("Config path has no file name")?;

    let (tx, rx) = channel();
    let mut watcher: RecommendedWatcher =
        notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let _ = tx.send(event);
            }
            Err(e) => error!("File system watcher error: {}", e),
        })
        .context("Failed to create file system watcher")?;

    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("Failed to watch {}", dir.display()))?;
    info!("Watching {} for config changes", config_path.display());

    let (change_tx, change_rx) = mpsc::channel(1);
    tokio::task::spawn_blocking(move || {
        // The watcher must live as long as this loop.
        let _watcher = watcher;
        loop {
            if cancel.is_cancelled() {
                debug!("Config watcher cancelled");
                break;
            }
            match rx.recv_timeout(Duration::from_millis(100)) {
                Ok(event) => {
                    let Some(path) = parse_event(&file_name, event) else {
                        continue;
                    };
                    debug!("Config file changed: {}", path.display());
                    match change_tx.try_send(ConfigChanged { path }) {
                        Ok(()) | Err(mpsc::error::TrySendError::Full(_)) => {}
                        Err(mpsc::error::TrySendError::Closed(_)) => break,
                    }
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    warn!("Watcher channel disconnected");
                    break;
                }
            }
        }
    });

    Ok(change_rx)
}

/// The changed config path, if `event` touches the watched file name.
///
/// Metadata-only and access events are ignored.
fn parse_event(file_name: &OsString, event: Event) -> Option<PathBuf> {
    match event.kind {
        EventKind::Create(_) | EventKind::Remove(_) => {}
        EventKind::Modify(ModifyKind::Metadata(_)) => return None,
        EventKind::Modify(_) => {}
        _ => return None,
    }
    event
        .paths
        .into_iter()
        .find(|path| path.file_name() == Some(file_name.as_os_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, MetadataKind};
    use tempfile::TempDir;

    fn event(kind: EventKind, path: &str) -> Event {
        Event {
            kind,
            paths: vec![PathBuf::from(path)],
            attrs: Default::default(),
        }
    }

    #[test]
    fn test_parse_event_matches_config_file() {
        let name = OsString::from("config.toml");
        let write = event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            "/home/u/.config/slatebar/config.toml",
        );
        assert_eq!(
            parse_event(&name, write),
            Some(PathBuf::from("/home/u/.config/slatebar/config.toml"))
        );

        let create = event(EventKind::Create(CreateKind::File), "/x/config.toml");
        assert!(parse_event(&name, create).is_some());
    }

    #[test]
    fn test_parse_event_ignores_other_files_and_metadata() {
        let name = OsString::from("config.toml");
        let sibling = event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            "/x/config.toml.swp",
        );
        assert!(parse_event(&name, sibling).is_none());

        let chmod = event(
            EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)),
            "/x/config.toml",
        );
        assert!(parse_event(&name, chmod).is_none());

        let access = event(EventKind::Access(notify::event::AccessKind::Any), "/x/config.toml");
        assert!(parse_event(&name, access).is_none());
    }

    #[tokio::test]
    async fn test_watch_reports_write() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "").unwrap();

        let cancel = CancellationToken::new();
        let mut changes = watch_config(&path, cancel.clone()).unwrap();

        // Give the backend a moment to register the watch.
        tokio::time::sleep(Duration::from_millis(100)).await;
        std::fs::write(&path, "separator_width = 3").unwrap();

        let change = tokio::time::timeout(Duration::from_secs(5), changes.recv())
            .await
            .expect("no change reported")
            .unwrap();
        assert_eq!(change.path.file_name(), path.file_name());
        cancel.cancel();
    }
}
