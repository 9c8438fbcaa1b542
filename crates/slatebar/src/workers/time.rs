use crate::worker::{
    Capability, UpdateSender, Worker, WorkerError, WorkerMetadata, settings_from_table,
};
use chrono::Local;
use chrono::format::{Item, StrftimeItems};
use serde::Deserialize;
use slatebar_core::config::Interval;
use slatebar_core::{Block, FormatTemplate, NamedArgs};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

const DEFAULT_LAYOUT: &str = "%a %d.%m.%Y %H:%M:%S";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TimeConfig {
    #[serde(default = "default_format")]
    format: FormatTemplate,
    #[serde(default = "default_layout")]
    layout: String,
    #[serde(default = "default_interval")]
    interval: Interval,
}

fn default_format() -> FormatTemplate {
    FormatTemplate::parse("{time}")
}

fn default_layout() -> String {
    DEFAULT_LAYOUT.to_string()
}

fn default_interval() -> Interval {
    Interval::from_secs(1)
}

/// Local wall clock
pub struct Time {
    format: FormatTemplate,
    layout: String,
    interval: Duration,
}

impl Default for Time {
    fn default() -> Self {
        Self {
            format: default_format(),
            layout: default_layout(),
            interval: default_interval().as_duration(),
        }
    }
}

impl Worker for Time {
    fn metadata(&self) -> WorkerMetadata {
        WorkerMetadata {
            name: "time",
            description: "Current date and time",
            capabilities: vec![Capability::Configurable],
        }
    }

    fn configure(&mut self, settings: &toml::Table) -> Result<(), WorkerError> {
        let config: TimeConfig = settings_from_table(settings)?;
        if StrftimeItems::new(&config.layout).any(|item| matches!(item, Item::Error)) {
            return Err(WorkerError::config(format!(
                "invalid time layout {:?}",
                config.layout
            )));
        }
        if config.interval.as_duration().is_zero() {
            return Err(WorkerError::config("interval must be positive"));
        }
        self.format = config.format;
        self.layout = config.layout;
        self.interval = config.interval.as_duration();
        Ok(())
    }

    async fn run(
        &self,
        updates: UpdateSender,
        cancel: CancellationToken,
    ) -> Result<(), WorkerError> {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = ticker.tick() => {
                    if !updates.notify() {
                        return Ok(());
                    }
                }
            }
        }
    }

    fn render(&self) -> Vec<Block> {
        let now = Local::now().format(&self.layout).to_string();
        let args = NamedArgs::new().with("time", now);
        vec![Block::new(self.format.expand(&args))]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::{ManagerId, UpdateSignal};
    use tokio::sync::mpsc;

    #[test]
    fn test_configure_layout() {
        let mut worker = Time::default();
        let settings: toml::Table =
            toml::from_str("layout = \"%Y\"\nformat = \"year {time}\"\ninterval = \"5m\"").unwrap();
        worker.configure(&settings).unwrap();
        assert_eq!(worker.interval, Duration::from_secs(300));

        let text = worker.render().remove(0).full_text;
        assert!(text.starts_with("year "));
        assert_eq!(text.len(), "year ".len() + 4);
    }

    #[test]
    fn test_rejects_bad_layout() {
        let mut worker = Time::default();
        let settings: toml::Table = toml::from_str("layout = \"%Q\"").unwrap();
        assert!(worker.configure(&settings).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_until_cancelled() {
        let worker = Time::default();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let updates = UpdateSender::new(ManagerId::new("time", 0), tx);
        let cancel = CancellationToken::new();

        let run_cancel = cancel.clone();
        let task = tokio::spawn(async move { worker.run(updates, run_cancel).await });

        for _ in 0..3 {
            assert_eq!(
                rx.recv().await,
                Some(UpdateSignal::Changed(ManagerId::new("time", 0)))
            );
        }
        cancel.cancel();
        task.await.unwrap().unwrap();
    }
}
