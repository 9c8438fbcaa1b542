use crate::worker::{
    Capability, UpdateSender, Worker, WorkerError, WorkerMetadata, settings_from_table,
};
use serde::Deserialize;
use slatebar_core::protocol::MouseButton;
use slatebar_core::{Block, ClickEvent, FormatTemplate, NamedArgs};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ClicksConfig {
    #[serde(default = "default_format")]
    format: FormatTemplate,
}

fn default_format() -> FormatTemplate {
    FormatTemplate::parse("{clicks}")
}

/// Counts clicks on its block; scrolling down counts back towards zero.
pub struct Clicks {
    format: FormatTemplate,
    clicks: AtomicU64,
}

impl Default for Clicks {
    fn default() -> Self {
        Self {
            format: default_format(),
            clicks: AtomicU64::new(0),
        }
    }
}

impl Clicks {
    pub fn count(&self) -> u64 {
        self.clicks.load(Ordering::SeqCst)
    }
}

impl Worker for Clicks {
    fn metadata(&self) -> WorkerMetadata {
        WorkerMetadata {
            name: "clicks",
            description: "Click counter",
            capabilities: vec![Capability::Configurable, Capability::ClickEvents],
        }
    }

    fn configure(&mut self, settings: &toml::Table) -> Result<(), WorkerError> {
        let config: ClicksConfig = settings_from_table(settings)?;
        self.format = config.format;
        Ok(())
    }

    async fn run(
        &self,
        _updates: UpdateSender,
        _cancel: CancellationToken,
    ) -> Result<(), WorkerError> {
        Ok(())
    }

    fn render(&self) -> Vec<Block> {
        let args = NamedArgs::new().with("clicks", self.count());
        vec![Block::new(self.format.expand(&args))]
    }

    async fn handle_event(
        &self,
        event: &ClickEvent,
        updates: &UpdateSender,
        _cancel: CancellationToken,
    ) -> Result<(), WorkerError> {
        if event.mouse_button() == MouseButton::ScrollDown {
            let _ = self
                .clicks
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)));
        } else {
            self.clicks.fetch_add(1, Ordering::SeqCst);
        }
        updates.notify();
        Ok(())
    }
}
