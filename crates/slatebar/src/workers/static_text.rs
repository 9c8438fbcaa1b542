use crate::manager::ERROR_COLOR;
use crate::worker::{
    Capability, UpdateSender, Worker, WorkerError, WorkerMetadata, settings_from_table,
};
use serde::Deserialize;
use slatebar_core::Block;
use slatebar_core::protocol::Markup;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct StaticConfig {
    #[serde(default)]
    text: String,
    color: Option<String>,
}

/// Fixed text. Also stands in for entries that could not be built.
#[derive(Debug, Default)]
pub struct StaticText {
    text: String,
    color: Option<String>,
    plain: bool,
}

impl StaticText {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: None,
            plain: false,
        }
    }

    /// Red static text for configuration problems.
    ///
    /// The message is folded onto one line and rendered without markup, since
    /// it may quote arbitrary config text.
    pub fn error(text: impl AsRef<str>) -> Self {
        Self {
            text: single_line(text.as_ref()),
            color: Some(ERROR_COLOR.to_string()),
            plain: true,
        }
    }
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl Worker for StaticText {
    fn metadata(&self) -> WorkerMetadata {
        WorkerMetadata {
            name: "static",
            description: "Fixed text",
            capabilities: vec![Capability::Configurable],
        }
    }

    fn configure(&mut self, settings: &toml::Table) -> Result<(), WorkerError> {
        let config: StaticConfig = settings_from_table(settings)?;
        self.text = config.text;
        self.color = config.color;
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
        let mut block = Block::new(self.text.clone());
        block.color = self.color.clone();
        block.markup = Some(if self.plain { Markup::None } else { Markup::Pango });
        vec![block]
    }
}
