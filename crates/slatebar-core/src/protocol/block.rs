//! Renderable block schema

use serde::{Deserialize, Serialize};

/// Markup mode for a block's text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Markup {
    /// Plain text (host default)
    None,
    /// Pango markup
    Pango,
}

/// Text alignment inside a block wider than its text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Left,
    Right,
    Center,
}

/// Minimum block width: either pixels or the width of a sample string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MinWidth {
    Pixels(u32),
    Text(String),
}

/// One renderable text segment in the output stream.
///
/// Workers produce blocks from `render()`; the owning manager rewrites
/// `name` so every block on the bar is unique and can be traced back to the
/// manager that produced it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// The text that will be displayed
    pub full_text: String,

    /// Shown instead of `full_text` when the bar runs out of space
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_text: Option<String>,

    /// Text color in #RRGGBB or #RRGGBBAA notation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    /// Background color in #RRGGBB or #RRGGBBAA notation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,

    /// Border color in #RRGGBB or #RRGGBBAA notation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_top: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_bottom: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_left: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_right: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_width: Option<MinWidth>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<Align>,

    /// Block name, used to route click events back to the producer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Block instance, passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,

    /// Highlight the block as urgent
    #[serde(default, skip_serializing_if = "is_false")]
    pub urgent: bool,

    /// Whether the bar separator is drawn after this block
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator: Option<bool>,

    /// Blank pixels after the block
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator_block_width: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markup: Option<Markup>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Block {
    /// Create a block with only `full_text` set.
    pub fn new(full_text: impl Into<String>) -> Self {
        Self {
            full_text: full_text.into(),
            ..Default::default()
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_short_text(mut self, short_text: impl Into<String>) -> Self {
        self.short_text = Some(short_text.into());
        self
    }

    pub fn urgent(mut self) -> Self {
        self.urgent = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_block_omits_optional_fields() {
        let json = serde_json::to_string(&Block::new("12:00")).unwrap();
        assert_eq!(json, r#"{"full_text":"12:00"}"#);
    }

    #[test]
    fn test_block_uses_wire_field_names() {
        let block = Block {
            full_text: "bat 80%".to_string(),
            short_text: Some("80".to_string()),
            color: Some("#00ff00".to_string()),
            separator_block_width: Some(12),
            markup: Some(Markup::Pango),
            name: Some("battery:0:0".to_string()),
            urgent: true,
            align: Some(Align::Center),
            ..Default::default()
        };
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value["full_text"], "bat 80%");
        assert_eq!(value["short_text"], "80");
        assert_eq!(value["color"], "#00ff00");
        assert_eq!(value["separator_block_width"], 12);
        assert_eq!(value["markup"], "pango");
        assert_eq!(value["name"], "battery:0:0");
        assert_eq!(value["urgent"], true);
        assert_eq!(value["align"], "center");
        assert!(value.get("instance").is_none());
        assert!(value.get("background").is_none());
    }

    #[test]
    fn test_urgent_false_is_omitted() {
        let value = serde_json::to_value(Block::new("x")).unwrap();
        assert!(value.get("urgent").is_none());
    }

    #[test]
    fn test_separator_false_is_kept() {
        let block = Block {
            separator: Some(false),
            ..Block::new("x")
        };
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value["separator"], false);
    }

    #[test]
    fn test_min_width_accepts_pixels_and_text() {
        let pixels: Block = serde_json::from_str(r#"{"full_text":"a","min_width":40}"#).unwrap();
        assert_eq!(pixels.min_width, Some(MinWidth::Pixels(40)));

        let text: Block =
            serde_json::from_str(r#"{"full_text":"a","min_width":"100%"}"#).unwrap();
        assert_eq!(text.min_width, Some(MinWidth::Text("100%".to_string())));
    }

    #[test]
    fn test_block_deserializes_from_worker_json() {
        let json = r##"{"full_text":"up","color":"#ff0000","urgent":true}"##;
        let block: Block = serde_json::from_str(json).unwrap();
        assert_eq!(block.full_text, "up");
        assert_eq!(block.color.as_deref(), Some("#ff0000"));
        assert!(block.urgent);
    }
}
