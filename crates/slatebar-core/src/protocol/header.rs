use serde::{Deserialize, Serialize};

/// Protocol header written once before the block stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub version: u32,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub click_events: bool,

    /// Signal the host sends to resume a stopped bar
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cont_signal: Option<i32>,

    /// Signal the host sends to pause the bar
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_signal: Option<i32>,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            version: 1,
            click_events: true,
            cont_signal: None,
            stop_signal: None,
        }
    }
}
