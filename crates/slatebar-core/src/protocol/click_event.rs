//! Click event schema sent by the bar host

use serde::{Deserialize, Serialize};
use std::fmt;

/// A pointer event on one rendered block.
///
/// Every field except `name` is optional on the wire; hosts differ in what
/// they send (swaybar adds `modifiers`, i3bar omits `instance` when unset).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClickEvent {
    /// Name of the clicked block
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,

    /// Absolute pointer position
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,

    /// X11 button number
    #[serde(default)]
    pub button: u32,

    /// Input event code
    #[serde(default)]
    pub event: u32,

    /// Position relative to the block's top-left corner
    #[serde(default)]
    pub relative_x: i32,
    #[serde(default)]
    pub relative_y: i32,

    /// Block size
    #[serde(default)]
    pub width: i32,
    #[serde(default)]
    pub height: i32,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modifiers: Vec<String>,
}

impl ClickEvent {
    pub fn mouse_button(&self) -> MouseButton {
        MouseButton::from(self.button)
    }

    /// Last `:`-separated segment of the block name: the worker-supplied
    /// name or index of the clicked block.
    pub fn block_suffix(&self) -> &str {
        match self.name.rfind(':') {
            Some(idx) => &self.name[idx + 1..],
            None => &self.name,
        }
    }
}

/// Mouse button decoded from the X11 button number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    ScrollUp,
    ScrollDown,
    ScrollLeft,
    ScrollRight,
    Back,
    Forward,
    Other(u32),
}

impl From<u32> for MouseButton {
    fn from(code: u32) -> Self {
        match code {
            1 => Self::Left,
            2 => Self::Middle,
            3 => Self::Right,
            4 => Self::ScrollUp,
            5 => Self::ScrollDown,
            6 => Self::ScrollLeft,
            7 => Self::ScrollRight,
            8 => Self::Back,
            9 => Self::Forward,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => f.write_str("Left"),
            Self::Middle => f.write_str("Middle"),
            Self::Right => f.write_str("Right"),
            Self::ScrollUp => f.write_str("ScrollUp"),
            Self::ScrollDown => f.write_str("ScrollDown"),
            Self::ScrollLeft => f.write_str("ScrollLeft"),
            Self::ScrollRight => f.write_str("ScrollRight"),
            Self::Back => f.write_str("Back"),
            Self::Forward => f.write_str("Forward"),
            Self::Other(code) => write!(f, "{code}"),
        }
    }
}
