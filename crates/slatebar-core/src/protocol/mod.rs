//! i3bar/swaybar protocol types
//!
//! Field names follow the wire format exactly (snake_case). Optional fields
//! that are unset are omitted on output, never written as `null`.

mod block;
mod click_event;
mod header;

pub use block::{Align, Block, Markup, MinWidth};
pub use click_event::{ClickEvent, MouseButton};
pub use header::Header;
