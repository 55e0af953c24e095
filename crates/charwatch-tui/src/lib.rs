//! Terminal UI for charwatch.
//!
//! A roster of every character the server reports, and a fixed grid of
//! character cards for the selected ones.
//!
//! ## Hotkeys
//!
//! - `↑`/`k`, `↓`/`j` - Move the roster cursor
//! - `Space`/`Enter` - Show or hide the character under the cursor
//! - `1`-`9` - Expand or collapse a card's details
//! - `PgUp`/`PgDn` - Scroll the open details
//! - `r` - Reconnect now
//! - `[` - Collapse the roster
//! - `t` - Toggle light/dark theme
//! - `?` or `h` - Help
//! - `q` - Quit

pub mod app;
pub mod event;
pub mod roster;
pub mod theme;
pub mod widget;


pub use app::{App, AppResult, SHUTDOWN_GRACE};
pub use event::{AppEvent, InputHandler};
pub use theme::{Theme, ThemeManager};
