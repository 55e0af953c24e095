//! # charwatch-link
//!
//! Connection to the character status server.
//!
//! - [`manager`] - Phase/reconnect state machine (no I/O)
//! - [`transport`] - tokio-tungstenite WebSocket transport on a background runtime
//! - [`link`] - Both glued to the event queue the UI thread drains each frame

pub mod link;
pub mod manager;
pub mod transport;

pub use link::{LinkUpdate, StatusLink};
pub use manager::{Action, ConnectionId, ConnectionManager, FrameOutcome};
pub use transport::{Envelope, RecordingTransport, Transport, TransportEvent, WsTransport};
