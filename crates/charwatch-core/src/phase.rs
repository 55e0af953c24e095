//! Connection phase of the status link.

use std::fmt;

use crate::record::CharacterRecord;

/// Exactly one phase is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionPhase {
    #[default]
    Connecting,
    Connected,
    Disconnected,
}

impl ConnectionPhase {
    pub fn is_connected(self) -> bool {
        self == ConnectionPhase::Connected
    }

    /// Header status text.
    pub fn status_label(self, reconnect_pending: bool) -> &'static str {
        match self {
            ConnectionPhase::Connected => "Connected",
            ConnectionPhase::Connecting => "Connecting...",
            ConnectionPhase::Disconnected if reconnect_pending => {
                "Disconnected - Attempting to Reconnect"
            }
            ConnectionPhase::Disconnected => "Disconnected",
        }
    }
}

impl fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionPhase::Connecting => "connecting",
            ConnectionPhase::Connected => "connected",
            ConnectionPhase::Disconnected => "disconnected",
        };
        f.write_str(s)
    }
}

/// Per-character link indicator (roster rows and cards).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkIndicator {
    pub connected: bool,
    pub title: &'static str,
}

impl LinkIndicator {
    /// While the main link is up, the character's own CONNECTED flag decides;
    /// otherwise every character shows the main link state.
    pub fn for_character(phase: ConnectionPhase, record: Option<&CharacterRecord>) -> Self {
        match (phase, record) {
            (ConnectionPhase::Connected, Some(record)) if record.is_character_connected() => Self {
                connected: true,
                title: "Connected",
            },
            (ConnectionPhase::Connected, _) => Self {
                connected: false,
                title: "Disconnected (Character)",
            },
            (ConnectionPhase::Connecting, _) => Self {
                connected: false,
                title: "Connecting...",
            },
            (ConnectionPhase::Disconnected, _) => Self {
                connected: false,
                title: "Disconnected (Main)",
            },
        }
    }
}
