//! Connection lifecycle state machine.
//!
//! [`ConnectionManager`] owns the connection phase, the identity of the
//! current connection and the single reconnect deadline. It performs no I/O:
//! every transition returns the [`Action`]s the caller must hand to a
//! transport, and transport events come back in through `on_*` methods tagged
//! with the connection they belong to. Events for a superseded connection are
//! ignored.

use std::time::{Duration, Instant};

use charwatch_core::log_connection_event;
use charwatch_core::{ConnectionPhase, StatusRegistry, parse_frame};
use tracing::{debug, error, warn};

/// Close code the browser-style API reports for an abnormal closure.
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Identity of one connection attempt. Monotonically increasing.
pub type ConnectionId = u64;

/// Transport work requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Open { id: ConnectionId, url: String },
    Close { id: ConnectionId },
}

/// Result of feeding one inbound text frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Applied to the registry; reconciliation is due
    Applied { changed: bool },
    /// Malformed or unexpected; registry untouched
    Rejected,
    /// From a superseded connection
    Stale,
}

#[derive(Debug, Clone)]
pub struct ConnectionManager {
    url: String,
    phase: ConnectionPhase,
    current: Option<ConnectionId>,
    next_id: ConnectionId,
    reconnect_delay: Duration,
    reconnect_at: Option<Instant>,
}

impl ConnectionManager {
    pub fn new(url: impl Into<String>, reconnect_delay: Duration) -> Self {
        Self {
            url: url.into(),
            phase: ConnectionPhase::Connecting,
            current: None,
            next_id: 1,
            reconnect_delay,
            reconnect_at: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    pub fn current(&self) -> Option<ConnectionId> {
        self.current
    }

    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_at.is_some()
    }

    pub fn reconnect_at(&self) -> Option<Instant> {
        self.reconnect_at
    }

    pub fn reconnect_delay(&self) -> Duration {
        self.reconnect_delay
    }

    /// Start a new connection, closing any open one first. Cancels a pending
    /// reconnect. Safe to call repeatedly.
    pub fn connect(&mut self) -> Vec<Action> {
        self.cancel_reconnect();

        let mut actions = Vec::with_capacity(2);
        if let Some(old) = self.current.take() {
            debug!(connection = old, "closing existing connection");
            actions.push(Action::Close { id: old });
        }

        let id = self.next_id;
        self.next_id += 1;
        self.current = Some(id);
        self.phase = ConnectionPhase::Connecting;
        log_connection_event!(connection = id, url = %self.url, "connecting");

        actions.push(Action::Open {
            id,
            url: self.url.clone(),
        });
        actions
    }

    /// Transport opened. Returns true if the phase changed.
    pub fn on_open(&mut self, id: ConnectionId) -> bool {
        if !self.is_current(id) {
            debug!(connection = id, "ignoring open of superseded connection");
            return false;
        }
        self.cancel_reconnect();
        let changed = self.phase != ConnectionPhase::Connected;
        self.phase = ConnectionPhase::Connected;
        log_connection_event!(connection = id, "connected");
        changed
    }

    /// Decode one text frame and apply it. Bad frames are logged and dropped.
    pub fn on_message(
        &mut self,
        id: ConnectionId,
        text: &str,
        registry: &mut StatusRegistry,
    ) -> FrameOutcome {
        if !self.is_current(id) {
            return FrameOutcome::Stale;
        }
        match parse_frame(text) {
            Ok(frame) => FrameOutcome::Applied {
                changed: frame.apply(registry),
            },
            Err(e) => {
                warn!(connection = id, error = %e, len = text.len(), "dropping inbound frame");
                FrameOutcome::Rejected
            }
        }
    }

    /// Transport closed. The registry is left as is (offline display uses
    /// it). An unclean close, or code 1006, arms the reconnect deadline.
    /// Returns true if the close applied to the current connection.
    pub fn on_close(&mut self, id: ConnectionId, code: u16, clean: bool, now: Instant) -> bool {
        if !self.is_current(id) {
            debug!(connection = id, code, "ignoring close of superseded connection");
            return false;
        }
        self.current = None;
        self.phase = ConnectionPhase::Disconnected;
        self.cancel_reconnect();

        if !clean || code == ABNORMAL_CLOSURE {
            self.reconnect_at = Some(now + self.reconnect_delay);
            log_connection_event!(
                connection = id,
                code,
                delay_ms = self.reconnect_delay.as_millis() as u64,
                "disconnected, reconnect scheduled"
            );
        } else {
            log_connection_event!(connection = id, code, "disconnected cleanly, not reconnecting");
        }
        true
    }

    /// Transport error. Logged only; the close that follows drives recovery.
    pub fn on_error(&mut self, id: ConnectionId, message: &str) {
        if self.is_current(id) {
            error!(connection = id, url = %self.url, error = %message, "transport error");
        } else {
            debug!(connection = id, error = %message, "error on superseded connection");
        }
    }

    /// Fire the reconnect deadline if it has passed.
    pub fn poll_timer(&mut self, now: Instant) -> Vec<Action> {
        match self.reconnect_at {
            Some(at) if now >= at => {
                debug!("reconnect deadline reached");
                self.connect()
            }
            _ => Vec::new(),
        }
    }

    /// Close the current connection for good; no reconnect follows.
    pub fn shutdown(&mut self) -> Vec<Action> {
        self.cancel_reconnect();
        self.phase = ConnectionPhase::Disconnected;
        match self.current.take() {
            Some(id) => {
                log_connection_event!(connection = id, "shutting down");
                vec![Action::Close { id }]
            }
            None => Vec::new(),
        }
    }

    fn is_current(&self, id: ConnectionId) -> bool {
        self.current == Some(id)
    }

    fn cancel_reconnect(&mut self) {
        if self.reconnect_at.take().is_some() {
            debug!("cancelled pending reconnect");
        }
    }
}
