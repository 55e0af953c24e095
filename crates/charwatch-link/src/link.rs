//! The status link: connection manager plus transport plus event queue.

use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, Instant};

use charwatch_core::{ConnectionPhase, DashboardConfig, Result, StatusRegistry};
use tracing::{debug, warn};

use crate::manager::{ConnectionManager, FrameOutcome};
use crate::transport::{Envelope, Transport, TransportEvent, WsTransport};

/// What one [`StatusLink::pump`] observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkUpdate {
    /// At least one frame was applied; a coalesced reconciliation is due
    pub frames_applied: usize,
    /// The connection phase (or reconnect state) changed
    pub phase_changed: bool,
}

impl LinkUpdate {
    pub fn registry_touched(&self) -> bool {
        self.frames_applied > 0
    }
}

pub struct StatusLink<T: Transport> {
    manager: ConnectionManager,
    transport: T,
    events: Receiver<Envelope>,
}

impl StatusLink<WsTransport> {
    /// WebSocket link for the configured server.
    pub fn from_config(config: &DashboardConfig) -> Result<Self> {
        let (transport, events) = WsTransport::new()?;
        Ok(Self::new(
            ConnectionManager::new(config.server_url.clone(), config.reconnect_delay()),
            transport,
            events,
        ))
    }

    /// Close cleanly and stop the runtime.
    pub fn shutdown(mut self, grace: Duration) {
        self.close();
        self.transport.shutdown(grace);
    }
}

impl<T: Transport> StatusLink<T> {
    pub fn new(manager: ConnectionManager, transport: T, events: Receiver<Envelope>) -> Self {
        Self {
            manager,
            transport,
            events,
        }
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.manager.phase()
    }

    pub fn reconnect_pending(&self) -> bool {
        self.manager.reconnect_pending()
    }

    pub fn url(&self) -> &str {
        self.manager.url()
    }

    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// (Re)connect now. Cancels any pending reconnect.
    pub fn connect(&mut self) {
        let actions = self.manager.connect();
        self.transport.execute(actions);
    }

    /// Close for good (normal closure, no reconnect).
    pub fn close(&mut self) {
        let actions = self.manager.shutdown();
        self.transport.execute(actions);
    }

    /// Drain every queued transport event in arrival order, then check the
    /// reconnect deadline.
    pub fn pump(&mut self, registry: &mut StatusRegistry, now: Instant) -> LinkUpdate {
        let mut update = LinkUpdate::default();
        let before = (self.manager.phase(), self.manager.reconnect_pending());

        loop {
            match self.events.try_recv() {
                Ok(envelope) => self.handle(envelope, registry, now, &mut update),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    warn!("transport event channel closed");
                    break;
                }
            }
        }

        let actions = self.manager.poll_timer(now);
        if !actions.is_empty() {
            self.transport.execute(actions);
        }

        update.phase_changed = before != (self.manager.phase(), self.manager.reconnect_pending());
        update
    }

    fn handle(
        &mut self,
        envelope: Envelope,
        registry: &mut StatusRegistry,
        now: Instant,
        update: &mut LinkUpdate,
    ) {
        let Envelope { connection, event } = envelope;
        match event {
            TransportEvent::Opened => {
                self.manager.on_open(connection);
            }
            TransportEvent::Text(text) => match self.manager.on_message(connection, &text, registry) {
                FrameOutcome::Applied { .. } => update.frames_applied += 1,
                FrameOutcome::Rejected => {}
                FrameOutcome::Stale => debug!(connection, "dropped frame from superseded connection"),
            },
            TransportEvent::Error(message) => self.manager.on_error(connection, &message),
            TransportEvent::Closed { code, clean } => {
                self.manager.on_close(connection, code, clean, now);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::{ABNORMAL_CLOSURE, Action};
    use crate::transport::RecordingTransport;
    use std::sync::mpsc::{self, Sender};

    const DELAY: Duration = Duration::from_millis(100);

    fn link() -> (StatusLink<RecordingTransport>, Sender<Envelope>) {
        let (tx, rx) = mpsc::channel();
        let link = StatusLink::new(
            ConnectionManager::new("ws://test/ws", DELAY),
            RecordingTransport::default(),
            rx,
        );
        (link, tx)
    }

    fn send(tx: &Sender<Envelope>, connection: u64, event: TransportEvent) {
        tx.send(Envelope { connection, event }).unwrap();
    }

    #[test]
    fn test_burst_of_frames_is_one_update() {
        let (mut link, tx) = link();
        link.connect();
        send(&tx, 1, TransportEvent::Opened);
        send(&tx, 1, TransportEvent::Text(r#"{"A": {"HEALTH": 1}}"#.into()));
        send(&tx, 1, TransportEvent::Text(r#"{"updates": {"B": {}}, "deletions": []}"#.into()));
        send(&tx, 1, TransportEvent::Text("garbage".into()));

        let mut registry = StatusRegistry::new();
        let update = link.pump(&mut registry, Instant::now());

        assert_eq!(update.frames_applied, 2);
        assert!(update.phase_changed);
        assert_eq!(link.phase(), ConnectionPhase::Connected);
        assert_eq!(registry.names(), vec!["A", "B"]);

        let quiet = link.pump(&mut registry, Instant::now());
        assert_eq!(quiet, LinkUpdate::default());
    }

    #[test]
    fn test_unclean_close_reconnects_after_delay() {
        let (mut link, tx) = link();
        link.connect();
        send(&tx, 1, TransportEvent::Opened);
        send(&tx, 1, TransportEvent::Error("reset".into()));
        send(
            &tx,
            1,
            TransportEvent::Closed {
                code: ABNORMAL_CLOSURE,
                clean: false,
            },
        );

        let mut registry = StatusRegistry::new();
        let start = Instant::now();
        link.pump(&mut registry, start);
        assert_eq!(link.phase(), ConnectionPhase::Disconnected);
        assert!(link.reconnect_pending());
        assert_eq!(link.transport().actions.len(), 1);

        link.pump(&mut registry, start + DELAY);
        assert_eq!(link.phase(), ConnectionPhase::Connecting);
        assert_eq!(
            link.transport().actions.last(),
            Some(&Action::Open {
                id: 2,
                url: "ws://test/ws".into()
            })
        );
    }

    #[test]
    fn test_events_from_old_connection_are_dropped() {
        let (mut link, tx) = link();
        link.connect();
        link.connect();
        send(&tx, 1, TransportEvent::Opened);
        send(&tx, 1, TransportEvent::Text(r#"{"A": {}}"#.into()));

        let mut registry = StatusRegistry::new();
        let update = link.pump(&mut registry, Instant::now());
        assert_eq!(update.frames_applied, 0);
        assert!(registry.is_empty());
        assert_eq!(link.phase(), ConnectionPhase::Connecting);
    }

    #[test]
    fn test_close_sends_close_action() {
        let (mut link, _tx) = link();
        link.connect();
        link.close();
        assert_eq!(link.transport().actions.last(), Some(&Action::Close { id: 1 }));
        assert_eq!(link.phase(), ConnectionPhase::Disconnected);
        assert!(!link.reconnect_pending());
    }
}
