//! WebSocket transport.
//!
//! Connections run as tasks on a background tokio runtime. Everything they
//! observe is forwarded, tagged with the connection id, over a std channel
//! that the UI thread drains once per frame, so all state mutation stays on
//! one thread and in arrival order.

use std::collections::HashMap;
use std::sync::mpsc;
use std::time::Duration;

use charwatch_core::{CharwatchError, Result};
use futures_util::future::join_all;
use futures_util::{SinkExt, StreamExt};
use tokio::runtime::Runtime;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tracing::{debug, info, trace, warn};

use crate::manager::{ABNORMAL_CLOSURE, Action, ConnectionId};

/// Close code used when no close frame carried one.
const NO_STATUS_RECEIVED: u16 = 1005;

/// What a connection observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Opened,
    Text(String),
    Error(String),
    /// Always the last event of a connection
    Closed { code: u16, clean: bool },
}

/// A [`TransportEvent`] tagged with its connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub connection: ConnectionId,
    pub event: TransportEvent,
}

/// Executes [`Action`]s.
pub trait Transport {
    fn open(&mut self, id: ConnectionId, url: &str);
    fn close(&mut self, id: ConnectionId);

    fn execute(&mut self, actions: Vec<Action>) {
        for action in actions {
            match action {
                Action::Open { id, url } => self.open(id, &url),
                Action::Close { id } => self.close(id),
            }
        }
    }
}

/// Handle on one running connection task.
struct LiveConnection {
    /// Taken once a close has been requested
    closer: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl LiveConnection {
    fn request_close(&mut self) {
        if let Some(closer) = self.closer.take() {
            let _ = closer.send(());
        }
    }
}

/// tokio-tungstenite transport on its own runtime.
pub struct WsTransport {
    runtime: Runtime,
    events: mpsc::Sender<Envelope>,
    connections: HashMap<ConnectionId, LiveConnection>,
}

impl WsTransport {
    /// Start the runtime. Events arrive on the returned receiver.
    pub fn new() -> Result<(Self, mpsc::Receiver<Envelope>)> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("charwatch-link")
            .enable_all()
            .build()
            .map_err(|e| CharwatchError::internal(format!("failed to start link runtime: {e}")))?;
        let (events, rx) = mpsc::channel();
        Ok((
            Self {
                runtime,
                events,
                connections: HashMap::new(),
            },
            rx,
        ))
    }
}

impl Transport for WsTransport {
    fn open(&mut self, id: ConnectionId, url: &str) {
        self.connections.retain(|_, conn| !conn.task.is_finished());

        let (closer, close_rx) = oneshot::channel();
        let events = self.events.clone();
        let url = url.to_string();
        let task = self.runtime.spawn(async move {
            run_connection(id, url, events, close_rx).await;
        });
        self.connections.insert(
            id,
            LiveConnection {
                closer: Some(closer),
                task,
            },
        );
    }

    fn close(&mut self, id: ConnectionId) {
        match self.connections.get_mut(&id) {
            Some(conn) => conn.request_close(),
            None => trace!(connection = id, "close requested for unknown connection"),
        }
    }
}

impl WsTransport {
    /// Close every live connection, wait up to `grace` for the close
    /// handshakes to go out, then stop the runtime.
    pub fn shutdown(mut self, grace: Duration) {
        let mut tasks = Vec::with_capacity(self.connections.len());
        for (id, mut conn) in self.connections.drain() {
            trace!(connection = id, "closing at shutdown");
            conn.request_close();
            tasks.push(conn.task);
        }
        let drained = self
            .runtime
            .block_on(async { tokio::time::timeout(grace, join_all(tasks)).await });
        if drained.is_err() {
            debug!(?grace, "connections still open at shutdown");
        }
        self.runtime.shutdown_background();
    }
}

async fn run_connection(
    id: ConnectionId,
    url: String,
    events: mpsc::Sender<Envelope>,
    mut close_rx: oneshot::Receiver<()>,
) {
    let emit = |event: TransportEvent| {
        // The receiver only goes away at shutdown.
        let _ = events.send(Envelope {
            connection: id,
            event,
        });
    };

    let connecting = tokio::select! {
        result = connect_async(url.as_str()) => Some(result),
        _ = &mut close_rx => None,
    };
    let stream = match connecting {
        Some(Ok((stream, _response))) => stream,
        Some(Err(e)) => {
            warn!(connection = id, url = %url, error = %e, "connect failed");
            emit(TransportEvent::Error(CharwatchError::TransportConnect {
                url: url.clone(),
                message: e.to_string(),
            }
            .to_string()));
            emit(TransportEvent::Closed {
                code: ABNORMAL_CLOSURE,
                clean: false,
            });
            return;
        }
        None => {
            debug!(connection = id, "closed before connecting");
            emit(TransportEvent::Closed {
                code: u16::from(CloseCode::Normal),
                clean: true,
            });
            return;
        }
    };

    info!(connection = id, url = %url, "websocket open");
    emit(TransportEvent::Opened);

    let (mut write, mut read) = stream.split();
    let mut close_code: Option<u16> = None;

    loop {
        tokio::select! {
            _ = &mut close_rx => {
                let frame = CloseFrame {
                    code: CloseCode::Normal,
                    reason: "".into(),
                };
                if let Err(e) = write.send(Message::Close(Some(frame))).await {
                    debug!(connection = id, error = %e, "failed to send close frame");
                }
                emit(TransportEvent::Closed {
                    code: u16::from(CloseCode::Normal),
                    clean: true,
                });
                return;
            }
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => emit(TransportEvent::Text(text)),
                Some(Ok(Message::Close(frame))) => {
                    let code = frame
                        .as_ref()
                        .map(|f| u16::from(f.code))
                        .unwrap_or(NO_STATUS_RECEIVED);
                    debug!(connection = id, code, "server sent close");
                    close_code = Some(code);
                }
                Some(Ok(_)) => trace!(connection = id, "ignoring non-text message"),
                Some(Err(e)) => {
                    emit(TransportEvent::Error(
                        CharwatchError::transport(url.as_str(), e.to_string()).to_string(),
                    ));
                    break;
                }
                None => break,
            }
        }
    }

    // A close handshake makes the closure clean; anything else is abnormal.
    let event = match close_code {
        Some(code) => TransportEvent::Closed { code, clean: true },
        None => TransportEvent::Closed {
            code: ABNORMAL_CLOSURE,
            clean: false,
        },
    };
    info!(connection = id, ?event, "websocket closed");
    emit(event);
}

/// Transport that records actions instead of performing them.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    pub actions: Vec<Action>,
}

impl Transport for RecordingTransport {
    fn open(&mut self, id: ConnectionId, url: &str) {
        self.actions.push(Action::Open {
            id,
            url: url.to_string(),
        });
    }

    fn close(&mut self, id: ConnectionId) {
        self.actions.push(Action::Close { id });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execute_dispatches_in_order() {
        let mut transport = RecordingTransport::default();
        transport.execute(vec![
            Action::Close { id: 1 },
            Action::Open {
                id: 2,
                url: "ws://h/ws".into(),
            },
        ]);
        assert_eq!(
            transport.actions,
            vec![
                Action::Close { id: 1 },
                Action::Open {
                    id: 2,
                    url: "ws://h/ws".into()
                }
            ]
        );
    }

    #[test]
    fn test_connect_failure_reports_error_then_abnormal_close() {
        let (mut transport, rx) = WsTransport::new().unwrap();
        // Port 9 (discard) on localhost is essentially never a websocket server.
        transport.open(7, "ws://127.0.0.1:9/ws");

        let first = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        assert_eq!(first.connection, 7);
        assert!(matches!(first.event, TransportEvent::Error(_)));

        let second = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        assert_eq!(
            second.event,
            TransportEvent::Closed {
                code: ABNORMAL_CLOSURE,
                clean: false
            }
        );
    }
}
