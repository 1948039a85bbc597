//! Native WebSocket transport.
//!
//! A background thread owns the socket and talks to the caller over channels,
//! so [`Transport::poll`] never blocks. Dropped connections are retried with
//! backoff until [`NativeWebSocket::disconnect`] is called.

use super::client::{ConnectionState, SyncError, Transport, TransportEvent};
use std::net::TcpStream;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, TryRecvError, channel};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket, connect};
use url::Url;

/// Read timeout on the socket, bounding command latency.
const READ_TIMEOUT: Duration = Duration::from_millis(50);
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);
const RECONNECT_MIN_DELAY: Duration = Duration::from_millis(500);
const RECONNECT_MAX_DELAY: Duration = Duration::from_secs(10);

/// Commands sent to the WebSocket thread.
enum WsCommand {
    Send(String),
    Close,
}

/// How a connected session ended.
enum SessionEnd {
    /// Caller asked to close; stop for good.
    Closed,
    /// Connection lost; try again.
    Lost,
}

/// WebSocket client for native platforms.
pub struct NativeWebSocket {
    state: ConnectionState,
    cmd_tx: Option<Sender<WsCommand>>,
    event_rx: Option<Receiver<TransportEvent>>,
    _thread: Option<JoinHandle<()>>,
}

impl NativeWebSocket {
    /// Create a new disconnected WebSocket client.
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            cmd_tx: None,
            event_rx: None,
            _thread: None,
        }
    }

    /// Create a client and start connecting to `url`.
    pub fn connect_to(url: &str) -> Result<Self, SyncError> {
        let mut socket = Self::new();
        socket.connect(url)?;
        Ok(socket)
    }

    /// Start connecting to a WebSocket server.
    pub fn connect(&mut self, url: &str) -> Result<(), SyncError> {
        if self.cmd_tx.is_some() {
            return Err(SyncError::AlreadyConnected);
        }

        let parsed = Url::parse(url).map_err(|e| SyncError::InvalidUrl(e.to_string()))?;
        if parsed.scheme() != "ws" && parsed.scheme() != "wss" {
            return Err(SyncError::InvalidUrl(format!(
                "unsupported scheme {}",
                parsed.scheme()
            )));
        }

        self.state = ConnectionState::Connecting;

        let (cmd_tx, cmd_rx) = channel::<WsCommand>();
        let (event_tx, event_rx) = channel::<TransportEvent>();
        let url = url.to_string();

        let handle = thread::spawn(move || run_connection(&url, &cmd_rx, &event_tx));

        self.cmd_tx = Some(cmd_tx);
        self.event_rx = Some(event_rx);
        self._thread = Some(handle);
        Ok(())
    }

    /// Disconnect from the server and stop reconnecting.
    pub fn disconnect(&mut self) {
        if let Some(tx) = self.cmd_tx.take() {
            let _ = tx.send(WsCommand::Close);
        }
        self.event_rx = None;
        self._thread = None;
        self.state = ConnectionState::Disconnected;
    }

    /// Get current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }
}

impl Default for NativeWebSocket {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for NativeWebSocket {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl Transport for NativeWebSocket {
    fn send(&mut self, text: String) -> Result<(), SyncError> {
        let tx = self.cmd_tx.as_ref().ok_or(SyncError::NotConnected)?;
        tx.send(WsCommand::Send(text))
            .map_err(|_| SyncError::ChannelClosed)
    }

    fn poll(&mut self) -> Vec<TransportEvent> {
        let Some(rx) = self.event_rx.as_ref() else {
            return Vec::new();
        };
        let events: Vec<TransportEvent> = rx.try_iter().collect();
        for event in &events {
            match event {
                TransportEvent::Connected => self.state = ConnectionState::Connected,
                TransportEvent::Disconnected => self.state = ConnectionState::Disconnected,
                TransportEvent::Error(_) => self.state = ConnectionState::Error,
                TransportEvent::Message(_) => {}
            }
        }
        events
    }
}

/// Thread body: connect, serve, and reconnect until closed.
fn run_connection(url: &str, cmd_rx: &Receiver<WsCommand>, event_tx: &Sender<TransportEvent>) {
    let mut delay = RECONNECT_MIN_DELAY;
    loop {
        log::info!("WebSocket thread: connecting to {}", url);
        match connect(url) {
            Ok((mut socket, response)) => {
                log::info!("WebSocket connected, status: {}", response.status());
                delay = RECONNECT_MIN_DELAY;
                configure_timeouts(&mut socket);
                if event_tx.send(TransportEvent::Connected).is_err() {
                    return;
                }
                let end = serve(&mut socket, cmd_rx, event_tx);
                let _ = event_tx.send(TransportEvent::Disconnected);
                if let SessionEnd::Closed = end {
                    break;
                }
            }
            Err(e) => {
                log::error!("WebSocket connection failed: {}", e);
                if event_tx
                    .send(TransportEvent::Error(format!("Connection failed: {}", e)))
                    .is_err()
                {
                    return;
                }
            }
        }

        if wait_for_retry(cmd_rx, delay) {
            break;
        }
        delay = (delay * 2).min(RECONNECT_MAX_DELAY);
    }
    log::info!("WebSocket thread exiting");
}

fn configure_timeouts(socket: &mut WebSocket<MaybeTlsStream<TcpStream>>) {
    match socket.get_mut() {
        MaybeTlsStream::Plain(tcp) => {
            let _ = tcp.set_read_timeout(Some(READ_TIMEOUT));
            let _ = tcp.set_write_timeout(Some(WRITE_TIMEOUT));
        }
        #[allow(unreachable_patterns)]
        _ => {
            log::debug!("TLS or other stream - using default timeout handling");
        }
    }
}

fn serve(
    socket: &mut WebSocket<MaybeTlsStream<TcpStream>>,
    cmd_rx: &Receiver<WsCommand>,
    event_tx: &Sender<TransportEvent>,
) -> SessionEnd {
    loop {
        match cmd_rx.try_recv() {
            Ok(WsCommand::Send(msg)) => {
                log::debug!("WebSocket sending: {}", preview(&msg));
                if let Err(e) = socket.send(Message::Text(msg)) {
                    log::error!("WebSocket send error: {}", e);
                    return SessionEnd::Lost;
                }
            }
            Ok(WsCommand::Close) => {
                log::info!("WebSocket close requested");
                let _ = socket.close(None);
                return SessionEnd::Closed;
            }
            Err(TryRecvError::Disconnected) => {
                log::info!("WebSocket command channel disconnected");
                let _ = socket.close(None);
                return SessionEnd::Closed;
            }
            Err(TryRecvError::Empty) => {}
        }

        match socket.read() {
            Ok(Message::Text(txt)) => {
                log::debug!("WebSocket received: {}", preview(&txt));
                if event_tx.send(TransportEvent::Message(txt)).is_err() {
                    return SessionEnd::Closed;
                }
            }
            Ok(Message::Ping(data)) => {
                let _ = socket.send(Message::Pong(data));
            }
            Ok(Message::Close(_)) => {
                log::info!("WebSocket received close frame");
                return SessionEnd::Lost;
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(ref e))
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut => {}
            Err(e) => {
                log::error!("WebSocket read error: {}", e);
                return SessionEnd::Lost;
            }
        }
    }
}

/// Sleep before the next attempt. Returns true if the caller asked to stop.
///
/// Sends issued while offline are dropped; the canvas re-syncs from the
/// snapshot after rejoining.
fn wait_for_retry(cmd_rx: &Receiver<WsCommand>, delay: Duration) -> bool {
    let deadline = std::time::Instant::now() + delay;
    loop {
        let remaining = deadline.saturating_duration_since(std::time::Instant::now());
        if remaining.is_zero() {
            return false;
        }
        match cmd_rx.recv_timeout(remaining) {
            Ok(WsCommand::Close) | Err(RecvTimeoutError::Disconnected) => return true,
            Ok(WsCommand::Send(_)) => log::warn!("Dropping message sent while offline"),
            Err(RecvTimeoutError::Timeout) => return false,
        }
    }
}

fn preview(text: &str) -> &str {
    let end = text
        .char_indices()
        .nth(100)
        .map_or(text.len(), |(i, _)| i);
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_websocket_url() {
        let mut socket = NativeWebSocket::new();
        assert!(matches!(
            socket.connect("http://localhost:3030"),
            Err(SyncError::InvalidUrl(_))
        ));
        assert!(matches!(
            socket.connect("not a url"),
            Err(SyncError::InvalidUrl(_))
        ));
        assert_eq!(socket.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_send_before_connect_fails() {
        let mut socket = NativeWebSocket::new();
        assert!(matches!(
            socket.send("{}".to_string()),
            Err(SyncError::NotConnected)
        ));
        assert!(socket.poll().is_empty());
    }

    #[test]
    fn test_preview_respects_char_boundaries() {
        let text = "é".repeat(150);
        assert_eq!(preview(&text).chars().count(), 100);
        assert_eq!(preview("short"), "short");
    }
}
