//! Session-aware client on top of a message transport.

use super::protocol::{ClientMessage, ServerMessage, decode_action, decode_actions};
use crate::actions::Action;
use crate::canvas::Outgoing;
use thiserror::Error;

/// Errors raised by the sync layer.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Not connected")]
    NotConnected,
    #[error("Already connected")]
    AlreadyConnected,
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Transport channel closed")]
    ChannelClosed,
    #[error("Serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Raw events produced by a transport.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Connected,
    Message(String),
    Disconnected,
    Error(String),
}

/// A bidirectional text-message channel to the relay.
///
/// Implementations must not block in either method; inbound traffic is
/// buffered until the next `poll`.
pub trait Transport {
    fn send(&mut self, text: String) -> Result<(), SyncError>;
    fn poll(&mut self) -> Vec<TransportEvent>;
}

/// Events surfaced to the canvas host.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    Connected,
    Disconnected,
    /// Authoritative history for the joined session; replaces local history.
    HistorySnapshot(Vec<Action>),
    RemoteAction(Action),
    Cleared,
    Users(Vec<String>),
    Error(String),
}

#[derive(Debug, Clone)]
struct SessionRequest {
    session: String,
    name: String,
}

/// Client for one relay connection.
pub struct SyncClient<T: Transport> {
    transport: T,
    state: ConnectionState,
    session: Option<SessionRequest>,
}

impl<T: Transport> SyncClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: ConnectionState::Connecting,
            session: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Current session id, if one was requested.
    pub fn session(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.session.as_str())
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Request to join a session.
    ///
    /// Sent immediately when connected, otherwise on the next connect. The
    /// request is remembered and re-sent after every reconnect.
    pub fn join_session(
        &mut self,
        session: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<(), SyncError> {
        self.session = Some(SessionRequest {
            session: session.into(),
            name: name.into(),
        });
        if self.is_connected() {
            self.send_join()?;
        }
        Ok(())
    }

    /// Leave the current session.
    pub fn leave_session(&mut self) -> Result<(), SyncError> {
        if self.session.take().is_some() && self.is_connected() {
            self.send(&ClientMessage::Leave)?;
        }
        Ok(())
    }

    /// Broadcast a locally committed action.
    pub fn emit_action(&mut self, action: &Action) -> Result<(), SyncError> {
        self.send(&ClientMessage::Action {
            action: action.clone(),
        })
    }

    /// Broadcast a clear of the session history.
    pub fn emit_clear(&mut self) -> Result<(), SyncError> {
        self.send(&ClientMessage::Clear)
    }

    /// Forward one queued canvas effect.
    pub fn send_outgoing(&mut self, outgoing: Outgoing) -> Result<(), SyncError> {
        match outgoing {
            Outgoing::Action(action) => self.emit_action(&action),
            Outgoing::Clear => self.emit_clear(),
        }
    }

    /// Drain transport events and translate them (non-blocking).
    pub fn poll(&mut self) -> Vec<SyncEvent> {
        let mut events = Vec::new();
        for event in self.transport.poll() {
            match event {
                TransportEvent::Connected => {
                    self.state = ConnectionState::Connected;
                    if let Err(e) = self.send_join() {
                        log::error!("Failed to send join: {}", e);
                    }
                    events.push(SyncEvent::Connected);
                }
                TransportEvent::Disconnected => {
                    self.state = ConnectionState::Disconnected;
                    events.push(SyncEvent::Disconnected);
                }
                TransportEvent::Error(message) => {
                    self.state = ConnectionState::Error;
                    events.push(SyncEvent::Error(message));
                }
                TransportEvent::Message(text) => {
                    if let Some(event) = self.handle_message(&text) {
                        events.push(event);
                    }
                }
            }
        }
        events
    }

    fn handle_message(&self, text: &str) -> Option<SyncEvent> {
        let message = match serde_json::from_str::<ServerMessage>(text) {
            Ok(message) => message,
            Err(e) => {
                log::warn!("Failed to parse server message: {}", e);
                return None;
            }
        };
        match message {
            ServerMessage::Joined {
                session,
                peer_count,
                history,
            } => {
                if self.session() != Some(session.as_str()) {
                    log::warn!("Ignoring snapshot for session {}", session);
                    return None;
                }
                log::info!(
                    "Joined session {} with {} peers, {} actions",
                    session,
                    peer_count,
                    history.len()
                );
                Some(SyncEvent::HistorySnapshot(decode_actions(history)))
            }
            ServerMessage::Action { action } => decode_action(action).map(SyncEvent::RemoteAction),
            ServerMessage::Cleared => Some(SyncEvent::Cleared),
            ServerMessage::Users { users } => Some(SyncEvent::Users(users)),
            ServerMessage::Error { message } => {
                log::warn!("Relay error: {}", message);
                Some(SyncEvent::Error(message))
            }
        }
    }

    fn send_join(&mut self) -> Result<(), SyncError> {
        let Some(request) = self.session.clone() else {
            return Ok(());
        };
        log::debug!("Joining session {}", request.session);
        self.send(&ClientMessage::Join {
            session: request.session,
            name: request.name,
        })
    }

    fn send(&mut self, message: &ClientMessage) -> Result<(), SyncError> {
        if !self.is_connected() {
            return Err(SyncError::NotConnected);
        }
        let text = serde_json::to_string(message)?;
        self.transport.send(text)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::actions::{ShapeAction, ShapeKind};
    use kurbo::Point;
    use serde_json::{Value, json};

    /// In-memory transport recording what was sent.
    #[derive(Default)]
    pub(crate) struct MockTransport {
        pub sent: Vec<String>,
        pub inbound: Vec<TransportEvent>,
    }

    impl MockTransport {
        pub fn push_json(&mut self, value: Value) {
            self.inbound.push(TransportEvent::Message(value.to_string()));
        }

        pub fn sent_json(&self) -> Vec<Value> {
            self.sent
                .iter()
                .map(|s| serde_json::from_str(s).unwrap())
                .collect()
        }
    }

    impl Transport for MockTransport {
        fn send(&mut self, text: String) -> Result<(), SyncError> {
            self.sent.push(text);
            Ok(())
        }

        fn poll(&mut self) -> Vec<TransportEvent> {
            std::mem::take(&mut self.inbound)
        }
    }

    fn line() -> Action {
        Action::Shape(ShapeAction {
            kind: ShapeKind::Line,
            color: "#000000".to_string(),
            size: 2.0,
            start: Point::ZERO,
            end: Point::new(5.0, 5.0),
        })
    }

    fn connected_client() -> SyncClient<MockTransport> {
        let mut client = SyncClient::new(MockTransport::default());
        client.transport_mut().inbound.push(TransportEvent::Connected);
        assert_eq!(client.poll(), vec![SyncEvent::Connected]);
        client
    }

    #[test]
    fn test_join_waits_for_connection() {
        let mut client = SyncClient::new(MockTransport::default());
        client.join_session("abc", "Ada").unwrap();
        assert!(client.transport().sent.is_empty());

        client.transport_mut().inbound.push(TransportEvent::Connected);
        client.poll();
        assert_eq!(
            client.transport().sent_json(),
            vec![json!({"type": "join", "session": "abc", "name": "Ada"})]
        );
    }

    #[test]
    fn test_rejoin_after_reconnect() {
        let mut client = connected_client();
        client.join_session("abc", "Ada").unwrap();
        client.transport_mut().inbound.extend([
            TransportEvent::Disconnected,
            TransportEvent::Connected,
        ]);
        let events = client.poll();
        assert_eq!(events, vec![SyncEvent::Disconnected, SyncEvent::Connected]);
        assert_eq!(client.transport().sent.len(), 2);
        assert!(client.is_connected());
    }

    #[test]
    fn test_emit_requires_connection() {
        let mut client = SyncClient::new(MockTransport::default());
        assert!(matches!(
            client.emit_action(&line()),
            Err(SyncError::NotConnected)
        ));
        let mut client = connected_client();
        client.send_outgoing(Outgoing::Action(line())).unwrap();
        client.send_outgoing(Outgoing::Clear).unwrap();
        let sent = client.transport().sent_json();
        assert_eq!(sent[0]["type"], "action");
        assert_eq!(sent[0]["action"]["tool"], "line");
        assert_eq!(sent[1], json!({"type": "clear"}));
    }

    #[test]
    fn test_inbound_translation() {
        let mut client = connected_client();
        client.join_session("abc", "Ada").unwrap();
        let transport = client.transport_mut();
        transport.push_json(json!({
            "type": "joined", "session": "abc", "peer_count": 1,
            "history": [
                {"tool": "line", "color": "#000000", "size": 2, "startX": 0, "startY": 0, "endX": 5, "endY": 5},
                {"tool": "bogus"}
            ]
        }));
        transport.push_json(json!({"type": "action", "action": {"tool": "nope"}}));
        let remote = serde_json::to_value(line()).unwrap();
        transport.push_json(json!({"type": "action", "action": remote}));
        transport.push_json(json!({"type": "cleared"}));
        transport.push_json(json!({"type": "users", "users": ["Ada", "Bob"]}));
        transport
            .inbound
            .push(TransportEvent::Message("not json".to_string()));

        let events = client.poll();
        assert_eq!(
            events,
            vec![
                SyncEvent::HistorySnapshot(vec![line()]),
                SyncEvent::RemoteAction(line()),
                SyncEvent::Cleared,
                SyncEvent::Users(vec!["Ada".to_string(), "Bob".to_string()]),
            ]
        );
    }

    #[test]
    fn test_snapshot_for_other_session_ignored() {
        let mut client = connected_client();
        client.join_session("abc", "Ada").unwrap();
        client
            .transport_mut()
            .push_json(json!({"type": "joined", "session": "xyz", "peer_count": 1, "history": []}));
        assert!(client.poll().is_empty());
    }

    #[test]
    fn test_leave_forgets_session() {
        let mut client = connected_client();
        client.join_session("abc", "Ada").unwrap();
        client.leave_session().unwrap();
        assert_eq!(client.session(), None);
        assert_eq!(client.transport().sent_json()[1], json!({"type": "leave"}));
    }
}
