//! HTTP routes and the per-connection WebSocket loop.

use crate::session::{Envelope, JoinOutcome, SessionRegistry};
use crate::{RelayConfig, RelayError};
use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use sketchboard_core::sync::{ClientMessage, ServerMessage};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Shared application state
pub struct AppState {
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(config: &RelayConfig) -> Self {
        Self {
            sessions: SessionRegistry::new(config.channel_capacity),
        }
    }
}

/// Build the relay router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Index page
async fn index() -> &'static str {
    "Sketchboard Relay Server - Connect via WebSocket at /ws"
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

/// WebSocket upgrade handler
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

type Sender = SplitSink<WebSocket, Message>;

/// Per-connection state.
struct Connection {
    peer_id: String,
    session: Option<String>,
    rx: Option<broadcast::Receiver<Envelope>>,
}

impl Connection {
    fn enter(&mut self, session: String, outcome: JoinOutcome) -> ServerMessage {
        self.session = Some(session);
        self.rx = Some(outcome.rx);
        outcome.joined
    }

    fn leave(&mut self, state: &AppState) {
        if let Some(session) = self.session.take() {
            state.sessions.leave(&session, &self.peer_id);
        }
        self.rx = None;
    }
}

async fn send_message(sender: &mut Sender, message: &ServerMessage) -> Result<(), RelayError> {
    let text = serde_json::to_string(message)?;
    sender
        .send(Message::Text(text.into()))
        .await
        .map_err(|_| RelayError::Closed)
}

/// Handle one client message. Errors are reported back to the client.
fn dispatch(
    state: &AppState,
    conn: &mut Connection,
    message: ClientMessage,
) -> Result<Option<ServerMessage>, RelayError> {
    match message {
        ClientMessage::Join { session, name } => {
            if conn.session.as_deref().is_some_and(|current| current != session) {
                conn.leave(state);
            }
            let outcome = state.sessions.join(&session, &conn.peer_id, &name)?;
            Ok(Some(conn.enter(session, outcome)))
        }
        ClientMessage::Leave => {
            conn.leave(state);
            Ok(None)
        }
        ClientMessage::Action { action } => {
            let session = conn.session.as_deref().ok_or(RelayError::NotJoined)?;
            state.sessions.append_action(session, &conn.peer_id, &action)?;
            Ok(None)
        }
        ClientMessage::Clear => {
            let session = conn.session.as_deref().ok_or(RelayError::NotJoined)?;
            state.sessions.clear(session, &conn.peer_id)?;
            Ok(None)
        }
    }
}

/// Handle a WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let mut conn = Connection {
        peer_id: Uuid::new_v4().to_string(),
        session: None,
        rx: None,
    };
    info!("New connection: {}", conn.peer_id);

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            // Handle incoming messages from client
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(message) => dispatch(&state, &mut conn, message).unwrap_or_else(|e| {
                                warn!("Rejected message from {}: {}", conn.peer_id, e);
                                Some(ServerMessage::Error { message: e.to_string() })
                            }),
                            Err(e) => {
                                warn!("Invalid message from {}: {}", conn.peer_id, e);
                                Some(ServerMessage::Error {
                                    message: format!("Invalid message: {}", e),
                                })
                            }
                        };
                        if let Some(reply) = reply {
                            if send_message(&mut sender, &reply).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // Ignore binary, ping/pong
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {}", conn.peer_id, e);
                        break;
                    }
                }
            }

            // Handle broadcast messages from the session
            msg = async {
                match &mut conn.rx {
                    Some(rx) => rx.recv().await,
                    None => std::future::pending().await,
                }
            } => {
                match msg {
                    Ok(envelope) => {
                        // Don't echo back to sender
                        if envelope.is_for(&conn.peer_id) {
                            let text = envelope.text.to_string();
                            if sender.send(Message::Text(text.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!("Peer {} lagged by {} messages, resyncing", conn.peer_id, missed);
                        let Some(session) = conn.session.clone() else { continue };
                        match state.sessions.resync(&session, &conn.peer_id) {
                            Ok(outcome) => {
                                let joined = conn.enter(session, outcome);
                                if send_message(&mut sender, &joined).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!("Resync failed for {}: {}", conn.peer_id, e);
                                conn.rx = None;
                            }
                        }
                    }
                    Err(RecvError::Closed) => {
                        debug!("Session channel closed for {}", conn.peer_id);
                        conn.rx = None;
                    }
                }
            }
        }
    }

    // Cleanup on disconnect
    conn.leave(&state);
    info!("Connection closed: {}", conn.peer_id);
}
