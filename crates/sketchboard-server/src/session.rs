//! Session registry: per-session history, membership and broadcast.

use crate::RelayError;
use dashmap::DashMap;
use serde_json::Value;
use sketchboard_core::actions::Action;
use sketchboard_core::sync::ServerMessage;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// A pre-serialized message on a session's broadcast channel.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// Originating peer, never sent its own message. `None` goes to everyone.
    pub from: Option<Arc<str>>,
    pub text: Arc<str>,
}

impl Envelope {
    fn new(from: Option<&str>, message: &ServerMessage) -> Result<Self, RelayError> {
        Ok(Self {
            from: from.map(Arc::from),
            text: Arc::from(serde_json::to_string(message)?),
        })
    }

    /// Whether this envelope should be delivered to `peer_id`.
    pub fn is_for(&self, peer_id: &str) -> bool {
        self.from.as_deref() != Some(peer_id)
    }
}

#[derive(Debug, Clone)]
struct Peer {
    id: String,
    name: String,
}

struct Session {
    tx: broadcast::Sender<Envelope>,
    /// Members in join order.
    peers: Vec<Peer>,
    /// Accepted actions in broadcast order, canonically encoded.
    history: Vec<Value>,
}

impl Session {
    fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            peers: Vec::new(),
            history: Vec::new(),
        }
    }

    fn user_names(&self) -> Vec<String> {
        self.peers.iter().map(|p| p.name.clone()).collect()
    }

    /// Send to current subscribers. No subscribers is not an error.
    fn publish(&self, from: Option<&str>, message: &ServerMessage) -> Result<(), RelayError> {
        let _ = self.tx.send(Envelope::new(from, message)?);
        Ok(())
    }

    fn publish_users(&self) -> Result<(), RelayError> {
        self.publish(
            None,
            &ServerMessage::Users {
                users: self.user_names(),
            },
        )
    }
}

/// Everything a newly joined peer needs.
pub struct JoinOutcome {
    pub rx: broadcast::Receiver<Envelope>,
    /// The `joined` reply, consistent with `rx`: nothing is missed or repeated.
    pub joined: ServerMessage,
}

/// All live sessions, keyed by id.
pub struct SessionRegistry {
    sessions: DashMap<String, Session>,
    channel_capacity: usize,
}

impl SessionRegistry {
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            channel_capacity: channel_capacity.max(1),
        }
    }

    /// Add (or refresh) a peer in a session, creating the session if unknown.
    pub fn join(
        &self,
        session_id: &str,
        peer_id: &str,
        name: &str,
    ) -> Result<JoinOutcome, RelayError> {
        let mut session = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Session::new(self.channel_capacity));

        match session.peers.iter_mut().find(|p| p.id == peer_id) {
            Some(peer) => peer.name = name.to_string(),
            None => session.peers.push(Peer {
                id: peer_id.to_string(),
                name: name.to_string(),
            }),
        }
        // Subscribe and snapshot under the same lock.
        let rx = session.tx.subscribe();
        let joined = ServerMessage::Joined {
            session: session_id.to_string(),
            peer_count: session.peers.len(),
            history: session.history.clone(),
        };
        session.publish_users()?;
        info!(
            "Peer {} joined session {} ({} peers, {} actions)",
            peer_id,
            session_id,
            session.peers.len(),
            session.history.len()
        );
        Ok(JoinOutcome { rx, joined })
    }

    /// Fresh `joined` snapshot and receiver for a peer that fell behind.
    pub fn resync(&self, session_id: &str, peer_id: &str) -> Result<JoinOutcome, RelayError> {
        let name = self
            .sessions
            .get(session_id)
            .and_then(|s| s.peers.iter().find(|p| p.id == peer_id).map(|p| p.name.clone()))
            .ok_or_else(|| RelayError::NotJoined)?;
        self.join(session_id, peer_id, &name)
    }

    /// Remove a peer; drops the session once it has no peers and no history.
    pub fn leave(&self, session_id: &str, peer_id: &str) {
        if let Some(mut session) = self.sessions.get_mut(session_id) {
            let before = session.peers.len();
            session.peers.retain(|p| p.id != peer_id);
            if session.peers.len() != before {
                if let Err(e) = session.publish_users() {
                    debug!("Failed to publish users for {}: {}", session_id, e);
                }
                info!("Peer {} left session {}", peer_id, session_id);
            }
        }
        if self
            .sessions
            .remove_if(session_id, |_, s| s.peers.is_empty() && s.history.is_empty())
            .is_some()
        {
            debug!("Dropped empty session {}", session_id);
        }
    }

    /// Append an action to history and broadcast it to the other peers.
    pub fn append_action(
        &self,
        session_id: &str,
        peer_id: &str,
        action: &Action,
    ) -> Result<(), RelayError> {
        let mut session = self.member_session(session_id, peer_id)?;
        let value = serde_json::to_value(action)?;
        let message = ServerMessage::Action {
            action: value.clone(),
        };
        // Append and send while holding the entry lock, so history order
        // equals broadcast order.
        session.publish(Some(peer_id), &message)?;
        session.history.push(value);
        Ok(())
    }

    /// Empty the session history and tell the other peers.
    pub fn clear(&self, session_id: &str, peer_id: &str) -> Result<(), RelayError> {
        let mut session = self.member_session(session_id, peer_id)?;
        session.history.clear();
        session.publish(Some(peer_id), &ServerMessage::Cleared)?;
        info!("Session {} cleared by {}", session_id, peer_id);
        Ok(())
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn history_len(&self, session_id: &str) -> Option<usize> {
        self.sessions.get(session_id).map(|s| s.history.len())
    }

    pub fn users(&self, session_id: &str) -> Option<Vec<String>> {
        self.sessions.get(session_id).map(|s| s.user_names())
    }

    fn member_session(
        &self,
        session_id: &str,
        peer_id: &str,
    ) -> Result<dashmap::mapref::one::RefMut<'_, String, Session>, RelayError> {
        let session = self
            .sessions
            .get_mut(session_id)
            .ok_or(RelayError::NotJoined)?;
        if !session.peers.iter().any(|p| p.id == peer_id) {
            return Err(RelayError::NotJoined);
        }
        Ok(session)
    }
}
