//! JSON messages exchanged with the relay.

use crate::actions::Action;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Messages sent to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join a session, creating it if unknown.
    Join { session: String, name: String },
    /// A locally committed action.
    Action { action: Action },
    /// Clear the session history for everyone.
    Clear,
    /// Leave the current session.
    Leave,
}

/// Messages received from the relay.
///
/// Action payloads stay as raw JSON here so one bad record can be dropped
/// without losing the rest of the message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Join confirmed, with the full session history in order.
    Joined {
        session: String,
        peer_count: usize,
        #[serde(default)]
        history: Vec<Value>,
    },
    /// An action committed by another participant.
    Action { action: Value },
    /// Another participant cleared the session.
    Cleared,
    /// Display names of everyone in the session.
    Users { users: Vec<String> },
    /// Error message
    Error { message: String },
}

/// Decode one inbound action record, logging and dropping it if malformed.
pub fn decode_action(value: Value) -> Option<Action> {
    match serde_json::from_value::<Action>(value) {
        Ok(action) => Some(action),
        Err(e) => {
            log::warn!("Dropping malformed action: {}", e);
            None
        }
    }
}

/// Decode a history snapshot, skipping malformed entries individually.
pub fn decode_actions(values: Vec<Value>) -> Vec<Action> {
    let total = values.len();
    let actions: Vec<Action> = values.into_iter().filter_map(decode_action).collect();
    if actions.len() != total {
        log::warn!(
            "Skipped {} of {} history entries",
            total - actions.len(),
            total
        );
    }
    actions
}
