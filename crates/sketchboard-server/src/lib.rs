//! Sketchboard WebSocket Relay Server
//!
//! Relays drawing actions between the participants of a session and keeps
//! each session's history so late joiners can catch up.
//!
//! ## Protocol
//!
//! Messages are JSON objects tagged by `type`:
//! ```json
//! { "type": "join", "session": "abc", "name": "Ada" }
//! { "type": "action", "action": { "tool": "pen", "color": "#000000", "size": 5, "path": [...] } }
//! { "type": "clear" }
//! { "type": "leave" }
//! ```
//! The relay answers with `joined`, `action`, `cleared`, `users` and `error`.
//! A client never receives its own `action` or `cleared` back.

mod config;
mod relay;
mod session;

pub use config::{ADDR_VAR, CHANNEL_CAPACITY_VAR, RelayConfig};
pub use relay::{AppState, router};
pub use session::{Envelope, JoinOutcome, SessionRegistry};

use thiserror::Error;

/// Relay errors.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Not joined to a session")]
    NotJoined,
    #[error("Connection closed")]
    Closed,
    #[error("Serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
