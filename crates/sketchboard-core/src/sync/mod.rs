//! Relay synchronization.
//!
//! [`SyncClient`] speaks the JSON session protocol over any [`Transport`];
//! [`NativeWebSocket`] is the transport used on desktop targets.

mod client;
#[cfg(not(target_arch = "wasm32"))]
mod native;
mod protocol;

pub use client::{ConnectionState, SyncClient, SyncError, SyncEvent, Transport, TransportEvent};
#[cfg(not(target_arch = "wasm32"))]
pub use native::NativeWebSocket;
pub use protocol::{ClientMessage, ServerMessage, decode_action, decode_actions};

#[cfg(test)]
pub(crate) use client::tests::MockTransport;
