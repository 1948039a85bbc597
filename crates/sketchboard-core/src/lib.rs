//! Sketchboard Core Library
//!
//! Platform-agnostic data model and logic for the Sketchboard shared canvas:
//! drawing actions and their wire format, the viewport transform, theme color
//! policy, the action log, the interaction state machine and the relay client.

pub mod actions;
pub mod camera;
pub mod canvas;
pub mod color;
pub mod history;
pub mod input;
pub mod sync;
pub mod tools;

pub use actions::{
    Action, ActionError, ImageAction, ShapeAction, ShapeKind, Stroke, StrokeKind, TextAction,
};
pub use camera::Viewport;
pub use canvas::{Canvas, InteractionState, Outgoing, TextEntry};
pub use color::{Theme, background_color_for, resolve_color};
pub use history::ActionLog;
pub use input::{Key, Modifiers, MouseButton, PointerEvent};
pub use sync::{ConnectionState, SyncClient, SyncError, SyncEvent, Transport, TransportEvent};
#[cfg(not(target_arch = "wasm32"))]
pub use sync::NativeWebSocket;
pub use tools::{Draft, ToolKind, ToolSettings};
