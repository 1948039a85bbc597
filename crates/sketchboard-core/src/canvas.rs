//! Canvas state and the interaction state machine.
//!
//! [`Canvas`] owns everything a single client needs to draw: viewport,
//! committed history, tool settings, theme and the in-progress interaction.
//! Device input and relay events are fed in one at a time; effects that must
//! reach the relay are queued as [`Outgoing`] and drained by the host.

use crate::actions::{Action, ImageAction, TextAction};
use crate::camera::{BUTTON_ZOOM_FACTOR, Viewport, WHEEL_ZOOM_FACTOR};
use crate::color::Theme;
use crate::history::ActionLog;
use crate::input::{Key, Modifiers, MouseButton, PointerEvent};
use crate::sync::SyncEvent;
use crate::tools::{Draft, ToolKind, ToolSettings};
use kurbo::{Point, Size, Vec2};

/// Device position at which inserted images are anchored.
pub const IMAGE_INSERT_POSITION: Point = Point::new(50.0, 50.0);

/// Effects to forward to the relay.
#[derive(Debug, Clone, PartialEq)]
pub enum Outgoing {
    Action(Action),
    Clear,
}

/// An open text region.
#[derive(Debug, Clone, PartialEq)]
pub struct TextEntry {
    /// Device position of the gesture; where the host places the editor.
    pub anchor: Point,
    /// Canvas position the committed text will be anchored at.
    pub position: Point,
    /// Text typed so far.
    pub buffer: String,
    /// Visual scale for the editor, the viewport scale when it opened.
    pub display_scale: f64,
}

/// What the pointer is currently doing.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    /// Dragging the viewport; `last` is the previous device position.
    Panning { last: Point },
    /// Building a stroke or shape.
    BuildingDraft(Draft),
    /// Typing into a text region.
    TextEntry(TextEntry),
}

/// A client's drawing surface.
#[derive(Debug, Clone)]
pub struct Canvas {
    viewport: Viewport,
    history: ActionLog,
    settings: ToolSettings,
    theme: Theme,
    surface_size: Size,
    state: InteractionState,
    outgoing: Vec<Outgoing>,
    needs_redraw: bool,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

impl Canvas {
    pub fn new() -> Self {
        Self {
            viewport: Viewport::default(),
            history: ActionLog::new(),
            settings: ToolSettings::default(),
            theme: Theme::default(),
            surface_size: Size::new(800.0, 600.0),
            state: InteractionState::Idle,
            outgoing: Vec::new(),
            needs_redraw: true,
        }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn history(&self) -> &ActionLog {
        &self.history
    }

    pub fn settings(&self) -> &ToolSettings {
        &self.settings
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn surface_size(&self) -> Size {
        self.surface_size
    }

    pub fn interaction(&self) -> &InteractionState {
        &self.state
    }

    /// The in-progress draft, rendered on top of the history.
    pub fn draft(&self) -> Option<&Draft> {
        match &self.state {
            InteractionState::BuildingDraft(draft) => Some(draft),
            _ => None,
        }
    }

    pub fn text_entry(&self) -> Option<&TextEntry> {
        match &self.state {
            InteractionState::TextEntry(entry) => Some(entry),
            _ => None,
        }
    }

    pub fn is_typing(&self) -> bool {
        matches!(self.state, InteractionState::TextEntry(_))
    }

    /// Returns true once after any change that affects rendered output.
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.needs_redraw)
    }

    /// Take queued relay effects in commit order.
    pub fn drain_outgoing(&mut self) -> Vec<Outgoing> {
        std::mem::take(&mut self.outgoing)
    }

    pub fn set_surface_size(&mut self, size: Size) {
        if size.is_finite() && size.width > 0.0 && size.height > 0.0 {
            self.surface_size = size;
        }
    }

    // --- Settings ---

    /// Switch the active tool. Refused while text is being entered.
    pub fn set_tool(&mut self, tool: ToolKind) -> bool {
        if self.is_typing() {
            log::debug!("Tool switch to {:?} suppressed during text entry", tool);
            return false;
        }
        self.settings.tool = tool;
        true
    }

    pub fn set_color(&mut self, color: impl Into<String>) -> bool {
        let color = color.into();
        if color.trim().is_empty() {
            return false;
        }
        self.settings.color = color;
        true
    }

    pub fn set_brush_size(&mut self, size: f64) -> bool {
        if !(size.is_finite() && size > 0.0) {
            log::warn!("Ignoring invalid brush size {}", size);
            return false;
        }
        self.settings.brush_size = size;
        true
    }

    pub fn set_eraser_size(&mut self, size: f64) -> bool {
        if !(size.is_finite() && size > 0.0) {
            log::warn!("Ignoring invalid eraser size {}", size);
            return false;
        }
        self.settings.eraser_size = size;
        true
    }

    /// Change the theme. Stored colors are untouched; only rendering changes.
    pub fn set_theme(&mut self, theme: Theme) {
        if self.theme != theme {
            self.theme = theme;
            self.needs_redraw = true;
        }
    }

    // --- Pointer input ---

    /// Feed one pointer event.
    pub fn handle_pointer_event(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Down {
                position,
                button,
                modifiers,
            } => self.pointer_down(position, button, modifiers),
            PointerEvent::Move { position } => self.pointer_move(position),
            PointerEvent::Up { .. } | PointerEvent::Leave => self.pointer_up(),
            PointerEvent::Scroll { position, delta } => self.scroll(position, delta),
        }
    }

    fn pointer_down(&mut self, position: Point, button: MouseButton, modifiers: Modifiers) {
        if !matches!(self.state, InteractionState::Idle) {
            return;
        }
        let pan_gesture =
            button == MouseButton::Middle || (button == MouseButton::Left && modifiers.ctrl);
        if pan_gesture {
            self.state = InteractionState::Panning { last: position };
            return;
        }
        if button != MouseButton::Left {
            return;
        }

        let world = self.viewport.screen_to_world(position);
        if self.settings.tool == ToolKind::Text {
            self.state = InteractionState::TextEntry(TextEntry {
                anchor: position,
                position: world,
                buffer: String::new(),
                display_scale: self.viewport.scale,
            });
            self.needs_redraw = true;
            return;
        }

        if let Some(draft) = Draft::begin(&self.settings, self.theme, world) {
            self.state = InteractionState::BuildingDraft(draft);
            self.needs_redraw = true;
        }
    }

    fn pointer_move(&mut self, position: Point) {
        match &mut self.state {
            InteractionState::Panning { last } => {
                let delta = position - *last;
                *last = position;
                self.viewport.pan_by(delta);
                self.needs_redraw = true;
            }
            InteractionState::BuildingDraft(draft) => {
                draft.update(self.viewport.screen_to_world(position));
                self.needs_redraw = true;
            }
            InteractionState::Idle | InteractionState::TextEntry(_) => {}
        }
    }

    fn pointer_up(&mut self) {
        match std::mem::take(&mut self.state) {
            InteractionState::BuildingDraft(draft) => {
                self.commit(draft.finish());
            }
            InteractionState::Panning { .. } | InteractionState::Idle => {}
            // Text regions end on blur or Enter, not on release.
            typing @ InteractionState::TextEntry(_) => self.state = typing,
        }
    }

    fn scroll(&mut self, position: Point, delta: Vec2) {
        // Horizontal-only wheel motion carries no zoom direction.
        if self.is_typing() || delta.y == 0.0 {
            return;
        }
        let factor = if delta.y < 0.0 {
            WHEEL_ZOOM_FACTOR
        } else {
            1.0 / WHEEL_ZOOM_FACTOR
        };
        if self.viewport.zoom_at(position, factor) {
            self.needs_redraw = true;
        }
    }

    // --- Zoom buttons ---

    pub fn zoom_in(&mut self) -> bool {
        self.zoom_buttons(BUTTON_ZOOM_FACTOR)
    }

    pub fn zoom_out(&mut self) -> bool {
        self.zoom_buttons(1.0 / BUTTON_ZOOM_FACTOR)
    }

    fn zoom_buttons(&mut self, factor: f64) -> bool {
        if self.is_typing() {
            return false;
        }
        let zoomed = self.viewport.zoom_at_center(self.surface_size, factor);
        self.needs_redraw |= zoomed;
        zoomed
    }

    /// Return to the identity view.
    pub fn reset_view(&mut self) {
        if self.is_typing() {
            return;
        }
        self.viewport.reset();
        self.needs_redraw = true;
    }

    // --- Text entry ---

    /// Append typed text to the open region.
    pub fn text_input(&mut self, text: &str) {
        if let InteractionState::TextEntry(entry) = &mut self.state {
            entry.buffer.push_str(text);
        }
    }

    /// Handle a key press while text is being entered.
    pub fn key_down(&mut self, key: Key, modifiers: Modifiers) {
        if key == Key::Enter && !modifiers.shift {
            self.finish_text();
            return;
        }
        let InteractionState::TextEntry(entry) = &mut self.state else {
            return;
        };
        match key {
            Key::Enter => entry.buffer.push('\n'),
            Key::Backspace => {
                entry.buffer.pop();
            }
        }
    }

    /// The text region lost focus.
    pub fn blur_text(&mut self) {
        self.finish_text();
    }

    fn finish_text(&mut self) {
        if !self.is_typing() {
            return;
        }
        let InteractionState::TextEntry(entry) = std::mem::take(&mut self.state) else {
            return;
        };
        self.needs_redraw = true;
        let text = entry.buffer.trim();
        if text.is_empty() {
            log::debug!("Discarding empty text region");
            return;
        }
        self.commit(Action::Text(TextAction {
            color: self.settings.color.clone(),
            font_size: self.settings.font_size(),
            text: text.to_string(),
            position: entry.position,
        }));
    }

    // --- Other commands ---

    /// Place an encoded image at the fixed insertion point.
    pub fn insert_image(&mut self, source: impl Into<String>) -> bool {
        let position = self.viewport.screen_to_world(IMAGE_INSERT_POSITION);
        self.commit(Action::Image(ImageAction {
            source: source.into(),
            position,
        }))
    }

    /// Clear the history locally and tell the relay.
    pub fn request_clear(&mut self) {
        self.history.clear();
        self.outgoing.push(Outgoing::Clear);
        self.needs_redraw = true;
    }

    fn commit(&mut self, action: Action) -> bool {
        if let Err(e) = action.validate() {
            log::warn!("Refusing to commit {} action: {}", action.tool_name(), e);
            return false;
        }
        log::debug!("Committing {} action", action.tool_name());
        self.history.append(action.clone());
        self.outgoing.push(Outgoing::Action(action));
        self.needs_redraw = true;
        true
    }

    // --- Relay ---

    /// Apply an inbound relay event. Returns true if the history changed.
    pub fn apply_sync_event(&mut self, event: SyncEvent) -> bool {
        match event {
            SyncEvent::HistorySnapshot(actions) => self.history.replace_all(actions),
            SyncEvent::RemoteAction(action) => self.history.append(action),
            SyncEvent::Cleared => self.history.clear(),
            SyncEvent::Connected
            | SyncEvent::Disconnected
            | SyncEvent::Users(_)
            | SyncEvent::Error(_) => return false,
        }
        self.needs_redraw = true;
        true
    }
}
