//! The in-progress action under local construction.

use super::ToolSettings;
use crate::actions::{Action, ShapeAction, Stroke};
use crate::color::{Theme, background_color_for};
use kurbo::Point;

/// An uncommitted action that grows with pointer movement.
///
/// Rendered as a live preview on top of the history, but not part of it
/// until [`Draft::finish`] hands the action over for commit.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    action: Action,
}

impl Draft {
    /// Start a draft for the active tool at a canvas-space point.
    ///
    /// Returns `None` for tools that do not draft (text has its own flow).
    /// Eraser strokes take the current background as their ink.
    pub fn begin(settings: &ToolSettings, theme: Theme, start: Point) -> Option<Self> {
        let size = settings.stroke_size();
        if let Some(kind) = settings.tool.stroke_kind() {
            let color = match kind {
                crate::actions::StrokeKind::Pen => settings.color.clone(),
                crate::actions::StrokeKind::Eraser => background_color_for(theme).to_string(),
            };
            return Some(Self {
                action: Action::Stroke(Stroke {
                    kind,
                    color,
                    size,
                    path: vec![start],
                }),
            });
        }
        let kind = settings.tool.shape_kind()?;
        Some(Self {
            action: Action::Shape(ShapeAction {
                kind,
                color: settings.color.clone(),
                size,
                start,
                end: start,
            }),
        })
    }

    /// Feed a new canvas-space pointer position.
    ///
    /// Strokes append to their path; shapes move their end point.
    pub fn update(&mut self, point: Point) {
        match &mut self.action {
            Action::Stroke(stroke) => stroke.path.push(point),
            Action::Shape(shape) => shape.end = point,
            Action::Text(_) | Action::Image(_) => {}
        }
    }

    /// Preview of the action as it would be committed now.
    pub fn preview(&self) -> &Action {
        &self.action
    }

    /// Freeze the draft into a committed action.
    pub fn finish(self) -> Action {
        self.action
    }
}
