//! Tool system for the drawing surface.

mod draft;

pub use draft::Draft;

use crate::actions::{ShapeKind, StrokeKind};
use serde::{Deserialize, Serialize};

/// Default pen width.
pub const DEFAULT_BRUSH_SIZE: f64 = 5.0;
/// Default eraser width.
pub const DEFAULT_ERASER_SIZE: f64 = 20.0;
/// Default ink color.
pub const DEFAULT_COLOR: &str = "#000000";

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    #[default]
    Pen,
    Eraser,
    Rectangle,
    Circle,
    Line,
    Triangle,
    Arrow,
    Text,
}

impl ToolKind {
    /// Freehand kind for pen/eraser.
    pub fn stroke_kind(self) -> Option<StrokeKind> {
        match self {
            ToolKind::Pen => Some(StrokeKind::Pen),
            ToolKind::Eraser => Some(StrokeKind::Eraser),
            _ => None,
        }
    }

    /// Outline kind for the two-point shape tools.
    pub fn shape_kind(self) -> Option<ShapeKind> {
        match self {
            ToolKind::Rectangle => Some(ShapeKind::Rectangle),
            ToolKind::Circle => Some(ShapeKind::Circle),
            ToolKind::Line => Some(ShapeKind::Line),
            ToolKind::Triangle => Some(ShapeKind::Triangle),
            ToolKind::Arrow => Some(ShapeKind::Arrow),
            _ => None,
        }
    }
}

/// Current tool choices, read when a draft starts and when text is finalized.
///
/// Passed explicitly rather than read from ambient state, so a settings change
/// cannot reach into a draft that is already in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSettings {
    pub tool: ToolKind,
    pub color: String,
    pub brush_size: f64,
    pub eraser_size: f64,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            tool: ToolKind::default(),
            color: DEFAULT_COLOR.to_string(),
            brush_size: DEFAULT_BRUSH_SIZE,
            eraser_size: DEFAULT_ERASER_SIZE,
        }
    }
}

impl ToolSettings {
    /// Line width for the active tool.
    pub fn stroke_size(&self) -> f64 {
        if self.tool == ToolKind::Eraser {
            self.eraser_size
        } else {
            self.brush_size
        }
    }

    /// Font size for text, derived from the brush size.
    pub fn font_size(&self) -> f64 {
        self.brush_size * 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = ToolSettings::default();
        assert_eq!(settings.tool, ToolKind::Pen);
        assert_eq!(settings.color, "#000000");
        assert!((settings.stroke_size() - DEFAULT_BRUSH_SIZE).abs() < f64::EPSILON);
    }

    #[test]
    fn test_eraser_uses_eraser_size() {
        let settings = ToolSettings {
            tool: ToolKind::Eraser,
            ..ToolSettings::default()
        };
        assert!((settings.stroke_size() - DEFAULT_ERASER_SIZE).abs() < f64::EPSILON);
    }

    #[test]
    fn test_font_size_doubles_brush() {
        let settings = ToolSettings {
            brush_size: 7.0,
            ..ToolSettings::default()
        };
        assert!((settings.font_size() - 14.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(ToolKind::Eraser.stroke_kind(), Some(StrokeKind::Eraser));
        assert_eq!(ToolKind::Arrow.shape_kind(), Some(ShapeKind::Arrow));
        assert_eq!(ToolKind::Text.stroke_kind(), None);
        assert_eq!(ToolKind::Text.shape_kind(), None);
    }
}
