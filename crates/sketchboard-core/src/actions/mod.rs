//! Drawing actions: the unit of replication between participants.
//!
//! An [`Action`] is immutable once committed to the history. Geometry is
//! always stored in canvas space.

mod geometry;
mod wire;

pub use geometry::ARROW_HEAD_LENGTH;

use kurbo::Point;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons an action record is rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActionError {
    #[error("Size must be a positive number, got {0}")]
    InvalidSize(f64),
    #[error("Font size must be a positive number, got {0}")]
    InvalidFontSize(f64),
    #[error("Stroke path is empty")]
    EmptyPath,
    #[error("Non-finite coordinate in {0}")]
    NonFinite(&'static str),
    #[error("Text is empty")]
    EmptyText,
    #[error("Image source is empty")]
    EmptyImage,
    #[error("Color is empty")]
    EmptyColor,
}

/// Freehand tools that produce a [`Stroke`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrokeKind {
    Pen,
    Eraser,
}

/// Two-point outline shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Rectangle,
    Circle,
    Line,
    Triangle,
    Arrow,
}

/// A freehand polyline.
#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    pub kind: StrokeKind,
    /// Ink color. For erasers, the background color at creation time.
    pub color: String,
    /// Line width in device pixels at scale 1.
    pub size: f64,
    /// Points in canvas space, in pointer order. Never empty.
    pub path: Vec<Point>,
}

impl Stroke {
    /// A stroke needs at least two points to leave a mark.
    pub fn is_drawable(&self) -> bool {
        self.path.len() >= 2
    }
}

/// An outline shape spanned by two points.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeAction {
    pub kind: ShapeKind,
    pub color: String,
    pub size: f64,
    pub start: Point,
    pub end: Point,
}

/// A line of text anchored at its baseline origin.
#[derive(Debug, Clone, PartialEq)]
pub struct TextAction {
    pub color: String,
    pub font_size: f64,
    pub text: String,
    pub position: Point,
}

/// An embedded raster image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAction {
    /// Self-contained encoded payload, normally a `data:` URI.
    pub source: String,
    /// Top-left corner in canvas space.
    pub position: Point,
}

/// One committed unit of drawn content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "wire::WireAction", into = "wire::WireAction")]
pub enum Action {
    Stroke(Stroke),
    Shape(ShapeAction),
    Text(TextAction),
    Image(ImageAction),
}

impl Action {
    /// Wire tag of this action.
    pub fn tool_name(&self) -> &'static str {
        match self {
            Action::Stroke(s) => match s.kind {
                StrokeKind::Pen => "pen",
                StrokeKind::Eraser => "eraser",
            },
            Action::Shape(s) => match s.kind {
                ShapeKind::Rectangle => "rectangle",
                ShapeKind::Circle => "circle",
                ShapeKind::Line => "line",
                ShapeKind::Triangle => "triangle",
                ShapeKind::Arrow => "arrow",
            },
            Action::Text(_) => "text",
            Action::Image(_) => "image",
        }
    }

    /// Stored (theme-independent) color, if the action has one.
    pub fn color(&self) -> Option<&str> {
        match self {
            Action::Stroke(s) => Some(&s.color),
            Action::Shape(s) => Some(&s.color),
            Action::Text(t) => Some(&t.color),
            Action::Image(_) => None,
        }
    }

    /// Check the invariants every committed action must hold.
    pub fn validate(&self) -> Result<(), ActionError> {
        match self {
            Action::Stroke(s) => {
                check_color(&s.color)?;
                check_size(s.size)?;
                if s.path.is_empty() {
                    return Err(ActionError::EmptyPath);
                }
                if !s.path.iter().all(|p| p.is_finite()) {
                    return Err(ActionError::NonFinite("path"));
                }
            }
            Action::Shape(s) => {
                check_color(&s.color)?;
                check_size(s.size)?;
                if !s.start.is_finite() || !s.end.is_finite() {
                    return Err(ActionError::NonFinite("shape"));
                }
            }
            Action::Text(t) => {
                check_color(&t.color)?;
                if !(t.font_size.is_finite() && t.font_size > 0.0) {
                    return Err(ActionError::InvalidFontSize(t.font_size));
                }
                if t.text.trim().is_empty() {
                    return Err(ActionError::EmptyText);
                }
                if !t.position.is_finite() {
                    return Err(ActionError::NonFinite("text"));
                }
            }
            Action::Image(i) => {
                if i.source.trim().is_empty() {
                    return Err(ActionError::EmptyImage);
                }
                if !i.position.is_finite() {
                    return Err(ActionError::NonFinite("image"));
                }
            }
        }
        Ok(())
    }
}

fn check_size(size: f64) -> Result<(), ActionError> {
    if size.is_finite() && size > 0.0 {
        Ok(())
    } else {
        Err(ActionError::InvalidSize(size))
    }
}

fn check_color(color: &str) -> Result<(), ActionError> {
    if color.trim().is_empty() {
        Err(ActionError::EmptyColor)
    } else {
        Ok(())
    }
}
