//! Flat JSON encoding of actions.
//!
//! Every record is tagged by `tool`; shape endpoints are spelled out as
//! `startX`/`startY`/`endX`/`endY` and text/image anchors as `x`/`y`.

use super::{
    Action, ActionError, ImageAction, ShapeAction, ShapeKind, Stroke, StrokeKind, TextAction,
};
use kurbo::Point;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "lowercase")]
pub(crate) enum WireAction {
    Pen(WireStroke),
    Eraser(WireStroke),
    Rectangle(WireShape),
    Circle(WireShape),
    Line(WireShape),
    Triangle(WireShape),
    Arrow(WireShape),
    Text(WireText),
    Image(WireImage),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WireStroke {
    color: String,
    #[serde(deserialize_with = "lenient_f64")]
    size: f64,
    path: Vec<Point>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireShape {
    color: String,
    #[serde(deserialize_with = "lenient_f64")]
    size: f64,
    start_x: f64,
    start_y: f64,
    end_x: f64,
    end_y: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireText {
    text: String,
    color: String,
    #[serde(deserialize_with = "lenient_f64")]
    font_size: f64,
    x: f64,
    y: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WireImage {
    src: String,
    x: f64,
    y: f64,
}

/// Sizes come from slider inputs and may arrive as numeric strings.
fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(f64),
        String(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

impl TryFrom<WireAction> for Action {
    type Error = ActionError;

    fn try_from(wire: WireAction) -> Result<Self, Self::Error> {
        let stroke = |kind, s: WireStroke| {
            Action::Stroke(Stroke {
                kind,
                color: s.color,
                size: s.size,
                path: s.path,
            })
        };
        let shape = |kind, s: WireShape| {
            Action::Shape(ShapeAction {
                kind,
                color: s.color,
                size: s.size,
                start: Point::new(s.start_x, s.start_y),
                end: Point::new(s.end_x, s.end_y),
            })
        };

        let action = match wire {
            WireAction::Pen(s) => stroke(StrokeKind::Pen, s),
            WireAction::Eraser(s) => stroke(StrokeKind::Eraser, s),
            WireAction::Rectangle(s) => shape(ShapeKind::Rectangle, s),
            WireAction::Circle(s) => shape(ShapeKind::Circle, s),
            WireAction::Line(s) => shape(ShapeKind::Line, s),
            WireAction::Triangle(s) => shape(ShapeKind::Triangle, s),
            WireAction::Arrow(s) => shape(ShapeKind::Arrow, s),
            WireAction::Text(t) => Action::Text(TextAction {
                color: t.color,
                font_size: t.font_size,
                text: t.text,
                position: Point::new(t.x, t.y),
            }),
            WireAction::Image(i) => Action::Image(ImageAction {
                source: i.src,
                position: Point::new(i.x, i.y),
            }),
        };
        action.validate()?;
        Ok(action)
    }
}

impl From<Action> for WireAction {
    fn from(action: Action) -> Self {
        match action {
            Action::Stroke(s) => {
                let wire = WireStroke {
                    color: s.color,
                    size: s.size,
                    path: s.path,
                };
                match s.kind {
                    StrokeKind::Pen => WireAction::Pen(wire),
                    StrokeKind::Eraser => WireAction::Eraser(wire),
                }
            }
            Action::Shape(s) => {
                let wire = WireShape {
                    color: s.color,
                    size: s.size,
                    start_x: s.start.x,
                    start_y: s.start.y,
                    end_x: s.end.x,
                    end_y: s.end.y,
                };
                match s.kind {
                    ShapeKind::Rectangle => WireAction::Rectangle(wire),
                    ShapeKind::Circle => WireAction::Circle(wire),
                    ShapeKind::Line => WireAction::Line(wire),
                    ShapeKind::Triangle => WireAction::Triangle(wire),
                    ShapeKind::Arrow => WireAction::Arrow(wire),
                }
            }
            Action::Text(t) => WireAction::Text(WireText {
                text: t.text,
                color: t.color,
                font_size: t.font_size,
                x: t.position.x,
                y: t.position.y,
            }),
            Action::Image(i) => WireAction::Image(WireImage {
                src: i.source,
                x: i.position.x,
                y: i.position.y,
            }),
        }
    }
}
