//! Outline geometry for strokes and shapes.

use super::{ShapeAction, ShapeKind, Stroke};
use kurbo::{BezPath, Circle, Point, Shape as KurboShape};
use std::f64::consts::PI;

/// Arrow barb length in device pixels, kept constant on screen.
pub const ARROW_HEAD_LENGTH: f64 = 10.0;

/// Flattening tolerance used when converting circles to paths.
const CURVE_TOLERANCE: f64 = 0.1;

impl Stroke {
    /// Polyline through the path, or `None` if there is nothing to draw.
    pub fn to_path(&self) -> Option<BezPath> {
        let (first, rest) = self.path.split_first()?;
        if rest.is_empty() {
            return None;
        }
        let mut path = BezPath::new();
        path.move_to(*first);
        for point in rest {
            path.line_to(*point);
        }
        Some(path)
    }
}

impl ShapeAction {
    /// Outline path in canvas space.
    ///
    /// `scale` is the viewport scale; only the arrowhead depends on it.
    pub fn to_path(&self, scale: f64) -> BezPath {
        let (s, e) = (self.start, self.end);
        match self.kind {
            ShapeKind::Rectangle => {
                let mut path = BezPath::new();
                path.move_to(s);
                path.line_to(Point::new(e.x, s.y));
                path.line_to(e);
                path.line_to(Point::new(s.x, e.y));
                path.close_path();
                path
            }
            ShapeKind::Circle => {
                let center = s.midpoint(e);
                let radius = s.distance(e) / 2.0;
                Circle::new(center, radius).to_path(CURVE_TOLERANCE)
            }
            ShapeKind::Line => {
                let mut path = BezPath::new();
                path.move_to(s);
                path.line_to(e);
                path
            }
            ShapeKind::Triangle => {
                let mut path = BezPath::new();
                path.move_to(Point::new(s.x + (e.x - s.x) / 2.0, s.y));
                path.line_to(Point::new(s.x, e.y));
                path.line_to(e);
                path.close_path();
                path
            }
            ShapeKind::Arrow => {
                let head = ARROW_HEAD_LENGTH / scale;
                let angle = (e.y - s.y).atan2(e.x - s.x);
                let barb = |offset: f64| {
                    Point::new(
                        e.x - head * (angle + offset).cos(),
                        e.y - head * (angle + offset).sin(),
                    )
                };
                let mut path = BezPath::new();
                path.move_to(s);
                path.line_to(e);
                path.line_to(barb(-PI / 6.0));
                path.move_to(e);
                path.line_to(barb(PI / 6.0));
                path
            }
        }
    }
}
