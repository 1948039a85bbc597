//! Viewport module for pan/zoom transforms.

use kurbo::{Affine, Point, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Smallest scale the viewport will settle on.
///
/// Zoom factors compose multiplicatively, so a long run of zoom-out gestures
/// would otherwise drift toward zero and make `screen_to_world` blow up.
pub const MIN_SCALE: f64 = 1e-3;

/// Zoom factor applied per wheel notch.
pub const WHEEL_ZOOM_FACTOR: f64 = 1.1;

/// Zoom factor applied by the zoom in/out buttons.
pub const BUTTON_ZOOM_FACTOR: f64 = 1.2;

/// Viewport maps device (screen) coordinates to canvas (world) coordinates.
///
/// All action geometry is stored in canvas space, so it stays valid when the
/// local viewport changes and across participants with different viewports.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Current translation offset in device pixels.
    pub pan: Vec2,
    /// Current scale factor (1.0 = no zoom).
    pub scale: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            pan: Vec2::ZERO,
            scale: 1.0,
        }
    }
}

impl Viewport {
    /// Create a viewport with no pan and unit scale.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the affine transform for rendering (canvas → device).
    ///
    /// Translate by `pan`, then scale by `scale`.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.pan) * Affine::scale(self.scale)
    }

    /// Get the inverse transform for input handling (device → canvas).
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.scale) * Affine::translate(-self.pan)
    }

    /// Convert a device point to canvas coordinates.
    pub fn screen_to_world(&self, screen_point: Point) -> Point {
        Point::new(
            (screen_point.x - self.pan.x) / self.scale,
            (screen_point.y - self.pan.y) / self.scale,
        )
    }

    /// Convert a canvas point to device coordinates.
    pub fn world_to_screen(&self, world_point: Point) -> Point {
        Point::new(
            world_point.x * self.scale + self.pan.x,
            world_point.y * self.scale + self.pan.y,
        )
    }

    /// Convert a device-space length to canvas space.
    pub fn screen_len_to_world(&self, len: f64) -> f64 {
        len / self.scale
    }

    /// Pan by a delta in device coordinates. Independent of scale.
    pub fn pan_by(&mut self, delta: Vec2) {
        if !delta.x.is_finite() || !delta.y.is_finite() {
            log::warn!("Ignoring non-finite pan delta {:?}", delta);
            return;
        }
        self.pan += delta;
    }

    /// Zoom by `factor`, keeping the canvas point under `pivot` fixed on screen.
    ///
    /// Returns `false` if the factor was rejected or had no effect.
    pub fn zoom_at(&mut self, pivot: Point, factor: f64) -> bool {
        if !factor.is_finite() || factor <= 0.0 {
            log::warn!("Ignoring invalid zoom factor {}", factor);
            return false;
        }
        if !pivot.is_finite() {
            log::warn!("Ignoring non-finite zoom pivot {:?}", pivot);
            return false;
        }
        let new_scale = (self.scale * factor).max(MIN_SCALE);
        if !new_scale.is_finite() {
            log::warn!("Zoom would overflow scale {} by {}", self.scale, factor);
            return false;
        }
        if (new_scale - self.scale).abs() < f64::EPSILON {
            return false;
        }

        // Canvas point under the pivot before the scale changes
        let world_point = self.screen_to_world(pivot);

        let pan = Vec2::new(
            pivot.x - world_point.x * new_scale,
            pivot.y - world_point.y * new_scale,
        );
        if !pan.is_finite() {
            log::warn!("Zoom around {:?} would produce non-finite pan {:?}", pivot, pan);
            return false;
        }
        self.scale = new_scale;
        self.pan = pan;
        true
    }

    /// Zoom around the centre of a surface of the given size.
    pub fn zoom_at_center(&mut self, surface: Size, factor: f64) -> bool {
        self.zoom_at(Point::new(surface.width / 2.0, surface.height / 2.0), factor)
    }

    /// Reset to no pan and unit scale.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
