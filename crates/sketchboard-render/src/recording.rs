//! A surface that records drawing commands instead of rasterizing them.

use crate::images::DecodedImage;
use crate::renderer::Surface;
use kurbo::{Affine, BezPath, Point, Stroke as StrokeStyle};
use peniko::Color;

/// One recorded drawing call. Colors are stored as 8-bit RGBA.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear {
        color: [u8; 4],
    },
    SetTransform(Affine),
    Stroke {
        path: BezPath,
        width: f64,
        color: [u8; 4],
    },
    Text {
        text: String,
        position: Point,
        font_size: f64,
        color: [u8; 4],
    },
    Image {
        width: u32,
        height: u32,
        position: Point,
    },
}

fn rgba(color: Color) -> [u8; 4] {
    let c = color.to_rgba8();
    [c.r, c.g, c.b, c.a]
}

/// Display list of everything drawn since creation or the last clear.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordingSurface {
    commands: Vec<DrawCommand>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<DrawCommand> {
        self.commands
    }

    /// Recorded strokes as `(path, width, color)`.
    pub fn strokes(&self) -> impl Iterator<Item = (&BezPath, f64, [u8; 4])> {
        self.commands.iter().filter_map(|cmd| match cmd {
            DrawCommand::Stroke { path, width, color } => Some((path, *width, *color)),
            _ => None,
        })
    }

    /// Recorded images as `(width, height, position)`.
    pub fn images(&self) -> impl Iterator<Item = (u32, u32, Point)> + '_ {
        self.commands.iter().filter_map(|cmd| match cmd {
            DrawCommand::Image {
                width,
                height,
                position,
            } => Some((*width, *height, *position)),
            _ => None,
        })
    }
}

impl Surface for RecordingSurface {
    fn clear(&mut self, color: Color) {
        // Clearing discards everything drawn before.
        self.commands.clear();
        self.commands.push(DrawCommand::Clear { color: rgba(color) });
    }

    fn set_transform(&mut self, transform: Affine) {
        self.commands.push(DrawCommand::SetTransform(transform));
    }

    fn stroke(&mut self, path: &BezPath, style: &StrokeStyle, color: Color) {
        self.commands.push(DrawCommand::Stroke {
            path: path.clone(),
            width: style.width,
            color: rgba(color),
        });
    }

    fn fill_text(&mut self, text: &str, position: Point, font_size: f64, color: Color) {
        self.commands.push(DrawCommand::Text {
            text: text.to_string(),
            position,
            font_size,
            color: rgba(color),
        });
    }

    fn draw_image(&mut self, image: &DecodedImage, position: Point) {
        self.commands.push(DrawCommand::Image {
            width: image.width,
            height: image.height,
            position,
        });
    }
}
