//! Sketchboard Render Library
//!
//! Deterministic replay of the action log onto a [`Surface`]. Hosts plug in
//! their own rasterizer; [`RecordingSurface`] captures a display list for
//! headless use and tests.

mod images;
mod recording;
mod renderer;

pub use images::{DecodedImage, ImageCache, ImageError, ImageStatus, decode_data_uri};
pub use recording::{DrawCommand, RecordingSurface};
pub use renderer::{RenderContext, RenderReport, ReplayRenderer, Surface};
