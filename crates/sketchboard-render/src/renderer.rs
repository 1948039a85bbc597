//! Replay of the action log onto a drawing surface.

use crate::images::{DecodedImage, ImageCache, ImageStatus};
use kurbo::{Affine, BezPath, Cap, Join, Point, Stroke as StrokeStyle};
use peniko::Color;
use sketchboard_core::actions::{Action, ImageAction, ShapeAction, Stroke, TextAction};
use sketchboard_core::camera::Viewport;
use sketchboard_core::canvas::Canvas;
use sketchboard_core::color::{Theme, background_color_for, parse_color, resolve_color};
use sketchboard_core::history::ActionLog;

/// A drawing target.
///
/// Geometry passed to the drawing calls is in canvas space; the surface is
/// expected to apply the most recent [`Surface::set_transform`].
pub trait Surface {
    /// Fill the whole surface, ignoring the transform.
    fn clear(&mut self, color: Color);

    fn set_transform(&mut self, transform: Affine);

    fn stroke(&mut self, path: &BezPath, style: &StrokeStyle, color: Color);

    /// Draw a single run of text with its baseline origin at `position`.
    fn fill_text(&mut self, text: &str, position: Point, font_size: f64, color: Color);

    /// Draw an image at its natural size with its top-left at `position`.
    fn draw_image(&mut self, image: &DecodedImage, position: Point);
}

/// Context for a single render pass.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub viewport: Viewport,
    pub theme: Theme,
    pub history: &'a ActionLog,
    /// Uncommitted action drawn on top of the history.
    pub draft: Option<&'a Action>,
}

impl<'a> RenderContext<'a> {
    pub fn new(viewport: Viewport, theme: Theme, history: &'a ActionLog) -> Self {
        Self {
            viewport,
            theme,
            history,
            draft: None,
        }
    }

    /// Set the draft preview.
    pub fn with_draft(mut self, draft: Option<&'a Action>) -> Self {
        self.draft = draft;
        self
    }

    /// Everything a canvas currently shows.
    pub fn from_canvas(canvas: &'a Canvas) -> Self {
        Self::new(*canvas.viewport(), canvas.theme(), canvas.history())
            .with_draft(canvas.draft().map(|d| d.preview()))
    }
}

/// What a render pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderReport {
    /// Actions that produced drawing output.
    pub drawn: usize,
    /// Actions with nothing to draw (single-point strokes, failed images).
    pub skipped: usize,
    /// Images omitted because they are still decoding.
    pub images_pending: usize,
}

/// Replays actions in log order, then the draft.
///
/// Output depends only on the history, draft, viewport and theme, so two
/// clients with the same inputs produce the same drawing commands.
#[derive(Default)]
pub struct ReplayRenderer {
    images: ImageCache,
    /// History revision the image cache was last pruned against.
    pruned_at: Option<u64>,
}

impl ReplayRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render one frame.
    pub fn render<S: Surface + ?Sized>(
        &mut self,
        surface: &mut S,
        ctx: &RenderContext<'_>,
    ) -> RenderReport {
        let background = parse_color(background_color_for(ctx.theme)).unwrap_or(Color::WHITE);
        surface.clear(background);
        surface.set_transform(ctx.viewport.transform());

        self.prune_images(ctx.history);

        let mut report = RenderReport::default();
        for action in ctx.history {
            self.draw_action(surface, action, ctx, &mut report);
        }
        if let Some(draft) = ctx.draft {
            self.draw_action(surface, draft, ctx, &mut report);
        }
        report
    }

    /// Collect finished image decodes. Returns true if another render is needed.
    pub fn poll_images(&mut self) -> bool {
        self.images.poll()
    }

    pub fn images(&self) -> &ImageCache {
        &self.images
    }

    /// Drop decoded images whose actions are no longer in the history.
    fn prune_images(&mut self, history: &ActionLog) {
        if self.pruned_at == Some(history.revision()) {
            return;
        }
        self.pruned_at = Some(history.revision());
        self.images.retain_sources(history.iter().filter_map(|action| match action {
            Action::Image(image) => Some(image.source.as_str()),
            _ => None,
        }));
    }

    fn draw_action<S: Surface + ?Sized>(
        &mut self,
        surface: &mut S,
        action: &Action,
        ctx: &RenderContext<'_>,
        report: &mut RenderReport,
    ) {
        let scale = ctx.viewport.scale;
        let drawn = match action {
            Action::Stroke(stroke) => draw_stroke(surface, stroke, scale, ctx.theme),
            Action::Shape(shape) => {
                draw_shape(surface, shape, scale, ctx.theme);
                true
            }
            Action::Text(text) => {
                draw_text(surface, text, scale, ctx.theme);
                true
            }
            Action::Image(image) => match self.draw_image(surface, image) {
                Some(drawn) => drawn,
                None => {
                    report.images_pending += 1;
                    return;
                }
            },
        };
        if drawn {
            report.drawn += 1;
        } else {
            report.skipped += 1;
        }
    }

    /// `None` while the image is still decoding.
    fn draw_image<S: Surface + ?Sized>(
        &mut self,
        surface: &mut S,
        image: &ImageAction,
    ) -> Option<bool> {
        match self.images.get_or_request(&image.source) {
            ImageStatus::Ready(decoded) => {
                surface.draw_image(&decoded, image.position);
                Some(true)
            }
            ImageStatus::Failed => Some(false),
            ImageStatus::Pending => None,
        }
    }
}

fn line_style(size: f64, scale: f64) -> StrokeStyle {
    StrokeStyle::new(size / scale)
        .with_caps(Cap::Round)
        .with_join(Join::Round)
}

/// Resolve a stored color through the theme policy.
///
/// Unparseable colors fall back to the theme's rendering of black.
fn theme_color(stored: &str, theme: Theme) -> Color {
    parse_color(&resolve_color(stored, theme))
        .or_else(|| parse_color(&resolve_color("#000000", theme)))
        .unwrap_or(Color::BLACK)
}

fn draw_stroke<S: Surface + ?Sized>(
    surface: &mut S,
    stroke: &Stroke,
    scale: f64,
    theme: Theme,
) -> bool {
    let Some(path) = stroke.to_path() else {
        return false;
    };
    surface.stroke(&path, &line_style(stroke.size, scale), theme_color(&stroke.color, theme));
    true
}

fn draw_shape<S: Surface + ?Sized>(surface: &mut S, shape: &ShapeAction, scale: f64, theme: Theme) {
    surface.stroke(
        &shape.to_path(scale),
        &line_style(shape.size, scale),
        theme_color(&shape.color, theme),
    );
}

fn draw_text<S: Surface + ?Sized>(surface: &mut S, text: &TextAction, scale: f64, theme: Theme) {
    surface.fill_text(
        &text.text,
        text.position,
        text.font_size / scale,
        theme_color(&text.color, theme),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::tests::{png_data_uri, wait_for_decodes};
    use crate::recording::{DrawCommand, RecordingSurface};
    use kurbo::Vec2;
    use sketchboard_core::actions::{ShapeKind, StrokeKind};
    use sketchboard_core::input::{Modifiers, MouseButton, PointerEvent};
    use sketchboard_core::sync::SyncEvent;

    fn pen(color: &str, points: &[(f64, f64)]) -> Action {
        Action::Stroke(Stroke {
            kind: StrokeKind::Pen,
            color: color.to_string(),
            size: 4.0,
            path: points.iter().map(|&(x, y)| Point::new(x, y)).collect(),
        })
    }

    fn shape(kind: ShapeKind, color: &str) -> Action {
        Action::Shape(ShapeAction {
            kind,
            color: color.to_string(),
            size: 2.0,
            start: Point::new(0.0, 0.0),
            end: Point::new(10.0, 10.0),
        })
    }

    fn log_of(actions: Vec<Action>) -> ActionLog {
        let mut log = ActionLog::new();
        log.replace_all(actions);
        log
    }

    fn render(ctx: &RenderContext<'_>) -> (RecordingSurface, RenderReport) {
        let mut surface = RecordingSurface::new();
        let report = ReplayRenderer::new().render(&mut surface, ctx);
        (surface, report)
    }

    #[test]
    fn test_empty_history_is_background_only() {
        let log = ActionLog::new();
        let (surface, report) = render(&RenderContext::new(Viewport::default(), Theme::Dark, &log));
        assert_eq!(
            surface.commands(),
            &[
                DrawCommand::Clear {
                    color: [0x34, 0x3a, 0x40, 255]
                },
                DrawCommand::SetTransform(Affine::IDENTITY),
            ]
        );
        assert_eq!(report, RenderReport::default());
    }

    #[test]
    fn test_replays_in_log_order_then_draft() {
        let log = log_of(vec![
            shape(ShapeKind::Rectangle, "#ff0000"),
            shape(ShapeKind::Circle, "#00ff00"),
        ]);
        let draft = shape(ShapeKind::Line, "#0000ff");
        let ctx =
            RenderContext::new(Viewport::default(), Theme::Light, &log).with_draft(Some(&draft));
        let (surface, report) = render(&ctx);

        let colors: Vec<[u8; 4]> = surface
            .strokes()
            .map(|(_, _, color)| color)
            .collect();
        assert_eq!(
            colors,
            vec![[255, 0, 0, 255], [0, 255, 0, 255], [0, 0, 255, 255]]
        );
        assert_eq!(report.drawn, 3);
    }

    #[test]
    fn test_widths_and_fonts_divide_by_scale() {
        let log = log_of(vec![
            pen("#000000", &[(0.0, 0.0), (1.0, 1.0)]),
            Action::Text(TextAction {
                color: "#000000".to_string(),
                font_size: 20.0,
                text: "hi".to_string(),
                position: Point::new(1.0, 2.0),
            }),
        ]);
        let viewport = Viewport {
            pan: Vec2::new(5.0, 5.0),
            scale: 2.0,
        };
        let (surface, _) = render(&RenderContext::new(viewport, Theme::Light, &log));
        let commands = surface.commands();
        assert_eq!(commands[1], DrawCommand::SetTransform(viewport.transform()));
        match &commands[2] {
            DrawCommand::Stroke { width, .. } => assert!((width - 2.0).abs() < 1e-12),
            other => panic!("expected stroke, got {other:?}"),
        }
        match &commands[3] {
            DrawCommand::Text { font_size, text, .. } => {
                assert!((font_size - 10.0).abs() < 1e-12);
                assert_eq!(text, "hi");
            }
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn test_single_point_stroke_invisible_until_second_point() {
        let log = log_of(vec![pen("#000000", &[(3.0, 3.0)])]);
        let ctx = RenderContext::new(Viewport::default(), Theme::Light, &log);
        let (surface, report) = render(&ctx);
        assert_eq!(surface.strokes().count(), 0);
        assert_eq!(report.skipped, 1);

        let log = log_of(vec![pen("#000000", &[(3.0, 3.0), (4.0, 4.0)])]);
        let (surface, _) = render(&RenderContext::new(Viewport::default(), Theme::Light, &log));
        assert_eq!(surface.strokes().count(), 1);
    }

    #[test]
    fn test_dark_theme_inverts_monochrome() {
        let log = log_of(vec![
            pen("#000000", &[(0.0, 0.0), (1.0, 1.0)]),
            pen("#808080", &[(0.0, 0.0), (1.0, 1.0)]),
            pen("#ff0000", &[(0.0, 0.0), (1.0, 1.0)]),
        ]);
        let (surface, _) = render(&RenderContext::new(Viewport::default(), Theme::Dark, &log));
        let colors: Vec<[u8; 4]> = surface.strokes().map(|(_, _, c)| c).collect();
        assert_eq!(
            colors,
            vec![
                [255, 255, 255, 255],
                [0x7f, 0x7f, 0x7f, 255],
                [255, 0, 0, 255]
            ]
        );
    }

    #[test]
    fn test_unparseable_color_falls_back() {
        let log = log_of(vec![pen("not-a-color", &[(0.0, 0.0), (1.0, 1.0)])]);
        let (surface, _) = render(&RenderContext::new(Viewport::default(), Theme::Dark, &log));
        let colors: Vec<[u8; 4]> = surface.strokes().map(|(_, _, c)| c).collect();
        assert_eq!(colors, vec![[255, 255, 255, 255]]);
    }

    #[test]
    fn test_images_appear_after_decode() {
        let source = png_data_uri(2, 2);
        let log = log_of(vec![
            Action::Image(ImageAction {
                source,
                position: Point::new(50.0, 50.0),
            }),
            shape(ShapeKind::Line, "#000000"),
        ]);
        let ctx = RenderContext::new(Viewport::default(), Theme::Light, &log);
        let mut renderer = ReplayRenderer::new();

        let mut first = RecordingSurface::new();
        let report = renderer.render(&mut first, &ctx);
        assert_eq!(report.images_pending, 1);
        assert_eq!(first.images().count(), 0);
        assert_eq!(first.strokes().count(), 1);

        wait_for_decodes(&mut renderer.images);
        let mut second = RecordingSurface::new();
        let report = renderer.render(&mut second, &ctx);
        assert_eq!(report.images_pending, 0);
        assert_eq!(
            second.images().collect::<Vec<_>>(),
            vec![(2, 2, Point::new(50.0, 50.0))]
        );
    }

    #[test]
    fn test_cleared_images_leave_the_cache() {
        let mut log = log_of(vec![Action::Image(ImageAction {
            source: png_data_uri(2, 2),
            position: Point::ZERO,
        })]);
        let mut renderer = ReplayRenderer::new();
        renderer.render(
            &mut RecordingSurface::new(),
            &RenderContext::new(Viewport::default(), Theme::Light, &log),
        );
        wait_for_decodes(&mut renderer.images);
        assert_eq!(renderer.images().len(), 1);

        log.clear();
        let ctx = RenderContext::new(Viewport::default(), Theme::Light, &log);
        renderer.render(&mut RecordingSurface::new(), &ctx);
        assert!(renderer.images().is_empty());
    }

    #[test]
    fn test_failed_image_skipped_but_kept_in_history() {
        let log = log_of(vec![Action::Image(ImageAction {
            source: "data:image/png;base64,AAAA".to_string(),
            position: Point::ZERO,
        })]);
        let ctx = RenderContext::new(Viewport::default(), Theme::Light, &log);
        let mut renderer = ReplayRenderer::new();
        renderer.render(&mut RecordingSurface::new(), &ctx);
        wait_for_decodes(&mut renderer.images);
        let report = renderer.render(&mut RecordingSurface::new(), &ctx);
        assert_eq!(report.skipped, 1);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_canvas_draft_is_rendered_on_top() {
        let mut canvas = Canvas::new();
        canvas.apply_sync_event(SyncEvent::HistorySnapshot(vec![shape(
            ShapeKind::Rectangle,
            "#ff0000",
        )]));
        canvas.handle_pointer_event(PointerEvent::Down {
            position: Point::ZERO,
            button: MouseButton::Left,
            modifiers: Modifiers::NONE,
        });
        canvas.handle_pointer_event(PointerEvent::Move {
            position: Point::new(5.0, 5.0),
        });

        let (surface, report) = render(&RenderContext::from_canvas(&canvas));
        assert_eq!(report.drawn, 2);
        assert_eq!(canvas.history().len(), 1);
        let colors: Vec<[u8; 4]> = surface.strokes().map(|(_, _, c)| c).collect();
        assert_eq!(colors, vec![[255, 0, 0, 255], [0, 0, 0, 255]]);
    }

    #[test]
    fn test_join_receive_clear_renders_blank() {
        let mut canvas = Canvas::new();
        canvas.apply_sync_event(SyncEvent::HistorySnapshot(vec![pen(
            "#000000",
            &[(0.0, 0.0), (1.0, 1.0)],
        )]));
        canvas.apply_sync_event(SyncEvent::RemoteAction(shape(ShapeKind::Arrow, "#000000")));
        canvas.apply_sync_event(SyncEvent::Cleared);

        let (surface, _) = render(&RenderContext::from_canvas(&canvas));
        let blank = {
            let log = ActionLog::new();
            render(&RenderContext::new(Viewport::default(), Theme::Light, &log)).0
        };
        assert_eq!(surface, blank);
    }

    #[test]
    fn test_clients_converge_on_same_output() {
        let actions = vec![
            pen("#333333", &[(0.0, 0.0), (4.0, 9.0), (8.0, 2.0)]),
            shape(ShapeKind::Triangle, "#000000"),
            shape(ShapeKind::Arrow, "#ffffff"),
        ];
        // One client receives a snapshot, the other the same actions live.
        let mut a = Canvas::new();
        a.apply_sync_event(SyncEvent::HistorySnapshot(actions.clone()));
        let mut b = Canvas::new();
        for action in actions {
            b.apply_sync_event(SyncEvent::RemoteAction(action));
        }
        for canvas in [&mut a, &mut b] {
            canvas.set_theme(Theme::Dark);
        }
        let (left, _) = render(&RenderContext::from_canvas(&a));
        let (right, _) = render(&RenderContext::from_canvas(&b));
        assert_eq!(left, right);
    }
}
