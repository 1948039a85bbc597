//! Theme-dependent color resolution.
//!
//! Actions store the color the author picked. What actually gets painted is
//! resolved at render time against the local theme, so switching themes
//! re-resolves the same stored data.

use peniko::Color;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canvas color scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    Colorful,
}

impl Theme {
    /// Name used by the host UI (e.g. a CSS class).
    pub fn name(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::Colorful => "colorful",
        }
    }

    /// All themes, in toolbar order.
    pub fn all() -> &'static [Theme] {
        &[Theme::Light, Theme::Dark, Theme::Colorful]
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown theme name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown theme: {0}")]
pub struct UnknownTheme(pub String);

impl FromStr for Theme {
    type Err = UnknownTheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            "colorful" => Ok(Theme::Colorful),
            _ => Err(UnknownTheme(s.to_string())),
        }
    }
}

/// Canvas background for a theme. Also the ink of new eraser strokes.
pub fn background_color_for(theme: Theme) -> &'static str {
    match theme {
        Theme::Light => "#ffffff",
        Theme::Dark => "#343a40",
        Theme::Colorful => "#fffacd",
    }
}

/// Resolve the stroke/fill color to paint for a stored color under `theme`.
///
/// Only the dark theme changes anything, and only grayscale colors are
/// inverted there. Chromatic colors always pass through.
pub fn resolve_color(color: &str, theme: Theme) -> String {
    if theme != Theme::Dark {
        return color.to_string();
    }

    let lower = color.trim().to_ascii_lowercase();
    match lower.as_str() {
        "#000000" | "#000" | "black" => return "#ffffff".to_string(),
        "#ffffff" | "#fff" | "white" => return "#000000".to_string(),
        _ => {}
    }

    match gray_level(&lower) {
        Some(level) => {
            let inverted = 255 - level;
            format!("#{inverted:02x}{inverted:02x}{inverted:02x}")
        }
        None => color.to_string(),
    }
}

/// Channel value of a six-digit `#rrggbb` color whose channels are all equal.
fn gray_level(hex: &str) -> Option<u8> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok();
    let (r, g, b) = (channel(0)?, channel(2)?, channel(4)?);
    (r == g && g == b).then_some(r)
}

/// Parse a CSS color string into a paintable color.
pub fn parse_color(color: &str) -> Option<Color> {
    match peniko::color::parse_color(color.trim()) {
        Ok(dynamic) => Some(dynamic.to_alpha_color::<peniko::color::Srgb>()),
        Err(e) => {
            log::debug!("Unparseable color {:?}: {:?}", color, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_light_and_colorful_are_identity() {
        for color in ["#000000", "#808080", "#ff0000", "black", "rebeccapurple", "#ABC"] {
            assert_eq!(resolve_color(color, Theme::Light), color);
            assert_eq!(resolve_color(color, Theme::Colorful), color);
        }
    }

    #[test]
    fn test_dark_inverts_black_and_white() {
        assert_eq!(resolve_color("#000000", Theme::Dark), "#ffffff");
        assert_eq!(resolve_color("#000", Theme::Dark), "#ffffff");
        assert_eq!(resolve_color("BLACK", Theme::Dark), "#ffffff");
        assert_eq!(resolve_color("#ffffff", Theme::Dark), "#000000");
        assert_eq!(resolve_color("#FFF", Theme::Dark), "#000000");
        assert_eq!(resolve_color("white", Theme::Dark), "#000000");
    }

    #[test]
    fn test_dark_inverts_grays() {
        assert_eq!(resolve_color("#808080", Theme::Dark), "#7f7f7f");
        assert_eq!(resolve_color("#333333", Theme::Dark), "#cccccc");
        assert_eq!(resolve_color("#A0A0A0", Theme::Dark), "#5f5f5f");
    }

    #[test]
    fn test_dark_keeps_chromatic_colors() {
        assert_eq!(resolve_color("#ff0000", Theme::Dark), "#ff0000");
        assert_eq!(resolve_color("#112233", Theme::Dark), "#112233");
        assert_eq!(resolve_color("#808081", Theme::Dark), "#808081");
        assert_eq!(resolve_color("red", Theme::Dark), "red");
    }

    #[test]
    fn test_background_colors() {
        assert_eq!(background_color_for(Theme::Light), "#ffffff");
        assert_eq!(background_color_for(Theme::Dark), "#343a40");
        assert_eq!(background_color_for(Theme::Colorful), "#fffacd");
    }

    #[test]
    fn test_theme_parse() {
        assert_eq!("dark".parse::<Theme>(), Ok(Theme::Dark));
        assert_eq!(" Colorful ".parse::<Theme>(), Ok(Theme::Colorful));
        assert!("sepia".parse::<Theme>().is_err());
        for theme in Theme::all() {
            assert_eq!(theme.name().parse::<Theme>().ok(), Some(*theme));
        }
    }

    #[test]
    fn test_parse_color() {
        let red = parse_color("#ff0000").map(|c| c.to_rgba8());
        assert_eq!(red.map(|c| (c.r, c.g, c.b, c.a)), Some((255, 0, 0, 255)));
        assert!(parse_color("not a color").is_none());
    }
}
