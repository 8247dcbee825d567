//! Color representation for styled text
//!
//! Supports:
//! - Default foreground/background
//! - 16 standard ANSI colors (0-15)
//! - 256-color palette (0-255)
//! - 24-bit true color (RGB)
//!
//! Indexed colors stay indices until render time, where a
//! [`ColorPalette`](crate::palette::ColorPalette) resolves them. That keeps a
//! theme change from touching stored lines.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Color representation supporting all terminal color modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Color {
    /// Default terminal color (foreground or background)
    #[default]
    Default,
    /// Indexed color (0-255)
    /// 0-7: standard colors
    /// 8-15: bright colors
    /// 16-231: 6x6x6 color cube
    /// 232-255: grayscale
    Indexed(u8),
    /// 24-bit RGB color
    Rgb { r: u8, g: u8, b: u8 },
}

impl Color {
    /// Standard ANSI color indices
    pub const BLACK: u8 = 0;
    pub const RED: u8 = 1;
    pub const GREEN: u8 = 2;
    pub const YELLOW: u8 = 3;
    pub const BLUE: u8 = 4;
    pub const MAGENTA: u8 = 5;
    pub const CYAN: u8 = 6;
    pub const WHITE: u8 = 7;

    /// Create a new indexed color
    pub fn indexed(index: u8) -> Self {
        Color::Indexed(index)
    }

    /// Create a new RGB color
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color::Rgb { r, g, b }
    }

    /// Whether this is the default color
    pub fn is_default(&self) -> bool {
        matches!(self, Color::Default)
    }
}

impl From<Rgb> for Color {
    fn from(rgb: Rgb) -> Self {
        Color::Rgb {
            r: rgb.r,
            g: rgb.g,
            b: rgb.b,
        }
    }
}

/// A concrete 24-bit color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#RRGGBB`, `#RGB` or the X11 form `rgb:R/G/B` (1-4 hex digits per component)
    pub fn parse(spec: &str) -> Option<Self> {
        let spec = spec.trim();
        if let Some(hex) = spec.strip_prefix('#') {
            return match hex.len() {
                6 => Some(Self::new(
                    u8::from_str_radix(&hex[0..2], 16).ok()?,
                    u8::from_str_radix(&hex[2..4], 16).ok()?,
                    u8::from_str_radix(&hex[4..6], 16).ok()?,
                )),
                3 => {
                    let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
                    Some(Self::new(digit(0)?, digit(1)?, digit(2)?))
                },
                _ => None,
            };
        }
        let body = spec.strip_prefix("rgb:")?;
        let mut parts = body.split('/');
        let r = scale_component(parts.next()?)?;
        let g = scale_component(parts.next()?)?;
        let b = scale_component(parts.next()?)?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self::new(r, g, b))
    }

    /// Format as the X11 color spec xterm uses in query responses
    pub fn to_x_parse_color(&self) -> String {
        format!(
            "rgb:{:04x}/{:04x}/{:04x}",
            self.r as u16 * 0x101,
            self.g as u16 * 0x101,
            self.b as u16 * 0x101
        )
    }

    /// Format as `#rrggbb`
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Scale a 1-4 digit hex component to 8 bits
fn scale_component(hex: &str) -> Option<u8> {
    if hex.is_empty() || hex.len() > 4 {
        return None;
    }
    let value = u32::from_str_radix(hex, 16).ok()?;
    let max = (1u32 << (4 * hex.len() as u32)) - 1;
    Some(((value * 255 + max / 2) / max) as u8)
}

/// Convert a 256-color index to RGB values using the xterm palette
pub fn xterm_index_to_rgb(index: u8) -> Rgb {
    match index {
        // Standard colors (0-7)
        0 => Rgb::new(0, 0, 0),
        1 => Rgb::new(205, 0, 0),
        2 => Rgb::new(0, 205, 0),
        3 => Rgb::new(205, 205, 0),
        4 => Rgb::new(0, 0, 238),
        5 => Rgb::new(205, 0, 205),
        6 => Rgb::new(0, 205, 205),
        7 => Rgb::new(229, 229, 229),

        // Bright colors (8-15)
        8 => Rgb::new(127, 127, 127),
        9 => Rgb::new(255, 0, 0),
        10 => Rgb::new(0, 255, 0),
        11 => Rgb::new(255, 255, 0),
        12 => Rgb::new(92, 92, 255),
        13 => Rgb::new(255, 0, 255),
        14 => Rgb::new(0, 255, 255),
        15 => Rgb::new(255, 255, 255),

        // 6x6x6 color cube (16-231)
        16..=231 => {
            let idx = index - 16;
            let r = idx / 36;
            let g = (idx % 36) / 6;
            let b = idx % 6;
            let to_val = |v: u8| if v == 0 { 0 } else { 55 + v * 40 };
            Rgb::new(to_val(r), to_val(g), to_val(b))
        },

        // Grayscale (232-255)
        232..=255 => {
            let gray = 8 + (index - 232) * 10;
            Rgb::new(gray, gray, gray)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_default() {
        assert_eq!(Color::default(), Color::Default);
        assert!(Color::default().is_default());
    }

    #[test]
    fn test_color_from_rgb() {
        assert_eq!(Color::from(Rgb::new(1, 2, 3)), Color::rgb(1, 2, 3));
    }

    #[test]
    fn test_cube_and_grayscale() {
        assert_eq!(xterm_index_to_rgb(16), Rgb::new(0, 0, 0));
        assert_eq!(xterm_index_to_rgb(196), Rgb::new(255, 0, 0));
        assert_eq!(xterm_index_to_rgb(231), Rgb::new(255, 255, 255));
        assert_eq!(xterm_index_to_rgb(232), Rgb::new(8, 8, 8));
        assert_eq!(xterm_index_to_rgb(255), Rgb::new(238, 238, 238));
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(Rgb::parse("#ff8000"), Some(Rgb::new(255, 128, 0)));
        assert_eq!(Rgb::parse("#f80"), Some(Rgb::new(255, 136, 0)));
        assert_eq!(Rgb::parse("#ff80"), None);
        assert_eq!(Rgb::parse("#gg0000"), None);
    }

    #[test]
    fn test_parse_x11() {
        assert_eq!(Rgb::parse("rgb:ffff/0000/8080"), Some(Rgb::new(255, 0, 128)));
        assert_eq!(Rgb::parse("rgb:f/0/8"), Some(Rgb::new(255, 0, 136)));
        assert_eq!(Rgb::parse("rgb:ff/00"), None);
        assert_eq!(Rgb::parse("rgb:ff/00/00/00"), None);
    }

    #[test]
    fn test_x_parse_color_round_trip() {
        let color = Rgb::new(0x12, 0xab, 0xff);
        assert_eq!(color.to_x_parse_color(), "rgb:1212/abab/ffff");
        assert_eq!(Rgb::parse(&color.to_x_parse_color()), Some(color));
    }
}
