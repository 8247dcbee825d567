//! Color palettes
//!
//! A palette maps the 16 base indices to concrete colors and derives the
//! rest of the 256-color table (cube and grayscale) the xterm way. Entries
//! can be overridden at runtime (OSC 4) and reset (OSC 104). Swapping the
//! palette recolors everything without rewriting stored styles.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::color::{xterm_index_to_rgb, Color, Rgb};

/// Built-in palette choices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaletteKind {
    #[default]
    Xterm,
    Windows,
}

/// Colors used to resolve styles at render time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorPalette {
    base: [Rgb; 16],
    overrides: HashMap<u8, Rgb>,
    /// Default foreground
    pub foreground: Rgb,
    /// Default background
    pub background: Rgb,
    /// Cursor color, `None` means use the foreground
    pub cursor: Option<Rgb>,
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self::xterm()
    }
}

impl ColorPalette {
    /// Palette matching xterm's defaults
    pub fn xterm() -> Self {
        let mut base = [Rgb::default(); 16];
        for (i, slot) in base.iter_mut().enumerate() {
            *slot = xterm_index_to_rgb(i as u8);
        }
        Self::with_base(base)
    }

    /// Palette matching the classic Windows console colors
    pub fn windows() -> Self {
        Self::with_base([
            Rgb::new(0, 0, 0),
            Rgb::new(128, 0, 0),
            Rgb::new(0, 128, 0),
            Rgb::new(128, 128, 0),
            Rgb::new(0, 0, 128),
            Rgb::new(128, 0, 128),
            Rgb::new(0, 128, 128),
            Rgb::new(192, 192, 192),
            Rgb::new(128, 128, 128),
            Rgb::new(255, 0, 0),
            Rgb::new(0, 255, 0),
            Rgb::new(255, 255, 0),
            Rgb::new(0, 0, 255),
            Rgb::new(255, 0, 255),
            Rgb::new(0, 255, 255),
            Rgb::new(255, 255, 255),
        ])
    }

    /// Palette for a built-in kind
    pub fn for_kind(kind: PaletteKind) -> Self {
        match kind {
            PaletteKind::Xterm => Self::xterm(),
            PaletteKind::Windows => Self::windows(),
        }
    }

    /// Build a palette from 16 base colors
    pub fn with_base(base: [Rgb; 16]) -> Self {
        Self {
            base,
            overrides: HashMap::new(),
            foreground: base[7],
            background: base[0],
            cursor: None,
        }
    }

    /// Get the RGB color for an indexed color (0-255)
    pub fn indexed(&self, index: u8) -> Rgb {
        if let Some(rgb) = self.overrides.get(&index) {
            return *rgb;
        }
        match index {
            0..=15 => self.base[index as usize],
            _ => xterm_index_to_rgb(index),
        }
    }

    /// Resolve a stored color to RGB
    pub fn resolve(&self, color: Color, is_foreground: bool) -> Rgb {
        match color {
            Color::Default => {
                if is_foreground {
                    self.foreground
                } else {
                    self.background
                }
            },
            Color::Indexed(i) => self.indexed(i),
            Color::Rgb { r, g, b } => Rgb::new(r, g, b),
        }
    }

    /// Effective cursor color
    pub fn cursor_color(&self) -> Rgb {
        self.cursor.unwrap_or(self.foreground)
    }

    /// Override one palette entry
    pub fn set_indexed(&mut self, index: u8, rgb: Rgb) {
        self.overrides.insert(index, rgb);
    }

    /// Drop the override for one entry
    pub fn reset_indexed(&mut self, index: u8) {
        self.overrides.remove(&index);
    }

    /// Drop all overrides
    pub fn reset_all(&mut self) {
        self.overrides.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_indexed() {
        let palette = ColorPalette::xterm();
        assert_eq!(palette.indexed(0), Rgb::new(0, 0, 0));
        assert_eq!(palette.indexed(1), Rgb::new(205, 0, 0));
        assert_eq!(palette.indexed(16), Rgb::new(0, 0, 0));
        assert_eq!(palette.indexed(255), Rgb::new(238, 238, 238));
    }

    #[test]
    fn test_palette_swap_keeps_indices() {
        let red = Color::Indexed(Color::RED);
        assert_eq!(ColorPalette::xterm().resolve(red, true), Rgb::new(205, 0, 0));
        assert_eq!(ColorPalette::windows().resolve(red, true), Rgb::new(128, 0, 0));
    }

    #[test]
    fn test_palette_default_colors() {
        let mut palette = ColorPalette::xterm();
        palette.foreground = Rgb::new(1, 1, 1);
        assert_eq!(palette.resolve(Color::Default, true), Rgb::new(1, 1, 1));
        assert_eq!(palette.resolve(Color::Default, false), palette.background);
        assert_eq!(palette.cursor_color(), Rgb::new(1, 1, 1));
    }

    #[test]
    fn test_palette_override_and_reset() {
        let mut palette = ColorPalette::xterm();
        palette.set_indexed(200, Rgb::new(9, 9, 9));
        assert_eq!(palette.indexed(200), Rgb::new(9, 9, 9));
        palette.reset_indexed(200);
        assert_eq!(palette.indexed(200), xterm_index_to_rgb(200));
    }

    #[test]
    fn test_rgb_passthrough() {
        let palette = ColorPalette::default();
        assert_eq!(palette.resolve(Color::rgb(1, 2, 3), false), Rgb::new(1, 2, 3));
    }
}
