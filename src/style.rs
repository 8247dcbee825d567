//! Text styles
//!
//! A [`TextStyle`] is an immutable value: colors plus a set of attribute
//! flags. Lines store styles behind `Arc`, and [`StyleCache`] interns equal
//! styles so long runs of same-colored output share one allocation.

use std::collections::HashMap;
use std::sync::Arc;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::color::Color;

bitflags! {
    /// SGR text attribute flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct StyleOptions: u16 {
        const BOLD             = 1 << 0;
        const DIM              = 1 << 1;
        const ITALIC           = 1 << 2;
        const UNDERLINE        = 1 << 3;
        const DOUBLE_UNDERLINE = 1 << 4;
        const CURLY_UNDERLINE  = 1 << 5;
        const DOTTED_UNDERLINE = 1 << 6;
        const DASHED_UNDERLINE = 1 << 7;
        const BLINK            = 1 << 8;
        const INVERSE          = 1 << 9;
        const HIDDEN           = 1 << 10;
        const STRIKETHROUGH    = 1 << 11;
    }
}

impl StyleOptions {
    /// Every underline variant
    pub const ANY_UNDERLINE: StyleOptions = StyleOptions::UNDERLINE
        .union(StyleOptions::DOUBLE_UNDERLINE)
        .union(StyleOptions::CURLY_UNDERLINE)
        .union(StyleOptions::DOTTED_UNDERLINE)
        .union(StyleOptions::DASHED_UNDERLINE);
}

/// Underline style variants (SGR 4:x subparameters)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UnderlineStyle {
    #[default]
    None,
    Single,
    Double,
    Curly,
    Dotted,
    Dashed,
}

impl UnderlineStyle {
    /// Map an SGR `4:x` subparameter
    pub fn from_sgr(sub: u16) -> Self {
        match sub {
            0 => UnderlineStyle::None,
            2 => UnderlineStyle::Double,
            3 => UnderlineStyle::Curly,
            4 => UnderlineStyle::Dotted,
            5 => UnderlineStyle::Dashed,
            _ => UnderlineStyle::Single,
        }
    }

    fn flag(self) -> StyleOptions {
        match self {
            UnderlineStyle::None => StyleOptions::empty(),
            UnderlineStyle::Single => StyleOptions::UNDERLINE,
            UnderlineStyle::Double => StyleOptions::DOUBLE_UNDERLINE,
            UnderlineStyle::Curly => StyleOptions::CURLY_UNDERLINE,
            UnderlineStyle::Dotted => StyleOptions::DOTTED_UNDERLINE,
            UnderlineStyle::Dashed => StyleOptions::DASHED_UNDERLINE,
        }
    }
}

/// Identifier of an OSC 8 hyperlink in the terminal's link registry
pub type HyperlinkId = u32;

/// Style of a run of characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TextStyle {
    pub foreground: Color,
    pub background: Color,
    /// Underline color (SGR 58), `Default` follows the foreground
    pub underline_color: Color,
    pub options: StyleOptions,
    pub hyperlink: Option<HyperlinkId>,
}

impl TextStyle {
    /// The style of never-written cells
    pub const EMPTY: TextStyle = TextStyle {
        foreground: Color::Default,
        background: Color::Default,
        underline_color: Color::Default,
        options: StyleOptions::empty(),
        hyperlink: None,
    };

    pub fn new(foreground: Color, background: Color) -> Self {
        Self {
            foreground,
            background,
            ..Self::EMPTY
        }
    }

    pub fn with_foreground(mut self, color: Color) -> Self {
        self.foreground = color;
        self
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.background = color;
        self
    }

    /// Set or clear one or more flags
    pub fn with_option(mut self, option: StyleOptions, enabled: bool) -> Self {
        self.options.set(option, enabled);
        self
    }

    pub fn has(&self, option: StyleOptions) -> bool {
        self.options.contains(option)
    }

    /// Replace the underline variant
    pub fn with_underline(mut self, underline: UnderlineStyle) -> Self {
        self.options.remove(StyleOptions::ANY_UNDERLINE);
        self.options.insert(underline.flag());
        self
    }

    /// Current underline variant
    pub fn underline(&self) -> UnderlineStyle {
        if self.has(StyleOptions::UNDERLINE) {
            UnderlineStyle::Single
        } else if self.has(StyleOptions::DOUBLE_UNDERLINE) {
            UnderlineStyle::Double
        } else if self.has(StyleOptions::CURLY_UNDERLINE) {
            UnderlineStyle::Curly
        } else if self.has(StyleOptions::DOTTED_UNDERLINE) {
            UnderlineStyle::Dotted
        } else if self.has(StyleOptions::DASHED_UNDERLINE) {
            UnderlineStyle::Dashed
        } else {
            UnderlineStyle::None
        }
    }

    /// Foreground after applying inverse video
    pub fn effective_foreground(&self) -> Color {
        if self.has(StyleOptions::INVERSE) {
            self.background
        } else {
            self.foreground
        }
    }

    /// Background after applying inverse video
    pub fn effective_background(&self) -> Color {
        if self.has(StyleOptions::INVERSE) {
            self.foreground
        } else {
            self.background
        }
    }

    /// Style used to fill erased cells: only the background survives (BCE)
    pub fn erase_style(&self) -> TextStyle {
        TextStyle {
            background: self.background,
            ..Self::EMPTY
        }
    }
}

/// Interns styles so equal styles share one `Arc`
#[derive(Debug)]
pub struct StyleCache {
    styles: HashMap<TextStyle, Arc<TextStyle>>,
    limit: usize,
    empty: Arc<TextStyle>,
}

impl Default for StyleCache {
    fn default() -> Self {
        Self::new(4096)
    }
}

impl StyleCache {
    /// Create a cache that forgets everything once it holds `limit` styles
    pub fn new(limit: usize) -> Self {
        Self {
            styles: HashMap::new(),
            limit: limit.max(1),
            empty: Arc::new(TextStyle::EMPTY),
        }
    }

    /// Shared instance for `style`
    pub fn intern(&mut self, style: TextStyle) -> Arc<TextStyle> {
        if style == TextStyle::EMPTY {
            return self.empty.clone();
        }
        if let Some(shared) = self.styles.get(&style) {
            return shared.clone();
        }
        if self.styles.len() >= self.limit {
            log::trace!("style cache full ({} entries), clearing", self.styles.len());
            self.styles.clear();
        }
        let shared = Arc::new(style);
        self.styles.insert(style, shared.clone());
        shared
    }

    /// Shared instance of [`TextStyle::EMPTY`]
    pub fn empty(&self) -> Arc<TextStyle> {
        self.empty.clone()
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_structural_equality() {
        let a = TextStyle::EMPTY.with_foreground(Color::Indexed(1));
        let b = TextStyle::new(Color::Indexed(1), Color::Default);
        assert_eq!(a, b);
        assert_ne!(a, a.with_option(StyleOptions::BOLD, true));
    }

    #[test]
    fn test_underline_variants_are_exclusive() {
        let style = TextStyle::EMPTY
            .with_underline(UnderlineStyle::Curly)
            .with_underline(UnderlineStyle::Double);
        assert_eq!(style.underline(), UnderlineStyle::Double);
        assert!(!style.has(StyleOptions::CURLY_UNDERLINE));
        assert_eq!(style.with_underline(UnderlineStyle::None).underline(), UnderlineStyle::None);
    }

    #[test]
    fn test_inverse_swaps_colors() {
        let style = TextStyle::new(Color::Indexed(2), Color::Indexed(4))
            .with_option(StyleOptions::INVERSE, true);
        assert_eq!(style.effective_foreground(), Color::Indexed(4));
        assert_eq!(style.effective_background(), Color::Indexed(2));
    }

    #[test]
    fn test_erase_style_keeps_background() {
        let style = TextStyle::new(Color::Indexed(2), Color::Indexed(4))
            .with_option(StyleOptions::BOLD, true);
        assert_eq!(style.erase_style(), TextStyle::EMPTY.with_background(Color::Indexed(4)));
    }

    #[test]
    fn test_cache_interns() {
        let mut cache = StyleCache::default();
        let red = TextStyle::EMPTY.with_foreground(Color::Indexed(1));
        let a = cache.intern(red);
        let b = cache.intern(red);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&cache.intern(TextStyle::EMPTY), &cache.empty()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_limit() {
        let mut cache = StyleCache::new(2);
        for i in 0..5u8 {
            cache.intern(TextStyle::EMPTY.with_foreground(Color::Indexed(i + 1)));
        }
        assert!(cache.len() <= 2);
    }
}
