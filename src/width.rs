//! Double-width character detection
//!
//! Terminals disagree on which code points take two cells, mostly for the
//! East Asian Ambiguous category. A [`DoubleWidthProvider`] answers the
//! question for one convention; the emulator uses whichever one the
//! configuration selects.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthChar;

/// Decides whether a code point occupies two terminal cells
pub trait DoubleWidthProvider: Send + Sync {
    fn is_double_width(&self, code_point: u32, ambiguous_as_wide: bool) -> bool;

    /// Short name used in diagnostics
    fn name(&self) -> &'static str;
}

/// Unicode East Asian Width via `unicode-width`; ambiguous characters are
/// wide only when asked
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeWidthProvider;

impl DoubleWidthProvider for UnicodeWidthProvider {
    fn is_double_width(&self, code_point: u32, ambiguous_as_wide: bool) -> bool {
        let Some(c) = char::from_u32(code_point) else {
            return false;
        };
        let width = if ambiguous_as_wide {
            c.width_cjk()
        } else {
            c.width()
        };
        width == Some(2)
    }

    fn name(&self) -> &'static str {
        "unicode"
    }
}

/// CJK convention: ambiguous characters are always wide
#[derive(Debug, Clone, Copy, Default)]
pub struct CjkWidthProvider;

impl DoubleWidthProvider for CjkWidthProvider {
    fn is_double_width(&self, code_point: u32, _ambiguous_as_wide: bool) -> bool {
        char::from_u32(code_point).and_then(|c| c.width_cjk()) == Some(2)
    }

    fn name(&self) -> &'static str {
        "cjk"
    }
}

/// Every character is a single cell
#[derive(Debug, Clone, Copy, Default)]
pub struct NarrowWidthProvider;

impl DoubleWidthProvider for NarrowWidthProvider {
    fn is_double_width(&self, _code_point: u32, _ambiguous_as_wide: bool) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "narrow"
    }
}

/// Provider selection as it appears in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WidthProviderKind {
    #[default]
    Unicode,
    Cjk,
    Narrow,
}

impl WidthProviderKind {
    pub const ALL: [WidthProviderKind; 3] = [
        WidthProviderKind::Unicode,
        WidthProviderKind::Cjk,
        WidthProviderKind::Narrow,
    ];
}

impl fmt::Display for WidthProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WidthProviderKind::Unicode => "unicode",
            WidthProviderKind::Cjk => "cjk",
            WidthProviderKind::Narrow => "narrow",
        })
    }
}

impl FromStr for WidthProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unicode" => Ok(WidthProviderKind::Unicode),
            "cjk" => Ok(WidthProviderKind::Cjk),
            "narrow" => Ok(WidthProviderKind::Narrow),
            other => Err(format!("unknown width provider '{}'", other)),
        }
    }
}

pub fn provider_for(kind: WidthProviderKind) -> Arc<dyn DoubleWidthProvider> {
    match kind {
        WidthProviderKind::Unicode => Arc::new(UnicodeWidthProvider),
        WidthProviderKind::Cjk => Arc::new(CjkWidthProvider),
        WidthProviderKind::Narrow => Arc::new(NarrowWidthProvider),
    }
}

/// Number of cells `c` takes: 0 for combining marks, otherwise 1 or 2
pub fn cell_width(provider: &dyn DoubleWidthProvider, c: char, ambiguous_as_wide: bool) -> usize {
    if c.width() == Some(0) {
        return 0;
    }
    if provider.is_double_width(c as u32, ambiguous_as_wide) {
        2
    } else {
        1
    }
}

/// Code points in `range` on which two providers disagree
pub fn disagreements(
    a: &dyn DoubleWidthProvider,
    b: &dyn DoubleWidthProvider,
    range: RangeInclusive<u32>,
    ambiguous_as_wide: bool,
) -> Vec<u32> {
    range
        .filter(|&cp| char::from_u32(cp).is_some())
        .filter(|&cp| a.is_double_width(cp, ambiguous_as_wide) != b.is_double_width(cp, ambiguous_as_wide))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_is_narrow_everywhere() {
        for kind in WidthProviderKind::ALL {
            let provider = provider_for(kind);
            assert!(!provider.is_double_width('a' as u32, true), "{}", kind);
        }
    }

    #[test]
    fn test_cjk_ideograph() {
        assert!(UnicodeWidthProvider.is_double_width('中' as u32, false));
        assert!(CjkWidthProvider.is_double_width('中' as u32, false));
        assert!(!NarrowWidthProvider.is_double_width('中' as u32, false));
    }

    #[test]
    fn test_ambiguous_characters() {
        let box_drawing = '─' as u32;
        assert!(!UnicodeWidthProvider.is_double_width(box_drawing, false));
        assert!(UnicodeWidthProvider.is_double_width(box_drawing, true));
        assert!(CjkWidthProvider.is_double_width(box_drawing, false));
    }

    #[test]
    fn test_invalid_code_point() {
        assert!(!UnicodeWidthProvider.is_double_width(0xD800, false));
    }

    #[test]
    fn test_cell_width() {
        let provider = UnicodeWidthProvider;
        assert_eq!(cell_width(&provider, 'x', false), 1);
        assert_eq!(cell_width(&provider, '字', false), 2);
        assert_eq!(cell_width(&provider, '\u{0301}', false), 0);
    }

    #[test]
    fn test_disagreements() {
        let diff = disagreements(&UnicodeWidthProvider, &CjkWidthProvider, 0x2500..=0x2502, false);
        assert_eq!(diff, vec![0x2500, 0x2501, 0x2502]);
        assert!(disagreements(&UnicodeWidthProvider, &UnicodeWidthProvider, 0..=0x3000, false).is_empty());
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!("CJK".parse::<WidthProviderKind>().unwrap(), WidthProviderKind::Cjk);
        assert!("wide".parse::<WidthProviderKind>().is_err());
    }
}
