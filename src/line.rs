//! Terminal line representation
//!
//! A line is an ordered list of styled runs ([`TextEntry`]). Each column is
//! one `char`; a double-width character is followed by the [`DWC`]
//! placeholder so column arithmetic stays simple. Every mutation bumps the
//! line's version, which is what snapshots compare to detect change.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use crate::style::TextStyle;

/// Placeholder stored in the column after a double-width character
pub const DWC: char = '\u{E000}';

/// Stable identity of a line, assigned once at creation
pub type LineId = u64;

static NEXT_LINE_ID: AtomicU64 = AtomicU64::new(1);

fn next_line_id() -> LineId {
    NEXT_LINE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Shared `Arc` of [`TextStyle::EMPTY`] used for padding
pub fn empty_style() -> Arc<TextStyle> {
    static EMPTY: OnceLock<Arc<TextStyle>> = OnceLock::new();
    EMPTY.get_or_init(|| Arc::new(TextStyle::EMPTY)).clone()
}

fn same_style(a: &Arc<TextStyle>, b: &Arc<TextStyle>) -> bool {
    Arc::ptr_eq(a, b) || **a == **b
}

/// A run of characters sharing one style
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEntry {
    style: Arc<TextStyle>,
    chars: Vec<char>,
}

impl TextEntry {
    pub fn new(style: Arc<TextStyle>, chars: Vec<char>) -> Self {
        Self { style, chars }
    }

    pub fn style(&self) -> &Arc<TextStyle> {
        &self.style
    }

    /// Raw cells, placeholders included
    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    /// Visible text of the run
    pub fn text(&self) -> String {
        self.chars.iter().filter(|&&c| c != DWC).collect()
    }

    /// Number of columns covered
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }
}

type Cell = (char, Arc<TextStyle>);

/// One row of the terminal
///
/// `Clone` keeps the id: a clone is a copy of the same logical line, which
/// is what snapshots hand out. The buffer creates fresh lines with
/// [`TerminalLine::new`].
#[derive(Debug, Clone)]
pub struct TerminalLine {
    id: LineId,
    entries: Vec<TextEntry>,
    wrapped: bool,
    version: u64,
}

impl Default for TerminalLine {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for TerminalLine {
    fn eq(&self, other: &Self) -> bool {
        self.wrapped == other.wrapped && self.entries == other.entries
    }
}

impl Eq for TerminalLine {}

impl TerminalLine {
    /// Create an empty line with a fresh id
    pub fn new() -> Self {
        Self {
            id: next_line_id(),
            entries: Vec::new(),
            wrapped: false,
            version: 0,
        }
    }

    /// Create a line with a fresh id holding `text` in `style`
    pub fn from_text(text: &str, style: Arc<TextStyle>) -> Self {
        let mut line = Self::new();
        let chars: Vec<char> = text.chars().collect();
        if !chars.is_empty() {
            line.entries.push(TextEntry::new(style, chars));
        }
        line
    }

    /// Create a line filled with `width` blanks of `style`
    pub fn filled(width: usize, style: Arc<TextStyle>) -> Self {
        let mut line = Self::new();
        if width > 0 && *style != TextStyle::EMPTY {
            line.entries.push(TextEntry::new(style, vec![' '; width]));
        }
        line
    }

    pub fn id(&self) -> LineId {
        self.id
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn entries(&self) -> &[TextEntry] {
        &self.entries
    }

    pub fn is_wrapped(&self) -> bool {
        self.wrapped
    }

    /// Mark this line as continuing on the next row (soft wrap)
    pub fn set_wrapped(&mut self, wrapped: bool) {
        if self.wrapped != wrapped {
            self.wrapped = wrapped;
            self.touch();
        }
    }

    /// Number of columns that have been written
    pub fn len(&self) -> usize {
        self.entries.iter().map(TextEntry::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True if the line holds nothing but unstyled blanks
    pub fn is_blank(&self) -> bool {
        self.entries
            .iter()
            .all(|e| *e.style == TextStyle::EMPTY && e.chars.iter().all(|&c| c == ' '))
    }

    /// Visible text, placeholders removed
    pub fn text(&self) -> String {
        self.entries.iter().map(TextEntry::text).collect()
    }

    /// Character at column `x` (a blank past the end)
    pub fn char_at(&self, x: usize) -> char {
        self.cell_at(x).map(|(c, _)| c).unwrap_or(' ')
    }

    /// Style at column `x` (the empty style past the end)
    pub fn style_at(&self, x: usize) -> Arc<TextStyle> {
        self.cell_at(x).map(|(_, s)| s).unwrap_or_else(empty_style)
    }

    fn cell_at(&self, x: usize) -> Option<Cell> {
        let mut start = 0;
        for entry in &self.entries {
            if x < start + entry.len() {
                return Some((entry.chars[x - start], entry.style.clone()));
            }
            start += entry.len();
        }
        None
    }

    /// Write `chars` starting at column `x`, padding with blanks if needed
    pub fn write_string(&mut self, x: usize, chars: &[char], style: &Arc<TextStyle>) {
        if chars.is_empty() {
            return;
        }
        let len = self.len();
        if x == len && chars[0] != DWC {
            self.append(chars, style);
            self.touch();
            return;
        }
        let mut cells = self.cells();
        pad(&mut cells, x);
        let end = x + chars.len();
        repair_wide(&mut cells, x, end);
        for (i, &c) in chars.iter().enumerate() {
            let cell = (c, style.clone());
            if x + i < cells.len() {
                cells[x + i] = cell;
            } else {
                cells.push(cell);
            }
        }
        self.set_cells(cells);
    }

    /// Insert `count` blanks at `x`, dropping whatever moves past `max_len`
    pub fn insert_blank_characters(&mut self, x: usize, count: usize, max_len: usize, style: &Arc<TextStyle>) {
        let mut cells = self.cells();
        if x >= cells.len() && **style == TextStyle::EMPTY {
            return;
        }
        pad(&mut cells, x);
        repair_wide(&mut cells, x, x);
        let blanks = std::iter::repeat_with(|| (' ', style.clone())).take(count);
        cells.splice(x..x, blanks);
        if cells.len() > max_len {
            cells.truncate(max_len);
            let last = cells.len();
            repair_wide(&mut cells, last, last);
        }
        self.set_cells(cells);
    }

    /// Remove `count` characters at `x`, shifting the rest left.
    ///
    /// With a non-empty style the freed columns at the right edge
    /// (up to `width`) are filled with blanks of that style.
    pub fn delete_characters(&mut self, x: usize, count: usize, width: usize, style: &Arc<TextStyle>) {
        let mut cells = self.cells();
        if x >= cells.len() {
            return;
        }
        let end = (x + count).min(cells.len());
        repair_wide(&mut cells, x, end);
        cells.drain(x..end);
        if **style != TextStyle::EMPTY {
            while cells.len() < width {
                cells.push((' ', style.clone()));
            }
        }
        self.set_cells(cells);
    }

    /// Blank columns `left..right` with `style`
    pub fn clear_area(&mut self, left: usize, right: usize, style: &Arc<TextStyle>) {
        if left >= right {
            return;
        }
        let mut cells = self.cells();
        if **style == TextStyle::EMPTY && right >= cells.len() {
            if left >= cells.len() {
                return;
            }
            repair_wide(&mut cells, left, left);
            cells.truncate(left);
            self.set_cells(cells);
            return;
        }
        pad(&mut cells, right);
        repair_wide(&mut cells, left, right);
        for cell in &mut cells[left..right] {
            *cell = (' ', style.clone());
        }
        self.set_cells(cells);
    }

    /// Drop everything past column `width`
    pub fn truncate(&mut self, width: usize) {
        if self.len() <= width {
            return;
        }
        let mut cells = self.cells();
        repair_wide(&mut cells, width, width);
        cells.truncate(width);
        self.set_cells(cells);
    }

    /// Remove all content and the wrapped flag
    pub fn clear(&mut self) {
        self.entries.clear();
        self.wrapped = false;
        self.touch();
    }

    /// Replace all content with `width` blanks of `style`
    pub fn clear_with(&mut self, width: usize, style: &Arc<TextStyle>) {
        self.entries.clear();
        self.wrapped = false;
        if width > 0 && **style != TextStyle::EMPTY {
            self.entries.push(TextEntry::new(style.clone(), vec![' '; width]));
        }
        self.touch();
    }

    fn touch(&mut self) {
        self.version += 1;
    }

    fn append(&mut self, chars: &[char], style: &Arc<TextStyle>) {
        match self.entries.last_mut() {
            Some(last) if same_style(&last.style, style) => last.chars.extend_from_slice(chars),
            _ => self.entries.push(TextEntry::new(style.clone(), chars.to_vec())),
        }
    }

    fn cells(&self) -> Vec<Cell> {
        let mut cells = Vec::with_capacity(self.len());
        for entry in &self.entries {
            cells.extend(entry.chars.iter().map(|&c| (c, entry.style.clone())));
        }
        cells
    }

    fn set_cells(&mut self, cells: Vec<Cell>) {
        let mut entries: Vec<TextEntry> = Vec::new();
        for (c, style) in cells {
            match entries.last_mut() {
                Some(last) if same_style(&last.style, &style) => last.chars.push(c),
                _ => entries.push(TextEntry::new(style, vec![c])),
            }
        }
        self.entries = entries;
        self.touch();
    }
}

fn pad(cells: &mut Vec<Cell>, len: usize) {
    if cells.len() < len {
        let style = empty_style();
        cells.resize_with(len, || (' ', style.clone()));
    }
}

/// Blank out halves of wide characters cut by an edit of `start..end`
fn repair_wide(cells: &mut [Cell], start: usize, end: usize) {
    if start > 0 && start < cells.len() && cells[start].0 == DWC {
        cells[start - 1].0 = ' ';
    }
    if end > 0 && end < cells.len() && cells[end].0 == DWC {
        cells[end].0 = ' ';
    }
}
