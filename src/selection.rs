//! Text selection over buffer snapshots
//!
//! Positions are buffer coordinates: rows from 0 are the screen, negative
//! rows reach into the history (-1 is the newest history line). Columns are
//! cells, and an end position is exclusive.
//!
//! Everything here works on a [`VersionedBufferSnapshot`], so selecting never
//! holds the buffer lock.

use serde::{Deserialize, Serialize};

use crate::line::DWC;
use crate::snapshot::VersionedBufferSnapshot;

/// Characters that end a word for double-click selection
pub const DEFAULT_SEPARATORS: &[char] = &[
    ' ', '\u{a0}', '\t', '\'', '"', '$', '(', ')', '[', ']', '{', '}', '<', '>',
];

/// A position in the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectionPoint {
    /// Row index (negative for history)
    pub row: isize,
    /// Column index (0-based)
    pub col: usize,
}

impl SelectionPoint {
    pub fn new(row: isize, col: usize) -> Self {
        Self { row, col }
    }

    /// Check if this point is before another point
    pub fn is_before(&self, other: &SelectionPoint) -> bool {
        (self.row, self.col) < (other.row, other.col)
    }
}

/// Selection type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SelectionType {
    /// Character-level selection (default)
    #[default]
    Normal,
    /// Word-level selection (double-click)
    Word,
    /// Line-level selection (triple-click), whole logical lines
    Line,
}

/// A selection being made with the mouse
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    start: SelectionPoint,
    end: SelectionPoint,
    selection_type: SelectionType,
    active: bool,
}

impl Selection {
    pub fn new(start: SelectionPoint, selection_type: SelectionType) -> Self {
        Self {
            start,
            end: start,
            selection_type,
            active: true,
        }
    }

    /// Move the end point (mouse drag)
    pub fn update(&mut self, point: SelectionPoint) {
        self.end = point;
    }

    /// Finish the selection (mouse released)
    pub fn finish(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn selection_type(&self) -> SelectionType {
        self.selection_type
    }

    /// Start and end ordered
    pub fn normalized(&self) -> (SelectionPoint, SelectionPoint) {
        sort_points(self.start, self.end)
    }

    /// Selected range once word or line expansion is applied
    pub fn resolve(&self, snapshot: &VersionedBufferSnapshot) -> (SelectionPoint, SelectionPoint) {
        let (start, end) = self.normalized();
        match self.selection_type {
            SelectionType::Normal => (start, end),
            SelectionType::Word => {
                let (word_start, _) = get_word_bounds(snapshot, start);
                let (_, word_end) = get_word_bounds(snapshot, end);
                (word_start, word_end)
            },
            SelectionType::Line => {
                let (line_start, _) = get_line_bounds(snapshot, start.row);
                let (_, line_end) = get_line_bounds(snapshot, end.row);
                (line_start, line_end)
            },
        }
    }

    /// Selected text
    pub fn text(&self, snapshot: &VersionedBufferSnapshot) -> String {
        let (start, end) = self.resolve(snapshot);
        get_selection_text(snapshot, start, end)
    }
}

fn sort_points(a: SelectionPoint, b: SelectionPoint) -> (SelectionPoint, SelectionPoint) {
    if b.is_before(&a) {
        (b, a)
    } else {
        (a, b)
    }
}

/// Rows available in `snapshot` as an inclusive range
fn row_range(snapshot: &VersionedBufferSnapshot) -> (isize, isize) {
    let top = -(snapshot.history_lines_count() as isize);
    let bottom = snapshot.height() as isize - 1;
    (top, bottom)
}

/// Word around `point` using [`DEFAULT_SEPARATORS`]
pub fn get_word_bounds(snapshot: &VersionedBufferSnapshot, point: SelectionPoint) -> (SelectionPoint, SelectionPoint) {
    get_word_bounds_with(snapshot, point, DEFAULT_SEPARATORS)
}

/// Word around `point`: the run of non-separator cells containing it.
///
/// The scan continues into the neighbouring row when the rows are joined by
/// a soft wrap. Separators are excluded; a separator (or a cell past the end
/// of the text) selects just that cell.
pub fn get_word_bounds_with(
    snapshot: &VersionedBufferSnapshot,
    point: SelectionPoint,
    separators: &[char],
) -> (SelectionPoint, SelectionPoint) {
    let width = snapshot.width();
    let (top, bottom) = row_range(snapshot);
    let row = point.row.clamp(top, bottom);
    let col = point.col.min(width.saturating_sub(1));
    let is_separator = |c: char| separators.contains(&c);

    let line = snapshot.get_line(row);
    if col >= line.len() || is_separator(line.char_at(col)) {
        return (SelectionPoint::new(row, col), SelectionPoint::new(row, col + 1));
    }

    // Backward to the cell after the previous separator
    let (mut start_row, mut start_col) = (row, col);
    let mut current = line.clone();
    loop {
        if start_col == 0 {
            if start_row > top && snapshot.get_line(start_row - 1).is_wrapped() {
                start_row -= 1;
                start_col = width;
                current = snapshot.get_line(start_row);
            } else {
                break;
            }
        }
        if is_separator(current.char_at(start_col - 1)) {
            break;
        }
        start_col -= 1;
    }

    // Forward to the next separator
    let (mut end_row, mut end_col) = (row, col + 1);
    let mut current = line;
    loop {
        if end_col >= width {
            if end_row < bottom && current.is_wrapped() {
                end_row += 1;
                end_col = 0;
                current = snapshot.get_line(end_row);
            } else {
                break;
            }
        }
        if is_separator(current.char_at(end_col)) {
            break;
        }
        end_col += 1;
    }

    (SelectionPoint::new(start_row, start_col), SelectionPoint::new(end_row, end_col))
}

/// The whole logical line containing `row`, following soft wraps both ways
pub fn get_line_bounds(snapshot: &VersionedBufferSnapshot, row: isize) -> (SelectionPoint, SelectionPoint) {
    let (top, bottom) = row_range(snapshot);
    let row = row.clamp(top, bottom);

    let mut start = row;
    while start > top && snapshot.get_line(start - 1).is_wrapped() {
        start -= 1;
    }
    let mut end = row;
    while end < bottom && snapshot.get_line(end).is_wrapped() {
        end += 1;
    }
    let end_col = snapshot.get_line(end).len();
    (SelectionPoint::new(start, 0), SelectionPoint::new(end, end_col))
}

/// Text between two points.
///
/// Rows are joined with `\n` except where a row soft-wraps into the next.
/// Placeholder cells behind wide characters are skipped.
pub fn get_selection_text(snapshot: &VersionedBufferSnapshot, start: SelectionPoint, end: SelectionPoint) -> String {
    let (top, _) = row_range(snapshot);
    let (mut start, mut end) = sort_points(start, end);
    start.row = start.row.max(top);
    if end.row < start.row {
        (start, end) = sort_points(start, end);
    }

    let mut text = String::new();
    for row in start.row..=end.row {
        let line = snapshot.get_line(row);
        let len = line.len();
        let from = if row == start.row { start.col.min(len) } else { 0 };
        let to = if row == end.row { end.col.min(len) } else { len };
        text.extend((from..to.max(from)).map(|x| line.char_at(x)).filter(|&c| c != DWC));
        if !line.is_wrapped() && row < end.row {
            text.push('\n');
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::TerminalTextBuffer;
    use crate::emulator::Emulator;
    use crate::stream::ArrayDataStream;
    use crate::terminal::Terminal;

    fn snapshot(width: usize, height: usize, input: &str) -> VersionedBufferSnapshot {
        let buffer = TerminalTextBuffer::shared(width, height, 100);
        let mut emulator = Emulator::new(ArrayDataStream::new(input), Terminal::new(buffer.clone()));
        emulator.run().unwrap();
        buffer.create_snapshot()
    }

    fn p(row: isize, col: usize) -> SelectionPoint {
        SelectionPoint::new(row, col)
    }

    #[test]
    fn test_word_bounds_single_row() {
        let snap = snapshot(20, 2, "foo bar(baz) qux");
        assert_eq!(get_word_bounds(&snap, p(0, 5)), (p(0, 4), p(0, 7)));
        assert_eq!(get_word_bounds(&snap, p(0, 0)), (p(0, 0), p(0, 3)));
        assert_eq!(get_word_bounds(&snap, p(0, 9)), (p(0, 8), p(0, 11)));
    }

    #[test]
    fn test_word_bounds_on_separator() {
        let snap = snapshot(20, 2, "foo bar");
        assert_eq!(get_word_bounds(&snap, p(0, 3)), (p(0, 3), p(0, 4)));
        // Past the end of the text
        assert_eq!(get_word_bounds(&snap, p(0, 15)), (p(0, 15), p(0, 16)));
    }

    #[test]
    fn test_word_bounds_across_wrap() {
        let snap = snapshot(8, 3, "one twothree four");
        // "twothree" spans the soft wrap after column 7
        assert_eq!(get_word_bounds(&snap, p(1, 1)), (p(0, 4), p(1, 4)));
        assert_eq!(get_word_bounds(&snap, p(0, 5)), (p(0, 4), p(1, 4)));
        let text = get_selection_text(&snap, p(0, 4), p(1, 4));
        assert_eq!(text, "twothree");
    }

    #[test]
    fn test_word_bounds_stop_at_hard_line_end() {
        let snap = snapshot(4, 3, "abcd\r\nefgh");
        assert_eq!(get_word_bounds(&snap, p(1, 1)), (p(1, 0), p(1, 4)));
    }

    #[test]
    fn test_custom_separators() {
        let snap = snapshot(20, 2, "a.b.c d");
        assert_eq!(get_word_bounds_with(&snap, p(0, 2), &['.', ' ']), (p(0, 2), p(0, 3)));
        assert_eq!(get_word_bounds(&snap, p(0, 2)), (p(0, 0), p(0, 5)));
    }

    #[test]
    fn test_line_bounds_follow_wraps() {
        let snap = snapshot(4, 4, "abcdefghij\r\nxy");
        assert_eq!(get_line_bounds(&snap, 1), (p(0, 0), p(2, 2)));
        assert_eq!(get_line_bounds(&snap, 3), (p(3, 0), p(3, 2)));
    }

    #[test]
    fn test_selection_text_newlines_between_hard_lines() {
        let snap = snapshot(10, 3, "first\r\nsecond\r\nthird");
        assert_eq!(get_selection_text(&snap, p(0, 2), p(2, 3)), "rst\nsecond\nthi");
        // Reversed points give the same text
        assert_eq!(get_selection_text(&snap, p(2, 3), p(0, 2)), "rst\nsecond\nthi");
    }

    #[test]
    fn test_selection_text_joins_wrapped_rows() {
        let snap = snapshot(4, 3, "abcdefgh");
        let (start, end) = get_line_bounds(&snap, 0);
        assert_eq!(get_selection_text(&snap, start, end), "abcdefgh");
    }

    #[test]
    fn test_selection_text_skips_wide_placeholders() {
        let snap = snapshot(10, 2, "a中b");
        assert_eq!(get_selection_text(&snap, p(0, 0), p(0, 4)), "a中b");
    }

    #[test]
    fn test_selection_reaches_history() {
        let snap = snapshot(10, 2, "old\r\nmid\r\nnew");
        assert_eq!(snap.history_lines_count(), 1);
        assert_eq!(get_selection_text(&snap, p(-5, 0), p(0, 3)), "old\nmid");
    }

    #[test]
    fn test_selection_types() {
        let snap = snapshot(20, 2, "hello big world");
        let mut selection = Selection::new(p(0, 7), SelectionType::Word);
        selection.update(p(0, 12));
        assert_eq!(selection.text(&snap), "big world");
        assert!(selection.is_active());
        selection.finish();
        assert!(!selection.is_active());

        let line = Selection::new(p(0, 3), SelectionType::Line);
        assert_eq!(line.text(&snap), "hello big world");

        let mut normal = Selection::new(p(0, 8), SelectionType::Normal);
        normal.update(p(0, 1));
        assert_eq!(normal.normalized(), (p(0, 1), p(0, 8)));
        assert_eq!(normal.text(&snap), "ello bi");
    }
}
