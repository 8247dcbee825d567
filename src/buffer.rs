//! The terminal text buffer
//!
//! [`TerminalTextBuffer`] owns every line: the visible screen, the
//! scrollback history and a second screen/history pair for the alternate
//! screen. All access goes through one reentrant lock. Writers run closures
//! against [`BufferState`] with [`TerminalTextBuffer::modify`]; readers on
//! other threads take a [`VersionedBufferSnapshot`] and work without locks.
//!
//! Coordinates are 0-based. Row 0 is the top of the screen, negative rows
//! address the history (-1 is the most recently scrolled-off line).

use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

use crate::line::{empty_style, TerminalLine};
use crate::snapshot::{IncrementalSnapshotBuilder, SnapshotMode, SnapshotStats, VersionedBufferSnapshot};
use crate::storage::{history_storage, LinesStorage, UnboundedLinesStorage};
use crate::style::{HyperlinkId, TextStyle};

/// Guard returned by [`TerminalTextBuffer::lock`]
pub type BufferLock<'a> = ReentrantMutexGuard<'a, RefCell<BufferState>>;

/// Everything guarded by the buffer lock
pub struct BufferState {
    width: usize,
    height: usize,
    screen: Box<dyn LinesStorage>,
    history: Box<dyn LinesStorage>,
    alt_screen: Box<dyn LinesStorage>,
    alt_history: Box<dyn LinesStorage>,
    using_alternate: bool,
    max_history: usize,
    snapshots: IncrementalSnapshotBuilder,
}

impl std::fmt::Debug for BufferState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferState")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("history", &self.history.len())
            .field("using_alternate", &self.using_alternate)
            .finish()
    }
}

fn blank_screen(height: usize) -> Box<dyn LinesStorage> {
    let mut screen = UnboundedLinesStorage::new();
    for _ in 0..height {
        screen.add_to_bottom(TerminalLine::new());
    }
    Box::new(screen)
}

impl BufferState {
    fn new(width: usize, height: usize, max_history: usize) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            screen: blank_screen(height),
            history: history_storage(max_history),
            alt_screen: blank_screen(height),
            alt_history: history_storage(max_history),
            using_alternate: false,
            max_history,
            snapshots: IncrementalSnapshotBuilder::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_using_alternate(&self) -> bool {
        self.using_alternate
    }

    pub fn history_lines_count(&self) -> usize {
        self.history.len()
    }

    pub fn screen(&self) -> &dyn LinesStorage {
        self.screen.as_ref()
    }

    pub fn history(&self) -> &dyn LinesStorage {
        self.history.as_ref()
    }

    /// Line at `index` (negative = history), `None` if out of range
    pub fn line(&self, index: isize) -> Option<&TerminalLine> {
        if index >= 0 {
            self.screen.get(index as usize)
        } else {
            let back = index.unsigned_abs();
            let i = self.history.len().checked_sub(back)?;
            self.history.get(i)
        }
    }

    /// Mutable screen line at row `y`
    pub fn screen_line_mut(&mut self, y: usize) -> Option<&mut TerminalLine> {
        self.screen.get_mut(y)
    }

    /// Copy of the line at `index`; out-of-range indices give an empty line
    pub fn get_line(&self, index: isize) -> TerminalLine {
        self.line(index).cloned().unwrap_or_default()
    }

    pub fn line_text(&self, index: isize) -> String {
        self.line(index).map(TerminalLine::text).unwrap_or_default()
    }

    pub fn screen_lines_text(&self) -> Vec<String> {
        self.screen.line_texts()
    }

    pub fn history_lines_text(&self) -> Vec<String> {
        self.history.line_texts()
    }

    /// Write `chars` at column `x` of row `y`
    pub fn write_string(&mut self, x: usize, y: usize, chars: &[char], style: &Arc<TextStyle>) {
        let width = self.width;
        if let Some(line) = self.screen.get_mut(y) {
            let fit = chars.len().min(width.saturating_sub(x));
            if fit > 0 {
                line.write_string(x, &chars[..fit], style);
            }
        }
    }

    /// Insert `count` blanks at column `x` of row `y`
    pub fn insert_blank_characters(&mut self, x: usize, y: usize, count: usize, style: &Arc<TextStyle>) {
        let width = self.width;
        if let Some(line) = self.screen.get_mut(y) {
            line.insert_blank_characters(x, count, width, style);
        }
    }

    /// Delete `count` characters at column `x` of row `y`
    pub fn delete_characters(&mut self, x: usize, y: usize, count: usize, style: &Arc<TextStyle>) {
        let width = self.width;
        if let Some(line) = self.screen.get_mut(y) {
            line.delete_characters(x, count, width, style);
        }
    }

    /// Blank `count` characters starting at column `x` of row `y`
    pub fn erase_characters(&mut self, x: usize, y: usize, count: usize, style: &Arc<TextStyle>) {
        let right = (x + count).min(self.width);
        if let Some(line) = self.screen.get_mut(y) {
            line.clear_area(x, right, style);
        }
    }

    /// Blank the rectangle `left..right` x `top..bottom`
    pub fn clear_area(&mut self, left: usize, top: usize, right: usize, bottom: usize, style: &Arc<TextStyle>) {
        let right = right.min(self.width);
        for y in top..bottom.min(self.height) {
            if let Some(line) = self.screen.get_mut(y) {
                line.clear_area(left, right, style);
                if left == 0 {
                    line.set_wrapped(false);
                }
            }
        }
    }

    /// Mark row `y` as a wrapped continuation (or not)
    pub fn set_line_wrapped(&mut self, y: usize, wrapped: bool) {
        if let Some(line) = self.screen.get_mut(y) {
            line.set_wrapped(wrapped);
        }
    }

    fn blank_line(&self, style: &Arc<TextStyle>) -> TerminalLine {
        TerminalLine::filled(self.width, style.clone())
    }

    fn push_history(&mut self, line: TerminalLine) {
        if self.using_alternate {
            return;
        }
        self.history.add_to_bottom(line);
    }

    /// Insert `count` blank lines at row `y`, pushing lines below down and
    /// dropping those that fall past `bottom` (exclusive)
    pub fn insert_lines(&mut self, y: usize, count: usize, bottom: usize, style: &Arc<TextStyle>) {
        let bottom = bottom.min(self.height);
        if y >= bottom {
            return;
        }
        let count = count.min(bottom - y);
        for _ in 0..count {
            self.screen.remove(bottom - 1);
            let blank = self.blank_line(style);
            self.screen.insert(y, blank);
        }
    }

    /// Delete `count` lines at row `y`, pulling lines up from `bottom`
    /// (exclusive) and filling the gap with blanks
    pub fn delete_lines(&mut self, y: usize, count: usize, bottom: usize, style: &Arc<TextStyle>) {
        let bottom = bottom.min(self.height);
        if y >= bottom {
            return;
        }
        let count = count.min(bottom - y);
        for _ in 0..count {
            self.screen.remove(y);
            let blank = self.blank_line(style);
            self.screen.insert(bottom - 1, blank);
        }
    }

    /// Scroll the region `top..bottom` up by `count` lines.
    ///
    /// Lines leaving a region that starts at the top of the main screen
    /// move into the history.
    pub fn scroll_up(&mut self, top: usize, bottom: usize, count: usize, style: &Arc<TextStyle>) {
        let bottom = bottom.min(self.height);
        if top >= bottom {
            return;
        }
        let count = count.min(bottom - top);
        for _ in 0..count {
            let Some(line) = self.screen.remove(top) else {
                break;
            };
            if top == 0 {
                self.push_history(line);
            }
            let blank = self.blank_line(style);
            self.screen.insert(bottom - 1, blank);
        }
    }

    /// Scroll the region `top..bottom` down by `count` lines
    pub fn scroll_down(&mut self, top: usize, bottom: usize, count: usize, style: &Arc<TextStyle>) {
        self.insert_lines(top, count, bottom, style);
    }

    /// Blank every screen line in place
    pub fn clear_screen(&mut self, style: &Arc<TextStyle>) {
        let width = self.width;
        for y in 0..self.height {
            if let Some(line) = self.screen.get_mut(y) {
                line.clear_with(width, style);
            }
        }
    }

    /// Move every non-blank screen line into the history and blank the screen
    pub fn move_screen_to_history(&mut self) {
        let last = (0..self.height)
            .rev()
            .find(|&y| self.screen.get(y).map_or(false, |l| !l.is_blank()));
        if let Some(last) = last {
            let moved = self.screen.remove_from_top(last + 1);
            for line in moved {
                self.push_history(line);
            }
            for _ in 0..=last {
                self.screen.add_to_bottom(TerminalLine::new());
            }
        }
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Fill every cell of the screen with `ch` (DECALN)
    pub fn fill_screen(&mut self, ch: char) {
        let row: Vec<char> = vec![ch; self.width];
        let style = empty_style();
        for y in 0..self.height {
            if let Some(line) = self.screen.get_mut(y) {
                line.clear();
                line.write_string(0, &row, &style);
            }
        }
    }

    /// Switch between the main and alternate line pairs.
    ///
    /// The alternate screen starts blank every time it is entered; while it
    /// is shown the main pair only changes through resizes.
    pub fn use_alternate(&mut self, enabled: bool) {
        if enabled == self.using_alternate {
            return;
        }
        std::mem::swap(&mut self.screen, &mut self.alt_screen);
        std::mem::swap(&mut self.history, &mut self.alt_history);
        self.using_alternate = enabled;
        if enabled {
            self.screen = blank_screen(self.height);
            self.history.clear();
        }
    }

    /// Resize to `width` x `height` and return where row `cursor_y` ended up.
    ///
    /// Shrinking first drops blank lines below the cursor, then moves lines
    /// from the top of the screen into the history. Growing pulls lines back
    /// out of the history before adding blanks at the bottom. Narrowing
    /// truncates lines.
    pub fn resize(&mut self, width: usize, height: usize, cursor_y: usize) -> usize {
        self.resize_screens(width, height, cursor_y, 0).0
    }

    /// Like [`resize`](Self::resize), also tracking a row on the inactive
    /// screen (the main screen's saved cursor while the alternate is shown).
    ///
    /// The inactive main screen is resized the same way as the active one,
    /// so rows cut from its top land in its history. Returns the new rows of
    /// `cursor_y` and `inactive_y`.
    pub fn resize_screens(&mut self, width: usize, height: usize, cursor_y: usize, inactive_y: usize) -> (usize, usize) {
        let width = width.max(1);
        let height = height.max(1);
        let old_height = self.height;

        let (cursor_y, inactive_y) = if self.using_alternate {
            let cursor_y = resize_lines(self.screen.as_mut(), None, old_height, height, cursor_y);
            let main_y = resize_lines(
                self.alt_screen.as_mut(),
                Some(self.alt_history.as_mut()),
                old_height,
                height,
                inactive_y,
            );
            (cursor_y, main_y)
        } else {
            let cursor_y = resize_lines(
                self.screen.as_mut(),
                Some(self.history.as_mut()),
                old_height,
                height,
                cursor_y,
            );
            resize_inactive(self.alt_screen.as_mut(), height);
            (cursor_y, inactive_y.min(height - 1))
        };

        if width < self.width {
            for storage in [
                &mut self.screen,
                &mut self.history,
                &mut self.alt_screen,
                &mut self.alt_history,
            ] {
                for i in 0..storage.len() {
                    if let Some(line) = storage.get_mut(i) {
                        line.truncate(width);
                    }
                }
            }
        }

        self.width = width;
        self.height = height;
        (cursor_y, inactive_y)
    }

    /// Hyperlink ids referenced by any line of either screen or history
    pub fn hyperlinks_in_use(&self) -> HashSet<HyperlinkId> {
        let mut live = HashSet::new();
        let storages = [&self.screen, &self.history, &self.alt_screen, &self.alt_history];
        for storage in storages {
            for line in (0..storage.len()).filter_map(|i| storage.get(i)) {
                live.extend(line.entries().iter().filter_map(|entry| entry.style().hyperlink));
            }
        }
        live
    }

    /// Change the maximum history size
    pub fn set_max_history(&mut self, max_history: usize) {
        self.max_history = max_history;
        if max_history == 0 {
            return;
        }
        if self.history.capacity().is_none() {
            let mut ring = history_storage(max_history);
            for line in self.history.remove_from_top(usize::MAX) {
                ring.add_to_bottom(line);
            }
            self.history = ring;
        } else {
            self.history.set_capacity(max_history);
        }
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    fn snapshot(&mut self, mode: SnapshotMode) -> VersionedBufferSnapshot {
        self.snapshots.build(
            self.screen.as_ref(),
            self.history.as_ref(),
            self.width,
            self.height,
            self.using_alternate,
            mode,
        )
    }
}

/// Resize one screen from `old_height` to `height` rows and return the new
/// row of `cursor_y`. Without a history, lines cut from the top are dropped
/// and growing only adds blanks.
fn resize_lines(
    screen: &mut dyn LinesStorage,
    history: Option<&mut dyn LinesStorage>,
    old_height: usize,
    height: usize,
    cursor_y: usize,
) -> usize {
    let mut cursor_y = cursor_y.min(old_height.saturating_sub(1));
    if height < old_height {
        let mut to_remove = old_height - height;
        while to_remove > 0 && screen.len() > cursor_y + 1 {
            let last = screen.len() - 1;
            if !screen.get(last).map_or(false, TerminalLine::is_blank) {
                break;
            }
            screen.remove_from_bottom(1);
            to_remove -= 1;
        }
        let removed = screen.remove_from_top(to_remove);
        if let Some(history) = history {
            for line in removed {
                history.add_to_bottom(line);
            }
        }
        cursor_y = cursor_y.saturating_sub(to_remove);
    } else if height > old_height {
        let mut to_add = height - old_height;
        if let Some(history) = history {
            while to_add > 0 {
                let Some(line) = history.remove_from_bottom(1).pop() else {
                    break;
                };
                screen.add_to_top(line);
                cursor_y += 1;
                to_add -= 1;
            }
        }
        for _ in 0..to_add {
            screen.add_to_bottom(TerminalLine::new());
        }
    }
    cursor_y.min(height - 1)
}

fn resize_inactive(screen: &mut dyn LinesStorage, height: usize) {
    if screen.len() > height {
        screen.remove_from_bottom(screen.len() - height);
    }
    while screen.len() < height {
        screen.add_to_bottom(TerminalLine::new());
    }
}

/// Thread-safe owner of all grid state
pub struct TerminalTextBuffer {
    state: ReentrantMutex<RefCell<BufferState>>,
}

impl std::fmt::Debug for TerminalTextBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let guard = self.state.lock();
        let result = match guard.try_borrow() {
            Ok(state) => f.debug_tuple("TerminalTextBuffer").field(&*state).finish(),
            Err(_) => f.write_str("TerminalTextBuffer { <borrowed> }"),
        };
        result
    }
}

impl TerminalTextBuffer {
    /// Create a `width` x `height` buffer keeping up to `max_history`
    /// scrolled-off lines (0 keeps an unbounded history)
    pub fn new(width: usize, height: usize, max_history: usize) -> Self {
        Self {
            state: ReentrantMutex::new(RefCell::new(BufferState::new(width, height, max_history))),
        }
    }

    /// Create a buffer ready to be shared between threads
    pub fn shared(width: usize, height: usize, max_history: usize) -> Arc<Self> {
        Arc::new(Self::new(width, height, max_history))
    }

    /// Acquire the buffer lock.
    ///
    /// The lock is reentrant: the holder may call any other method,
    /// which relocks. It is released when the guard drops, unwinding included.
    pub fn lock(&self) -> BufferLock<'_> {
        self.state.lock()
    }

    /// Run `f` with mutable access to the state.
    ///
    /// Calling `modify` or `read` from inside `f` is a bug and panics.
    pub fn modify<R>(&self, f: impl FnOnce(&mut BufferState) -> R) -> R {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        f(&mut state)
    }

    /// Run `f` with shared access to the state
    pub fn read<R>(&self, f: impl FnOnce(&BufferState) -> R) -> R {
        let guard = self.state.lock();
        let state = guard.borrow();
        f(&state)
    }

    pub fn width(&self) -> usize {
        self.read(BufferState::width)
    }

    pub fn height(&self) -> usize {
        self.read(BufferState::height)
    }

    pub fn is_using_alternate(&self) -> bool {
        self.read(BufferState::is_using_alternate)
    }

    pub fn history_lines_count(&self) -> usize {
        self.read(BufferState::history_lines_count)
    }

    /// Copy of the line at `index` (negative = history, out of range = empty)
    pub fn get_line(&self, index: isize) -> TerminalLine {
        self.read(|state| state.get_line(index))
    }

    pub fn line_text(&self, index: isize) -> String {
        self.read(|state| state.line_text(index))
    }

    pub fn screen_lines_text(&self) -> Vec<String> {
        self.read(BufferState::screen_lines_text)
    }

    pub fn write_string(&self, x: usize, y: usize, text: &str, style: &Arc<TextStyle>) {
        let chars: Vec<char> = text.chars().collect();
        self.modify(|state| state.write_string(x, y, &chars, style));
    }

    pub fn insert_lines(&self, y: usize, count: usize, bottom: usize) {
        self.modify(|state| state.insert_lines(y, count, bottom, &empty_style()));
    }

    pub fn delete_lines(&self, y: usize, count: usize, bottom: usize) {
        self.modify(|state| state.delete_lines(y, count, bottom, &empty_style()));
    }

    pub fn scroll_up(&self, top: usize, bottom: usize, count: usize) {
        self.modify(|state| state.scroll_up(top, bottom, count, &empty_style()));
    }

    pub fn scroll_down(&self, top: usize, bottom: usize, count: usize) {
        self.modify(|state| state.scroll_down(top, bottom, count, &empty_style()));
    }

    pub fn clear_screen(&self) {
        self.modify(|state| state.clear_screen(&empty_style()));
    }

    pub fn clear_history(&self) {
        self.modify(BufferState::clear_history);
    }

    /// Clear both the screen and the history
    pub fn clear_all(&self) {
        self.modify(|state| {
            state.clear_screen(&empty_style());
            state.clear_history();
        });
    }

    pub fn use_alternate(&self, enabled: bool) {
        self.modify(|state| state.use_alternate(enabled));
    }

    /// Resize and return the new row of `cursor_y`
    pub fn resize(&self, width: usize, height: usize, cursor_y: usize) -> usize {
        self.modify(|state| state.resize(width, height, cursor_y))
    }

    /// Resize, also tracking `inactive_y` on the inactive screen
    pub fn resize_screens(&self, width: usize, height: usize, cursor_y: usize, inactive_y: usize) -> (usize, usize) {
        self.modify(|state| state.resize_screens(width, height, cursor_y, inactive_y))
    }

    /// Incremental snapshot of the active screen and history
    pub fn create_snapshot(&self) -> VersionedBufferSnapshot {
        self.modify(|state| state.snapshot(SnapshotMode::Incremental))
    }

    /// Snapshot copying every line, bypassing the cache
    pub fn create_full_snapshot(&self) -> VersionedBufferSnapshot {
        self.modify(|state| state.snapshot(SnapshotMode::FullCopy))
    }

    pub fn snapshot_stats(&self) -> SnapshotStats {
        self.read(|state| state.snapshots.stats())
    }
}
