//! Cursor state
//!
//! The cursor tracks the position, the pending-wrap flag and the shape. The
//! saved copy taken by DECSC also carries the pen style, the character sets
//! and the two modes that VT terminals restore with it.

use serde::{Deserialize, Serialize};

use crate::charset::CharsetState;
use crate::style::TextStyle;

/// Cursor shape (DECSCUSR)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CursorShape {
    #[default]
    Block,
    Underline,
    Bar,
}

impl CursorShape {
    /// Shape and blink flag for a DECSCUSR parameter
    pub fn from_decscusr(param: u16) -> Option<(CursorShape, bool)> {
        match param {
            0 | 1 => Some((CursorShape::Block, true)),
            2 => Some((CursorShape::Block, false)),
            3 => Some((CursorShape::Underline, true)),
            4 => Some((CursorShape::Underline, false)),
            5 => Some((CursorShape::Bar, true)),
            6 => Some((CursorShape::Bar, false)),
            _ => None,
        }
    }
}

/// Cursor position and appearance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    /// Column (0-indexed)
    pub col: usize,
    /// Row (0-indexed)
    pub row: usize,
    /// The last column was written; the next printable character wraps first
    pub pending_wrap: bool,
    pub shape: CursorShape,
    pub blinking: bool,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            col: 0,
            row: 0,
            pending_wrap: false,
            shape: CursorShape::Block,
            blinking: true,
        }
    }
}

/// State saved by DECSC and restored by DECRC
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedCursor {
    pub col: usize,
    pub row: usize,
    pub style: TextStyle,
    pub charsets: CharsetState,
    pub origin_mode: bool,
    pub autowrap: bool,
}

impl Default for SavedCursor {
    fn default() -> Self {
        Self {
            col: 0,
            row: 0,
            style: TextStyle::EMPTY,
            charsets: CharsetState::default(),
            origin_mode: false,
            autowrap: true,
        }
    }
}

impl Cursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move up by `n` rows, not past `top` when starting at or below it
    pub fn move_up(&mut self, n: usize, top: usize) {
        let floor = if self.row >= top { top } else { 0 };
        self.row = self.row.saturating_sub(n).max(floor);
        self.pending_wrap = false;
    }

    /// Move down by `n` rows, not past `bottom` (inclusive)
    pub fn move_down(&mut self, n: usize, bottom: usize) {
        self.row = (self.row + n).min(bottom.max(self.row));
        self.pending_wrap = false;
    }

    /// Move left by `n` columns, stopping at column 0
    pub fn move_left(&mut self, n: usize) {
        self.col = self.col.saturating_sub(n);
        self.pending_wrap = false;
    }

    /// Move right by `n` columns, stopping at the last column
    pub fn move_right(&mut self, n: usize, cols: usize) {
        self.col = (self.col + n).min(cols.saturating_sub(1));
        self.pending_wrap = false;
    }

    /// Move to column `col` (0-indexed), clamped
    pub fn set_col(&mut self, col: usize, cols: usize) {
        self.col = col.min(cols.saturating_sub(1));
        self.pending_wrap = false;
    }

    /// Carriage return - move to column 0
    pub fn carriage_return(&mut self) {
        self.col = 0;
        self.pending_wrap = false;
    }

    /// Clamp into a `cols` x `rows` screen
    pub fn clamp(&mut self, cols: usize, rows: usize) {
        self.col = self.col.min(cols.saturating_sub(1));
        self.row = self.row.min(rows.saturating_sub(1));
        self.pending_wrap = false;
    }

    /// Reset position and appearance
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
