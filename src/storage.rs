//! Line storages for the screen and the scrollback history
//!
//! Two implementations of [`LinesStorage`]:
//! - [`UnboundedLinesStorage`] grows freely until its capacity is lowered
//! - [`CyclicLinesStorage`] is a ring that silently drops the oldest line
//!   once it is full
//!
//! Index 0 is always the oldest (topmost) line.

use std::collections::VecDeque;

use crate::line::{LineId, TerminalLine};

/// Default maximum scrollback lines
pub const DEFAULT_HISTORY_SIZE: usize = 10000;

/// An ordered collection of lines
pub trait LinesStorage: Send {
    /// Number of lines currently stored
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of lines kept, `None` if unbounded
    fn capacity(&self) -> Option<usize>;

    fn get(&self, index: usize) -> Option<&TerminalLine>;

    fn get_mut(&mut self, index: usize) -> Option<&mut TerminalLine>;

    /// Append below the last line. Returns the line evicted to make room.
    fn add_to_bottom(&mut self, line: TerminalLine) -> Option<TerminalLine>;

    /// Insert above the first line. Returns the line evicted to make room.
    fn add_to_top(&mut self, line: TerminalLine) -> Option<TerminalLine>;

    /// Remove up to `count` lines from the top, oldest first
    fn remove_from_top(&mut self, count: usize) -> Vec<TerminalLine>;

    /// Remove up to `count` lines from the bottom, in top-to-bottom order
    fn remove_from_bottom(&mut self, count: usize) -> Vec<TerminalLine>;

    /// Insert at `index` (clamped to the end)
    fn insert(&mut self, index: usize, line: TerminalLine) -> Option<TerminalLine>;

    fn remove(&mut self, index: usize) -> Option<TerminalLine>;

    fn clear(&mut self);

    /// Change the capacity, dropping the oldest lines that no longer fit
    fn set_capacity(&mut self, capacity: usize) -> Vec<TerminalLine>;

    fn iter(&self) -> Box<dyn Iterator<Item = &TerminalLine> + '_>;

    /// Ids of every stored line, oldest first
    fn line_ids(&self) -> Vec<LineId> {
        self.iter().map(TerminalLine::id).collect()
    }

    /// Text of every line, oldest first
    fn line_texts(&self) -> Vec<String> {
        self.iter().map(TerminalLine::text).collect()
    }
}

/// Storage without a fixed bound, backed by a `VecDeque`
#[derive(Debug, Default, Clone)]
pub struct UnboundedLinesStorage {
    lines: VecDeque<TerminalLine>,
}

impl UnboundedLinesStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LinesStorage for UnboundedLinesStorage {
    fn len(&self) -> usize {
        self.lines.len()
    }

    fn capacity(&self) -> Option<usize> {
        None
    }

    fn get(&self, index: usize) -> Option<&TerminalLine> {
        self.lines.get(index)
    }

    fn get_mut(&mut self, index: usize) -> Option<&mut TerminalLine> {
        self.lines.get_mut(index)
    }

    fn add_to_bottom(&mut self, line: TerminalLine) -> Option<TerminalLine> {
        self.lines.push_back(line);
        None
    }

    fn add_to_top(&mut self, line: TerminalLine) -> Option<TerminalLine> {
        self.lines.push_front(line);
        None
    }

    fn remove_from_top(&mut self, count: usize) -> Vec<TerminalLine> {
        let count = count.min(self.lines.len());
        self.lines.drain(..count).collect()
    }

    fn remove_from_bottom(&mut self, count: usize) -> Vec<TerminalLine> {
        let start = self.lines.len() - count.min(self.lines.len());
        self.lines.drain(start..).collect()
    }

    fn insert(&mut self, index: usize, line: TerminalLine) -> Option<TerminalLine> {
        let index = index.min(self.lines.len());
        self.lines.insert(index, line);
        None
    }

    fn remove(&mut self, index: usize) -> Option<TerminalLine> {
        self.lines.remove(index)
    }

    fn clear(&mut self) {
        self.lines.clear();
    }

    fn set_capacity(&mut self, capacity: usize) -> Vec<TerminalLine> {
        let excess = self.lines.len().saturating_sub(capacity);
        self.remove_from_top(excess)
    }

    fn iter(&self) -> Box<dyn Iterator<Item = &TerminalLine> + '_> {
        Box::new(self.lines.iter())
    }
}

/// Fixed-capacity ring of lines
#[derive(Debug, Clone)]
pub struct CyclicLinesStorage {
    lines: VecDeque<TerminalLine>,
    capacity: usize,
}

impl CyclicLinesStorage {
    /// Create a ring holding at most `capacity` lines
    pub fn new(capacity: usize) -> Self {
        Self {
            // Don't pre-allocate too much
            lines: VecDeque::with_capacity(capacity.min(1000)),
            capacity,
        }
    }
}

impl LinesStorage for CyclicLinesStorage {
    fn len(&self) -> usize {
        self.lines.len()
    }

    fn capacity(&self) -> Option<usize> {
        Some(self.capacity)
    }

    fn get(&self, index: usize) -> Option<&TerminalLine> {
        self.lines.get(index)
    }

    fn get_mut(&mut self, index: usize) -> Option<&mut TerminalLine> {
        self.lines.get_mut(index)
    }

    fn add_to_bottom(&mut self, line: TerminalLine) -> Option<TerminalLine> {
        if self.capacity == 0 {
            return Some(line);
        }
        let evicted = if self.lines.len() >= self.capacity {
            self.lines.pop_front()
        } else {
            None
        };
        self.lines.push_back(line);
        evicted
    }

    fn add_to_top(&mut self, line: TerminalLine) -> Option<TerminalLine> {
        // A full ring only holds newer lines, so the incoming top line is the one dropped
        if self.lines.len() >= self.capacity {
            return Some(line);
        }
        self.lines.push_front(line);
        None
    }

    fn remove_from_top(&mut self, count: usize) -> Vec<TerminalLine> {
        let count = count.min(self.lines.len());
        self.lines.drain(..count).collect()
    }

    fn remove_from_bottom(&mut self, count: usize) -> Vec<TerminalLine> {
        let start = self.lines.len() - count.min(self.lines.len());
        self.lines.drain(start..).collect()
    }

    fn insert(&mut self, index: usize, line: TerminalLine) -> Option<TerminalLine> {
        if self.capacity == 0 {
            return Some(line);
        }
        let index = index.min(self.lines.len());
        self.lines.insert(index, line);
        if self.lines.len() > self.capacity {
            return self.lines.pop_front();
        }
        None
    }

    fn remove(&mut self, index: usize) -> Option<TerminalLine> {
        self.lines.remove(index)
    }

    fn clear(&mut self) {
        self.lines.clear();
    }

    fn set_capacity(&mut self, capacity: usize) -> Vec<TerminalLine> {
        self.capacity = capacity;
        let excess = self.lines.len().saturating_sub(capacity);
        self.remove_from_top(excess)
    }

    fn iter(&self) -> Box<dyn Iterator<Item = &TerminalLine> + '_> {
        Box::new(self.lines.iter())
    }
}

/// Create a history storage: cyclic when `max_lines > 0`, unbounded otherwise
pub fn history_storage(max_lines: usize) -> Box<dyn LinesStorage> {
    if max_lines == 0 {
        Box::new(UnboundedLinesStorage::new())
    } else {
        Box::new(CyclicLinesStorage::new(max_lines))
    }
}
