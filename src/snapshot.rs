//! Immutable snapshots of the text buffer
//!
//! A [`VersionedBufferSnapshot`] is a point-in-time copy of the active
//! screen and history that any thread can read without locking. Snapshots
//! are built by an [`IncrementalSnapshotBuilder`] that keeps the copy of
//! every line it handed out, keyed by the line's stable id. When a line's
//! version has not moved since the last snapshot the previous copy is shared
//! instead of copied again.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};

use serde::Serialize;

use crate::line::{LineId, TerminalLine};
use crate::storage::LinesStorage;

/// A copied line together with the version it was copied at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedLine {
    pub line: Arc<TerminalLine>,
    pub version: u64,
}

fn empty_line() -> Arc<TerminalLine> {
    static EMPTY: OnceLock<Arc<TerminalLine>> = OnceLock::new();
    EMPTY.get_or_init(|| Arc::new(TerminalLine::new())).clone()
}

/// Point-in-time view of the active screen and history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedBufferSnapshot {
    screen: Vec<VersionedLine>,
    history: Vec<VersionedLine>,
    width: usize,
    height: usize,
    using_alternate: bool,
}

impl VersionedBufferSnapshot {
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

    pub fn screen_lines(&self) -> &[VersionedLine] {
        &self.screen
    }

    pub fn history_lines(&self) -> &[VersionedLine] {
        &self.history
    }

    fn entry(&self, index: isize) -> Option<&VersionedLine> {
        if index >= 0 {
            self.screen.get(index as usize)
        } else {
            let back = index.unsigned_abs();
            self.history
                .len()
                .checked_sub(back)
                .and_then(|i| self.history.get(i))
        }
    }

    /// Line at `index`: 0.. is the screen, -1 is the newest history line.
    ///
    /// Out-of-range indices give an empty line.
    pub fn get_line(&self, index: isize) -> Arc<TerminalLine> {
        self.entry(index)
            .map(|v| v.line.clone())
            .unwrap_or_else(empty_line)
    }

    /// Version the line at `index` was copied at
    pub fn get_line_version(&self, index: isize) -> Option<u64> {
        self.entry(index).map(|v| v.version)
    }

    /// Text of every screen line, top to bottom
    pub fn screen_lines_text(&self) -> Vec<String> {
        self.screen.iter().map(|v| v.line.text()).collect()
    }

    /// Text of every history line, oldest first
    pub fn history_lines_text(&self) -> Vec<String> {
        self.history.iter().map(|v| v.line.text()).collect()
    }

    /// Screen as plain text, trailing blanks trimmed, one line per row
    pub fn to_text(&self) -> String {
        self.screen
            .iter()
            .map(|v| v.line.text().trim_end().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// How a snapshot should be produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotMode {
    /// Reuse unchanged lines from the cache
    Incremental,
    /// Copy every line and leave the cache alone
    FullCopy,
}

/// Counters describing how snapshots were built
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotStats {
    pub snapshot_count: u64,
    pub full_copy_count: u64,
    pub lines_reused: u64,
    pub lines_copied: u64,
}

impl SnapshotStats {
    /// Fraction of lines that were shared rather than copied
    pub fn reuse_ratio(&self) -> f64 {
        let total = self.lines_reused + self.lines_copied;
        if total == 0 {
            0.0
        } else {
            self.lines_reused as f64 / total as f64
        }
    }
}

/// Builds snapshots, sharing copies of lines that did not change
#[derive(Debug, Default)]
pub struct IncrementalSnapshotBuilder {
    cache: HashMap<LineId, Arc<TerminalLine>>,
    last_geometry: Option<(usize, usize, bool)>,
    stats: SnapshotStats,
}

impl IncrementalSnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> SnapshotStats {
        self.stats
    }

    /// Number of lines currently cached
    pub fn cached_lines(&self) -> usize {
        self.cache.len()
    }

    /// Forget every cached copy
    pub fn invalidate(&mut self) {
        self.cache.clear();
        self.last_geometry = None;
    }

    /// Build a snapshot of `history` and `screen`.
    ///
    /// Must be called while the owning buffer's lock is held.
    pub fn build(
        &mut self,
        screen: &dyn LinesStorage,
        history: &dyn LinesStorage,
        width: usize,
        height: usize,
        using_alternate: bool,
        mode: SnapshotMode,
    ) -> VersionedBufferSnapshot {
        let geometry = (width, height, using_alternate);
        let incremental = mode == SnapshotMode::Incremental;
        let reuse = incremental && self.last_geometry == Some(geometry);
        if incremental && !reuse && !self.cache.is_empty() {
            log::debug!(
                "snapshot geometry changed {:?} -> {:?}, dropping {} cached lines",
                self.last_geometry,
                geometry,
                self.cache.len()
            );
            self.cache.clear();
        }

        let mut live: HashSet<LineId> = HashSet::with_capacity(screen.len() + history.len());
        let history_lines: Vec<VersionedLine> = history
            .iter()
            .map(|line| self.copy_line(line, reuse, incremental, &mut live))
            .collect();
        let screen_lines: Vec<VersionedLine> = screen
            .iter()
            .map(|line| self.copy_line(line, reuse, incremental, &mut live))
            .collect();

        if incremental {
            self.cache.retain(|id, _| live.contains(id));
            self.last_geometry = Some(geometry);
        }
        self.stats.snapshot_count += 1;
        if !reuse {
            self.stats.full_copy_count += 1;
        }

        VersionedBufferSnapshot {
            screen: screen_lines,
            history: history_lines,
            width,
            height,
            using_alternate,
        }
    }

    fn copy_line(
        &mut self,
        line: &TerminalLine,
        reuse: bool,
        populate: bool,
        live: &mut HashSet<LineId>,
    ) -> VersionedLine {
        live.insert(line.id());
        if reuse {
            if let Some(cached) = self.cache.get(&line.id()) {
                if cached.version() == line.version() {
                    self.stats.lines_reused += 1;
                    return VersionedLine {
                        line: cached.clone(),
                        version: line.version(),
                    };
                }
            }
        }
        self.stats.lines_copied += 1;
        let copy = Arc::new(line.clone());
        if populate {
            self.cache.insert(line.id(), copy.clone());
        }
        VersionedLine {
            line: copy,
            version: line.version(),
        }
    }
}
