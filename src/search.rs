//! Substring search over snapshots
//!
//! [`SubstringFinder`] is a Rabin-Karp matcher: a polynomial rolling hash
//! (base 31) slides over the text and every hash hit is verified character
//! by character. Matches may overlap.

use serde::Serialize;

use crate::line::DWC;
use crate::snapshot::VersionedBufferSnapshot;

const BASE: u64 = 31;

/// A match in buffer coordinates, columns in cells with the end exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SearchMatch {
    /// Row index, negative for history
    pub row: isize,
    pub start_column: usize,
    pub end_column: usize,
}

/// Rolling-hash substring matcher for one pattern
#[derive(Debug, Clone)]
pub struct SubstringFinder {
    pattern: Vec<char>,
    pattern_hash: u64,
    /// BASE^(len - 1), for removing the character leaving the window
    power: u64,
    ignore_case: bool,
}

fn fold(c: char, ignore_case: bool) -> char {
    if ignore_case {
        c.to_lowercase().next().unwrap_or(c)
    } else {
        c
    }
}

impl SubstringFinder {
    pub fn new(pattern: &str, ignore_case: bool) -> Self {
        let pattern: Vec<char> = pattern.chars().map(|c| fold(c, ignore_case)).collect();
        let pattern_hash = pattern
            .iter()
            .fold(0u64, |hash, &c| hash.wrapping_mul(BASE).wrapping_add(c as u64));
        let power = (1..pattern.len()).fold(1u64, |p, _| p.wrapping_mul(BASE));
        Self {
            pattern,
            pattern_hash,
            power,
            ignore_case,
        }
    }

    pub fn pattern_len(&self) -> usize {
        self.pattern.len()
    }

    pub fn ignore_case(&self) -> bool {
        self.ignore_case
    }

    /// Start index of every occurrence in `text`, overlapping ones included
    pub fn find_all(&self, text: &[char]) -> Vec<usize> {
        let m = self.pattern.len();
        if m == 0 || text.len() < m {
            return Vec::new();
        }
        let key = |c: char| fold(c, self.ignore_case) as u64;

        let mut hash = text[..m]
            .iter()
            .fold(0u64, |hash, &c| hash.wrapping_mul(BASE).wrapping_add(key(c)));
        let mut found = Vec::new();
        for start in 0..=text.len() - m {
            if start > 0 {
                let leaving = key(text[start - 1]).wrapping_mul(self.power);
                hash = hash
                    .wrapping_sub(leaving)
                    .wrapping_mul(BASE)
                    .wrapping_add(key(text[start + m - 1]));
            }
            if hash == self.pattern_hash && self.verify(&text[start..start + m]) {
                found.push(start);
            }
        }
        found
    }

    /// Like [`find_all`](Self::find_all) on a string, indices in chars
    pub fn find_in_str(&self, text: &str) -> Vec<usize> {
        let chars: Vec<char> = text.chars().collect();
        self.find_all(&chars)
    }

    fn verify(&self, window: &[char]) -> bool {
        window
            .iter()
            .zip(&self.pattern)
            .all(|(&c, &p)| fold(c, self.ignore_case) == p)
    }
}

/// Search every history line (oldest first) then every screen line
pub fn find_in_snapshot(snapshot: &VersionedBufferSnapshot, pattern: &str, ignore_case: bool) -> Vec<SearchMatch> {
    let finder = SubstringFinder::new(pattern, ignore_case);
    if finder.pattern_len() == 0 {
        return Vec::new();
    }

    let history = snapshot.history_lines_count() as isize;
    let rows = (-history..0).chain(0..snapshot.height() as isize);
    let mut matches = Vec::new();
    for row in rows {
        let line = snapshot.get_line(row);
        // Searchable characters with the cell column each one starts at
        let (columns, chars): (Vec<usize>, Vec<char>) = (0..line.len())
            .map(|x| (x, line.char_at(x)))
            .filter(|&(_, c)| c != DWC)
            .unzip();
        for start in finder.find_all(&chars) {
            let last = start + finder.pattern_len() - 1;
            let end_column = columns.get(last + 1).copied().unwrap_or(line.len());
            matches.push(SearchMatch {
                row,
                start_column: columns[start],
                end_column,
            });
        }
    }
    log::trace!("search for {:?} found {} matches", pattern, matches.len());
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::TerminalTextBuffer;
    use crate::style::TextStyle;
    use std::sync::Arc;

    #[test]
    fn test_overlapping_matches() {
        let finder = SubstringFinder::new("aaa", false);
        assert_eq!(finder.find_in_str("aaaa"), vec![0, 1]);
    }

    #[test]
    fn test_case_insensitive() {
        let finder = SubstringFinder::new("HeLLo", true);
        assert_eq!(finder.find_in_str("hello HELLO hElLo"), vec![0, 6, 12]);
        assert!(SubstringFinder::new("HeLLo", false).find_in_str("hello").is_empty());
    }

    #[test]
    fn test_empty_and_long_patterns() {
        assert!(SubstringFinder::new("", false).find_in_str("abc").is_empty());
        assert!(SubstringFinder::new("abcd", false).find_in_str("abc").is_empty());
    }

    #[test]
    fn test_combining_sequences_are_opaque() {
        let finder = SubstringFinder::new("e\u{301}", false);
        assert_eq!(finder.find_in_str("cafe\u{301} e"), vec![3]);
    }

    #[test]
    fn test_find_in_snapshot_history_then_screen() {
        let buffer = TerminalTextBuffer::new(20, 2, 100);
        let style = Arc::new(TextStyle::EMPTY);
        buffer.write_string(0, 0, "error one", &style);
        buffer.scroll_up(0, 2, 1);
        buffer.write_string(0, 1, "no Error here", &style);
        let snapshot = buffer.create_snapshot();

        let matches = find_in_snapshot(&snapshot, "error", true);
        assert_eq!(
            matches,
            vec![
                SearchMatch {
                    row: -1,
                    start_column: 0,
                    end_column: 5,
                },
                SearchMatch {
                    row: 1,
                    start_column: 3,
                    end_column: 8,
                },
            ]
        );
        assert_eq!(find_in_snapshot(&snapshot, "error", false).len(), 1);
    }

    #[test]
    fn test_find_columns_account_for_wide_chars() {
        let buffer = TerminalTextBuffer::new(20, 1, 0);
        let style = Arc::new(TextStyle::EMPTY);
        let chars = ['中', DWC, 'a', 'b'];
        buffer.modify(|state| state.write_string(0, 0, &chars, &style));
        let matches = find_in_snapshot(&buffer.create_snapshot(), "中a", false);
        assert_eq!(
            matches,
            vec![SearchMatch {
                row: 0,
                start_column: 0,
                end_column: 3,
            }]
        );
    }
}
