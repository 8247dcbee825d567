//! Property tests over the public API

use std::sync::Arc;

use proptest::prelude::*;

use mochi_vtcore::{ArrayDataStream, Emulator, SubstringFinder, Terminal, TerminalTextBuffer, TextStyle};

#[derive(Debug, Clone)]
enum Op {
    Write { x: usize, y: usize, text: String },
    ScrollUp { top: usize, bottom: usize, count: usize },
    InsertLines { y: usize, count: usize },
    DeleteLines { y: usize, count: usize },
    ClearScreen,
    Alternate(bool),
    Resize { width: usize, height: usize },
    Snapshot,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0usize..12, 0usize..6, "[a-z ]{0,8}").prop_map(|(x, y, text)| Op::Write { x, y, text }),
        2 => (0usize..6, 0usize..7, 1usize..4).prop_map(|(top, bottom, count)| Op::ScrollUp { top, bottom, count }),
        1 => (0usize..6, 1usize..3).prop_map(|(y, count)| Op::InsertLines { y, count }),
        1 => (0usize..6, 1usize..3).prop_map(|(y, count)| Op::DeleteLines { y, count }),
        1 => Just(Op::ClearScreen),
        1 => any::<bool>().prop_map(Op::Alternate),
        1 => (2usize..12, 1usize..7).prop_map(|(width, height)| Op::Resize { width, height }),
        3 => Just(Op::Snapshot),
    ]
}

fn apply(buffer: &TerminalTextBuffer, op: &Op, style: &Arc<TextStyle>) {
    match op {
        Op::Write { x, y, text } => buffer.write_string(*x, *y, text, style),
        Op::ScrollUp { top, bottom, count } => buffer.scroll_up(*top, *bottom, *count),
        Op::InsertLines { y, count } => buffer.insert_lines(*y, *count, buffer.height()),
        Op::DeleteLines { y, count } => buffer.delete_lines(*y, *count, buffer.height()),
        Op::ClearScreen => buffer.clear_screen(),
        Op::Alternate(enabled) => buffer.use_alternate(*enabled),
        Op::Resize { width, height } => {
            buffer.resize(*width, *height, 0);
        },
        Op::Snapshot => {
            buffer.create_snapshot();
        },
    }
}

fn naive_find(text: &[char], pattern: &[char]) -> Vec<usize> {
    if pattern.is_empty() || text.len() < pattern.len() {
        return Vec::new();
    }
    (0..=text.len() - pattern.len())
        .filter(|&i| &text[i..i + pattern.len()] == pattern)
        .collect()
}

proptest! {
    #[test]
    fn incremental_snapshot_matches_full_copy(ops in prop::collection::vec(op(), 1..40)) {
        let buffer = TerminalTextBuffer::new(10, 5, 8);
        let style = Arc::new(TextStyle::EMPTY);
        for op in &ops {
            apply(&buffer, op, &style);
            let incremental = buffer.create_snapshot();
            let full = buffer.create_full_snapshot();
            prop_assert_eq!(incremental, full);
        }
    }

    #[test]
    fn rabin_karp_matches_naive_search(text in "[ab]{0,40}", pattern in "[ab]{1,4}") {
        let text: Vec<char> = text.chars().collect();
        let pattern_chars: Vec<char> = pattern.chars().collect();
        let finder = SubstringFinder::new(&pattern, false);
        prop_assert_eq!(finder.find_all(&text), naive_find(&text, &pattern_chars));
    }

    #[test]
    fn case_folding_search_matches_lowercased_naive(text in "[aAbB]{0,30}", pattern in "[aAbB]{1,3}") {
        let lower = |s: &str| s.to_lowercase().chars().collect::<Vec<char>>();
        let finder = SubstringFinder::new(&pattern, true);
        prop_assert_eq!(finder.find_in_str(&text), naive_find(&lower(&text), &lower(&pattern)));
    }

    #[test]
    fn arbitrary_input_keeps_cursor_on_screen(input in "(\x1b\\[[0-9;?]{0,6}[A-Za-z@`]|\x1b\\][0-9;a-z?]{0,8}\x07|[ -~]|\r|\n|\t|\x08|中){0,80}") {
        let terminal = Terminal::new(TerminalTextBuffer::shared(12, 4, 10));
        let mut emulator = Emulator::new(ArrayDataStream::new(&input), terminal);
        prop_assert!(emulator.run().is_ok());
        let terminal = emulator.into_terminal();
        // DECCOLM may legitimately change the width
        let snapshot = terminal.buffer().create_snapshot();
        let cursor = terminal.cursor();
        prop_assert!(cursor.col < snapshot.width());
        prop_assert!(cursor.row < snapshot.height());
        for row in 0..snapshot.height() as isize {
            prop_assert!(snapshot.get_line(row).len() <= snapshot.width());
        }
    }
}
