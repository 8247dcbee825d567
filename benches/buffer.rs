//! Text buffer and snapshot benchmarks

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mochi_vtcore::{find_in_snapshot, TerminalTextBuffer, TextStyle};

fn filled_buffer() -> TerminalTextBuffer {
    let buffer = TerminalTextBuffer::new(120, 40, 5000);
    let style = Arc::new(TextStyle::EMPTY);
    for i in 0..2000 {
        buffer.write_string(0, 39, &format!("line {:05} lorem ipsum dolor sit amet", i), &style);
        buffer.scroll_up(0, 40, 1);
    }
    buffer
}

fn bench_scroll(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer");

    group.bench_function("scroll_into_history", |b| b.iter(|| black_box(filled_buffer())));

    group.finish();
}

fn bench_snapshots(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer");

    let buffer = filled_buffer();
    let style = Arc::new(TextStyle::EMPTY);
    // Prime the cache
    buffer.create_snapshot();

    group.bench_function("incremental_snapshot_one_line_changed", |b| {
        b.iter(|| {
            buffer.write_string(0, 0, "changed", &style);
            black_box(buffer.create_snapshot())
        })
    });
    group.bench_function("full_snapshot", |b| b.iter(|| black_box(buffer.create_full_snapshot())));

    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer");

    let snapshot = filled_buffer().create_snapshot();
    group.bench_function("search_history", |b| {
        b.iter(|| black_box(find_in_snapshot(&snapshot, "Dolor", true)))
    });

    group.finish();
}

criterion_group!(benches, bench_scroll, bench_snapshots, bench_search);
criterion_main!(benches);
