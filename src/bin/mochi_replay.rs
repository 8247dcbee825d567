//! Mochi replay tool
//!
//! Feeds a captured output stream through the emulator and prints the
//! resulting screen. Reads from a file or stdin.

use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;

use mochi_vtcore::{find_in_snapshot, CliArgs, Emulator, EmulatorConfig, ReaderDataStream, SearchMatch, SnapshotStats};

#[derive(Parser, Debug)]
#[command(name = "mochi-replay")]
#[command(version)]
#[command(about = "Replay captured terminal output and print the final screen", long_about = None)]
struct ReplayArgs {
    /// Input file, stdin when omitted
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(short, long)]
    json: bool,

    /// Include scrollback in the output
    #[arg(long)]
    history: bool,

    /// Report matches of this pattern (case insensitive)
    #[arg(short, long, value_name = "PATTERN")]
    search: Option<String>,

    #[command(flatten)]
    config: CliArgs,
}

#[derive(Serialize)]
struct Report {
    columns: usize,
    rows: usize,
    /// 1-based (column, row)
    cursor: (usize, usize),
    alternate_screen: bool,
    title: String,
    history: Vec<String>,
    screen: Vec<String>,
    matches: Vec<SearchMatch>,
    stats: SnapshotStats,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = ReplayArgs::parse();
    let config = match EmulatorConfig::load_with_args(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        },
    };

    let source: Box<dyn Read> = match &args.input {
        Some(path) => match File::open(path) {
            Ok(file) => Box::new(file),
            Err(e) => {
                eprintln!("Error reading file '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            },
        },
        None => Box::new(io::stdin()),
    };

    let mut emulator =
        Emulator::new(ReaderDataStream::new(source), config.create_terminal()).with_sync_output(config.sync_output());
    if let Err(e) = emulator.run() {
        eprintln!("Error reading input: {}", e);
        return ExitCode::FAILURE;
    }
    let terminal = emulator.into_terminal();

    let snapshot = terminal.buffer().create_snapshot();
    let report = Report {
        columns: snapshot.width(),
        rows: snapshot.height(),
        cursor: terminal.cursor_position(),
        alternate_screen: snapshot.is_using_alternate(),
        title: terminal.window_title().to_string(),
        history: if args.history {
            snapshot.history_lines_text()
        } else {
            Vec::new()
        },
        screen: snapshot.screen_lines_text(),
        matches: args
            .search
            .as_deref()
            .map(|pattern| find_in_snapshot(&snapshot, pattern, true))
            .unwrap_or_default(),
        stats: terminal.buffer().snapshot_stats(),
    };

    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing report: {}", e);
                return ExitCode::FAILURE;
            },
        }
        return ExitCode::SUCCESS;
    }

    println!("Terminal State ({}x{}):", report.columns, report.rows);
    println!("Cursor: ({}, {})", report.cursor.0, report.cursor.1);
    if !report.title.is_empty() {
        println!("Title: {}", report.title);
    }
    println!("---");
    for line in report.history.iter().chain(&report.screen) {
        println!("{}", line);
    }
    println!("---");
    for m in &report.matches {
        println!("match: row {} columns {}..{}", m.row, m.start_column, m.end_column);
    }
    println!(
        "snapshots: {} ({} full), lines reused {} / copied {}",
        report.stats.snapshot_count, report.stats.full_copy_count, report.stats.lines_reused, report.stats.lines_copied
    );

    ExitCode::SUCCESS
}
