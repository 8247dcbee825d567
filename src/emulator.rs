//! Emulator loop
//!
//! The emulator pulls characters from a [`DataStream`], recognizes controls,
//! escape sequences and runs of printable text, and applies them to a
//! [`Terminal`]. Each logical unit (one control, one sequence or one run of
//! text) is read in full first and then applied while holding the buffer
//! lock, so a snapshot never observes a half-applied unit and never waits on
//! input that has not arrived.

use crate::error::{SequenceError, StreamError};
use crate::sequence::{ControlSequence, DeviceControlSequence, SystemCommandSequence};
use crate::stream::{is_control, ArrayDataStream, DataStream};
use crate::sync_output::SynchronizedOutput;
use crate::terminal::Terminal;

/// Where the emulator is in the input grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParserState {
    #[default]
    Ground,
    Escape,
    CsiEntry,
    OscString,
    DcsString,
    /// Capturing a synchronized output block
    SyncOutput,
}

/// Drives a [`Terminal`] from a character stream
pub struct Emulator<S: DataStream> {
    stream: S,
    terminal: Terminal,
    state: ParserState,
    sync: SynchronizedOutput,
}

impl<S: DataStream> std::fmt::Debug for Emulator<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emulator")
            .field("state", &self.state)
            .field("terminal", &self.terminal)
            .finish()
    }
}

impl<S: DataStream> Emulator<S> {
    pub fn new(stream: S, terminal: Terminal) -> Self {
        Self {
            stream,
            terminal,
            state: ParserState::Ground,
            sync: SynchronizedOutput::default(),
        }
    }

    /// Use different limits for synchronized output blocks
    pub fn with_sync_output(mut self, sync: SynchronizedOutput) -> Self {
        self.sync = sync;
        self
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    pub fn terminal(&self) -> &Terminal {
        &self.terminal
    }

    pub fn terminal_mut(&mut self) -> &mut Terminal {
        &mut self.terminal
    }

    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    pub fn into_terminal(self) -> Terminal {
        self.terminal
    }

    /// True while the stream has something to read
    pub fn has_next(&mut self) -> bool {
        !self.stream.is_empty()
    }

    /// Process one logical unit of input
    pub fn next(&mut self) -> Result<(), StreamError> {
        if self.state == ParserState::SyncOutput {
            return self.synchronize();
        }
        let c = self.stream.get_char()?;
        self.dispatch(c)
    }

    /// Process until the stream ends.
    ///
    /// End of stream is a normal finish; any other stream error is returned.
    pub fn run(&mut self) -> Result<(), StreamError> {
        loop {
            match self.next() {
                Ok(()) => {},
                Err(err) if err.is_end_of_stream() => return Ok(()),
                Err(err) => return Err(err),
            }
        }
    }

    /// Process `c` as if it had just been read from the stream
    pub fn process_char(&mut self, c: char) -> Result<(), StreamError> {
        self.dispatch(c)
    }

    /// Read the whole unit starting at `c`, then apply it under the lock.
    ///
    /// Reading may wait for more input, so it happens before locking.
    fn dispatch(&mut self, c: char) -> Result<(), StreamError> {
        let room = self.terminal.distance_to_line_end();
        let unit = match read_unit(&mut self.stream, &mut self.state, c, room) {
            Ok(unit) => unit,
            Err(SequenceError::Stream(err)) => {
                self.state = ParserState::Ground;
                return Err(err);
            },
            Err(err) => {
                log::warn!("Discarding sequence: {}", err);
                Unit::Skip
            },
        };
        self.state = ParserState::Ground;

        let buffer = self.terminal.buffer().clone();
        let begins_sync = {
            let _guard = buffer.lock();
            apply(&mut self.terminal, &unit)
        };
        self.terminal.content_changed();
        if begins_sync {
            self.state = ParserState::SyncOutput;
        }
        Ok(())
    }

    /// Capture a synchronized block, then replay it in one locked pass.
    ///
    /// The replay reads only the captured characters, so it never waits on
    /// the stream. A sequence cut off by an aborted capture is handed back
    /// to the stream and finished after the lock is released.
    fn synchronize(&mut self) -> Result<(), StreamError> {
        let capture = self.sync.capture(&mut self.stream);
        self.state = ParserState::Ground;

        let total = capture.chars.len();
        let mut replay = ArrayDataStream::from_chars(&capture.chars, 0, total);
        let mut unfinished = None;

        let buffer = self.terminal.buffer().clone();
        {
            let _guard = buffer.lock();
            loop {
                let start = total - replay.remaining();
                let Ok(c) = replay.get_char() else {
                    break;
                };
                let room = self.terminal.distance_to_line_end();
                match read_unit(&mut replay, &mut self.state, c, room) {
                    Ok(unit) => {
                        apply(&mut self.terminal, &unit);
                    },
                    Err(SequenceError::Unterminated) => {
                        unfinished = Some(start);
                        break;
                    },
                    Err(err) => log::warn!("Discarding sequence in synchronized block: {}", err),
                }
            }
            self.state = ParserState::Ground;
            self.terminal.end_synchronized_output();
        }
        self.terminal.content_changed();

        if let Some(start) = unfinished {
            let rest = &capture.chars[start..];
            log::trace!("{} chars of an unfinished sequence returned to the stream", rest.len());
            self.stream.push_back_buffer(rest, rest.len());
        }
        match capture.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// One parsed unit of input, ready to apply
#[derive(Debug)]
enum Unit {
    Text(String),
    Control(char),
    Esc {
        intermediate: Option<char>,
        final_char: char,
    },
    Csi(ControlSequence),
    Osc(SystemCommandSequence),
    Dcs(DeviceControlSequence),
    Skip,
}

/// Read the unit that starts with `c`.
///
/// Malformed sequences come back as [`Unit::Skip`]. An unterminated sequence
/// or a stream failure is returned as the error.
fn read_unit<D: DataStream + ?Sized>(
    stream: &mut D,
    state: &mut ParserState,
    c: char,
    room: usize,
) -> Result<Unit, SequenceError> {
    match c {
        '\x1b' => read_escape(stream, state),
        '\u{9b}' => read_csi(stream, state),
        '\u{9d}' => read_osc(stream, state),
        '\u{90}' => read_dcs(stream, state),
        '\x7f' => Ok(Unit::Skip),
        c if is_control(c) => Ok(Unit::Control(c)),
        '\u{80}'..='\u{9f}' => {
            log::debug!("Unhandled C1 control: U+{:04X}", c as u32);
            Ok(Unit::Skip)
        },
        _ => {
            // Printable run: batch up to the end of the line
            stream.push_char(c);
            let text = stream.read_non_control_characters(room)?;
            if text.is_empty() {
                Ok(Unit::Text(stream.get_char()?.to_string()))
            } else {
                Ok(Unit::Text(text))
            }
        },
    }
}

fn read_escape<D: DataStream + ?Sized>(stream: &mut D, state: &mut ParserState) -> Result<Unit, SequenceError> {
    *state = ParserState::Escape;
    let c = stream.get_char()?;
    match c {
        '[' => read_csi(stream, state),
        ']' => read_osc(stream, state),
        'P' => read_dcs(stream, state),
        '#' | '(' | ')' | '*' | '+' | '-' | '.' | '/' | ' ' | '%' => Ok(Unit::Esc {
            intermediate: Some(c),
            final_char: stream.get_char()?,
        }),
        c if is_control(c) => {
            // The escape is cancelled; the control is handled on its own
            stream.push_char(c);
            Ok(Unit::Skip)
        },
        _ => Ok(Unit::Esc {
            intermediate: None,
            final_char: c,
        }),
    }
}

fn read_csi<D: DataStream + ?Sized>(stream: &mut D, state: &mut ParserState) -> Result<Unit, SequenceError> {
    *state = ParserState::CsiEntry;
    Ok(discard_malformed(ControlSequence::read(stream))?.map_or(Unit::Skip, Unit::Csi))
}

fn read_osc<D: DataStream + ?Sized>(stream: &mut D, state: &mut ParserState) -> Result<Unit, SequenceError> {
    *state = ParserState::OscString;
    Ok(discard_malformed(SystemCommandSequence::read(stream))?.map_or(Unit::Skip, Unit::Osc))
}

fn read_dcs<D: DataStream + ?Sized>(stream: &mut D, state: &mut ParserState) -> Result<Unit, SequenceError> {
    *state = ParserState::DcsString;
    Ok(discard_malformed(DeviceControlSequence::read(stream))?.map_or(Unit::Skip, Unit::Dcs))
}

/// Malformed sequences are dropped; running out of input is passed on
fn discard_malformed<T>(result: Result<T, SequenceError>) -> Result<Option<T>, SequenceError> {
    match result {
        Ok(seq) => Ok(Some(seq)),
        Err(err @ (SequenceError::Unterminated | SequenceError::Stream(_))) => Err(err),
        Err(err) => {
            log::warn!("Discarding malformed sequence: {}", err);
            Ok(None)
        },
    }
}

/// Apply a unit to the terminal. Returns true if it opened a synchronized block.
fn apply(terminal: &mut Terminal, unit: &Unit) -> bool {
    match unit {
        Unit::Text(text) => terminal.write_characters(text),
        Unit::Control(c) => terminal.handle_control(*c),
        Unit::Esc {
            intermediate,
            final_char,
        } => terminal.handle_esc(*intermediate, *final_char),
        Unit::Csi(csi) => {
            for &control in csi.controls() {
                terminal.handle_control(control);
            }
            terminal.handle_csi(csi);
            return begins_synchronized_output(csi);
        },
        Unit::Osc(osc) => terminal.handle_osc(osc),
        Unit::Dcs(dcs) => terminal.handle_dcs(dcs),
        Unit::Skip => {},
    }
    false
}

fn begins_synchronized_output(csi: &ControlSequence) -> bool {
    csi.prefix() == Some('?')
        && csi.intermediates().is_empty()
        && csi.final_char() == 'h'
        && csi.params().contains(&2026)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::TerminalTextBuffer;
    use crate::stream::ArrayDataStream;

    fn emulator(input: &str) -> Emulator<ArrayDataStream> {
        let terminal = Terminal::new(TerminalTextBuffer::shared(20, 4, 100));
        Emulator::new(ArrayDataStream::new(input), terminal)
    }

    fn screen<S: DataStream>(emulator: &Emulator<S>) -> Vec<String> {
        emulator.terminal().buffer().screen_lines_text()
    }

    #[test]
    fn test_run_to_end_of_stream() {
        let mut emu = emulator("Hello\r\nWorld");
        assert!(emu.has_next());
        emu.run().unwrap();
        assert!(!emu.has_next());
        assert_eq!(screen(&emu)[..2], ["Hello".to_string(), "World".to_string()]);
    }

    #[test]
    fn test_next_processes_one_unit() {
        let mut emu = emulator("ab\x1b[31mc");
        emu.next().unwrap();
        assert_eq!(screen(&emu)[0], "ab");
        emu.next().unwrap();
        assert_eq!(emu.state(), ParserState::Ground);
        emu.next().unwrap();
        assert_eq!(screen(&emu)[0], "abc");
        assert!(emu.next().unwrap_err().is_end_of_stream());
    }

    #[test]
    fn test_text_batches_stop_at_line_end() {
        let mut emu = emulator("0123456789012345678901234");
        emu.next().unwrap();
        assert_eq!(screen(&emu)[0], "01234567890123456789");
        assert!(emu.terminal().cursor().pending_wrap);
        emu.next().unwrap();
        assert_eq!(screen(&emu)[1], "01234");
    }

    #[test]
    fn test_c1_introducers() {
        let mut emu = emulator("\u{9b}2;3HX\u{9d}2;c1 title\u{9c}");
        emu.run().unwrap();
        assert_eq!(screen(&emu)[1], "  X");
        assert_eq!(emu.terminal().window_title(), "c1 title");
    }

    #[test]
    fn test_controls_inside_csi_run_first() {
        let mut emu = emulator("abc\x1b[1\rC");
        emu.run().unwrap();
        assert_eq!(emu.terminal().cursor().col, 1);
    }

    #[test]
    fn test_malformed_csi_is_dropped() {
        let mut emu = emulator("a\x1b[1\u{e9}2Hb");
        emu.run().unwrap();
        assert_eq!(screen(&emu)[0], "ab");
    }

    #[test]
    fn test_overlong_csi_is_dropped() {
        let mut emu = emulator(&format!("\x1b[{}mX", ";".repeat(300)));
        emu.run().unwrap();
        assert_eq!(screen(&emu)[0], "X");
    }

    #[test]
    fn test_cancelled_sequence() {
        let mut emu = emulator("a\x1b[12\x18b");
        emu.run().unwrap();
        assert_eq!(screen(&emu)[0], "ab");
    }

    #[test]
    fn test_unterminated_osc_at_end() {
        let mut emu = emulator("x\x1b]2;never ends");
        emu.run().unwrap();
        assert_eq!(screen(&emu)[0], "x");
        assert_eq!(emu.terminal().window_title(), "");
    }

    #[test]
    fn test_escape_cancelled_by_control() {
        let mut emu = emulator("ab\x1b\rc");
        emu.run().unwrap();
        assert_eq!(screen(&emu)[0], "cb");
    }

    #[test]
    fn test_process_char() {
        let mut emu = emulator("");
        emu.process_char('x').unwrap();
        emu.process_char('\n').unwrap();
        assert_eq!(emu.terminal().cursor_position(), (1, 2));
        assert_eq!(screen(&emu)[0], "x");
    }

    #[test]
    fn test_sync_output_state() {
        let mut emu = emulator("\x1b[?2026hab\x1b[?2026lc");
        emu.next().unwrap();
        assert_eq!(emu.state(), ParserState::SyncOutput);
        assert!(emu.terminal().modes().synchronized_output);
        emu.next().unwrap();
        assert_eq!(emu.state(), ParserState::Ground);
        assert!(!emu.terminal().modes().synchronized_output);
        assert_eq!(screen(&emu)[0], "ab");
        emu.run().unwrap();
        assert_eq!(screen(&emu)[0], "abc");
    }

    #[test]
    fn test_unfinished_sequence_in_block_goes_back_to_stream() {
        let terminal = Terminal::new(TerminalTextBuffer::shared(20, 4, 100));
        let sync = SynchronizedOutput::new(std::time::Duration::from_secs(5), 3);
        let mut emu = Emulator::new(ArrayDataStream::new("\x1b[?2026hab\x1b[1mc"), terminal).with_sync_output(sync);
        emu.next().unwrap();
        emu.next().unwrap();
        assert_eq!(screen(&emu)[0], "ab");
        assert_eq!(emu.stream_mut().remaining(), 5);
        emu.run().unwrap();
        assert_eq!(screen(&emu)[0], "abc");
        assert!(emu.terminal().pen().has(crate::style::StyleOptions::BOLD));
    }

    #[test]
    fn test_split_sequence_does_not_hold_the_lock() {
        use crate::stream::channel;
        use std::sync::mpsc;
        use std::thread;
        use std::time::Duration;

        let buffer = TerminalTextBuffer::shared(20, 4, 0);
        let (mut sender, mut stream) = channel();
        stream.set_poll_interval(Duration::from_millis(5));
        let terminal = Terminal::new(buffer.clone());
        let worker = thread::spawn(move || {
            let mut emu = Emulator::new(stream, terminal);
            emu.run().unwrap();
            emu
        });

        assert!(sender.send("x\x1b["));
        thread::sleep(Duration::from_millis(50));

        let (done_tx, done_rx) = mpsc::channel();
        let reader = buffer.clone();
        thread::spawn(move || {
            let rows = reader.create_snapshot().screen_lines_text();
            let _ = done_tx.send(rows);
        });
        let rows = done_rx
            .recv_timeout(Duration::from_secs(1))
            .expect("snapshot blocked by a half-read sequence");
        assert_eq!(rows[0], "x");

        assert!(sender.send("31my"));
        sender.close();
        let emu = worker.join().unwrap();
        assert_eq!(screen(&emu)[0], "xy");
        assert_eq!(emu.terminal().pen().foreground, crate::color::Color::Indexed(1));
    }
}
