//! Character sources for the emulator
//!
//! The emulator pulls characters one at a time from a [`DataStream`]. Every
//! stream supports single-character pushback and bulk pushback so a reader
//! that looked ahead can return what it did not consume.
//!
//! Three sources are provided:
//! - [`ArrayDataStream`]: a fixed block of text, mostly for tests and replays
//! - [`ChunkedDataStream`]: fed from another thread through a [`ChunkSender`]
//! - [`ReaderDataStream`]: decodes UTF-8 from any `std::io::Read`

use std::collections::VecDeque;
use std::io::{ErrorKind, Read};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::{Duration, Instant};

use unicode_segmentation::UnicodeSegmentation;

use crate::error::StreamError;

/// How long a blocking read waits before re-checking its state
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Returns true for characters that stop a printable run (C0 controls and DEL)
#[inline]
pub fn is_control(c: char) -> bool {
    (c as u32) < 0x20 || c == '\x7f'
}

/// A pull-based source of decoded characters
pub trait DataStream {
    /// Read the next character.
    ///
    /// Pushed back characters come first (most recent first). Returns
    /// [`StreamError::EndOfStream`] once the source is closed and drained.
    fn get_char(&mut self) -> Result<char, StreamError>;

    /// Read the next character, giving up at `deadline`.
    ///
    /// Returns `Ok(None)` when nothing arrived in time. Synchronized output
    /// relies on this to enforce its timeout, so a source that can block
    /// must not wait past `deadline`.
    fn get_char_before(&mut self, deadline: Instant) -> Result<Option<char>, StreamError>;

    /// Push a single character back. The next read returns it.
    fn push_char(&mut self, c: char);

    /// Re-inject `chars[..length]` so they are read again in their original order
    fn push_back_buffer(&mut self, chars: &[char], length: usize);

    /// Consume up to `max` printable characters.
    ///
    /// Stops before the first control character, which stays in the stream.
    /// Only returns what is available without waiting.
    fn read_non_control_characters(&mut self, max: usize) -> Result<String, StreamError>;

    /// True if nothing is pushed back, nothing is buffered and no data is pending
    fn is_empty(&mut self) -> bool;
}

/// LIFO pushback shared by the stream implementations
#[derive(Debug, Default, Clone)]
struct Pushback {
    stack: Vec<char>,
}

impl Pushback {
    fn pop(&mut self) -> Option<char> {
        self.stack.pop()
    }

    fn peek(&self) -> Option<char> {
        self.stack.last().copied()
    }

    fn push(&mut self, c: char) {
        self.stack.push(c);
    }

    fn push_all(&mut self, chars: &[char], length: usize) {
        assert!(
            length <= chars.len(),
            "pushback length {} exceeds buffer of {} chars",
            length,
            chars.len()
        );
        self.stack.extend(chars[..length].iter().rev());
    }

    fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}

/// Read printable characters first from the pushback, then from `queue`
fn read_printable(
    pushback: &mut Pushback,
    queue: &mut VecDeque<char>,
    max: usize,
    out: &mut String,
) -> usize {
    let mut count = 0;
    while count < max {
        if let Some(c) = pushback.peek() {
            if is_control(c) {
                return count;
            }
            pushback.pop();
            out.push(c);
            count += 1;
            continue;
        }
        match queue.front() {
            Some(&c) if !is_control(c) => {
                queue.pop_front();
                out.push(c);
                count += 1;
            },
            _ => return count,
        }
    }
    count
}

/// A stream over a fixed block of characters
#[derive(Debug, Clone, Default)]
pub struct ArrayDataStream {
    chars: VecDeque<char>,
    pushback: Pushback,
}

impl ArrayDataStream {
    /// Create a stream over the characters of `text`
    pub fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pushback: Pushback::default(),
        }
    }

    /// Create a stream over `chars[offset..offset + length]`
    pub fn from_chars(chars: &[char], offset: usize, length: usize) -> Self {
        let end = (offset + length).min(chars.len());
        let start = offset.min(end);
        Self {
            chars: chars[start..end].iter().copied().collect(),
            pushback: Pushback::default(),
        }
    }

    /// Number of characters left, pushback included
    pub fn remaining(&self) -> usize {
        self.chars.len() + self.pushback.stack.len()
    }
}

impl DataStream for ArrayDataStream {
    fn get_char(&mut self) -> Result<char, StreamError> {
        if let Some(c) = self.pushback.pop() {
            return Ok(c);
        }
        self.chars.pop_front().ok_or(StreamError::EndOfStream)
    }

    /// Never waits, so the deadline does not matter
    fn get_char_before(&mut self, _deadline: Instant) -> Result<Option<char>, StreamError> {
        self.get_char().map(Some)
    }

    fn push_char(&mut self, c: char) {
        self.pushback.push(c);
    }

    fn push_back_buffer(&mut self, chars: &[char], length: usize) {
        self.pushback.push_all(chars, length);
    }

    fn read_non_control_characters(&mut self, max: usize) -> Result<String, StreamError> {
        let mut out = String::new();
        read_printable(&mut self.pushback, &mut self.chars, max, &mut out);
        Ok(out)
    }

    fn is_empty(&mut self) -> bool {
        self.pushback.is_empty() && self.chars.is_empty()
    }
}

/// Holds back a trailing grapheme cluster that may continue in the next chunk
#[derive(Debug, Default, Clone)]
pub struct GraphemeCarry {
    pending: String,
}

const ZWJ: char = '\u{200D}';

fn is_regional_indicator(c: char) -> bool {
    ('\u{1F1E6}'..='\u{1F1FF}').contains(&c)
}

/// True for characters that attach to the cluster before them
/// (combining marks, variation selectors, emoji modifiers)
fn extends_cluster(c: char) -> bool {
    let mut pair = [0u8; 8];
    pair[0] = b'a';
    let len = 1 + c.encode_utf8(&mut pair[1..]).len();
    std::str::from_utf8(&pair[..len]).map_or(false, |s| s.graphemes(true).count() == 1)
}

/// Whether the cluster `tail` could still grow with the next character
fn may_continue(tail: &str) -> bool {
    let mut chars = tail.chars();
    match (chars.next(), chars.next_back()) {
        (Some(only), None) if is_regional_indicator(only) => true,
        (_, Some(last)) | (Some(last), None) => last == ZWJ || extends_cluster(last),
        (None, _) => false,
    }
}

impl GraphemeCarry {
    /// Prepend the carried text to `data` and return the part that is safe to
    /// hand out now.
    ///
    /// Only a trailing cluster that can still grow is kept: one ending in a
    /// joiner or an extending mark, or a lone regional indicator.
    pub fn split(&mut self, data: &str) -> String {
        let mut full = std::mem::take(&mut self.pending);
        full.push_str(data);

        match full.chars().last() {
            Some(last) if !last.is_ascii() => {},
            _ => return full,
        }
        let Some((boundary, tail)) = full.grapheme_indices(true).last() else {
            return full;
        };
        if may_continue(tail) {
            self.pending = full.split_off(boundary);
        }
        full
    }

    /// Release whatever is still being held
    pub fn flush(&mut self) -> String {
        std::mem::take(&mut self.pending)
    }

    /// True if nothing is held back
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Producer half of a [`ChunkedDataStream`]
#[derive(Debug)]
pub struct ChunkSender {
    tx: Sender<String>,
    carry: GraphemeCarry,
}

impl ChunkSender {
    /// Queue a chunk of decoded text.
    ///
    /// Returns false if the reading side has gone away.
    pub fn send(&mut self, data: &str) -> bool {
        let complete = self.carry.split(data);
        if complete.is_empty() {
            return true;
        }
        self.tx.send(complete).is_ok()
    }

    /// Flush any held-back grapheme and close the stream
    pub fn close(mut self) {
        let rest = self.carry.flush();
        if !rest.is_empty() {
            let _ = self.tx.send(rest);
        }
    }
}

impl Drop for ChunkSender {
    fn drop(&mut self) {
        let rest = self.carry.flush();
        if !rest.is_empty() {
            let _ = self.tx.send(rest);
        }
    }
}

/// A stream fed in chunks from another thread.
///
/// Reads block (polling every [`DEFAULT_POLL_INTERVAL`]) until data arrives or
/// every [`ChunkSender`] is dropped.
pub struct ChunkedDataStream {
    rx: Receiver<String>,
    /// Keeps the channel open for a stream fed through [`append`](Self::append)
    local_tx: Option<Sender<String>>,
    carry: GraphemeCarry,
    buffer: VecDeque<char>,
    pushback: Pushback,
    closed: bool,
    poll_interval: Duration,
    wait_observer: Option<Box<dyn FnMut() + Send>>,
}

impl std::fmt::Debug for ChunkedDataStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkedDataStream")
            .field("buffered", &self.buffer.len())
            .field("pushback", &self.pushback.stack.len())
            .field("closed", &self.closed)
            .finish()
    }
}

impl Default for ChunkedDataStream {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a connected sender and chunked stream
pub fn channel() -> (ChunkSender, ChunkedDataStream) {
    let (tx, rx) = mpsc::channel();
    let sender = ChunkSender {
        tx,
        carry: GraphemeCarry::default(),
    };
    let stream = ChunkedDataStream {
        rx,
        local_tx: None,
        carry: GraphemeCarry::default(),
        buffer: VecDeque::new(),
        pushback: Pushback::default(),
        closed: false,
        poll_interval: DEFAULT_POLL_INTERVAL,
        wait_observer: None,
    };
    (sender, stream)
}

enum Fetch {
    Data,
    Timeout,
    Closed,
}

impl ChunkedDataStream {
    /// A stream fed from the owning thread with [`append`](Self::append)
    pub fn new() -> Self {
        let (sender, mut stream) = channel();
        stream.local_tx = Some(sender.tx.clone());
        drop(sender);
        stream
    }

    /// Queue decoded text; a trailing grapheme that may continue is held back
    pub fn append(&mut self, data: &str) {
        let complete = self.carry.split(data);
        self.buffer.extend(complete.chars());
    }

    /// Flush held-back text and stop waiting for more once senders are gone
    pub fn close(&mut self) {
        let rest = self.carry.flush();
        self.buffer.extend(rest.chars());
        self.local_tx = None;
    }

    /// Change how long a blocking read waits between state checks
    pub fn set_poll_interval(&mut self, interval: Duration) {
        self.poll_interval = interval.max(Duration::from_millis(1));
    }

    /// Install a callback run every time the reader is about to wait for data
    pub fn set_wait_observer(&mut self, observer: Box<dyn FnMut() + Send>) {
        self.wait_observer = Some(observer);
    }

    /// Whether the producer side has closed
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn take_buffered(&mut self) -> Option<char> {
        self.pushback.pop().or_else(|| self.buffer.pop_front())
    }

    fn drain_ready(&mut self) {
        while !self.closed {
            match self.rx.try_recv() {
                Ok(chunk) => self.buffer.extend(chunk.chars()),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => self.closed = true,
            }
        }
    }

    fn fetch(&mut self, wait: Duration) -> Fetch {
        if self.closed {
            return Fetch::Closed;
        }
        if let Some(observer) = self.wait_observer.as_mut() {
            observer();
        }
        match self.rx.recv_timeout(wait) {
            Ok(chunk) => {
                self.buffer.extend(chunk.chars());
                Fetch::Data
            },
            Err(RecvTimeoutError::Timeout) => Fetch::Timeout,
            Err(RecvTimeoutError::Disconnected) => {
                self.closed = true;
                Fetch::Closed
            },
        }
    }
}

impl DataStream for ChunkedDataStream {
    fn get_char(&mut self) -> Result<char, StreamError> {
        loop {
            if let Some(c) = self.take_buffered() {
                return Ok(c);
            }
            if let Fetch::Closed = self.fetch(self.poll_interval) {
                return self.take_buffered().ok_or(StreamError::EndOfStream);
            }
        }
    }

    fn get_char_before(&mut self, deadline: Instant) -> Result<Option<char>, StreamError> {
        loop {
            if let Some(c) = self.take_buffered() {
                return Ok(Some(c));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            let wait = (deadline - now).min(self.poll_interval);
            match self.fetch(wait) {
                Fetch::Data | Fetch::Timeout => continue,
                Fetch::Closed => {
                    return self.take_buffered().map(Some).ok_or(StreamError::EndOfStream);
                },
            }
        }
    }

    fn push_char(&mut self, c: char) {
        self.pushback.push(c);
    }

    fn push_back_buffer(&mut self, chars: &[char], length: usize) {
        self.pushback.push_all(chars, length);
    }

    fn read_non_control_characters(&mut self, max: usize) -> Result<String, StreamError> {
        let mut out = String::new();
        let mut count = read_printable(&mut self.pushback, &mut self.buffer, max, &mut out);
        while count < max && self.buffer.is_empty() && self.pushback.is_empty() && !self.closed {
            self.drain_ready();
            if self.buffer.is_empty() {
                break;
            }
            count += read_printable(&mut self.pushback, &mut self.buffer, max - count, &mut out);
        }
        Ok(out)
    }

    fn is_empty(&mut self) -> bool {
        self.drain_ready();
        self.pushback.is_empty() && self.buffer.is_empty()
    }
}

/// A stream decoding UTF-8 from a byte reader such as a PTY master.
///
/// Invalid byte sequences decode to U+FFFD. A multi-byte sequence split
/// across reads is completed by the next read.
pub struct ReaderDataStream<R: Read> {
    reader: R,
    buffer: VecDeque<char>,
    pushback: Pushback,
    undecoded: Vec<u8>,
    carry: GraphemeCarry,
    eof: bool,
    read_buf: Box<[u8]>,
}

impl<R: Read> ReaderDataStream<R> {
    /// Wrap a reader, using a 4 KiB read buffer
    pub fn new(reader: R) -> Self {
        Self::with_capacity(reader, 4096)
    }

    /// Wrap a reader with a custom read buffer size
    pub fn with_capacity(reader: R, capacity: usize) -> Self {
        Self {
            reader,
            buffer: VecDeque::new(),
            pushback: Pushback::default(),
            undecoded: Vec::new(),
            carry: GraphemeCarry::default(),
            eof: false,
            read_buf: vec![0u8; capacity.max(4)].into_boxed_slice(),
        }
    }

    /// Consume the stream and return the reader
    pub fn into_inner(self) -> R {
        self.reader
    }

    fn decode_pending(&mut self, at_eof: bool) -> String {
        let mut text = String::new();
        let mut bytes = std::mem::take(&mut self.undecoded);
        let mut start = 0;
        loop {
            match std::str::from_utf8(&bytes[start..]) {
                Ok(valid) => {
                    text.push_str(valid);
                    start = bytes.len();
                    break;
                },
                Err(err) => {
                    let valid_up_to = start + err.valid_up_to();
                    text.push_str(&String::from_utf8_lossy(&bytes[start..valid_up_to]));
                    match err.error_len() {
                        Some(len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            start = valid_up_to + len;
                        },
                        None if at_eof => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            start = bytes.len();
                            break;
                        },
                        None => {
                            start = valid_up_to;
                            break;
                        },
                    }
                },
            }
        }
        self.undecoded = bytes.split_off(start);
        text
    }

    fn fill(&mut self) -> Result<bool, StreamError> {
        if self.eof {
            return Ok(false);
        }
        loop {
            match self.reader.read(&mut self.read_buf) {
                Ok(0) => {
                    self.eof = true;
                    let mut tail = self.decode_pending(true);
                    tail = self.carry.split(&tail);
                    tail.push_str(&self.carry.flush());
                    self.buffer.extend(tail.chars());
                    return Ok(!self.buffer.is_empty());
                },
                Ok(n) => {
                    self.undecoded.extend_from_slice(&self.read_buf[..n]);
                    let text = self.decode_pending(false);
                    let complete = self.carry.split(&text);
                    self.buffer.extend(complete.chars());
                    if !self.buffer.is_empty() {
                        return Ok(true);
                    }
                },
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(StreamError::Io(err)),
            }
        }
    }
}

impl<R: Read> DataStream for ReaderDataStream<R> {
    fn get_char(&mut self) -> Result<char, StreamError> {
        loop {
            if let Some(c) = self.pushback.pop().or_else(|| self.buffer.pop_front()) {
                return Ok(c);
            }
            if !self.fill()? {
                return Err(StreamError::EndOfStream);
            }
        }
    }

    /// Buffered characters are returned at any time. Otherwise this gives up
    /// once `deadline` has passed; a read already in progress can not be
    /// interrupted, so the wait may overrun by one blocking read.
    fn get_char_before(&mut self, deadline: Instant) -> Result<Option<char>, StreamError> {
        loop {
            if let Some(c) = self.pushback.pop().or_else(|| self.buffer.pop_front()) {
                return Ok(Some(c));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            if !self.fill()? {
                return Err(StreamError::EndOfStream);
            }
        }
    }

    fn push_char(&mut self, c: char) {
        self.pushback.push(c);
    }

    fn push_back_buffer(&mut self, chars: &[char], length: usize) {
        self.pushback.push_all(chars, length);
    }

    fn read_non_control_characters(&mut self, max: usize) -> Result<String, StreamError> {
        let mut out = String::new();
        read_printable(&mut self.pushback, &mut self.buffer, max, &mut out);
        Ok(out)
    }

    fn is_empty(&mut self) -> bool {
        self.pushback.is_empty() && self.buffer.is_empty() && self.eof
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn read_all(stream: &mut impl DataStream) -> String {
        let mut out = String::new();
        loop {
            match stream.get_char() {
                Ok(c) => out.push(c),
                Err(StreamError::EndOfStream) => return out,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
    }

    #[test]
    fn test_array_stream_end_of_stream() {
        let mut stream = ArrayDataStream::new("ab");
        assert_eq!(stream.get_char().unwrap(), 'a');
        assert_eq!(stream.get_char().unwrap(), 'b');
        assert!(stream.get_char().unwrap_err().is_end_of_stream());
        assert!(stream.is_empty());
    }

    #[test]
    fn test_push_char_is_lifo() {
        let mut stream = ArrayDataStream::new("z");
        stream.push_char('a');
        stream.push_char('b');
        assert_eq!(read_all(&mut stream), "baz");
    }

    #[test]
    fn test_push_back_buffer_preserves_order() {
        let mut stream = ArrayDataStream::new("Hello");
        let mut consumed = String::new();
        for _ in 0..3 {
            consumed.push(stream.get_char().unwrap());
        }
        assert_eq!(consumed, "Hel");
        stream.push_back_buffer(&['X', 'X'], 2);
        assert_eq!(read_all(&mut stream), "XXlo");
    }

    #[test]
    fn test_push_back_buffer_partial_length() {
        let mut stream = ArrayDataStream::new("");
        stream.push_back_buffer(&['1', '2', '3'], 2);
        assert_eq!(read_all(&mut stream), "12");
    }

    #[test]
    #[should_panic(expected = "pushback length")]
    fn test_push_back_buffer_rejects_bad_length() {
        let mut stream = ArrayDataStream::new("");
        stream.push_back_buffer(&['1'], 2);
    }

    #[test]
    fn test_read_non_control_stops_at_control() {
        let mut stream = ArrayDataStream::new("abc\x1b[m");
        assert_eq!(stream.read_non_control_characters(10).unwrap(), "abc");
        assert_eq!(stream.get_char().unwrap(), '\x1b');
    }

    #[test]
    fn test_read_non_control_respects_max() {
        let mut stream = ArrayDataStream::new("abcdef");
        assert_eq!(stream.read_non_control_characters(4).unwrap(), "abcd");
        assert_eq!(read_all(&mut stream), "ef");
    }

    #[test]
    fn test_read_non_control_stops_at_del() {
        let mut stream = ArrayDataStream::new("ab\x7fc");
        assert_eq!(stream.read_non_control_characters(10).unwrap(), "ab");
    }

    #[test]
    fn test_read_non_control_includes_pushback() {
        let mut stream = ArrayDataStream::new("cd\n");
        stream.push_back_buffer(&['a', 'b'], 2);
        assert_eq!(stream.read_non_control_characters(10).unwrap(), "abcd");
        assert_eq!(stream.get_char().unwrap(), '\n');
    }

    #[test]
    fn test_from_chars_window() {
        let chars: Vec<char> = "0123456".chars().collect();
        let mut stream = ArrayDataStream::from_chars(&chars, 2, 3);
        assert_eq!(read_all(&mut stream), "234");
    }

    #[test]
    fn test_grapheme_carry_holds_emoji() {
        let mut carry = GraphemeCarry::default();
        assert_eq!(carry.split("ab\u{1F468}\u{200D}"), "ab");
        assert!(!carry.is_empty());
        assert_eq!(carry.split("\u{1F469} ok"), "\u{1F468}\u{200D}\u{1F469} ok");
        assert!(carry.is_empty());
    }

    #[test]
    fn test_grapheme_carry_ascii_fast_path() {
        let mut carry = GraphemeCarry::default();
        assert_eq!(carry.split("plain"), "plain");
        assert!(carry.is_empty());
    }

    #[test]
    fn test_grapheme_carry_variation_selector() {
        let mut carry = GraphemeCarry::default();
        assert_eq!(carry.split("x\u{2764}\u{FE0F}"), "x");
        assert_eq!(carry.split("y"), "\u{2764}\u{FE0F}y");
        assert!(carry.is_empty());
    }

    #[test]
    fn test_grapheme_carry_releases_complete_cluster() {
        let mut carry = GraphemeCarry::default();
        assert_eq!(carry.split("\u{e9}"), "\u{e9}");
        assert_eq!(carry.split("\u{4e2d}"), "\u{4e2d}");
        assert_eq!(carry.split("\u{1F1FA}\u{1F1F8}"), "\u{1F1FA}\u{1F1F8}");
        assert!(carry.is_empty());
    }

    #[test]
    fn test_grapheme_carry_lone_regional_indicator() {
        let mut carry = GraphemeCarry::default();
        assert_eq!(carry.split("flag \u{1F1FA}"), "flag ");
        assert_eq!(carry.split("\u{1F1F8}"), "\u{1F1FA}\u{1F1F8}");
    }

    #[test]
    fn test_grapheme_carry_combining_mark() {
        let mut carry = GraphemeCarry::default();
        assert_eq!(carry.split("cafe\u{301}"), "caf");
        assert_eq!(carry.flush(), "e\u{301}");
    }

    #[test]
    fn test_chunked_stream_delivers_single_non_ascii_char() {
        let (mut tx, mut stream) = channel();
        stream.set_poll_interval(Duration::from_millis(5));
        assert!(tx.send("\u{e9}"));
        let deadline = Instant::now() + Duration::from_millis(300);
        assert_eq!(stream.get_char_before(deadline).unwrap(), Some('\u{e9}'));
        assert!(tx.send("\u{4e2d}"));
        let deadline = Instant::now() + Duration::from_millis(300);
        assert_eq!(stream.get_char_before(deadline).unwrap(), Some('\u{4e2d}'));
    }

    #[test]
    fn test_chunked_stream_across_threads() {
        let (mut tx, mut stream) = channel();
        let producer = thread::spawn(move || {
            tx.send("hel");
            tx.send("lo \u{1F600}");
            tx.send("!");
            tx.close();
        });
        assert_eq!(read_all(&mut stream), "hello \u{1F600}!");
        producer.join().unwrap();
    }

    #[test]
    fn test_chunked_stream_keeps_graphemes_together() {
        let (mut tx, mut stream) = channel();
        tx.send("a\u{1F468}\u{200D}");
        // Nothing past 'a' is visible until the joined cluster is complete
        assert_eq!(stream.read_non_control_characters(10).unwrap(), "a");
        tx.send("\u{1F469}b");
        assert_eq!(
            stream.read_non_control_characters(10).unwrap(),
            "\u{1F468}\u{200D}\u{1F469}b"
        );
    }

    #[test]
    fn test_chunked_stream_deadline() {
        let (_tx, mut stream) = channel();
        stream.set_poll_interval(Duration::from_millis(5));
        let deadline = Instant::now() + Duration::from_millis(20);
        assert!(stream.get_char_before(deadline).unwrap().is_none());
    }

    #[test]
    fn test_chunked_stream_closed_is_end_of_stream() {
        let (tx, mut stream) = channel();
        drop(tx);
        assert!(stream.get_char().unwrap_err().is_end_of_stream());
        assert!(stream.is_empty());
    }

    #[test]
    fn test_chunked_stream_append_and_close() {
        let mut stream = ChunkedDataStream::new();
        stream.append("ab\u{1F468}\u{200D}");
        assert_eq!(stream.read_non_control_characters(10).unwrap(), "ab");
        stream.close();
        assert_eq!(stream.get_char().unwrap(), '\u{1F468}');
        assert_eq!(stream.get_char().unwrap(), '\u{200D}');
        assert!(stream.get_char().unwrap_err().is_end_of_stream());
    }

    #[test]
    fn test_chunked_stream_wait_observer() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let (tx, mut stream) = channel();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        stream.set_wait_observer(Box::new(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        }));
        drop(tx);
        let _ = stream.get_char();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reader_stream_decodes_split_utf8() {
        struct OneByte<'a>(&'a [u8]);
        impl Read for OneByte<'_> {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                if self.0.is_empty() {
                    return Ok(0);
                }
                buf[0] = self.0[0];
                self.0 = &self.0[1..];
                Ok(1)
            }
        }
        let bytes = "a\u{00e9}\u{4e2d}".as_bytes();
        let mut stream = ReaderDataStream::new(OneByte(bytes));
        assert_eq!(read_all(&mut stream), "a\u{00e9}\u{4e2d}");
    }

    #[test]
    fn test_reader_stream_expired_deadline() {
        let mut stream = ReaderDataStream::new("ab".as_bytes());
        let past = Instant::now();
        assert_eq!(stream.get_char_before(past).unwrap(), None);
        let later = Instant::now() + Duration::from_secs(1);
        assert_eq!(stream.get_char_before(later).unwrap(), Some('a'));
        // Already buffered, so the expired deadline does not matter
        assert_eq!(stream.get_char_before(past).unwrap(), Some('b'));
    }

    #[test]
    fn test_reader_stream_replaces_invalid_bytes() {
        let bytes: &[u8] = &[b'a', 0xff, b'b', 0xe4];
        let mut stream = ReaderDataStream::new(bytes);
        assert_eq!(read_all(&mut stream), "a\u{FFFD}b\u{FFFD}");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn printable_run_round_trips(s in "[ -~\u{a0}-\u{2fff}]{0,64}") {
                let mut stream = ArrayDataStream::new(&s);
                let n = s.chars().count();
                let read = stream.read_non_control_characters(n).unwrap();
                prop_assert_eq!(read, s);
                prop_assert!(stream.is_empty());
            }

            #[test]
            fn pushback_replaces_prefix(
                text in "[a-z]{1,32}",
                split in 0usize..32,
                replacement in "[A-Z]{0,16}",
            ) {
                let chars: Vec<char> = text.chars().collect();
                let split = split.min(chars.len());
                let mut stream = ArrayDataStream::new(&text);
                for _ in 0..split {
                    stream.get_char().unwrap();
                }
                let r: Vec<char> = replacement.chars().collect();
                stream.push_back_buffer(&r, r.len());
                let rest: String = chars[split..].iter().collect();
                prop_assert_eq!(read_all(&mut stream), format!("{}{}", replacement, rest));
            }
        }
    }
}
