//! Synchronized output (DEC mode 2026)
//!
//! Between `ESC[?2026h` and `ESC[?2026l` an application asks for its output
//! to be shown atomically. [`SynchronizedOutput`] reads the span off the
//! stream without touching the terminal; the emulator then replays it in one
//! go while holding the buffer lock. The 8-bit CSI forms of both markers are
//! recognized as well.

use std::time::{Duration, Instant};

use crate::error::StreamError;
use crate::stream::DataStream;

/// Sequence that opens a synchronized block
pub const BEGIN_MARKER: &str = "\x1b[?2026h";
/// Sequence that closes a synchronized block
pub const END_MARKER: &str = "\x1b[?2026l";
/// 8-bit CSI form of [`BEGIN_MARKER`]
pub const BEGIN_MARKER_C1: &str = "\u{9b}?2026h";
/// 8-bit CSI form of [`END_MARKER`]
pub const END_MARKER_C1: &str = "\u{9b}?2026l";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);
pub const DEFAULT_MAX_CHARS: usize = 0x100000;

/// Why a capture stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureEnd {
    /// The end marker arrived
    EndMarker,
    /// More than the allowed number of characters was buffered
    Overflow,
    /// The deadline passed before the end marker
    Timeout,
    /// The stream was closed
    EndOfStream,
    /// The stream failed; the error is carried in [`Capture::error`]
    StreamError,
}

/// Characters read between the markers
#[derive(Debug)]
pub struct Capture {
    /// Captured text with both markers removed
    pub chars: Vec<char>,
    pub end: CaptureEnd,
    pub error: Option<StreamError>,
}

impl Capture {
    /// True unless the block was closed by its end marker
    pub fn aborted(&self) -> bool {
        self.end != CaptureEnd::EndMarker
    }
}

/// Capture limits for a synchronized block
#[derive(Debug, Clone)]
pub struct SynchronizedOutput {
    timeout: Duration,
    max_chars: usize,
    begin: [Vec<char>; 2],
    end: [Vec<char>; 2],
}

impl Default for SynchronizedOutput {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT, DEFAULT_MAX_CHARS)
    }
}

impl SynchronizedOutput {
    pub fn new(timeout: Duration, max_chars: usize) -> Self {
        Self {
            timeout,
            max_chars: max_chars.max(1),
            begin: [BEGIN_MARKER.chars().collect(), BEGIN_MARKER_C1.chars().collect()],
            end: [END_MARKER.chars().collect(), END_MARKER_C1.chars().collect()],
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Read until the end marker or one of the abort conditions.
    ///
    /// Repeated begin markers are dropped from the captured text. The whole
    /// deadline is measured from the start of the capture.
    pub fn capture<S: DataStream + ?Sized>(&self, stream: &mut S) -> Capture {
        let deadline = Instant::now() + self.timeout;
        let mut chars = Vec::new();

        let (end, error) = loop {
            let c = match stream.get_char_before(deadline) {
                Ok(Some(c)) => c,
                Ok(None) => break (CaptureEnd::Timeout, None),
                Err(StreamError::EndOfStream) => break (CaptureEnd::EndOfStream, None),
                Err(err) => break (CaptureEnd::StreamError, Some(err)),
            };
            chars.push(c);

            if let Some(marker) = self.end.iter().find(|m| chars.ends_with(m.as_slice())) {
                chars.truncate(chars.len() - marker.len());
                break (CaptureEnd::EndMarker, None);
            }
            if let Some(marker) = self.begin.iter().find(|m| chars.ends_with(m.as_slice())) {
                chars.truncate(chars.len() - marker.len());
            }
            if chars.len() > self.max_chars {
                break (CaptureEnd::Overflow, None);
            }
        };

        match end {
            CaptureEnd::EndMarker => log::trace!("synchronized block of {} chars", chars.len()),
            _ => log::debug!("synchronized output aborted ({:?}) after {} chars", end, chars.len()),
        }
        Capture { chars, end, error }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{channel, ArrayDataStream};

    fn text(capture: &Capture) -> String {
        capture.chars.iter().collect()
    }

    #[test]
    fn test_capture_until_end_marker() {
        let mut stream = ArrayDataStream::new("hello\x1b[?2026lafter");
        let capture = SynchronizedOutput::default().capture(&mut stream);
        assert_eq!(capture.end, CaptureEnd::EndMarker);
        assert!(!capture.aborted());
        assert_eq!(text(&capture), "hello");
        assert_eq!(stream.remaining(), 5);
    }

    #[test]
    fn test_nested_begin_dropped() {
        let mut stream = ArrayDataStream::new("a\x1b[?2026hb\x1b[?2026l");
        let capture = SynchronizedOutput::default().capture(&mut stream);
        assert_eq!(text(&capture), "ab");
    }

    #[test]
    fn test_c1_markers() {
        let mut stream = ArrayDataStream::new("a\u{9b}?2026hb\u{9b}?2026lafter");
        let capture = SynchronizedOutput::default().capture(&mut stream);
        assert_eq!(capture.end, CaptureEnd::EndMarker);
        assert_eq!(text(&capture), "ab");
        assert_eq!(stream.remaining(), 5);
    }

    #[test]
    fn test_other_private_modes_kept() {
        let mut stream = ArrayDataStream::new("\x1b[?25l\x1b[?2026l");
        let capture = SynchronizedOutput::default().capture(&mut stream);
        assert_eq!(text(&capture), "\x1b[?25l");
    }

    #[test]
    fn test_overflow_aborts() {
        let mut stream = ArrayDataStream::new("abcdefgh");
        let capture = SynchronizedOutput::new(DEFAULT_TIMEOUT, 4).capture(&mut stream);
        assert_eq!(capture.end, CaptureEnd::Overflow);
        assert_eq!(text(&capture), "abcde");
    }

    #[test]
    fn test_end_of_stream_aborts() {
        let mut stream = ArrayDataStream::new("partial");
        let capture = SynchronizedOutput::default().capture(&mut stream);
        assert_eq!(capture.end, CaptureEnd::EndOfStream);
        assert!(capture.aborted());
        assert_eq!(text(&capture), "partial");
    }

    #[test]
    fn test_timeout_aborts() {
        let (mut sender, mut stream) = channel();
        stream.set_poll_interval(Duration::from_millis(5));
        assert!(sender.send("slow"));
        let capture = SynchronizedOutput::new(Duration::from_millis(50), DEFAULT_MAX_CHARS).capture(&mut stream);
        assert_eq!(capture.end, CaptureEnd::Timeout);
        assert_eq!(text(&capture), "slow");
    }
}
