//! Control sequence readers
//!
//! Each reader is entered after the emulator consumed the introducer
//! (`ESC ]`, `ESC [`, `ESC P` or their C1 forms) and pulls the rest of the
//! sequence from a [`DataStream`].

use std::fmt;

use crate::error::SequenceError;
use crate::stream::DataStream;

/// Longest CSI sequence accepted, in characters
pub const MAX_CSI_LENGTH: usize = 256;

/// Longest OSC or DCS string body accepted, in bytes
pub const MAX_STRING_LENGTH: usize = 50 * 1024 * 1024;

/// Maximum number of parameters tracked
const MAX_PARAMS: usize = 32;

const BEL: char = '\x07';
const ESC: char = '\x1b';
const CAN: char = '\x18';
const SUB: char = '\x1a';
const ST: char = '\u{9c}';

/// How a string sequence was terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Terminator {
    #[default]
    Bel,
    /// The 8-bit String Terminator (0x9C)
    St,
    /// `ESC \`
    EscBackslash,
}

impl Terminator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Terminator::Bel => "\x07",
            Terminator::St => "\u{9c}",
            Terminator::EscBackslash => "\x1b\\",
        }
    }
}

/// An OSC sequence: `ESC ] arg ; arg ... terminator`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemCommandSequence {
    body: String,
    args: Vec<String>,
    terminator: Terminator,
}

impl SystemCommandSequence {
    /// Read the body up to and including its terminator
    pub fn read<S: DataStream + ?Sized>(stream: &mut S) -> Result<Self, SequenceError> {
        let mut body = String::new();
        loop {
            let c = stream.get_char()?;
            match c {
                BEL => return Ok(Self::parse(body, Terminator::Bel)),
                ST => return Ok(Self::parse(body, Terminator::St)),
                ESC => {
                    let next = stream.get_char()?;
                    if next == '\\' {
                        return Ok(Self::parse(body, Terminator::EscBackslash));
                    }
                    body.push(ESC);
                    stream.push_char(next);
                },
                '\0' => return Err(SequenceError::NulInOsc),
                _ => body.push(c),
            }
            if body.len() > MAX_STRING_LENGTH {
                return Err(SequenceError::TooLong {
                    limit: MAX_STRING_LENGTH,
                });
            }
        }
    }

    /// Build a sequence from an already collected body
    pub fn parse(body: String, terminator: Terminator) -> Self {
        let args = body.split(';').map(String::from).collect();
        Self {
            body,
            args,
            terminator,
        }
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn arg_at(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// Argument `index` as an integer, `default` if missing or not a number
    pub fn int_arg_at(&self, index: usize, default: i32) -> i32 {
        self.arg_at(index)
            .and_then(|arg| arg.trim().parse().ok())
            .unwrap_or(default)
    }

    pub fn terminator(&self) -> Terminator {
        self.terminator
    }

    /// Format a reply framed with this sequence's terminator
    pub fn format(&self, args: &[&str]) -> String {
        format!("\x1b]{}{}", args.join(";"), self.terminator.as_str())
    }
}

/// Prefix, parameters and intermediates shared by CSI and DCS
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Header {
    prefix: Option<char>,
    params: Vec<u16>,
    subparams: Vec<Vec<u16>>,
    intermediates: String,
    controls: Vec<char>,
    final_char: char,
}

impl Header {
    fn finish_field(&mut self, value: Option<u16>, in_sub: bool) {
        let value = value.unwrap_or(0);
        if in_sub {
            if let Some(subs) = self.subparams.last_mut() {
                subs.push(value);
            }
        } else if self.params.len() < MAX_PARAMS {
            self.params.push(value);
            self.subparams.push(Vec::new());
        }
    }

    /// Consume up to the final byte
    fn read<S: DataStream + ?Sized>(stream: &mut S, limit: usize) -> Result<Self, SequenceError> {
        let mut header = Header::default();
        let mut value: Option<u16> = None;
        let mut in_sub = false;
        let mut fields_seen = false;
        let mut malformed: Option<char> = None;
        let mut length = 0;

        loop {
            let c = stream.get_char()?;
            length += 1;
            if length > limit {
                // Skip to the end of the sequence before reporting it
                match c {
                    CAN | SUB => return Err(SequenceError::Cancelled),
                    ESC => {
                        stream.push_char(ESC);
                        return Err(SequenceError::InvalidByte(ESC));
                    },
                    '\x40'..='\x7e' => return Err(SequenceError::TooLong { limit }),
                    _ => continue,
                }
            }
            match c {
                CAN | SUB => return Err(SequenceError::Cancelled),
                ESC => {
                    stream.push_char(ESC);
                    return Err(SequenceError::InvalidByte(ESC));
                },
                '\0'..='\x1f' => header.controls.push(c),
                '?' | '>' | '=' | '<' | '!' if length == 1 => header.prefix = Some(c),
                '0'..='9' => {
                    fields_seen = true;
                    let digit = c as u16 - '0' as u16;
                    value = Some(value.unwrap_or(0).saturating_mul(10).saturating_add(digit));
                },
                ':' => {
                    fields_seen = true;
                    if in_sub {
                        header.finish_field(value, true);
                    } else {
                        header.finish_field(value, false);
                        in_sub = true;
                    }
                    value = None;
                },
                ';' => {
                    fields_seen = true;
                    header.finish_field(value, in_sub);
                    value = None;
                    in_sub = false;
                },
                '\x20'..='\x2f' => header.intermediates.push(c),
                '\x40'..='\x7e' => {
                    if fields_seen {
                        header.finish_field(value, in_sub);
                    }
                    header.final_char = c;
                    return match malformed {
                        Some(bad) => Err(SequenceError::InvalidByte(bad)),
                        None => Ok(header),
                    };
                },
                _ => {
                    malformed.get_or_insert(c);
                },
            }
        }
    }
}

/// A CSI sequence: `ESC [ prefix params intermediates final`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlSequence {
    header: Header,
}

impl ControlSequence {
    /// Read the rest of a sequence after `ESC [`.
    ///
    /// A malformed sequence is consumed through its final byte and reported
    /// as an error; an ESC aborts the sequence and stays in the stream.
    pub fn read<S: DataStream + ?Sized>(stream: &mut S) -> Result<Self, SequenceError> {
        Header::read(stream, MAX_CSI_LENGTH).map(|header| Self { header })
    }

    /// Number of `;`-separated parameters
    pub fn count(&self) -> usize {
        self.header.params.len()
    }

    /// Parameter `index`, with zero or missing replaced by `default`
    pub fn arg(&self, index: usize, default: u16) -> u16 {
        match self.raw(index) {
            0 => default,
            v => v,
        }
    }

    /// Parameter `index` as written (0 if missing)
    pub fn raw(&self, index: usize) -> u16 {
        self.header.params.get(index).copied().unwrap_or(0)
    }

    pub fn params(&self) -> &[u16] {
        &self.header.params
    }

    /// `:`-separated values following parameter `index`
    pub fn subparams(&self, index: usize) -> &[u16] {
        self.header
            .subparams
            .get(index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn prefix(&self) -> Option<char> {
        self.header.prefix
    }

    pub fn intermediates(&self) -> &str {
        &self.header.intermediates
    }

    pub fn final_char(&self) -> char {
        self.header.final_char
    }

    /// C0 controls that appeared inside the sequence
    pub fn controls(&self) -> &[char] {
        &self.header.controls
    }
}

fn write_params(f: &mut fmt::Formatter<'_>, header: &Header) -> fmt::Result {
    if let Some(prefix) = header.prefix {
        write!(f, "{}", prefix)?;
    }
    for (i, value) in header.params.iter().enumerate() {
        if i > 0 {
            f.write_str(";")?;
        }
        write!(f, "{}", value)?;
        for sub in header.subparams.get(i).into_iter().flatten() {
            write!(f, ":{}", sub)?;
        }
    }
    write!(f, "{}{}", header.intermediates, header.final_char)
}

impl fmt::Display for ControlSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ESC[")?;
        write_params(f, &self.header)
    }
}

/// A DCS sequence: `ESC P prefix params intermediates final data ST`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceControlSequence {
    header: Header,
    data: String,
}

impl DeviceControlSequence {
    /// Read the rest of a sequence after `ESC P`
    pub fn read<S: DataStream + ?Sized>(stream: &mut S) -> Result<Self, SequenceError> {
        let header = Header::read(stream, MAX_CSI_LENGTH)?;
        let mut data = String::new();
        loop {
            let c = stream.get_char()?;
            match c {
                ST => break,
                ESC => {
                    let next = stream.get_char()?;
                    if next == '\\' {
                        break;
                    }
                    stream.push_char(next);
                    stream.push_char(ESC);
                    return Err(SequenceError::InvalidByte(ESC));
                },
                CAN | SUB => return Err(SequenceError::Cancelled),
                _ => data.push(c),
            }
            if data.len() > MAX_STRING_LENGTH {
                return Err(SequenceError::TooLong {
                    limit: MAX_STRING_LENGTH,
                });
            }
        }
        Ok(Self { header, data })
    }

    pub fn prefix(&self) -> Option<char> {
        self.header.prefix
    }

    pub fn params(&self) -> &[u16] {
        &self.header.params
    }

    pub fn intermediates(&self) -> &str {
        &self.header.intermediates
    }

    pub fn final_char(&self) -> char {
        self.header.final_char
    }

    pub fn data(&self) -> &str {
        &self.data
    }
}

impl fmt::Display for DeviceControlSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ESC P")?;
        write_params(f, &self.header)?;
        write!(f, "{:?}", self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::ArrayDataStream;

    fn csi(input: &str) -> Result<ControlSequence, SequenceError> {
        ControlSequence::read(&mut ArrayDataStream::new(input))
    }

    fn osc(input: &str) -> SystemCommandSequence {
        SystemCommandSequence::read(&mut ArrayDataStream::new(input)).unwrap()
    }

    #[test]
    fn test_osc_args() {
        let seq = osc("7;file:///home/x\x07");
        assert_eq!(seq.args(), &["7".to_string(), "file:///home/x".to_string()]);
        assert_eq!(seq.int_arg_at(0, -1), 7);
        assert_eq!(seq.int_arg_at(1, 9), 9);
        assert_eq!(seq.int_arg_at(5, 42), 42);
        assert_eq!(seq.arg_at(5), None);
    }

    #[test]
    fn test_osc_terminators_are_echoed() {
        assert_eq!(osc("10;?\x07").format(&["10", "x"]), "\x1b]10;x\x07");
        assert_eq!(osc("10;?\x1b\\").format(&["10", "x"]), "\x1b]10;x\x1b\\");
        let st = osc("10;?\u{9c}");
        assert_eq!(st.terminator(), Terminator::St);
        assert_eq!(st.format(&["10"]), "\x1b]10\u{9c}");
    }

    #[test]
    fn test_osc_keeps_other_escapes() {
        let seq = osc("2;a\x1bb\x07");
        assert_eq!(seq.arg_at(1), Some("a\x1bb"));
    }

    #[test]
    fn test_osc_nul_aborts() {
        let mut stream = ArrayDataStream::new("0;ti\0tle\x07");
        let err = SystemCommandSequence::read(&mut stream).unwrap_err();
        assert!(matches!(err, SequenceError::NulInOsc));
    }

    #[test]
    fn test_osc_unterminated() {
        let mut stream = ArrayDataStream::new("0;title");
        let err = SystemCommandSequence::read(&mut stream).unwrap_err();
        assert!(matches!(err, SequenceError::Unterminated));
    }

    #[test]
    fn test_csi_params() {
        let seq = csi("12;5H").unwrap();
        assert_eq!(seq.final_char(), 'H');
        assert_eq!(seq.params(), &[12, 5]);
        assert_eq!(seq.arg(0, 1), 12);
        assert_eq!(seq.arg(2, 1), 1);
    }

    #[test]
    fn test_csi_empty_params_are_defaults() {
        let seq = csi(";5H").unwrap();
        assert_eq!(seq.params(), &[0, 5]);
        assert_eq!(seq.arg(0, 1), 1);
        assert_eq!(csi("m").unwrap().count(), 0);
    }

    #[test]
    fn test_csi_prefix_and_intermediates() {
        let seq = csi("?1049h").unwrap();
        assert_eq!(seq.prefix(), Some('?'));
        assert_eq!(seq.arg(0, 0), 1049);

        let seq = csi("2 q").unwrap();
        assert_eq!(seq.intermediates(), " ");
        assert_eq!(seq.final_char(), 'q');

        let seq = csi("!p").unwrap();
        assert_eq!(seq.prefix(), Some('!'));
    }

    #[test]
    fn test_csi_subparams() {
        let seq = csi("4:3m").unwrap();
        assert_eq!(seq.params(), &[4]);
        assert_eq!(seq.subparams(0), &[3]);

        let seq = csi("1;38:2::10:20:30m").unwrap();
        assert_eq!(seq.params(), &[1, 38]);
        assert_eq!(seq.subparams(1), &[2, 0, 10, 20, 30]);
    }

    #[test]
    fn test_csi_saturates_large_numbers() {
        let seq = csi("999999999A").unwrap();
        assert_eq!(seq.raw(0), u16::MAX);
    }

    #[test]
    fn test_csi_collects_embedded_controls() {
        let seq = csi("2\r\nA").unwrap();
        assert_eq!(seq.controls(), &['\r', '\n']);
        assert_eq!(seq.arg(0, 1), 2);
    }

    #[test]
    fn test_csi_cancel() {
        assert!(matches!(csi("12\x18H"), Err(SequenceError::Cancelled)));
    }

    #[test]
    fn test_csi_escape_aborts_and_stays() {
        let mut stream = ArrayDataStream::new("12\x1b[H");
        let err = ControlSequence::read(&mut stream).unwrap_err();
        assert!(matches!(err, SequenceError::InvalidByte('\x1b')));
        assert_eq!(stream.get_char().unwrap(), '\x1b');
    }

    #[test]
    fn test_csi_malformed_is_consumed() {
        let mut stream = ArrayDataStream::new("1\u{e9}2mX");
        let err = ControlSequence::read(&mut stream).unwrap_err();
        assert!(matches!(err, SequenceError::InvalidByte('\u{e9}')));
        assert_eq!(stream.get_char().unwrap(), 'X');
    }

    #[test]
    fn test_csi_too_long() {
        let input = format!("{}m", ";".repeat(MAX_CSI_LENGTH + 10));
        assert!(matches!(csi(&input), Err(SequenceError::TooLong { .. })));
    }

    #[test]
    fn test_csi_too_long_is_consumed_to_final_byte() {
        let mut stream = ArrayDataStream::new(&format!("{}mX", ";".repeat(300)));
        let err = ControlSequence::read(&mut stream).unwrap_err();
        assert!(matches!(err, SequenceError::TooLong { .. }));
        assert_eq!(stream.get_char().unwrap(), 'X');
    }

    #[test]
    fn test_csi_unterminated() {
        assert!(matches!(csi("12;"), Err(SequenceError::Unterminated)));
    }

    #[test]
    fn test_csi_display() {
        assert_eq!(csi("?25l").unwrap().to_string(), "ESC[?25l");
        assert_eq!(csi("4:3m").unwrap().to_string(), "ESC[4:3m");
    }

    #[test]
    fn test_dcs_decrqss() {
        let mut stream = ArrayDataStream::new("$qm\x1b\\rest");
        let seq = DeviceControlSequence::read(&mut stream).unwrap();
        assert_eq!(seq.intermediates(), "$");
        assert_eq!(seq.final_char(), 'q');
        assert_eq!(seq.data(), "m");
        assert_eq!(stream.get_char().unwrap(), 'r');
    }
}
