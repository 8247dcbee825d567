//! Keyboard and mouse input encoding
//!
//! The reverse direction of the protocol: key presses, mouse events, focus
//! changes and pastes become the byte sequences the application expects.
//! Everything here is a pure function of the event, the encoder settings and
//! the terminal's current [`Modes`].

use crate::modes::{Modes, MouseFormat, MouseMode};
use crate::platform::PlatformInfo;

const ESC: u8 = 0x1b;

/// A logical key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Tab,
    Backspace,
    Escape,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
    /// F1..F12
    F(u8),
}

/// Modifier keys held during an event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub alt: bool,
    pub ctrl: bool,
    /// Command on macOS, Super elsewhere
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        alt: false,
        ctrl: false,
        meta: false,
    };

    pub fn shift() -> Self {
        Self { shift: true, ..Self::NONE }
    }

    pub fn alt() -> Self {
        Self { alt: true, ..Self::NONE }
    }

    pub fn ctrl() -> Self {
        Self { ctrl: true, ..Self::NONE }
    }

    pub fn meta() -> Self {
        Self { meta: true, ..Self::NONE }
    }

    /// xterm modifier parameter: 1 + shift(1) + alt(2) + ctrl(4) + meta(8)
    pub fn code(&self) -> u8 {
        1 + self.shift as u8 + 2 * self.alt as u8 + 4 * self.ctrl as u8 + 8 * self.meta as u8
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::NONE
    }
}

/// Translates key events into bytes
#[derive(Debug, Clone)]
pub struct KeyEncoder {
    platform: PlatformInfo,
    /// Alt prefixes ESC to ordinary keys
    pub alt_sends_escape: bool,
    /// Meta prefixes ESC to ordinary keys
    pub meta_sends_escape: bool,
    /// Enter sends CR LF
    pub auto_newline: bool,
}

impl KeyEncoder {
    pub fn new(platform: PlatformInfo) -> Self {
        Self {
            platform,
            alt_sends_escape: true,
            meta_sends_escape: false,
            auto_newline: false,
        }
    }

    pub fn platform(&self) -> PlatformInfo {
        self.platform
    }

    /// Bytes for `key` pressed with `modifiers`
    pub fn encode(&self, key: Key, modifiers: Modifiers, modes: &Modes) -> Vec<u8> {
        let mods = modifiers.code();
        match key {
            Key::Char(c) => self.encode_char(c, modifiers),
            Key::Enter => {
                let mut bytes = if self.auto_newline || modes.linefeed_newline {
                    b"\r\n".to_vec()
                } else {
                    vec![b'\r']
                };
                self.prefix_escape(&mut bytes, modifiers);
                bytes
            },
            Key::Tab if modifiers.shift => b"\x1b[Z".to_vec(),
            Key::Tab => {
                let mut bytes = vec![b'\t'];
                self.prefix_escape(&mut bytes, modifiers);
                bytes
            },
            Key::Backspace => {
                let mut bytes = vec![if modifiers.ctrl { 0x08 } else { 0x7f }];
                self.prefix_escape(&mut bytes, modifiers);
                bytes
            },
            Key::Escape => vec![ESC],
            Key::Left | Key::Right if self.platform.is_macos() => {
                let right = key == Key::Right;
                if modifiers == Modifiers::alt() {
                    vec![ESC, if right { b'f' } else { b'b' }]
                } else if modifiers == Modifiers::meta() {
                    vec![if right { 0x05 } else { 0x01 }]
                } else {
                    cursor_key(if right { b'C' } else { b'D' }, mods, modes.application_cursor_keys)
                }
            },
            Key::Up => cursor_key(b'A', mods, modes.application_cursor_keys),
            Key::Down => cursor_key(b'B', mods, modes.application_cursor_keys),
            Key::Right => cursor_key(b'C', mods, modes.application_cursor_keys),
            Key::Left => cursor_key(b'D', mods, modes.application_cursor_keys),
            Key::Home => cursor_key(b'H', mods, modes.application_keypad),
            Key::End => cursor_key(b'F', mods, modes.application_keypad),
            Key::Insert => tilde_key(2, mods),
            Key::Delete => tilde_key(3, mods),
            Key::PageUp => tilde_key(5, mods),
            Key::PageDown => tilde_key(6, mods),
            Key::F(n @ 1..=4) => cursor_key(b'P' + (n - 1), mods, true),
            Key::F(n) => match n {
                5 => tilde_key(15, mods),
                6 => tilde_key(17, mods),
                7 => tilde_key(18, mods),
                8 => tilde_key(19, mods),
                9 => tilde_key(20, mods),
                10 => tilde_key(21, mods),
                11 => tilde_key(23, mods),
                12 => tilde_key(24, mods),
                _ => {
                    log::debug!("no encoding for function key F{}", n);
                    Vec::new()
                },
            },
        }
    }

    fn prefix_escape(&self, bytes: &mut Vec<u8>, modifiers: Modifiers) {
        if (modifiers.alt && self.alt_sends_escape) || (modifiers.meta && self.meta_sends_escape) {
            bytes.insert(0, ESC);
        }
    }

    fn encode_char(&self, c: char, modifiers: Modifiers) -> Vec<u8> {
        let mut bytes = match (modifiers.ctrl, control_code(c)) {
            (true, Some(code)) => vec![code],
            _ => {
                let mut buf = [0u8; 4];
                c.encode_utf8(&mut buf).as_bytes().to_vec()
            },
        };
        self.prefix_escape(&mut bytes, modifiers);
        bytes
    }
}

/// C0 code produced by Ctrl + `c`
fn control_code(c: char) -> Option<u8> {
    match c {
        'a'..='z' | 'A'..='Z' => Some(c.to_ascii_uppercase() as u8 - b'A' + 1),
        ' ' | '@' | '2' => Some(0x00),
        '[' | '3' => Some(0x1b),
        '\\' | '4' => Some(0x1c),
        ']' | '5' => Some(0x1d),
        '^' | '6' => Some(0x1e),
        '_' | '-' | '7' => Some(0x1f),
        '?' | '8' => Some(0x7f),
        _ => None,
    }
}

/// `CSI X`, `SS3 X` in application mode, `CSI 1 ; m X` when modified
fn cursor_key(final_byte: u8, mods: u8, application: bool) -> Vec<u8> {
    if mods > 1 {
        format!("\x1b[1;{}{}", mods, final_byte as char).into_bytes()
    } else if application {
        vec![ESC, b'O', final_byte]
    } else {
        vec![ESC, b'[', final_byte]
    }
}

/// `CSI n ~`, `CSI n ; m ~` when modified
fn tilde_key(code: u8, mods: u8) -> Vec<u8> {
    if mods > 1 {
        format!("\x1b[{};{}~", code, mods).into_bytes()
    } else {
        format!("\x1b[{}~", code).into_bytes()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    WheelUp,
    WheelDown,
}

impl MouseButton {
    fn code(self) -> u16 {
        match self {
            MouseButton::Left => 0,
            MouseButton::Middle => 1,
            MouseButton::Right => 2,
            MouseButton::WheelUp => 64,
            MouseButton::WheelDown => 65,
        }
    }

    fn is_wheel(self) -> bool {
        matches!(self, MouseButton::WheelUp | MouseButton::WheelDown)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseEventKind {
    Press(MouseButton),
    Release(MouseButton),
    /// Motion with a button held
    Drag(MouseButton),
    /// Motion with no button held
    Move,
}

/// A mouse event at a 0-based cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
    pub kind: MouseEventKind,
    pub column: u16,
    pub row: u16,
    pub modifiers: Modifiers,
}

impl MouseEvent {
    pub fn new(kind: MouseEventKind, column: u16, row: u16) -> Self {
        Self {
            kind,
            column,
            row,
            modifiers: Modifiers::NONE,
        }
    }

    fn reported_by(&self, mode: MouseMode) -> bool {
        match (mode, self.kind) {
            (MouseMode::None, _) => false,
            (MouseMode::X10, MouseEventKind::Press(_)) => true,
            (MouseMode::X10, _) => false,
            (_, MouseEventKind::Press(_)) => true,
            (_, MouseEventKind::Release(button)) => !button.is_wheel(),
            (MouseMode::Normal, _) => false,
            (MouseMode::ButtonEvent, MouseEventKind::Drag(_)) => true,
            (MouseMode::ButtonEvent, MouseEventKind::Move) => false,
            (MouseMode::AnyEvent, _) => true,
        }
    }
}

/// Encode a mouse event for the current tracking mode and format.
///
/// Returns `None` when the mode does not report this event.
pub fn encode_mouse(event: &MouseEvent, modes: &Modes) -> Option<Vec<u8>> {
    if !event.reported_by(modes.mouse_mode) {
        return None;
    }
    let release = matches!(event.kind, MouseEventKind::Release(_));
    let mut button = match event.kind {
        MouseEventKind::Press(b) => b.code(),
        // Only SGR can tell which button was released
        MouseEventKind::Release(b) if modes.mouse_format == MouseFormat::Sgr => b.code(),
        MouseEventKind::Release(_) => 3,
        MouseEventKind::Drag(b) => b.code() + 32,
        MouseEventKind::Move => 3 + 32,
    };
    if modes.mouse_mode != MouseMode::X10 {
        let mods = event.modifiers;
        button += 4 * mods.shift as u16 + 8 * (mods.alt || mods.meta) as u16 + 16 * mods.ctrl as u16;
    }
    let x = event.column.saturating_add(1);
    let y = event.row.saturating_add(1);

    let bytes = match modes.mouse_format {
        MouseFormat::X10 => {
            if x > 223 || y > 223 {
                return None;
            }
            vec![ESC, b'[', b'M', (button + 32) as u8, (x + 32) as u8, (y + 32) as u8]
        },
        MouseFormat::Utf8 => {
            let mut bytes = vec![ESC, b'[', b'M'];
            for value in [button + 32, x + 32, y + 32] {
                let c = char::from_u32(u32::from(value))?;
                let mut buf = [0u8; 4];
                bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
            bytes
        },
        MouseFormat::Sgr => {
            let final_char = if release { 'm' } else { 'M' };
            format!("\x1b[<{};{};{}{}", button, x, y, final_char).into_bytes()
        },
        MouseFormat::Urxvt => format!("\x1b[{};{};{}M", button + 32, x, y).into_bytes(),
    };
    Some(bytes)
}

/// `CSI I` / `CSI O` when focus reporting is on
pub fn encode_focus(gained: bool, modes: &Modes) -> Option<Vec<u8>> {
    if !modes.focus_events {
        return None;
    }
    Some(if gained { b"\x1b[I".to_vec() } else { b"\x1b[O".to_vec() })
}

/// Prepare pasted text: line breaks become CR, and with bracketed paste the
/// text is wrapped in `CSI 200~ .. CSI 201~` (with any embedded end marker
/// removed)
pub fn encode_paste(text: &str, modes: &Modes) -> Vec<u8> {
    let normalized = text.replace("\r\n", "\r").replace('\n', "\r");
    if !modes.bracketed_paste {
        return normalized.into_bytes();
    }
    let body = normalized.replace("\x1b[201~", "");
    let mut bytes = Vec::with_capacity(body.len() + 12);
    bytes.extend_from_slice(b"\x1b[200~");
    bytes.extend_from_slice(body.as_bytes());
    bytes.extend_from_slice(b"\x1b[201~");
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Os;

    fn linux() -> KeyEncoder {
        KeyEncoder::new(PlatformInfo::new(Os::Linux))
    }

    fn mac() -> KeyEncoder {
        KeyEncoder::new(PlatformInfo::new(Os::MacOs))
    }

    fn key(encoder: &KeyEncoder, key: Key, modifiers: Modifiers) -> Vec<u8> {
        encoder.encode(key, modifiers, &Modes::default())
    }

    #[test]
    fn test_modifier_code() {
        assert_eq!(Modifiers::NONE.code(), 1);
        assert_eq!(Modifiers::shift().code(), 2);
        assert_eq!(Modifiers::alt().code(), 3);
        assert_eq!(Modifiers::ctrl().code(), 5);
        assert_eq!(Modifiers::meta().code(), 9);
        let all = Modifiers {
            shift: true,
            alt: true,
            ctrl: true,
            meta: true,
        };
        assert_eq!(all.code(), 16);
    }

    #[test]
    fn test_plain_and_control_chars() {
        let enc = linux();
        assert_eq!(key(&enc, Key::Char('a'), Modifiers::NONE), b"a");
        assert_eq!(key(&enc, Key::Char('c'), Modifiers::ctrl()), vec![0x03]);
        assert_eq!(key(&enc, Key::Char('['), Modifiers::ctrl()), vec![0x1b]);
        assert_eq!(key(&enc, Key::Char('é'), Modifiers::NONE), "é".as_bytes());
    }

    #[test]
    fn test_alt_prefixes_escape() {
        let mut enc = linux();
        assert_eq!(key(&enc, Key::Char('x'), Modifiers::alt()), b"\x1bx");
        assert_eq!(key(&enc, Key::Backspace, Modifiers::alt()), b"\x1b\x7f");
        enc.alt_sends_escape = false;
        assert_eq!(key(&enc, Key::Char('x'), Modifiers::alt()), b"x");
    }

    #[test]
    fn test_cursor_keys() {
        let enc = linux();
        let mut modes = Modes::default();
        assert_eq!(enc.encode(Key::Up, Modifiers::NONE, &modes), b"\x1b[A");
        modes.application_cursor_keys = true;
        assert_eq!(enc.encode(Key::Up, Modifiers::NONE, &modes), b"\x1bOA");
        assert_eq!(enc.encode(Key::Up, Modifiers::shift(), &modes), b"\x1b[1;2A");
        assert_eq!(key(&enc, Key::Left, Modifiers::ctrl()), b"\x1b[1;5D");
        assert_eq!(key(&enc, Key::Left, Modifiers::alt()), b"\x1b[1;3D");
    }

    #[test]
    fn test_macos_word_navigation() {
        let enc = mac();
        assert_eq!(key(&enc, Key::Left, Modifiers::alt()), b"\x1bb");
        assert_eq!(key(&enc, Key::Right, Modifiers::alt()), b"\x1bf");
        assert_eq!(key(&enc, Key::Left, Modifiers::meta()), vec![0x01]);
        assert_eq!(key(&enc, Key::Right, Modifiers::meta()), vec![0x05]);
        assert_eq!(key(&enc, Key::Left, Modifiers::NONE), b"\x1b[D");
    }

    #[test]
    fn test_home_end_follow_keypad_mode() {
        let enc = linux();
        let mut modes = Modes::default();
        assert_eq!(enc.encode(Key::Home, Modifiers::NONE, &modes), b"\x1b[H");
        modes.application_keypad = true;
        assert_eq!(enc.encode(Key::End, Modifiers::NONE, &modes), b"\x1bOF");
        assert_eq!(enc.encode(Key::End, Modifiers::ctrl(), &modes), b"\x1b[1;5F");
    }

    #[test]
    fn test_editing_keys() {
        let enc = linux();
        assert_eq!(key(&enc, Key::Insert, Modifiers::NONE), b"\x1b[2~");
        assert_eq!(key(&enc, Key::Delete, Modifiers::NONE), b"\x1b[3~");
        assert_eq!(key(&enc, Key::PageUp, Modifiers::NONE), b"\x1b[5~");
        assert_eq!(key(&enc, Key::PageDown, Modifiers::shift()), b"\x1b[6;2~");
    }

    #[test]
    fn test_function_keys() {
        let enc = linux();
        assert_eq!(key(&enc, Key::F(1), Modifiers::NONE), b"\x1bOP");
        assert_eq!(key(&enc, Key::F(4), Modifiers::NONE), b"\x1bOS");
        assert_eq!(key(&enc, Key::F(1), Modifiers::shift()), b"\x1b[1;2P");
        assert_eq!(key(&enc, Key::F(5), Modifiers::NONE), b"\x1b[15~");
        assert_eq!(key(&enc, Key::F(6), Modifiers::NONE), b"\x1b[17~");
        assert_eq!(key(&enc, Key::F(12), Modifiers::ctrl()), b"\x1b[24;5~");
        assert!(key(&enc, Key::F(20), Modifiers::NONE).is_empty());
    }

    #[test]
    fn test_enter_tab_backspace() {
        let mut enc = linux();
        assert_eq!(key(&enc, Key::Enter, Modifiers::NONE), b"\r");
        assert_eq!(key(&enc, Key::Tab, Modifiers::shift()), b"\x1b[Z");
        assert_eq!(key(&enc, Key::Backspace, Modifiers::NONE), vec![0x7f]);
        assert_eq!(key(&enc, Key::Backspace, Modifiers::ctrl()), vec![0x08]);
        enc.auto_newline = true;
        assert_eq!(key(&enc, Key::Enter, Modifiers::NONE), b"\r\n");
    }

    fn tracking(mode: MouseMode, format: MouseFormat) -> Modes {
        Modes {
            mouse_mode: mode,
            mouse_format: format,
            ..Modes::default()
        }
    }

    #[test]
    fn test_mouse_not_reported_without_mode() {
        let press = MouseEvent::new(MouseEventKind::Press(MouseButton::Left), 0, 0);
        assert!(encode_mouse(&press, &Modes::default()).is_none());
    }

    #[test]
    fn test_mouse_x10_format() {
        let modes = tracking(MouseMode::Normal, MouseFormat::X10);
        let press = MouseEvent::new(MouseEventKind::Press(MouseButton::Left), 9, 4);
        assert_eq!(encode_mouse(&press, &modes).unwrap(), vec![0x1b, b'[', b'M', 32, 42, 37]);
        let release = MouseEvent::new(MouseEventKind::Release(MouseButton::Left), 9, 4);
        assert_eq!(encode_mouse(&release, &modes).unwrap()[3], 35);
        let far = MouseEvent::new(MouseEventKind::Press(MouseButton::Left), 300, 4);
        assert!(encode_mouse(&far, &modes).is_none());
    }

    #[test]
    fn test_mouse_sgr_format() {
        let modes = tracking(MouseMode::Normal, MouseFormat::Sgr);
        let press = MouseEvent::new(MouseEventKind::Press(MouseButton::Right), 299, 0);
        assert_eq!(encode_mouse(&press, &modes).unwrap(), b"\x1b[<2;300;1M");
        let release = MouseEvent::new(MouseEventKind::Release(MouseButton::Right), 299, 0);
        assert_eq!(encode_mouse(&release, &modes).unwrap(), b"\x1b[<2;300;1m");
        let mut wheel = MouseEvent::new(MouseEventKind::Press(MouseButton::WheelDown), 0, 0);
        wheel.modifiers = Modifiers::ctrl();
        assert_eq!(encode_mouse(&wheel, &modes).unwrap(), b"\x1b[<81;1;1M");
    }

    #[test]
    fn test_mouse_urxvt_and_utf8() {
        let press = MouseEvent::new(MouseEventKind::Press(MouseButton::Left), 0, 1);
        let urxvt = tracking(MouseMode::Normal, MouseFormat::Urxvt);
        assert_eq!(encode_mouse(&press, &urxvt).unwrap(), b"\x1b[32;1;2M");
        let utf8 = tracking(MouseMode::Normal, MouseFormat::Utf8);
        let far = MouseEvent::new(MouseEventKind::Press(MouseButton::Left), 299, 0);
        let mut expected = b"\x1b[M ".to_vec();
        expected.extend_from_slice("\u{14c}".as_bytes());
        expected.push(b'!');
        assert_eq!(encode_mouse(&far, &utf8).unwrap(), expected);
    }

    #[test]
    fn test_mouse_motion_filtering() {
        let drag = MouseEvent::new(MouseEventKind::Drag(MouseButton::Left), 0, 0);
        let moved = MouseEvent::new(MouseEventKind::Move, 0, 0);
        let normal = tracking(MouseMode::Normal, MouseFormat::Sgr);
        assert!(encode_mouse(&drag, &normal).is_none());
        let button = tracking(MouseMode::ButtonEvent, MouseFormat::Sgr);
        assert_eq!(encode_mouse(&drag, &button).unwrap(), b"\x1b[<32;1;1M");
        assert!(encode_mouse(&moved, &button).is_none());
        let any = tracking(MouseMode::AnyEvent, MouseFormat::Sgr);
        assert_eq!(encode_mouse(&moved, &any).unwrap(), b"\x1b[<35;1;1M");
        let x10 = tracking(MouseMode::X10, MouseFormat::X10);
        let release = MouseEvent::new(MouseEventKind::Release(MouseButton::Left), 0, 0);
        assert!(encode_mouse(&release, &x10).is_none());
    }

    #[test]
    fn test_focus_and_paste() {
        let mut modes = Modes::default();
        assert!(encode_focus(true, &modes).is_none());
        modes.focus_events = true;
        assert_eq!(encode_focus(false, &modes).unwrap(), b"\x1b[O");

        assert_eq!(encode_paste("a\nb", &modes), b"a\rb");
        modes.bracketed_paste = true;
        assert_eq!(encode_paste("x\x1b[201~y", &modes), b"\x1b[200~xy\x1b[201~");
    }
}
