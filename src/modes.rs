//! Terminal mode flags
//!
//! ANSI modes (SM/RM) and DEC private modes (DECSET/DECRST) that the
//! emulator tracks. Modes that need more than a flag flip (alternate
//! screen, column mode, synchronized output) are applied by the terminal;
//! this module only stores the state.

use serde::{Deserialize, Serialize};

/// Which mouse events are reported to the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MouseMode {
    #[default]
    None,
    /// Mode 9: button press only
    X10,
    /// Mode 1000: press and release
    Normal,
    /// Mode 1002: press, release and drag
    ButtonEvent,
    /// Mode 1003: every motion
    AnyEvent,
}

/// Coordinate encoding for mouse reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MouseFormat {
    #[default]
    X10,
    /// Mode 1005
    Utf8,
    /// Mode 1006
    Sgr,
    /// Mode 1015
    Urxvt,
}

/// Mode flags of one terminal session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modes {
    /// IRM (4)
    pub insert: bool,
    /// LNM (20): LF also returns the carriage
    pub linefeed_newline: bool,
    /// DECCKM (?1)
    pub application_cursor_keys: bool,
    /// DECKPAM / DECKPNM
    pub application_keypad: bool,
    /// DECCOLM (?3): 132 columns
    pub column_132: bool,
    /// Allow DECCOLM to resize (?40)
    pub allow_column_switch: bool,
    /// DECSCNM (?5)
    pub reverse_video: bool,
    /// DECOM (?6)
    pub origin: bool,
    /// DECAWM (?7)
    pub auto_wrap: bool,
    /// ?12
    pub cursor_blink: bool,
    /// DECTCEM (?25)
    pub cursor_visible: bool,
    pub mouse_mode: MouseMode,
    pub mouse_format: MouseFormat,
    /// ?1004
    pub focus_events: bool,
    /// ?47, ?1047, ?1049
    pub alternate_screen: bool,
    /// ?2004
    pub bracketed_paste: bool,
    /// ?2026
    pub synchronized_output: bool,
}

impl Default for Modes {
    fn default() -> Self {
        Self {
            insert: false,
            linefeed_newline: false,
            application_cursor_keys: false,
            application_keypad: false,
            column_132: false,
            allow_column_switch: false,
            reverse_video: false,
            origin: false,
            auto_wrap: true,
            cursor_blink: false,
            cursor_visible: true,
            mouse_mode: MouseMode::None,
            mouse_format: MouseFormat::X10,
            focus_events: false,
            alternate_screen: false,
            bracketed_paste: false,
            synchronized_output: false,
        }
    }
}

impl Modes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Set an ANSI mode. Returns false if the mode is not known.
    pub fn set_ansi(&mut self, mode: u16, value: bool) -> bool {
        match mode {
            4 => self.insert = value,
            20 => self.linefeed_newline = value,
            _ => return false,
        }
        true
    }

    pub fn ansi(&self, mode: u16) -> Option<bool> {
        match mode {
            4 => Some(self.insert),
            20 => Some(self.linefeed_newline),
            _ => None,
        }
    }

    /// Set a DEC private mode flag. Returns false if the mode is not known.
    pub fn set_dec(&mut self, mode: u16, value: bool) -> bool {
        match mode {
            1 => self.application_cursor_keys = value,
            3 => self.column_132 = value,
            5 => self.reverse_video = value,
            6 => self.origin = value,
            7 => self.auto_wrap = value,
            12 => self.cursor_blink = value,
            25 => self.cursor_visible = value,
            40 => self.allow_column_switch = value,
            9 | 1000 | 1002 | 1003 => self.set_mouse_mode(mode, value),
            1004 => self.focus_events = value,
            1005 | 1006 | 1015 => self.set_mouse_format(mode, value),
            47 | 1047 | 1049 => self.alternate_screen = value,
            2004 => self.bracketed_paste = value,
            2026 => self.synchronized_output = value,
            _ => return false,
        }
        true
    }

    /// Current value of a DEC private mode, `None` if unknown
    pub fn dec(&self, mode: u16) -> Option<bool> {
        let value = match mode {
            1 => self.application_cursor_keys,
            3 => self.column_132,
            5 => self.reverse_video,
            6 => self.origin,
            7 => self.auto_wrap,
            12 => self.cursor_blink,
            25 => self.cursor_visible,
            40 => self.allow_column_switch,
            9 => self.mouse_mode == MouseMode::X10,
            1000 => self.mouse_mode == MouseMode::Normal,
            1002 => self.mouse_mode == MouseMode::ButtonEvent,
            1003 => self.mouse_mode == MouseMode::AnyEvent,
            1004 => self.focus_events,
            1005 => self.mouse_format == MouseFormat::Utf8,
            1006 => self.mouse_format == MouseFormat::Sgr,
            1015 => self.mouse_format == MouseFormat::Urxvt,
            47 | 1047 | 1049 => self.alternate_screen,
            2004 => self.bracketed_paste,
            2026 => self.synchronized_output,
            _ => return None,
        };
        Some(value)
    }

    fn set_mouse_mode(&mut self, mode: u16, value: bool) {
        let requested = match mode {
            9 => MouseMode::X10,
            1000 => MouseMode::Normal,
            1002 => MouseMode::ButtonEvent,
            _ => MouseMode::AnyEvent,
        };
        if value {
            self.mouse_mode = requested;
        } else if self.mouse_mode == requested {
            self.mouse_mode = MouseMode::None;
        }
    }

    fn set_mouse_format(&mut self, mode: u16, value: bool) {
        let requested = match mode {
            1005 => MouseFormat::Utf8,
            1006 => MouseFormat::Sgr,
            _ => MouseFormat::Urxvt,
        };
        if value {
            self.mouse_format = requested;
        } else if self.mouse_format == requested {
            self.mouse_format = MouseFormat::X10;
        }
    }

    pub fn mouse_tracking(&self) -> bool {
        self.mouse_mode != MouseMode::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let modes = Modes::new();
        assert!(modes.auto_wrap);
        assert!(modes.cursor_visible);
        assert!(!modes.mouse_tracking());
        assert_eq!(modes.dec(7), Some(true));
        assert_eq!(modes.dec(31337), None);
    }

    #[test]
    fn test_mouse_modes_replace_each_other() {
        let mut modes = Modes::new();
        modes.set_dec(1000, true);
        modes.set_dec(1003, true);
        assert_eq!(modes.mouse_mode, MouseMode::AnyEvent);
        // Resetting a mode that is not active leaves the current one
        modes.set_dec(1000, false);
        assert_eq!(modes.mouse_mode, MouseMode::AnyEvent);
        modes.set_dec(1003, false);
        assert!(!modes.mouse_tracking());
    }

    #[test]
    fn test_mouse_format() {
        let mut modes = Modes::new();
        assert!(modes.set_dec(1006, true));
        assert_eq!(modes.mouse_format, MouseFormat::Sgr);
        assert_eq!(modes.dec(1006), Some(true));
        modes.set_dec(1006, false);
        assert_eq!(modes.mouse_format, MouseFormat::X10);
    }

    #[test]
    fn test_ansi_modes() {
        let mut modes = Modes::new();
        assert!(modes.set_ansi(4, true));
        assert!(modes.insert);
        assert!(!modes.set_ansi(99, true));
        assert_eq!(modes.ansi(20), Some(false));
    }
}
