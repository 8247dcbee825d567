//! Terminal state management
//!
//! [`Terminal`] holds everything escape sequences act on apart from the
//! lines themselves: cursor, pen style, modes, tab stops, character sets,
//! titles, palette and the queue of replies for the host. Lines live in the
//! shared [`TerminalTextBuffer`]; every edit goes through its lock.
//!
//! The emulator reads sequences off the stream and hands them to the
//! `handle_*` methods here.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::buffer::{BufferState, TerminalTextBuffer};
use crate::charset::{Charset, CharsetState};
use crate::color::{Color, Rgb};
use crate::cursor::{Cursor, CursorShape, SavedCursor};
use crate::hyperlink::HyperlinkRegistry;
use crate::line::DWC;
use crate::modes::Modes;
use crate::palette::ColorPalette;
use crate::sequence::{ControlSequence, DeviceControlSequence, SystemCommandSequence};
use crate::style::{HyperlinkId, StyleCache, StyleOptions, TextStyle, UnderlineStyle};
use crate::width::{cell_width, DoubleWidthProvider, UnicodeWidthProvider};

const TAB_WIDTH: usize = 8;
const TITLE_STACK_LIMIT: usize = 10;

/// Primary device attributes: VT220 with 132 columns, selective erase and ANSI color
const DA1_RESPONSE: &[u8] = b"\x1b[?62;1;6;22c";
/// Secondary device attributes
const DA2_RESPONSE: &[u8] = b"\x1b[>0;276;0c";

/// What an OSC 52 sequence asks of the clipboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardAction {
    /// Store the decoded text
    Set(String),
    /// Report the clipboard contents
    Query,
    Clear,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardRequest {
    /// Selection letters as sent (`c`, `p`, `s`, ...)
    pub selection: String,
    pub action: ClipboardAction,
}

/// Shell integration marks (OSC 133)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandMarker {
    PromptStarted,
    CommandStarted,
    CommandExecuted,
    CommandFinished { exit_code: Option<i32> },
}

/// Receives events the host may want to act on.
///
/// Every method has an empty default so implementors pick what they need.
pub trait TerminalListener: Send {
    fn on_bell(&mut self) {}

    fn on_title_changed(&mut self, _title: &str) {}

    fn on_working_directory_changed(&mut self, _uri: &str) {}

    /// A hyperlink started (`Some(uri)`) or ended (`None`)
    fn on_hyperlink(&mut self, _uri: Option<&str>) {}

    fn on_clipboard(&mut self, _request: ClipboardRequest) {}

    fn on_command_marker(&mut self, _marker: CommandMarker) {}

    /// OSC 1341: application defined command
    fn on_custom_command(&mut self, _args: &[String]) {}

    fn on_mode_changed(&mut self, _modes: &Modes) {}

    fn on_cursor_shape_changed(&mut self, _shape: CursorShape, _blinking: bool) {}

    /// Fired once per processed unit of input
    fn on_content_changed(&mut self) {}
}

/// Listener that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullListener;

impl TerminalListener for NullListener {}

fn default_tab_stops(width: usize) -> Vec<bool> {
    (0..width).map(|i| i > 0 && i % TAB_WIDTH == 0).collect()
}

/// Terminal emulator state
pub struct Terminal {
    buffer: Arc<TerminalTextBuffer>,
    cursor: Cursor,
    /// DECSC slots for the main and the alternate screen
    saved: [SavedCursor; 2],
    pen: TextStyle,
    pen_style: Arc<TextStyle>,
    styles: StyleCache,
    /// Scroll region rows, `bottom` exclusive
    scroll_top: usize,
    scroll_bottom: usize,
    modes: Modes,
    tab_stops: Vec<bool>,
    charsets: CharsetState,
    hyperlinks: HyperlinkRegistry,
    window_title: String,
    icon_title: String,
    title_stack: Vec<(String, String)>,
    working_directory: Option<String>,
    palette: ColorPalette,
    default_palette: ColorPalette,
    /// Replies to send back to the application
    pending_responses: Vec<Vec<u8>>,
    listener: Box<dyn TerminalListener>,
    width_provider: Arc<dyn DoubleWidthProvider>,
    ambiguous_as_wide: bool,
    /// LF, VT and FF also return to column 0, even without LNM
    implicit_carriage_return: bool,
    last_printed: Option<char>,
}

impl std::fmt::Debug for Terminal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Terminal")
            .field("cursor", &self.cursor)
            .field("scroll_region", &(self.scroll_top, self.scroll_bottom))
            .field("modes", &self.modes)
            .field("width_provider", &self.width_provider.name())
            .finish()
    }
}

impl Terminal {
    /// Create a terminal drawing into `buffer`
    pub fn new(buffer: Arc<TerminalTextBuffer>) -> Self {
        let width = buffer.width();
        let height = buffer.height();
        let styles = StyleCache::default();
        let pen_style = styles.empty();
        Self {
            buffer,
            cursor: Cursor::new(),
            saved: [SavedCursor::default(), SavedCursor::default()],
            pen: TextStyle::EMPTY,
            pen_style,
            styles,
            scroll_top: 0,
            scroll_bottom: height,
            modes: Modes::new(),
            tab_stops: default_tab_stops(width),
            charsets: CharsetState::new(),
            hyperlinks: HyperlinkRegistry::default(),
            window_title: String::new(),
            icon_title: String::new(),
            title_stack: Vec::new(),
            working_directory: None,
            palette: ColorPalette::default(),
            default_palette: ColorPalette::default(),
            pending_responses: Vec::new(),
            listener: Box::new(NullListener),
            width_provider: Arc::new(UnicodeWidthProvider),
            ambiguous_as_wide: false,
            implicit_carriage_return: true,
            last_printed: None,
        }
    }

    pub fn with_listener(mut self, listener: Box<dyn TerminalListener>) -> Self {
        self.listener = listener;
        self
    }

    pub fn with_palette(mut self, palette: ColorPalette) -> Self {
        self.default_palette = palette.clone();
        self.palette = palette;
        self
    }

    pub fn with_width_provider(mut self, provider: Arc<dyn DoubleWidthProvider>, ambiguous_as_wide: bool) -> Self {
        self.width_provider = provider;
        self.ambiguous_as_wide = ambiguous_as_wide;
        self
    }

    /// Whether a line feed also moves to column 0 when LNM is reset.
    ///
    /// On by default, for input recorded without a tty translating `\n`.
    pub fn with_implicit_carriage_return(mut self, enabled: bool) -> Self {
        self.implicit_carriage_return = enabled;
        self
    }

    pub fn set_listener(&mut self, listener: Box<dyn TerminalListener>) {
        self.listener = listener;
    }

    pub fn buffer(&self) -> &Arc<TerminalTextBuffer> {
        &self.buffer
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    /// Cursor position as 1-based `(column, row)`
    pub fn cursor_position(&self) -> (usize, usize) {
        (self.cursor.col + 1, self.cursor.row + 1)
    }

    /// Style applied to newly written text
    pub fn pen(&self) -> &TextStyle {
        &self.pen
    }

    pub fn modes(&self) -> &Modes {
        &self.modes
    }

    /// Scroll region as 0-based rows, bottom exclusive
    pub fn scroll_region(&self) -> (usize, usize) {
        (self.scroll_top, self.scroll_bottom)
    }

    pub fn charsets(&self) -> &CharsetState {
        &self.charsets
    }

    pub fn window_title(&self) -> &str {
        &self.window_title
    }

    pub fn icon_title(&self) -> &str {
        &self.icon_title
    }

    pub fn working_directory(&self) -> Option<&str> {
        self.working_directory.as_deref()
    }

    pub fn palette(&self) -> &ColorPalette {
        &self.palette
    }

    pub fn palette_mut(&mut self) -> &mut ColorPalette {
        &mut self.palette
    }

    /// URI registered for a hyperlink id found in a text style
    pub fn hyperlink(&self, id: HyperlinkId) -> Option<&str> {
        self.hyperlinks.get(id)
    }

    /// Number of hyperlinks currently registered
    pub fn hyperlink_count(&self) -> usize {
        self.hyperlinks.len()
    }

    pub fn ambiguous_chars_are_double_width(&self) -> bool {
        self.ambiguous_as_wide
    }

    /// Take pending responses that need to be sent back to the application
    pub fn take_responses(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.pending_responses)
    }

    fn queue_response(&mut self, response: Vec<u8>) {
        log::trace!("queued response {:?}", String::from_utf8_lossy(&response));
        self.pending_responses.push(response);
    }

    /// Tell the listener a unit of input has been applied
    pub fn content_changed(&mut self) {
        self.listener.on_content_changed();
    }

    /// A synchronized block was applied; its end marker never reaches us
    pub(crate) fn end_synchronized_output(&mut self) {
        if self.modes.synchronized_output {
            self.modes.synchronized_output = false;
            self.listener.on_mode_changed(&self.modes);
        }
    }

    fn width(&self) -> usize {
        self.buffer.width()
    }

    fn height(&self) -> usize {
        self.buffer.height()
    }

    fn set_pen(&mut self, pen: TextStyle) {
        self.pen = pen;
        self.pen_style = self.styles.intern(pen);
    }

    /// Style for erased cells: the pen's background only
    fn erase_style(&mut self) -> Arc<TextStyle> {
        let style = self.pen.erase_style();
        self.styles.intern(style)
    }

    fn saved_slot(&self) -> usize {
        usize::from(self.buffer.is_using_alternate())
    }

    /// Cells left before the right margin, at least 1
    pub fn distance_to_line_end(&self) -> usize {
        let width = self.width();
        if self.cursor.pending_wrap {
            if self.modes.auto_wrap {
                width
            } else {
                1
            }
        } else {
            width.saturating_sub(self.cursor.col).max(1)
        }
    }

    // ---------------------------------------------------------------------
    // Text output
    // ---------------------------------------------------------------------

    /// Write printable text at the cursor with the current pen
    pub fn write_characters(&mut self, text: &str) {
        let width = self.width();
        let mut run: Vec<char> = Vec::with_capacity(text.len());
        let mut run_x = self.cursor.col;

        for c in text.chars() {
            if ('\u{80}'..='\u{9f}').contains(&c) {
                log::trace!("dropping C1 control U+{:04X} inside text", c as u32);
                continue;
            }
            let c = self.charsets.translate(c);
            let cells = cell_width(self.width_provider.as_ref(), c, self.ambiguous_as_wide);
            if cells == 0 {
                log::trace!("dropping zero-width character U+{:04X}", c as u32);
                continue;
            }
            if cells > width {
                continue;
            }

            if self.cursor.pending_wrap {
                self.flush_run(run_x, &mut run);
                if self.modes.auto_wrap {
                    self.wrap_line();
                } else {
                    self.cursor.pending_wrap = false;
                }
                run_x = self.cursor.col;
            }

            // A wide character never straddles the right margin
            if cells == 2 && self.cursor.col + 2 > width {
                if self.modes.auto_wrap {
                    run.push(' ');
                    self.flush_run(run_x, &mut run);
                    self.wrap_line();
                } else {
                    self.flush_run(run_x, &mut run);
                    self.cursor.col = width - 2;
                }
                run_x = self.cursor.col;
            }

            run.push(c);
            if cells == 2 {
                run.push(DWC);
            }
            self.last_printed = Some(c);

            let next = self.cursor.col + cells;
            if next >= width {
                self.cursor.col = width - 1;
                self.cursor.pending_wrap = true;
            } else {
                self.cursor.col = next;
            }
        }
        self.flush_run(run_x, &mut run);
    }

    fn flush_run(&mut self, x: usize, run: &mut Vec<char>) {
        if run.is_empty() {
            return;
        }
        let y = self.cursor.row;
        let insert = self.modes.insert;
        let style = self.pen_style.clone();
        let blank = self.styles.empty();
        let chars: &[char] = run;
        self.buffer.modify(|state| {
            if insert {
                state.insert_blank_characters(x, y, chars.len(), &blank);
            }
            state.write_string(x, y, chars, &style);
        });
        run.clear();
    }

    /// Soft wrap: mark the current row as continued and move to the next
    fn wrap_line(&mut self) {
        let y = self.cursor.row;
        self.buffer.modify(|state| state.set_line_wrapped(y, true));
        self.cursor.carriage_return();
        self.index();
    }

    // ---------------------------------------------------------------------
    // Cursor motion and scrolling
    // ---------------------------------------------------------------------

    /// IND: move down, scrolling the region at its bottom margin
    fn index(&mut self) {
        self.cursor.pending_wrap = false;
        let row = self.cursor.row;
        if row + 1 == self.scroll_bottom {
            self.scroll_region_up(1);
        } else if row + 1 < self.height() {
            self.cursor.row += 1;
        }
    }

    /// RI: move up, scrolling the region at its top margin
    fn reverse_index(&mut self) {
        self.cursor.pending_wrap = false;
        let row = self.cursor.row;
        if row == self.scroll_top {
            self.scroll_region_down(1);
        } else if row > 0 {
            self.cursor.row -= 1;
        }
    }

    fn new_line(&mut self) {
        self.index();
        if self.modes.linefeed_newline || self.implicit_carriage_return {
            self.cursor.carriage_return();
        }
    }

    fn backspace(&mut self) {
        self.cursor.move_left(1);
    }

    fn horizontal_tab(&mut self) {
        let width = self.width();
        let start = self.cursor.col + 1;
        let col = (start..width)
            .find(|&i| self.tab_stops.get(i).copied().unwrap_or(false))
            .unwrap_or(width - 1);
        self.cursor.set_col(col, width);
    }

    fn back_tab(&mut self) {
        let col = (0..self.cursor.col)
            .rev()
            .find(|&i| self.tab_stops.get(i).copied().unwrap_or(false))
            .unwrap_or(0);
        self.cursor.col = col;
        self.cursor.pending_wrap = false;
    }

    fn scroll_region_up(&mut self, count: usize) {
        let style = self.erase_style();
        let (top, bottom) = (self.scroll_top, self.scroll_bottom);
        self.buffer.modify(|state| state.scroll_up(top, bottom, count, &style));
    }

    fn scroll_region_down(&mut self, count: usize) {
        let style = self.erase_style();
        let (top, bottom) = (self.scroll_top, self.scroll_bottom);
        self.buffer.modify(|state| state.scroll_down(top, bottom, count, &style));
    }

    /// Absolute positioning, relative to the scroll region in origin mode
    fn goto(&mut self, row: usize, col: usize) {
        let width = self.width();
        let (top, bottom) = if self.modes.origin {
            (self.scroll_top, self.scroll_bottom)
        } else {
            (0, self.height())
        };
        self.cursor.row = (top + row).min(bottom - 1);
        self.cursor.col = col.min(width - 1);
        self.cursor.pending_wrap = false;
    }

    fn cursor_home(&mut self) {
        self.goto(0, 0);
    }

    fn cursor_up(&mut self, n: usize) {
        self.cursor.move_up(n, self.scroll_top);
    }

    fn cursor_down(&mut self, n: usize) {
        let bottom = if self.cursor.row < self.scroll_bottom {
            self.scroll_bottom - 1
        } else {
            self.height() - 1
        };
        self.cursor.move_down(n, bottom);
    }

    fn save_cursor(&mut self) {
        let slot = self.saved_slot();
        self.saved[slot] = SavedCursor {
            col: self.cursor.col,
            row: self.cursor.row,
            style: self.pen,
            charsets: self.charsets,
            origin_mode: self.modes.origin,
            autowrap: self.modes.auto_wrap,
        };
    }

    fn restore_cursor(&mut self) {
        let saved = self.saved[self.saved_slot()].clone();
        self.cursor.col = saved.col;
        self.cursor.row = saved.row;
        self.cursor.clamp(self.width(), self.height());
        self.charsets = saved.charsets;
        self.modes.origin = saved.origin_mode;
        self.modes.auto_wrap = saved.autowrap;
        self.set_pen(saved.style);
    }

    // ---------------------------------------------------------------------
    // Erasing and editing
    // ---------------------------------------------------------------------

    fn erase_in_display(&mut self, mode: u16) {
        let (width, height) = (self.width(), self.height());
        let (x, y) = (self.cursor.col, self.cursor.row);
        let style = self.erase_style();
        self.buffer.modify(|state| match mode {
            0 => {
                state.clear_area(x, y, width, y + 1, &style);
                state.clear_area(0, y + 1, width, height, &style);
            },
            1 => {
                state.clear_area(0, 0, width, y, &style);
                state.clear_area(0, y, x + 1, y + 1, &style);
            },
            2 => {
                state.move_screen_to_history();
                state.clear_area(0, 0, width, height, &style);
            },
            3 => {
                state.clear_history();
                state.clear_area(0, 0, width, height, &style);
            },
            _ => log::debug!("Unsupported erase in display mode: {}", mode),
        });
    }

    fn erase_in_line(&mut self, mode: u16) {
        let width = self.width();
        let (x, y) = (self.cursor.col, self.cursor.row);
        let style = self.erase_style();
        self.buffer.modify(|state| match mode {
            0 => state.clear_area(x, y, width, y + 1, &style),
            1 => state.clear_area(0, y, x + 1, y + 1, &style),
            2 => state.clear_area(0, y, width, y + 1, &style),
            _ => log::debug!("Unsupported erase in line mode: {}", mode),
        });
    }

    fn in_scroll_region(&self) -> bool {
        (self.scroll_top..self.scroll_bottom).contains(&self.cursor.row)
    }

    fn insert_lines(&mut self, n: usize) {
        if !self.in_scroll_region() {
            return;
        }
        let style = self.erase_style();
        let (y, bottom) = (self.cursor.row, self.scroll_bottom);
        self.buffer.modify(|state| state.insert_lines(y, n, bottom, &style));
        self.cursor.carriage_return();
    }

    fn delete_lines(&mut self, n: usize) {
        if !self.in_scroll_region() {
            return;
        }
        let style = self.erase_style();
        let (y, bottom) = (self.cursor.row, self.scroll_bottom);
        self.buffer.modify(|state| state.delete_lines(y, n, bottom, &style));
        self.cursor.carriage_return();
    }

    fn insert_chars(&mut self, n: usize) {
        let style = self.erase_style();
        let (x, y) = (self.cursor.col, self.cursor.row);
        self.buffer.modify(|state| state.insert_blank_characters(x, y, n, &style));
        self.cursor.pending_wrap = false;
    }

    fn delete_chars(&mut self, n: usize) {
        let style = self.erase_style();
        let (x, y) = (self.cursor.col, self.cursor.row);
        self.buffer.modify(|state| state.delete_characters(x, y, n, &style));
        self.cursor.pending_wrap = false;
    }

    fn erase_chars(&mut self, n: usize) {
        let style = self.erase_style();
        let (x, y) = (self.cursor.col, self.cursor.row);
        self.buffer.modify(|state| state.erase_characters(x, y, n, &style));
    }

    fn set_scroll_region(&mut self, top: usize, bottom: usize) {
        let height = self.height();
        let bottom = bottom.min(height);
        if top + 1 >= bottom {
            log::debug!("Ignoring scroll region {}..{}", top, bottom);
            return;
        }
        self.scroll_top = top;
        self.scroll_bottom = bottom;
        self.cursor_home();
    }

    fn reset_scroll_region(&mut self) {
        self.scroll_top = 0;
        self.scroll_bottom = self.height();
    }

    fn use_alternate_screen(&mut self, enabled: bool) {
        self.modes.alternate_screen = enabled;
        self.buffer.modify(|state| state.use_alternate(enabled));
    }

    // ---------------------------------------------------------------------
    // Controls and escape sequences
    // ---------------------------------------------------------------------

    /// Execute a C0 control character
    pub fn handle_control(&mut self, c: char) {
        match c {
            '\x00' => {},
            '\x07' => {
                // BEL
                self.listener.on_bell();
            },
            '\x08' => {
                // BS
                self.backspace();
            },
            '\x09' => {
                // HT
                self.horizontal_tab();
            },
            '\x0a' | '\x0b' | '\x0c' => {
                // LF, VT, FF
                self.new_line();
            },
            '\x0d' => {
                // CR
                self.cursor.carriage_return();
            },
            '\x0e' => {
                // SO - Shift Out (select G1)
                self.charsets.invoke_gl(1);
            },
            '\x0f' => {
                // SI - Shift In (select G0)
                self.charsets.invoke_gl(0);
            },
            _ => {
                log::debug!("Unhandled control character: {:?}", c);
            },
        }
    }

    /// Handle `ESC [intermediate] final`
    pub fn handle_esc(&mut self, intermediate: Option<char>, final_char: char) {
        match (intermediate, final_char) {
            (None, '7') => {
                // DECSC
                self.save_cursor();
            },
            (None, '8') => {
                // DECRC
                self.restore_cursor();
            },
            (None, 'D') => {
                // IND
                self.index();
            },
            (None, 'E') => {
                // NEL
                self.cursor.carriage_return();
                self.index();
            },
            (None, 'H') => {
                // HTS
                let col = self.cursor.col;
                if let Some(stop) = self.tab_stops.get_mut(col) {
                    *stop = true;
                }
            },
            (None, 'M') => {
                // RI
                self.reverse_index();
            },
            (None, 'N') => self.charsets.single_shift(2),
            (None, 'O') => self.charsets.single_shift(3),
            (None, '=') => {
                // DECKPAM
                self.modes.application_keypad = true;
                self.listener.on_mode_changed(&self.modes);
            },
            (None, '>') => {
                // DECKPNM
                self.modes.application_keypad = false;
                self.listener.on_mode_changed(&self.modes);
            },
            (None, 'c') => {
                // RIS
                self.reset();
            },
            (None, 'F') => {
                // Cursor to lower left corner
                let bottom = self.height() - 1;
                self.cursor.row = bottom;
                self.cursor.carriage_return();
            },
            (None, 'n') => self.charsets.invoke_gl(2),
            (None, 'o') => self.charsets.invoke_gl(3),
            (None, '|') => self.charsets.invoke_gr(3),
            (None, '}') => self.charsets.invoke_gr(2),
            (None, '~') => self.charsets.invoke_gr(1),
            (None, '\\') => {
                // Stray string terminator
            },
            (Some('#'), '8') => {
                // DECALN - fill the screen with 'E'
                self.buffer.modify(|state| state.fill_screen('E'));
                self.reset_scroll_region();
                self.cursor_home();
            },
            (Some('#'), '3' | '4' | '5' | '6') => {
                log::debug!("Line size change ignored: ESC # {}", final_char);
            },
            (Some(slot @ ('(' | ')' | '*' | '+')), designator) => {
                let index = match slot {
                    '(' => 0,
                    ')' => 1,
                    '*' => 2,
                    _ => 3,
                };
                self.charsets.designate(index, Charset::from_designator(designator));
            },
            (Some(slot @ ('-' | '.' | '/')), designator) => {
                let index = match slot {
                    '-' => 1,
                    '.' => 2,
                    _ => 3,
                };
                self.charsets.designate(index, Charset::from_designator(designator));
            },
            (Some(' '), 'F' | 'G' | 'L' | 'M' | 'N') => {
                log::debug!("Conformance level ESC SP {} ignored", final_char);
            },
            (Some('%'), _) => {
                log::debug!("Character set selection ESC % {} ignored", final_char);
            },
            _ => {
                log::debug!("Unknown ESC sequence: {:?} {:?}", intermediate, final_char);
            },
        }
    }

    /// Handle a CSI sequence
    pub fn handle_csi(&mut self, csi: &ControlSequence) {
        match csi.prefix() {
            Some('?') => {
                self.handle_csi_private(csi);
                return;
            },
            Some('>') => {
                self.handle_csi_secondary(csi);
                return;
            },
            Some('!') if csi.final_char() == 'p' => {
                // DECSTR - Soft Terminal Reset
                self.soft_reset();
                return;
            },
            Some(_) => {
                log::debug!("Unknown CSI sequence: {}", csi);
                return;
            },
            None => {},
        }

        if !csi.intermediates().is_empty() {
            self.handle_csi_intermediate(csi);
            return;
        }

        let n = csi.arg(0, 1) as usize;
        match csi.final_char() {
            '@' => {
                // ICH - Insert Character
                self.insert_chars(n);
            },
            'A' => {
                // CUU - Cursor Up
                self.cursor_up(n);
            },
            'B' | 'e' => {
                // CUD - Cursor Down, VPR - Vertical Position Relative
                self.cursor_down(n);
            },
            'C' | 'a' => {
                // CUF - Cursor Forward, HPR - Horizontal Position Relative
                let width = self.width();
                self.cursor.move_right(n, width);
            },
            'D' => {
                // CUB - Cursor Back
                self.cursor.move_left(n);
            },
            'E' => {
                // CNL - Cursor Next Line
                self.cursor_down(n);
                self.cursor.carriage_return();
            },
            'F' => {
                // CPL - Cursor Previous Line
                self.cursor_up(n);
                self.cursor.carriage_return();
            },
            'G' | '`' => {
                // CHA - Cursor Horizontal Absolute, HPA
                let width = self.width();
                self.cursor.set_col(n - 1, width);
            },
            'H' | 'f' => {
                // CUP/HVP - Cursor Position
                let row = csi.arg(0, 1) as usize - 1;
                let col = csi.arg(1, 1) as usize - 1;
                self.goto(row, col);
            },
            'I' => {
                // CHT - Cursor Forward Tabulation
                for _ in 0..n {
                    self.horizontal_tab();
                }
            },
            'J' => {
                // ED - Erase in Display
                self.erase_in_display(csi.raw(0));
            },
            'K' => {
                // EL - Erase in Line
                self.erase_in_line(csi.raw(0));
            },
            'L' => {
                // IL - Insert Line
                self.insert_lines(n);
            },
            'M' => {
                // DL - Delete Line
                self.delete_lines(n);
            },
            'P' => {
                // DCH - Delete Character
                self.delete_chars(n);
            },
            'S' => {
                // SU - Scroll Up
                self.scroll_region_up(n);
            },
            'T' => {
                // SD - Scroll Down
                self.scroll_region_down(n);
            },
            'X' => {
                // ECH - Erase Character
                self.erase_chars(n);
            },
            'Z' => {
                // CBT - Cursor Backward Tabulation
                for _ in 0..n {
                    self.back_tab();
                }
            },
            'b' => {
                // REP - Repeat preceding character
                if let Some(c) = self.last_printed {
                    let text: String = std::iter::repeat(c).take(n).collect();
                    self.write_characters(&text);
                }
            },
            'c' => {
                // DA1 - Primary Device Attributes
                if csi.raw(0) == 0 {
                    self.queue_response(DA1_RESPONSE.to_vec());
                }
            },
            'd' => {
                // VPA - Vertical Position Absolute
                let col = self.cursor.col;
                self.goto(n - 1, col);
            },
            'g' => {
                // TBC - Tab Clear
                match csi.raw(0) {
                    0 => {
                        let col = self.cursor.col;
                        if let Some(stop) = self.tab_stops.get_mut(col) {
                            *stop = false;
                        }
                    },
                    3 => self.tab_stops.iter_mut().for_each(|stop| *stop = false),
                    other => log::debug!("Unknown tab clear mode: {}", other),
                }
            },
            'h' => {
                // SM - Set Mode
                self.set_ansi_modes(csi, true);
            },
            'l' => {
                // RM - Reset Mode
                self.set_ansi_modes(csi, false);
            },
            'm' => {
                // SGR - Select Graphic Rendition
                self.handle_sgr(csi);
            },
            'n' => {
                // DSR - Device Status Report
                match csi.raw(0) {
                    5 => self.queue_response(b"\x1b[0n".to_vec()),
                    6 => {
                        let (row, col) = self.report_position();
                        self.queue_response(format!("\x1b[{};{}R", row, col).into_bytes());
                    },
                    other => log::debug!("DSR request with unknown mode: {}", other),
                }
            },
            'r' => {
                // DECSTBM - Set Top and Bottom Margins
                let height = self.height().min(u16::MAX as usize) as u16;
                let top = csi.arg(0, 1) as usize - 1;
                let bottom = csi.arg(1, height) as usize;
                self.set_scroll_region(top, bottom);
            },
            's' => {
                // Save cursor (ANSI.SYS)
                self.save_cursor();
            },
            't' => {
                self.handle_window_op(csi);
            },
            'u' => {
                // Restore cursor (ANSI.SYS)
                self.restore_cursor();
            },
            _ => {
                log::debug!("Unknown CSI sequence: {}", csi);
            },
        }
    }

    /// Cursor position for reports, relative to the region in origin mode
    fn report_position(&self) -> (usize, usize) {
        let row = if self.modes.origin {
            self.cursor.row.saturating_sub(self.scroll_top)
        } else {
            self.cursor.row
        };
        (row + 1, self.cursor.col + 1)
    }

    /// Handle CSI sequences with private marker (?)
    fn handle_csi_private(&mut self, csi: &ControlSequence) {
        match (csi.intermediates(), csi.final_char()) {
            ("", 'h') => {
                // DECSET - DEC Private Mode Set
                for &mode in csi.params() {
                    self.set_dec_mode(mode, true);
                }
                self.listener.on_mode_changed(&self.modes);
            },
            ("", 'l') => {
                // DECRST - DEC Private Mode Reset
                for &mode in csi.params() {
                    self.set_dec_mode(mode, false);
                }
                self.listener.on_mode_changed(&self.modes);
            },
            ("", 'n') if csi.raw(0) == 6 => {
                // DECXCPR - Extended Cursor Position
                let (row, col) = self.report_position();
                self.queue_response(format!("\x1b[?{};{}R", row, col).into_bytes());
            },
            ("$", 'p') => {
                // DECRQM - Request DEC private mode
                let mode = csi.raw(0);
                let status = mode_status(self.modes.dec(mode));
                self.queue_response(format!("\x1b[?{};{}$y", mode, status).into_bytes());
            },
            _ => {
                log::debug!("Unknown private CSI: {}", csi);
            },
        }
    }

    /// Handle CSI sequences with the `>` marker
    fn handle_csi_secondary(&mut self, csi: &ControlSequence) {
        match csi.final_char() {
            'c' => {
                // DA2 - Secondary Device Attributes
                self.queue_response(DA2_RESPONSE.to_vec());
            },
            _ => {
                log::debug!("Unknown CSI sequence: {}", csi);
            },
        }
    }

    /// Handle CSI sequences with intermediate bytes
    fn handle_csi_intermediate(&mut self, csi: &ControlSequence) {
        match (csi.intermediates(), csi.final_char()) {
            (" ", 'q') => {
                // DECSCUSR - Set Cursor Style
                match CursorShape::from_decscusr(csi.raw(0)) {
                    Some((shape, blinking)) => {
                        self.cursor.shape = shape;
                        self.cursor.blinking = blinking;
                        self.listener.on_cursor_shape_changed(shape, blinking);
                    },
                    None => log::debug!("Unknown cursor style: {}", csi.raw(0)),
                }
            },
            ("$", 'p') => {
                // DECRQM - Request ANSI mode
                let mode = csi.raw(0);
                let status = mode_status(self.modes.ansi(mode));
                self.queue_response(format!("\x1b[{};{}$y", mode, status).into_bytes());
            },
            ("!", 'p') => {
                // DECSTR
                self.soft_reset();
            },
            _ => {
                log::debug!("Unknown CSI with intermediates: {}", csi);
            },
        }
    }

    fn handle_window_op(&mut self, csi: &ControlSequence) {
        match csi.raw(0) {
            18 => {
                // Report text area size in characters
                let (width, height) = (self.width(), self.height());
                self.queue_response(format!("\x1b[8;{};{}t", height, width).into_bytes());
            },
            22 => {
                // Push titles
                if self.title_stack.len() < TITLE_STACK_LIMIT {
                    self.title_stack.push((self.window_title.clone(), self.icon_title.clone()));
                }
            },
            23 => {
                // Pop titles
                if let Some((window, icon)) = self.title_stack.pop() {
                    self.icon_title = icon;
                    self.set_window_title(window);
                }
            },
            op => log::debug!("Window operation {} ignored", op),
        }
    }

    fn set_ansi_modes(&mut self, csi: &ControlSequence, value: bool) {
        for &mode in csi.params() {
            if !self.modes.set_ansi(mode, value) {
                log::debug!("Unknown ANSI mode: {} = {}", mode, value);
            }
        }
        self.listener.on_mode_changed(&self.modes);
    }

    /// Set DEC private mode
    fn set_dec_mode(&mut self, mode: u16, value: bool) {
        match mode {
            3 => {
                // DECCOLM - 132/80 columns, only when allowed by mode 40
                self.modes.column_132 = value;
                if self.modes.allow_column_switch {
                    let columns = if value { 132 } else { 80 };
                    let rows = self.height();
                    self.resize(columns, rows);
                    let blank = self.styles.empty();
                    self.buffer.modify(|state| state.clear_screen(&blank));
                    self.reset_scroll_region();
                    self.cursor_home();
                }
            },
            6 => {
                // DECOM - Origin Mode
                self.modes.origin = value;
                self.cursor_home();
            },
            47 | 1047 => {
                // Alternate screen buffer
                self.use_alternate_screen(value);
            },
            1048 => {
                // Save/restore cursor
                if value {
                    self.save_cursor();
                } else {
                    self.restore_cursor();
                }
            },
            1049 => {
                // Alternate screen with cursor save/restore
                if value {
                    self.save_cursor();
                    self.use_alternate_screen(true);
                    let blank = self.erase_style();
                    self.buffer.modify(|state| state.clear_screen(&blank));
                } else {
                    self.use_alternate_screen(false);
                    self.restore_cursor();
                }
            },
            _ => {
                if !self.modes.set_dec(mode, value) {
                    log::debug!("Unknown DEC mode: {} = {}", mode, value);
                }
            },
        }
    }

    /// Handle SGR (Select Graphic Rendition)
    fn handle_sgr(&mut self, csi: &ControlSequence) {
        let params = csi.params();
        let mut pen = self.pen;

        if params.is_empty() {
            self.set_pen(sgr_reset(pen));
            return;
        }

        let mut i = 0;
        while i < params.len() {
            let param = params[i];
            let subs = csi.subparams(i);
            match param {
                0 => pen = sgr_reset(pen),
                1 => pen = pen.with_option(StyleOptions::BOLD, true),
                2 => pen = pen.with_option(StyleOptions::DIM, true),
                3 => pen = pen.with_option(StyleOptions::ITALIC, true),
                4 => {
                    let kind = subs
                        .first()
                        .map_or(UnderlineStyle::Single, |&sub| UnderlineStyle::from_sgr(sub));
                    pen = pen.with_underline(kind);
                },
                5 | 6 => pen = pen.with_option(StyleOptions::BLINK, true),
                7 => pen = pen.with_option(StyleOptions::INVERSE, true),
                8 => pen = pen.with_option(StyleOptions::HIDDEN, true),
                9 => pen = pen.with_option(StyleOptions::STRIKETHROUGH, true),
                21 => pen = pen.with_underline(UnderlineStyle::Double),
                22 => pen = pen.with_option(StyleOptions::BOLD | StyleOptions::DIM, false),
                23 => pen = pen.with_option(StyleOptions::ITALIC, false),
                24 => pen = pen.with_underline(UnderlineStyle::None),
                25 => pen = pen.with_option(StyleOptions::BLINK, false),
                27 => pen = pen.with_option(StyleOptions::INVERSE, false),
                28 => pen = pen.with_option(StyleOptions::HIDDEN, false),
                29 => pen = pen.with_option(StyleOptions::STRIKETHROUGH, false),
                30..=37 => pen.foreground = Color::Indexed((param - 30) as u8),
                38 | 48 | 58 => {
                    let (color, consumed) = extended_color(params, i, subs);
                    if let Some(color) = color {
                        match param {
                            38 => pen.foreground = color,
                            48 => pen.background = color,
                            _ => pen.underline_color = color,
                        }
                    }
                    i += consumed;
                },
                39 => pen.foreground = Color::Default,
                40..=47 => pen.background = Color::Indexed((param - 40) as u8),
                49 => pen.background = Color::Default,
                59 => pen.underline_color = Color::Default,
                90..=97 => pen.foreground = Color::Indexed((param - 90 + 8) as u8),
                100..=107 => pen.background = Color::Indexed((param - 100 + 8) as u8),
                _ => {
                    log::debug!("Unknown SGR parameter: {}", param);
                },
            }
            i += 1;
        }
        self.set_pen(pen);
    }

    /// Handle a DCS sequence
    pub fn handle_dcs(&mut self, dcs: &DeviceControlSequence) {
        match (dcs.intermediates(), dcs.final_char()) {
            ("$", 'q') => {
                // DECRQSS - Request Status String
                self.request_status_string(dcs.data());
            },
            _ => {
                log::debug!("Unhandled DCS sequence: {}", dcs);
            },
        }
    }

    fn request_status_string(&mut self, request: &str) {
        let reply = match request {
            "m" => Some(format!("{}m", sgr_report(&self.pen))),
            "r" => Some(format!("{};{}r", self.scroll_top + 1, self.scroll_bottom)),
            " q" => Some(format!("{} q", decscusr_code(self.cursor.shape, self.cursor.blinking))),
            _ => None,
        };
        let response = match reply {
            Some(body) => format!("\x1bP1$r{}\x1b\\", body),
            None => {
                log::debug!("DECRQSS for unsupported setting {:?}", request);
                "\x1bP0$r\x1b\\".to_string()
            },
        };
        self.queue_response(response.into_bytes());
    }

    // ---------------------------------------------------------------------
    // OSC
    // ---------------------------------------------------------------------

    /// Handle an OSC sequence
    pub fn handle_osc(&mut self, osc: &SystemCommandSequence) {
        let Some(command) = osc.arg_at(0).and_then(|ps| ps.trim().parse::<u32>().ok()) else {
            log::debug!("Unknown OSC: {:?}", osc.body());
            return;
        };
        let rest = osc.body().split_once(';').map_or("", |(_, rest)| rest);

        match command {
            0 => {
                // Icon name and window title
                self.icon_title = rest.to_string();
                self.set_window_title(rest.to_string());
            },
            1 => {
                // Icon name
                self.icon_title = rest.to_string();
            },
            2 => {
                // Window title
                self.set_window_title(rest.to_string());
            },
            4 => {
                self.handle_palette_osc(osc);
            },
            7 => {
                // Current working directory
                self.working_directory = Some(rest.to_string());
                self.listener.on_working_directory_changed(rest);
            },
            8 => {
                // Hyperlink: params ; uri
                match rest.split_once(';') {
                    Some((_params, uri)) => self.set_hyperlink(uri),
                    None => log::debug!("Malformed hyperlink OSC: {:?}", osc.body()),
                }
            },
            10..=12 => {
                self.handle_dynamic_color(osc, command);
            },
            52 => {
                self.handle_clipboard(osc);
            },
            104 => {
                // Reset palette entries, all of them without arguments
                let indices: Vec<u8> = osc.args()[1..]
                    .iter()
                    .filter_map(|arg| arg.trim().parse().ok())
                    .collect();
                if indices.is_empty() {
                    self.palette.reset_all();
                } else {
                    for index in indices {
                        self.palette.reset_indexed(index);
                    }
                }
            },
            110 => self.palette.foreground = self.default_palette.foreground,
            111 => self.palette.background = self.default_palette.background,
            112 => self.palette.cursor = self.default_palette.cursor,
            133 => {
                self.handle_shell_integration(osc);
            },
            1341 => {
                // Custom command
                self.listener.on_custom_command(&osc.args()[1..]);
            },
            _ => {
                log::debug!("Unknown OSC {}: {:?}", command, rest);
            },
        }
    }

    fn set_window_title(&mut self, title: String) {
        self.listener.on_title_changed(&title);
        self.window_title = title;
    }

    fn set_hyperlink(&mut self, uri: &str) {
        let mut pen = self.pen;
        if uri.is_empty() {
            pen.hyperlink = None;
            self.listener.on_hyperlink(None);
        } else {
            if self.hyperlinks.needs_pruning() {
                self.prune_hyperlinks();
            }
            pen.hyperlink = Some(self.hyperlinks.intern(uri));
            self.listener.on_hyperlink(Some(uri));
        }
        self.set_pen(pen);
    }

    /// Drop registry entries that no line, pen or saved cursor refers to
    fn prune_hyperlinks(&mut self) {
        let mut live = self.buffer.read(BufferState::hyperlinks_in_use);
        let styles = std::iter::once(&self.pen).chain(self.saved.iter().map(|saved| &saved.style));
        live.extend(styles.filter_map(|style| style.hyperlink));
        self.hyperlinks.retain_live(&live);
    }

    /// OSC 4: `index;spec` pairs, `?` queries the entry
    fn handle_palette_osc(&mut self, osc: &SystemCommandSequence) {
        let args = &osc.args()[1..];
        for pair in args.chunks(2) {
            let [index, spec] = pair else {
                log::debug!("OSC 4 with dangling argument {:?}", pair);
                break;
            };
            let Ok(index) = index.trim().parse::<u8>() else {
                log::debug!("OSC 4 with invalid index {:?}", index);
                continue;
            };
            if spec == "?" {
                let rgb = self.palette.indexed(index).to_x_parse_color();
                let reply = osc.format(&["4", &index.to_string(), &rgb]);
                self.queue_response(reply.into_bytes());
            } else if let Some(rgb) = Rgb::parse(spec) {
                self.palette.set_indexed(index, rgb);
            } else {
                log::debug!("OSC 4 with invalid color {:?}", spec);
            }
        }
    }

    /// OSC 10/11/12: default foreground, background and cursor colors
    fn handle_dynamic_color(&mut self, osc: &SystemCommandSequence, command: u32) {
        let Some(spec) = osc.arg_at(1) else {
            return;
        };
        if spec == "?" {
            let rgb = match command {
                10 => self.palette.foreground,
                11 => self.palette.background,
                _ => self.palette.cursor_color(),
            };
            let reply = osc.format(&[&command.to_string(), &rgb.to_x_parse_color()]);
            self.queue_response(reply.into_bytes());
            return;
        }
        let Some(rgb) = Rgb::parse(spec) else {
            log::debug!("OSC {} with invalid color {:?}", command, spec);
            return;
        };
        match command {
            10 => self.palette.foreground = rgb,
            11 => self.palette.background = rgb,
            _ => self.palette.cursor = Some(rgb),
        }
    }

    /// OSC 52: `selection;base64` set, `selection;?` query, empty data clears
    fn handle_clipboard(&mut self, osc: &SystemCommandSequence) {
        let selection = match osc.arg_at(1) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => "s0".to_string(),
        };
        let data = osc.arg_at(2).unwrap_or("");
        let action = match data {
            "?" => ClipboardAction::Query,
            "" => ClipboardAction::Clear,
            encoded => match BASE64.decode(encoded.trim()) {
                Ok(bytes) => ClipboardAction::Set(String::from_utf8_lossy(&bytes).into_owned()),
                Err(err) => {
                    log::warn!("Discarding OSC 52 with invalid base64: {}", err);
                    return;
                },
            },
        };
        self.listener.on_clipboard(ClipboardRequest { selection, action });
    }

    /// OSC 133: shell prompt and command marks
    fn handle_shell_integration(&mut self, osc: &SystemCommandSequence) {
        let marker = match osc.arg_at(1).and_then(|arg| arg.chars().next()) {
            Some('A') => CommandMarker::PromptStarted,
            Some('B') => CommandMarker::CommandStarted,
            Some('C') => CommandMarker::CommandExecuted,
            Some('D') => CommandMarker::CommandFinished {
                exit_code: osc.arg_at(2).and_then(|code| code.trim().parse().ok()),
            },
            other => {
                log::debug!("Unknown shell integration mark {:?}", other);
                return;
            },
        };
        self.listener.on_command_marker(marker);
    }

    // ---------------------------------------------------------------------
    // Resets and geometry
    // ---------------------------------------------------------------------

    /// Perform a soft terminal reset (DECSTR)
    fn soft_reset(&mut self) {
        self.set_pen(TextStyle::EMPTY);
        self.modes.origin = false;
        self.modes.auto_wrap = true;
        self.modes.insert = false;
        self.modes.cursor_visible = true;
        self.modes.application_cursor_keys = false;
        self.modes.application_keypad = false;
        self.charsets.reset();
        self.reset_scroll_region();
        self.saved[self.saved_slot()] = SavedCursor::default();
        self.listener.on_mode_changed(&self.modes);
        log::debug!("Soft reset performed");
    }

    /// Full reset (RIS)
    pub fn reset(&mut self) {
        let blank = self.styles.empty();
        self.buffer.modify(|state| {
            state.use_alternate(false);
            state.clear_screen(&blank);
            state.clear_history();
        });
        self.cursor.reset();
        self.saved = [SavedCursor::default(), SavedCursor::default()];
        self.set_pen(TextStyle::EMPTY);
        self.modes.reset();
        self.charsets.reset();
        self.tab_stops = default_tab_stops(self.width());
        self.reset_scroll_region();
        self.palette = self.default_palette.clone();
        self.last_printed = None;
        self.listener.on_mode_changed(&self.modes);
        self.listener.on_cursor_shape_changed(self.cursor.shape, self.cursor.blinking);
    }

    /// Resize the terminal to `columns` x `rows`
    pub fn resize(&mut self, columns: usize, rows: usize) {
        let inactive = 1 - self.saved_slot();
        let (row, saved_row) = self
            .buffer
            .resize_screens(columns, rows, self.cursor.row, self.saved[inactive].row);
        self.saved[inactive].row = saved_row;
        let (width, height) = (self.width(), self.height());
        self.cursor.row = row;
        self.cursor.clamp(width, height);
        for saved in &mut self.saved {
            saved.col = saved.col.min(width - 1);
            saved.row = saved.row.min(height - 1);
        }
        let old_width = self.tab_stops.len();
        self.tab_stops.resize(width, false);
        for (i, stop) in self.tab_stops.iter_mut().enumerate().skip(old_width) {
            *stop = i % TAB_WIDTH == 0;
        }
        self.reset_scroll_region();
    }
}

/// SGR 0: everything but the active hyperlink
fn sgr_reset(pen: TextStyle) -> TextStyle {
    TextStyle {
        hyperlink: pen.hyperlink,
        ..TextStyle::EMPTY
    }
}

/// Parse the color after 38/48/58.
///
/// Colon form (`38:2::r:g:b`, `38:5:n`) lives in the subparameters;
/// semicolon form consumes the following parameters. Returns the color and
/// how many extra parameters were used.
fn extended_color(params: &[u16], i: usize, subs: &[u16]) -> (Option<Color>, usize) {
    let to_u8 = |v: u16| v.min(255) as u8;
    if let Some(&space) = subs.first() {
        let color = match space {
            5 => subs.get(1).map(|&n| Color::Indexed(to_u8(n))),
            2 if subs.len() >= 4 => {
                let rgb = &subs[subs.len() - 3..];
                Some(Color::rgb(to_u8(rgb[0]), to_u8(rgb[1]), to_u8(rgb[2])))
            },
            _ => None,
        };
        return (color, 0);
    }

    let remaining = params.len() - i - 1;
    match params.get(i + 1) {
        Some(5) => match params.get(i + 2) {
            Some(&n) => (Some(Color::Indexed(to_u8(n))), 2),
            None => (None, remaining),
        },
        Some(2) if remaining >= 4 => {
            let color = Color::rgb(to_u8(params[i + 2]), to_u8(params[i + 3]), to_u8(params[i + 4]));
            (Some(color), 4)
        },
        Some(2) => (None, remaining),
        Some(other) => {
            log::debug!("Unknown extended color space: {}", other);
            (None, 1)
        },
        None => (None, 0),
    }
}

/// SGR parameters reproducing `style`, as reported by DECRQSS
fn sgr_report(style: &TextStyle) -> String {
    let mut parts = vec!["0".to_string()];
    let flags = [
        (StyleOptions::BOLD, "1"),
        (StyleOptions::DIM, "2"),
        (StyleOptions::ITALIC, "3"),
        (StyleOptions::BLINK, "5"),
        (StyleOptions::INVERSE, "7"),
        (StyleOptions::HIDDEN, "8"),
        (StyleOptions::STRIKETHROUGH, "9"),
    ];
    for (flag, code) in flags {
        if style.has(flag) {
            parts.push(code.to_string());
        }
    }
    match style.underline() {
        UnderlineStyle::None => {},
        UnderlineStyle::Single => parts.push("4".to_string()),
        UnderlineStyle::Double => parts.push("21".to_string()),
        UnderlineStyle::Curly => parts.push("4:3".to_string()),
        UnderlineStyle::Dotted => parts.push("4:4".to_string()),
        UnderlineStyle::Dashed => parts.push("4:5".to_string()),
    }
    if let Some(fg) = color_report(style.foreground, 30, 90, 38) {
        parts.push(fg);
    }
    if let Some(bg) = color_report(style.background, 40, 100, 48) {
        parts.push(bg);
    }
    parts.join(";")
}

fn color_report(color: Color, base: u16, bright: u16, extended: u16) -> Option<String> {
    match color {
        Color::Default => None,
        Color::Indexed(i) if i < 8 => Some((base + i as u16).to_string()),
        Color::Indexed(i) if i < 16 => Some((bright + i as u16 - 8).to_string()),
        Color::Indexed(i) => Some(format!("{};5;{}", extended, i)),
        Color::Rgb { r, g, b } => Some(format!("{};2;{};{};{}", extended, r, g, b)),
    }
}

fn decscusr_code(shape: CursorShape, blinking: bool) -> u16 {
    let base = match shape {
        CursorShape::Block => 1,
        CursorShape::Underline => 3,
        CursorShape::Bar => 5,
    };
    if blinking {
        base
    } else {
        base + 1
    }
}

/// DECRPM status: 1 set, 2 reset, 0 not recognized
fn mode_status(value: Option<bool>) -> u8 {
    match value {
        Some(true) => 1,
        Some(false) => 2,
        None => 0,
    }
}
