//! Character set designation and invocation
//!
//! Four slots G0..G3 can each hold a character set. One slot is invoked into
//! GL and one into GR; a single shift borrows G2 or G3 for exactly one
//! character.

use serde::{Deserialize, Serialize};

/// A designatable character set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Charset {
    #[default]
    Ascii,
    /// DEC Special Graphics (line drawing)
    DecSpecialGraphics,
    Uk,
}

impl Charset {
    /// Charset for a designator final character (`ESC ( 0` etc.)
    ///
    /// National replacement sets are not supported and map to ASCII.
    pub fn from_designator(c: char) -> Charset {
        match c {
            'B' | '@' => Charset::Ascii,
            '0' | '2' => Charset::DecSpecialGraphics,
            'A' => Charset::Uk,
            _ => {
                log::debug!("unsupported character set designator {:?}, using ASCII", c);
                Charset::Ascii
            },
        }
    }

    /// Map `c` through this set
    pub fn map(self, c: char) -> char {
        match self {
            Charset::Ascii => c,
            Charset::Uk if c == '#' => '£',
            Charset::Uk => c,
            Charset::DecSpecialGraphics => dec_special_graphics(c),
        }
    }
}

fn dec_special_graphics(c: char) -> char {
    match c {
        '_' => ' ',
        '`' => '◆',
        'a' => '▒',
        'b' => '␉',
        'c' => '␌',
        'd' => '␍',
        'e' => '␊',
        'f' => '°',
        'g' => '±',
        'h' => '␤',
        'i' => '␋',
        'j' => '┘',
        'k' => '┐',
        'l' => '┌',
        'm' => '└',
        'n' => '┼',
        'o' => '⎺',
        'p' => '⎻',
        'q' => '─',
        'r' => '⎼',
        's' => '⎽',
        't' => '├',
        'u' => '┤',
        'v' => '┴',
        'w' => '┬',
        'x' => '│',
        'y' => '≤',
        'z' => '≥',
        '{' => 'π',
        '|' => '≠',
        '}' => '£',
        '~' => '·',
        _ => c,
    }
}

/// G0..G3 slots plus GL/GR invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharsetState {
    slots: [Charset; 4],
    gl: usize,
    gr: usize,
    single_shift: Option<usize>,
}

impl Default for CharsetState {
    fn default() -> Self {
        Self {
            slots: [Charset::Ascii; 4],
            gl: 0,
            gr: 2,
            single_shift: None,
        }
    }
}

impl CharsetState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Designate `charset` into slot `slot` (0..=3)
    pub fn designate(&mut self, slot: usize, charset: Charset) {
        if let Some(s) = self.slots.get_mut(slot) {
            *s = charset;
        }
    }

    pub fn slot(&self, slot: usize) -> Charset {
        self.slots.get(slot).copied().unwrap_or_default()
    }

    /// Invoke slot `slot` into GL (SI, SO, LS2, LS3)
    pub fn invoke_gl(&mut self, slot: usize) {
        if slot < 4 {
            self.gl = slot;
        }
    }

    pub fn gr(&self) -> usize {
        self.gr
    }

    /// Invoke slot `slot` into GR (LS1R, LS2R, LS3R)
    pub fn invoke_gr(&mut self, slot: usize) {
        if slot < 4 {
            self.gr = slot;
        }
    }

    /// Use slot 2 or 3 for the next character only (SS2, SS3)
    pub fn single_shift(&mut self, slot: usize) {
        if slot == 2 || slot == 3 {
            self.single_shift = Some(slot);
        }
    }

    /// Whether every invoked set is plain ASCII, so text can skip mapping
    pub fn is_identity(&self) -> bool {
        self.single_shift.is_none() && self.slots[self.gl] == Charset::Ascii
    }

    /// Map one printed character, consuming a pending single shift
    pub fn translate(&mut self, c: char) -> char {
        // Input is decoded text: only GL is mapped
        if let Some(slot) = self.single_shift.take() {
            return self.slots[slot].map(c);
        }
        match c {
            '\x20'..='\x7e' => self.slots[self.gl].map(c),
            _ => c,
        }
    }
}
