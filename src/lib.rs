//! Mochi VT core
//!
//! A VT/xterm emulation engine without any GUI attached:
//!
//! - `stream`: character sources with pushback (`DataStream`)
//! - `sequence`: CSI, OSC and DCS readers
//! - `emulator` / `terminal`: the dispatch loop and the state it drives
//! - `buffer`, `storage`, `line`, `snapshot`: the text buffer model with
//!   scrollback and versioned, incrementally built snapshots
//! - `style`, `color`, `palette`: cell styling
//! - `selection`, `search`: text extraction and Rabin-Karp search
//! - `input`: key, mouse, focus and paste encoding
//! - `sync_output`: synchronized output (mode 2026) capture
//!
//! The whole pipeline is deterministic: the same input always produces the
//! same buffer contents.

pub mod buffer;
pub mod charset;
pub mod color;
pub mod config;
pub mod cursor;
pub mod emulator;
pub mod error;
pub mod hyperlink;
pub mod input;
pub mod line;
pub mod modes;
pub mod palette;
pub mod platform;
pub mod search;
pub mod selection;
pub mod sequence;
pub mod snapshot;
pub mod storage;
pub mod stream;
pub mod style;
pub mod sync_output;
pub mod terminal;
pub mod typeahead;
pub mod width;

pub use buffer::{BufferState, TerminalTextBuffer};
pub use color::{Color, Rgb};
pub use config::{CliArgs, EmulatorConfig};
pub use emulator::{Emulator, ParserState};
pub use error::{ConfigError, SequenceError, StreamError};
pub use hyperlink::HyperlinkRegistry;
pub use input::{encode_focus, encode_mouse, encode_paste, Key, KeyEncoder, Modifiers, MouseEvent};
pub use line::{TerminalLine, DWC};
pub use palette::ColorPalette;
pub use platform::PlatformInfo;
pub use search::{find_in_snapshot, SearchMatch, SubstringFinder};
pub use selection::{Selection, SelectionPoint, SelectionType};
pub use snapshot::{SnapshotStats, VersionedBufferSnapshot};
pub use stream::{channel, ArrayDataStream, ChunkedDataStream, DataStream, ReaderDataStream};
pub use style::{StyleOptions, TextStyle};
pub use sync_output::SynchronizedOutput;
pub use terminal::{Terminal, TerminalListener};
pub use typeahead::TypeAheadDebouncer;
pub use width::{DoubleWidthProvider, WidthProviderKind};
