//! Emulator configuration
//!
//! Settings come from four layers, later ones winning:
//! defaults, the TOML config file, `MOCHI_VT_*` environment variables and
//! command line arguments. The merged result is validated once.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::buffer::TerminalTextBuffer;
use crate::color::Rgb;
use crate::error::ConfigError;
use crate::input::KeyEncoder;
use crate::palette::{ColorPalette, PaletteKind};
use crate::platform::{PlatformInfo, PlatformSetting};
use crate::sync_output::{SynchronizedOutput, DEFAULT_MAX_CHARS, DEFAULT_TIMEOUT};
use crate::terminal::Terminal;
use crate::typeahead::DEFAULT_CLEAR_DELAY;
use crate::width::{provider_for, WidthProviderKind};

const MAX_SCROLLBACK: usize = 10_000_000;

/// Command line overrides shared by the bundled tools
#[derive(Parser, Debug, Clone, Default)]
pub struct CliArgs {
    /// Path to custom config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Screen columns
    #[arg(long, value_name = "COLS")]
    pub columns: Option<usize>,

    /// Screen rows
    #[arg(long, value_name = "ROWS")]
    pub rows: Option<usize>,

    /// Number of scrollback lines (0 keeps everything)
    #[arg(long, value_name = "LINES")]
    pub scrollback: Option<usize>,

    /// Double-width table (unicode, cjk, narrow)
    #[arg(long, value_name = "KIND")]
    pub width_provider: Option<WidthProviderKind>,

    /// Treat East Asian ambiguous characters as wide
    #[arg(long)]
    pub ambiguous_wide: bool,

    /// Synchronized output timeout in milliseconds
    #[arg(long, value_name = "MS")]
    pub sync_timeout: Option<u64>,

    /// Platform whose key conventions to follow (auto, linux, macos, windows)
    #[arg(long, value_name = "OS")]
    pub platform: Option<PlatformSetting>,

    /// Line feeds keep the column (as on a tty without output translation)
    #[arg(long)]
    pub raw_line_feed: bool,
}

/// Everything needed to build a terminal, its buffer and its encoder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmulatorConfig {
    pub columns: usize,
    pub rows: usize,
    pub scrollback_lines: usize,
    pub ambiguous_as_wide: bool,
    pub width_provider: WidthProviderKind,
    pub sync_output_timeout_ms: u64,
    pub sync_output_max_chars: usize,
    pub palette: PaletteKind,
    /// Replacement for the 16 base colors, `#rrggbb` each
    pub custom_palette: Option<Vec<String>>,
    pub typeahead_clear_delay_ms: u64,
    pub platform: PlatformSetting,
    pub alt_sends_escape: bool,
    pub meta_sends_escape: bool,
    pub auto_newline: bool,
    /// Line feeds also return to column 0
    pub implicit_carriage_return: bool,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            columns: 80,
            rows: 24,
            scrollback_lines: 10_000,
            ambiguous_as_wide: false,
            width_provider: WidthProviderKind::default(),
            sync_output_timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            sync_output_max_chars: DEFAULT_MAX_CHARS,
            palette: PaletteKind::default(),
            custom_palette: None,
            typeahead_clear_delay_ms: DEFAULT_CLEAR_DELAY.as_millis() as u64,
            platform: PlatformSetting::default(),
            alt_sends_escape: true,
            meta_sends_escape: false,
            auto_newline: false,
            implicit_carriage_return: true,
        }
    }
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        message: message.into(),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl EmulatorConfig {
    /// Load configuration with full precedence:
    /// CLI args > environment variables > config file > defaults
    pub fn load_with_args(args: &CliArgs) -> Result<Self, ConfigError> {
        let mut config = match &args.config {
            // An explicitly named file must load
            Some(path) => Self::load_from_file(path)?,
            None => Self::default_config_path()
                .filter(|path| path.exists())
                .and_then(|path| match Self::load_from_file(&path) {
                    Ok(config) => Some(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {:?}: {}", path, e);
                        None
                    },
                })
                .unwrap_or_default(),
        };

        config.apply_env(|name| env::var(name).ok());
        config.apply_cli_args(args);
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Apply `MOCHI_VT_*` overrides; unparsable values are ignored with a warning
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parsed<T: std::str::FromStr>(name: &str, value: Option<String>) -> Option<T> {
            let value = value?;
            let parsed = value.trim().parse().ok();
            if parsed.is_none() {
                log::warn!("ignoring {}={:?}: not a valid value", name, value);
            }
            parsed
        }
        let flag = |name: &str| {
            let value = lookup(name)?;
            let parsed = parse_bool(&value);
            if parsed.is_none() {
                log::warn!("ignoring {}={:?}: expected a boolean", name, value);
            }
            parsed
        };

        if let Some(v) = parsed("MOCHI_VT_COLUMNS", lookup("MOCHI_VT_COLUMNS")) {
            self.columns = v;
        }
        if let Some(v) = parsed("MOCHI_VT_ROWS", lookup("MOCHI_VT_ROWS")) {
            self.rows = v;
        }
        if let Some(v) = parsed("MOCHI_VT_SCROLLBACK", lookup("MOCHI_VT_SCROLLBACK")) {
            self.scrollback_lines = v;
        }
        if let Some(v) = parsed("MOCHI_VT_WIDTH_PROVIDER", lookup("MOCHI_VT_WIDTH_PROVIDER")) {
            self.width_provider = v;
        }
        if let Some(v) = flag("MOCHI_VT_AMBIGUOUS_WIDE") {
            self.ambiguous_as_wide = v;
        }
        if let Some(v) = parsed("MOCHI_VT_SYNC_TIMEOUT_MS", lookup("MOCHI_VT_SYNC_TIMEOUT_MS")) {
            self.sync_output_timeout_ms = v;
        }
        if let Some(v) = parsed("MOCHI_VT_SYNC_MAX_CHARS", lookup("MOCHI_VT_SYNC_MAX_CHARS")) {
            self.sync_output_max_chars = v;
        }
        if let Some(value) = lookup("MOCHI_VT_PALETTE") {
            match value.to_ascii_lowercase().as_str() {
                "xterm" => self.palette = PaletteKind::Xterm,
                "windows" => self.palette = PaletteKind::Windows,
                _ => log::warn!("ignoring MOCHI_VT_PALETTE={:?}: unknown palette", value),
            }
        }
        if let Some(v) = parsed("MOCHI_VT_TYPEAHEAD_MS", lookup("MOCHI_VT_TYPEAHEAD_MS")) {
            self.typeahead_clear_delay_ms = v;
        }
        if let Some(v) = parsed("MOCHI_VT_PLATFORM", lookup("MOCHI_VT_PLATFORM")) {
            self.platform = v;
        }
        if let Some(v) = flag("MOCHI_VT_ALT_SENDS_ESCAPE") {
            self.alt_sends_escape = v;
        }
        if let Some(v) = flag("MOCHI_VT_META_SENDS_ESCAPE") {
            self.meta_sends_escape = v;
        }
        if let Some(v) = flag("MOCHI_VT_AUTO_NEWLINE") {
            self.auto_newline = v;
        }
        if let Some(v) = flag("MOCHI_VT_IMPLICIT_CR") {
            self.implicit_carriage_return = v;
        }
    }

    pub fn apply_cli_args(&mut self, args: &CliArgs) {
        if let Some(columns) = args.columns {
            self.columns = columns;
        }
        if let Some(rows) = args.rows {
            self.rows = rows;
        }
        if let Some(scrollback) = args.scrollback {
            self.scrollback_lines = scrollback;
        }
        if let Some(kind) = args.width_provider {
            self.width_provider = kind;
        }
        if args.ambiguous_wide {
            self.ambiguous_as_wide = true;
        }
        if let Some(ms) = args.sync_timeout {
            self.sync_output_timeout_ms = ms;
        }
        if let Some(platform) = args.platform {
            self.platform = platform;
        }
        if args.raw_line_feed {
            self.implicit_carriage_return = false;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.columns < 2 {
            return Err(invalid("columns", "must be at least 2"));
        }
        if self.rows < 1 {
            return Err(invalid("rows", "must be at least 1"));
        }
        if self.scrollback_lines > MAX_SCROLLBACK {
            return Err(invalid("scrollback_lines", "must be at most 10,000,000"));
        }
        if self.sync_output_max_chars == 0 {
            return Err(invalid("sync_output_max_chars", "must be positive"));
        }
        if let Some(colors) = &self.custom_palette {
            if colors.len() != 16 {
                return Err(invalid(
                    "custom_palette",
                    format!("expected 16 colors, found {}", colors.len()),
                ));
            }
            for (i, color) in colors.iter().enumerate() {
                if Rgb::parse(color).is_none() {
                    return Err(invalid(
                        &format!("custom_palette[{}]", i),
                        format!("invalid color '{}', expected #RRGGBB", color),
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("mochi-vtcore").join("config.toml"))
    }

    /// Write the configuration as TOML, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::default_config_path().ok_or_else(|| invalid("path", "no config directory on this system"))?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn platform_info(&self) -> PlatformInfo {
        PlatformInfo::from_setting(self.platform)
    }

    /// Built-in palette with the custom base colors applied
    pub fn color_palette(&self) -> ColorPalette {
        let custom = self.custom_palette.as_ref().and_then(|colors| {
            let parsed: Option<Vec<Rgb>> = colors.iter().map(|c| Rgb::parse(c)).collect();
            <[Rgb; 16]>::try_from(parsed?).ok()
        });
        match custom {
            Some(base) => ColorPalette::with_base(base),
            None => ColorPalette::for_kind(self.palette),
        }
    }

    pub fn sync_output(&self) -> SynchronizedOutput {
        SynchronizedOutput::new(
            Duration::from_millis(self.sync_output_timeout_ms),
            self.sync_output_max_chars,
        )
    }

    pub fn typeahead_clear_delay(&self) -> Duration {
        Duration::from_millis(self.typeahead_clear_delay_ms)
    }

    pub fn create_buffer(&self) -> Arc<TerminalTextBuffer> {
        TerminalTextBuffer::shared(self.columns, self.rows, self.scrollback_lines)
    }

    /// A terminal over a fresh buffer, with palette and width rules applied
    pub fn create_terminal(&self) -> Terminal {
        Terminal::new(self.create_buffer())
            .with_palette(self.color_palette())
            .with_width_provider(provider_for(self.width_provider), self.ambiguous_as_wide)
            .with_implicit_carriage_return(self.implicit_carriage_return)
    }

    pub fn key_encoder(&self) -> KeyEncoder {
        let mut encoder = KeyEncoder::new(self.platform_info());
        encoder.alt_sends_escape = self.alt_sends_escape;
        encoder.meta_sends_escape = self.meta_sends_escape;
        encoder.auto_newline = self.auto_newline;
        encoder
    }
}
