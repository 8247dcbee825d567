//! Host platform description
//!
//! Some key encodings differ on macOS. Instead of querying the OS from deep
//! inside the encoder, a [`PlatformInfo`] is resolved once at startup and
//! handed to whatever needs it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    Linux,
    MacOs,
    Windows,
    Other,
}

/// Platform selection as written in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformSetting {
    #[default]
    Auto,
    Linux,
    Macos,
    Windows,
}

impl FromStr for PlatformSetting {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(PlatformSetting::Auto),
            "linux" => Ok(PlatformSetting::Linux),
            "macos" | "mac" => Ok(PlatformSetting::Macos),
            "windows" => Ok(PlatformSetting::Windows),
            other => Err(format!("unknown platform '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformInfo {
    pub os: Os,
}

impl PlatformInfo {
    pub const fn new(os: Os) -> Self {
        Self { os }
    }

    /// The platform this binary was compiled for
    pub fn detect() -> Self {
        let os = if cfg!(target_os = "macos") {
            Os::MacOs
        } else if cfg!(target_os = "linux") {
            Os::Linux
        } else if cfg!(windows) {
            Os::Windows
        } else {
            Os::Other
        };
        Self { os }
    }

    /// Resolve a configured setting, detecting only for `Auto`
    pub fn from_setting(setting: PlatformSetting) -> Self {
        match setting {
            PlatformSetting::Auto => Self::detect(),
            PlatformSetting::Linux => Self::new(Os::Linux),
            PlatformSetting::Macos => Self::new(Os::MacOs),
            PlatformSetting::Windows => Self::new(Os::Windows),
        }
    }

    pub fn is_macos(&self) -> bool {
        self.os == Os::MacOs
    }

    pub fn is_windows(&self) -> bool {
        self.os == Os::Windows
    }
}

impl fmt::Display for PlatformInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.os {
            Os::Linux => "linux",
            Os::MacOs => "macos",
            Os::Windows => "windows",
            Os::Other => "other",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_setting_wins() {
        assert!(PlatformInfo::from_setting(PlatformSetting::Macos).is_macos());
        assert!(!PlatformInfo::from_setting(PlatformSetting::Linux).is_macos());
        assert!(PlatformInfo::from_setting(PlatformSetting::Windows).is_windows());
    }

    #[test]
    fn test_detect_matches_target() {
        assert_eq!(PlatformInfo::detect().is_macos(), cfg!(target_os = "macos"));
    }

    #[test]
    fn test_parse_setting() {
        assert_eq!("MacOS".parse::<PlatformSetting>().unwrap(), PlatformSetting::Macos);
        assert!("beos".parse::<PlatformSetting>().is_err());
    }
}
