use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Directory name used under the platform config and data directories.
pub const APP_DIR: &str = "mcp-config-tui";

/// User settings loaded from `settings.toml`.
///
/// Missing file or unknown keys fall back to defaults; a malformed file is
/// logged and ignored rather than aborting startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Palette name, see `Palette::by_name`.
    pub theme: String,
    /// Show the one-time shortcut notice after startup.
    pub show_shortcut_notice: bool,
    /// Timeout for a single connection test, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: "dark".to_string(),
            show_shortcut_notice: true,
            request_timeout_secs: 10,
        }
    }
}

impl Settings {
    pub fn load() -> Self {
        let Some(path) = Self::path() else {
            return Self::default();
        };
        match fs::read_to_string(&path) {
            Ok(raw) => Self::parse(&raw),
            Err(_) => Self::default(),
        }
    }

    fn parse(raw: &str) -> Self {
        match toml::from_str(raw) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("✗ Failed to parse settings.toml, using defaults: {e}");
                Self::default()
            }
        }
    }

    fn path() -> Option<PathBuf> {
        Some(dirs::config_dir()?.join(APP_DIR).join("settings.toml"))
    }
}

/// Resolve (and create) the data directory holding the server database.
pub fn data_dir() -> Result<PathBuf, AppError> {
    let dir = dirs::data_dir()
        .ok_or_else(|| AppError::Config("no platform data directory".to_string()))?
        .join(APP_DIR);
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_empty() {
        let settings = Settings::parse("");
        assert_eq!(settings.theme, "dark");
        assert!(settings.show_shortcut_notice);
        assert_eq!(settings.request_timeout_secs, 10);
    }

    #[test]
    fn parses_partial_file() {
        let settings = Settings::parse("theme = \"light\"\n");
        assert_eq!(settings.theme, "light");
        assert!(settings.show_shortcut_notice);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let settings = Settings::parse("theme = [not toml");
        assert_eq!(settings.theme, "dark");
    }
}
