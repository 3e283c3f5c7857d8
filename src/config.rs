//! Guichet configuration.
//!
//! Loaded from `~/.guichet/config.toml`. Every field is optional and a
//! missing file is a valid empty configuration.

use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

/// Guichet configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Command executed to acquire the user position.
    /// Must print `<longitude> <latitude>` on stdout; a non-zero exit is
    /// treated as the user declining to share their position.
    pub locate_command: Option<String>,

    /// Command invoked with one JSON argument after each status change.
    /// Best-effort: failure is warned about, never propagated.
    pub notify_command: Option<String>,

    /// Mission directory path. Defaults to `~/.guichet/missions.toml`.
    pub missions_path: Option<PathBuf>,

    /// Database path. Defaults to `~/.guichet/guichet.sqlite`.
    pub database_path: Option<PathBuf>,
}

impl Config {
    /// Load config from `~/.guichet/config.toml`.
    ///
    /// A missing file yields the default config; an unreadable or invalid
    /// file is an error.
    pub fn load() -> Result<Self, String> {
        let Some(path) = Self::path() else {
            return Ok(Self::default());
        };

        let contents = match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(format!("failed to read {}: {e}", path.display())),
        };

        toml::from_str(&contents).map_err(|e| format!("invalid config at {}: {e}", path.display()))
    }

    /// The config file path: `~/.guichet/config.toml`.
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".guichet").join("config.toml"))
    }
}
