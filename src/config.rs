//! Binding configuration.
//!
//! Supports YAML configuration with precedence: ENV > file > defaults.
//!
//! ```yaml
//! version: 1
//! library:
//!   name: libmacmon.dylib
//!   search_paths: [/opt/macmon/lib/libmacmon.dylib]
//!   abi: full
//! poll:
//!   update_ms: 1000
//! ```

use crate::error::{MacmonError, Result};
use crate::ffi::{default_library_name, AbiVariant, CandidatePath};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming an explicit library path, tried first.
pub const LIBRARY_ENV: &str = "MACMON_LIBRARY";

/// Where and how to load the native library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Library file name used for the default search locations.
    #[serde(default = "default_library_name")]
    pub name: String,

    /// Explicit paths tried, in order, before the default locations.
    #[serde(default)]
    pub search_paths: Vec<PathBuf>,

    /// Entry points the library is expected to export.
    #[serde(default)]
    pub abi: AbiVariant,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self { name: default_library_name(), search_paths: Vec::new(), abi: AbiVariant::default() }
    }
}

/// Polling settings for collector hosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Refresh interval in milliseconds.
    #[serde(default = "default_update_ms")]
    pub update_ms: u64,
}

fn default_update_ms() -> u64 {
    1000
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { update_ms: default_update_ms() }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Configuration version.
    #[serde(default = "default_version")]
    pub version: u32,

    /// Library location settings.
    #[serde(default)]
    pub library: LibraryConfig,

    /// Polling settings.
    #[serde(default)]
    pub poll: PollConfig,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self { version: default_version(), library: LibraryConfig::default(), poll: PollConfig::default() }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .map_err(|_| MacmonError::ConfigNotFound(path.display().to_string()))?;

        Self::parse(&content)
    }

    /// Parses and validates configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error with line number if parsing fails.
    pub fn parse(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml).map_err(|e| {
            let line = e.location().map(|l| l.line()).unwrap_or(0);
            MacmonError::ConfigParse { line, message: e.to_string() }
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration with fallback to defaults.
    #[must_use]
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform config location: `<config dir>/macmon/config.yaml`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("macmon").join("config.yaml"))
    }

    /// Checks values serde cannot express as types.
    ///
    /// # Errors
    ///
    /// Returns [`MacmonError::ConfigInvalid`] naming the offending key.
    pub fn validate(&self) -> Result<()> {
        if self.library.name.trim().is_empty() {
            return Err(MacmonError::ConfigInvalid {
                key: "library.name".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.poll.update_ms == 0 {
            return Err(MacmonError::ConfigInvalid {
                key: "poll.update_ms".to_string(),
                message: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Returns the update interval as a Duration.
    #[must_use]
    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.poll.update_ms)
    }

    /// Candidate library locations, honouring [`LIBRARY_ENV`].
    #[must_use]
    pub fn candidates(&self) -> Vec<CandidatePath> {
        self.candidates_with_override(std::env::var_os(LIBRARY_ENV).map(PathBuf::from))
    }

    /// Candidate library locations: `env_override`, then `search_paths`, then
    /// the working directory, executable and binding module locations.
    #[must_use]
    pub fn candidates_with_override(&self, env_override: Option<PathBuf>) -> Vec<CandidatePath> {
        env_override
            .into_iter()
            .filter(|path| !path.as_os_str().is_empty())
            .chain(self.library.search_paths.iter().cloned())
            .map(CandidatePath::Explicit)
            .chain(CandidatePath::defaults(&self.library.name))
            .collect()
    }
}
