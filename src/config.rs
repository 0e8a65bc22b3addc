use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading an explicitly requested config file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Where the active configuration came from. Config is read before logging
/// exists, so the outcome is reported once logging is up.
#[derive(Debug)]
pub enum ConfigSource {
    File(PathBuf),
    Missing(PathBuf),
    Invalid(ConfigError),
}

impl ConfigSource {
    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => log::info!("Loaded config from {}", path.display()),
            ConfigSource::Missing(path) => {
                log::debug!("No config file at {}, using defaults", path.display())
            }
            ConfigSource::Invalid(err) => log::warn!("{err}, using defaults"),
        }
    }
}

/// Top-level importer configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImporterConfig {
    pub import: ImportConfig,
    pub catalog: CatalogConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

/// Behaviour switches for the import pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Wrap dice expressions in descriptions as inline roll commands.
    pub inline_rolls: bool,
    /// Tag used for emphasis markup in descriptions.
    pub emphasis_tag: String,
    /// Legendary action count when the creature is legendary but the
    /// introduction does not state one.
    pub default_legendary_actions: u32,
    /// Allow the 0.5 skill multiplier.
    pub half_proficiency: bool,
}

/// Spell catalog source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// JSON file with the spell catalog.
    pub spells_path: Option<PathBuf>,
}

/// Where finished creatures are written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub store_dir: Option<PathBuf>,
}

/// Log output configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    pub level: String,
    /// Directory for daily-rolling JSON log files.
    pub log_dir: Option<PathBuf>,
    /// JSON lines on stderr instead of the human format.
    pub json: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            inline_rolls: false,
            emphasis_tag: "em".to_string(),
            default_legendary_actions: 3,
            half_proficiency: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: None,
            json: false,
        }
    }
}

impl ImporterConfig {
    /// Load configuration from `~/.config/statblock-importer/config.toml`.
    /// Falls back to `Default` if the file is missing or unparseable.
    pub fn load() -> (Self, ConfigSource) {
        Self::load_or_default(&Self::config_path())
    }

    /// Load `path`, falling back to `Default` on any failure.
    pub fn load_or_default(path: &Path) -> (Self, ConfigSource) {
        match Self::from_path(path) {
            Ok(config) => (config, ConfigSource::File(path.to_path_buf())),
            Err(ConfigError::Read { path, source }) if source.kind() == ErrorKind::NotFound => {
                (Self::default(), ConfigSource::Missing(path))
            }
            Err(err) => (Self::default(), ConfigSource::Invalid(err)),
        }
    }

    /// Load configuration from an explicit path. Unlike [`load`](Self::load),
    /// a missing or broken file is an error.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(config)
    }

    /// Spell catalog path, if configured.
    pub fn spells_path(&self) -> Option<&Path> {
        self.catalog.spells_path.as_deref()
    }

    /// Output directory, if configured.
    pub fn store_dir(&self) -> Option<&Path> {
        self.output.store_dir.as_deref()
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("statblock-importer").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }
}
