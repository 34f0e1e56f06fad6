use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::app::domain::DEFAULT_MAX_STEPS;
use crate::attachments::AttachmentLimits;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoreConfig {
    #[serde(default)]
    pub attachments: AttachmentLimits,

    #[serde(default)]
    pub session: SessionSettings,

    #[serde(default)]
    pub history: HistorySettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Tool calls allowed within one turn.
    pub max_steps: usize,
    /// Prefix of the canonical session URL, e.g. `/chat/<id>`.
    pub url_prefix: String,
    pub event_capacity: usize,
    pub command_capacity: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            url_prefix: "/chat/".to_string(),
            event_capacity: 256,
            command_capacity: 64,
        }
    }
}

impl SessionSettings {
    pub fn canonical_url(&self, session_id: impl std::fmt::Display) -> String {
        format!("{}{}", self.url_prefix, session_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    pub preview_chars: usize,
    pub fallback_title: String,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            preview_chars: 30,
            fallback_title: "New Chat".to_string(),
        }
    }
}

impl CoreConfig {
    /// `<config dir>/colloquy/config.toml`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("colloquy").join("config.toml"))
    }

    /// Load config from `path`, or return defaults if the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
