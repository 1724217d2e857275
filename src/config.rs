//! Codec configuration.
//!
//! This module provides [`StegoConfig`], the settings shared by encoder and
//! decoder, with TOML persistence:
//!
//! ```toml
//! max_payload_len = 48
//! ply_budget = 2048
//! max_attempts = 16
//! filler_plies = 4
//! integrity_tag = true
//!
//! [headers]
//! Event = "Club Championship"
//! White = "Carlsen, M."
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::chess::Position;

/// Default maximum payload size in bytes.
///
/// A single attempt at this size ends early (mate, draw) in roughly one
/// game out of twenty; [`DEFAULT_MAX_ATTEMPTS`] retries make the failure
/// of every attempt negligible.
pub const DEFAULT_MAX_PAYLOAD_LEN: usize = 64;

/// Default ply budget before encoding gives up.
pub const DEFAULT_PLY_BUDGET: usize = 2048;

/// Default number of move orders tried before reporting no capacity.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 16;

/// Errors that can occur when loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
}

/// Settings both sides of a transcript must agree on.
///
/// `max_payload_len`, `integrity_tag` and `start_fen` affect the wire
/// format; `ply_budget`, `max_attempts`, `filler_plies` and `headers` only
/// shape encoding.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct StegoConfig {
    /// Largest payload accepted, in bytes.
    pub max_payload_len: usize,

    /// Maximum plies played per attempt.
    pub ply_budget: usize,

    /// Move orders tried before encoding fails; the attempt used is
    /// recorded in the `Round` header.
    pub max_attempts: u32,

    /// Extra plies appended after the payload.
    pub filler_plies: usize,

    /// Append a 32-bit integrity tag to the frame.
    pub integrity_tag: bool,

    /// Custom start position (standard if absent).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_fen: Option<String>,

    /// Extra PGN headers.
    pub headers: BTreeMap<String, String>,
}

impl Default for StegoConfig {
    fn default() -> Self {
        Self {
            max_payload_len: DEFAULT_MAX_PAYLOAD_LEN,
            ply_budget: DEFAULT_PLY_BUDGET,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            filler_plies: 0,
            integrity_tag: false,
            start_fen: None,
            headers: BTreeMap::new(),
        }
    }
}

impl StegoConfig {
    /// Loads and validates a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: StegoConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the configuration as TOML.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_payload_len == 0 {
            return Err(ConfigError::Invalid(
                "max_payload_len must be positive".to_string(),
            ));
        }
        if self.max_payload_len > u32::MAX as usize {
            return Err(ConfigError::Invalid(
                "max_payload_len must fit the 32-bit length field".to_string(),
            ));
        }
        if self.ply_budget == 0 {
            return Err(ConfigError::Invalid("ply_budget must be positive".to_string()));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid("max_attempts must be positive".to_string()));
        }
        self.start_position()?;
        Ok(())
    }

    /// The configured start position.
    pub fn start_position(&self) -> Result<Position, ConfigError> {
        match &self.start_fen {
            Some(fen) => Position::from_fen(fen)
                .map_err(|e| ConfigError::Invalid(format!("start_fen: {}", e))),
            None => Ok(Position::starting()),
        }
    }
}
