//! Framing constants and runtime configuration.

use std::path::PathBuf;

use crate::error::ConfigError;

/// First sync byte of every record header.
pub const HEAD_BYTE1: u8 = 0xA3;
/// Second sync byte of every record header.
pub const HEAD_BYTE2: u8 = 0x95;
/// Sync bytes plus message id.
pub const HEADER_SIZE: usize = 3;

/// Message id of the self-describing format record.
pub const FORMAT_MSG_ID: u8 = 128;

/// Limits imposed by the format record's `n`, `N` and `Z` columns.
pub const MAX_NAME_LEN: usize = 4;
pub const MAX_CODES_LEN: usize = 16;
pub const MAX_LABELS_LEN: usize = 64;
/// The format record stores a record's length in one byte.
pub const MAX_RECORD_LEN: usize = u8::MAX as usize;

/// Environment key holding the persisted category bitmask.
pub const BITMASK_ENV: &str = "FLIGHT_LOG_BITMASK";
/// Environment key holding the default log path.
pub const PATH_ENV: &str = "FLIGHT_LOG_PATH";

const DEFAULT_PATH: &str = "flight.bin";

/// Settings the logging subsystem loads at startup.
///
/// The category bitmask lives outside the core (parameter storage on the
/// vehicle, an environment variable here); this struct is only the carrier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub bitmask: u32,
    pub log_path: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            bitmask: crate::category::PLANE_CATEGORIES.known_bits(),
            log_path: PathBuf::from(DEFAULT_PATH),
        }
    }
}

impl LogConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup, falling back to defaults
    /// for missing keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(BITMASK_ENV) {
            config.bitmask = parse_bitmask(BITMASK_ENV, &raw)?;
        }
        if let Some(raw) = lookup(PATH_ENV) {
            if raw.trim().is_empty() {
                return Err(ConfigError::EmptyValue { key: PATH_ENV });
            }
            config.log_path = PathBuf::from(raw);
        }

        Ok(config)
    }
}

/// Accepts decimal or `0x`-prefixed hex.
pub fn parse_bitmask(key: &'static str, raw: &str) -> Result<u32, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::EmptyValue { key });
    }
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => trimmed.parse::<u32>(),
    };
    parsed.map_err(|_| ConfigError::InvalidBitmask {
        key,
        value: raw.to_string(),
    })
}
