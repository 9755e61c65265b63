//! # Configuration Utilities
//!
//! TOML configuration shared by the `stegocrypt` CLI and the web server.
//!
//! Every field has a default, so an empty file (or no file at all) is a valid
//! configuration.
//!
//! # Example TOML
//!
//! ```toml
//! [crypto]
//! key_size_bits = 2048
//!
//! [stego]
//! strict_trailing_bits = false
//! max_carrier_pixels = 40000000
//!
//! [server]
//! address = "127.0.0.1:5000"
//! max_upload_bytes = 16777216
//! default_keys_path = "keys/default.json"
//!
//! [logging]
//! level = "info"
//! ```

use anyhow::{bail, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::encryption::keys::{DEFAULT_KEY_BITS, MIN_KEY_BITS};

/// Load a TOML configuration file and deserialize it into the specified type.
///
/// # Arguments
/// - `path`: Path to the TOML configuration file
///
/// # Returns
/// - `Ok(T)`: Successfully loaded and parsed configuration
/// - `Err`: File I/O or parsing error
///
/// # Example
/// ```ignore
/// let config: StegoConfig = load_config("config/stegocrypt.toml")?;
/// ```
pub fn load_config<T>(path: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    let content = fs::read_to_string(path)?;
    let config: T = toml::from_str(&content)?;
    Ok(config)
}

/// Complete configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StegoConfig {
    pub crypto: CryptoConfig,
    pub stego: StegoSettings,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// RSA key settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// Modulus size for generated key pairs
    pub key_size_bits: usize,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            key_size_bits: DEFAULT_KEY_BITS,
        }
    }
}

/// Embedding and extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StegoSettings {
    /// Fail extraction when the declared bit length leaves a partial byte
    pub strict_trailing_bits: bool,
    /// Largest carrier accepted, in pixels
    pub max_carrier_pixels: u64,
}

impl Default for StegoSettings {
    fn default() -> Self {
        Self {
            strict_trailing_bits: false,
            max_carrier_pixels: 40_000_000,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address (e.g., "127.0.0.1:5000")
    pub address: String,
    /// Request body limit in bytes
    pub max_upload_bytes: usize,
    /// JSON key file used for default-mode encoding; generated at start-up when unset
    pub default_keys_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:5000".to_string(),
            max_upload_bytes: 16 * 1024 * 1024,
            default_keys_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of off, error, warn, info, debug, trace
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn level_filter(&self) -> Result<LevelFilter> {
        match self.level.parse::<LevelFilter>() {
            Ok(level) => Ok(level),
            Err(_) => bail!("invalid log level '{}'", self.level),
        }
    }
}

impl StegoConfig {
    /// Load and validate a configuration file.
    pub fn from_file(path: &str) -> Result<Self> {
        let config: StegoConfig = load_config(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, otherwise use the defaults.
    pub fn load_or_default(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let bits = self.crypto.key_size_bits;
        if bits < MIN_KEY_BITS || bits % 8 != 0 {
            bail!(
                "crypto.key_size_bits must be a multiple of 8 and at least {}, got {}",
                MIN_KEY_BITS,
                bits
            );
        }
        if self.stego.max_carrier_pixels == 0 {
            bail!("stego.max_carrier_pixels must be greater than zero");
        }
        if self.server.max_upload_bytes == 0 {
            bail!("server.max_upload_bytes must be greater than zero");
        }
        self.logging.level_filter()?;
        Ok(())
    }
}
