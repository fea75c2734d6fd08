//! Configuration loading traits and types.
//!
//! One TOML file configures a bytereg process: logging, the physical memory
//! device to map register ranges from, and the platform description.
//!
//! # Usage
//!
//! ```rust,no_run
//! use bytereg_common::config::{ByteregConfig, ConfigError};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = ByteregConfig::load_validated(Path::new("platform.toml"))?;
//!     println!("{} devices described", config.platform.devices.len());
//!     Ok(())
//! }
//! ```

use crate::consts::DEFAULT_MEM_DEVICE;
use crate::platform::PlatformConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

/// Process-level configuration fields.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "bytereg"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    pub service_name: String,
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            service_name: "bytereg".to_string(),
        }
    }
}

fn default_mem_device() -> PathBuf {
    PathBuf::from(DEFAULT_MEM_DEVICE)
}

fn default_true() -> bool {
    true
}

/// Register mapping configuration.
///
/// # TOML Example
///
/// ```toml
/// [driver]
/// mem_device = "/dev/mem"
/// sync = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Character device exposing physical memory.
    #[serde(default = "default_mem_device")]
    pub mem_device: PathBuf,

    /// Open the memory device with `O_SYNC` so the mapping is uncached.
    #[serde(default = "default_true")]
    pub sync: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            mem_device: default_mem_device(),
            sync: true,
        }
    }
}

/// Complete bytereg configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ByteregConfig {
    /// Logging and service identity.
    #[serde(default)]
    pub shared: SharedConfig,

    /// Register mapping settings.
    #[serde(default)]
    pub driver: DriverConfig,

    /// Described hardware instances (`[[devices]]` tables).
    #[serde(flatten)]
    pub platform: PlatformConfig,
}

impl ByteregConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        if self.driver.mem_device.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "mem_device cannot be empty".to_string(),
            ));
        }
        self.platform.validate()
    }

    /// Load and validate in one step.
    pub fn load_validated(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }
}

/// Trait for loading configuration from TOML files.
///
/// Blanket-implemented for any type implementing
/// `serde::de::DeserializeOwned`.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
