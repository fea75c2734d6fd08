//! Platform description types.
//!
//! A platform description lists the hardware instances present on the
//! machine, each with a compatibility string and one physical register
//! range. It plays the role of the device tree: the driver never parses it
//! itself, it only receives one [`HardwareInstanceDescriptor`] per bind.
//!
//! # TOML Example
//!
//! ```toml
//! [[devices]]
//! name = "leds@41200000"
//! compatible = "xlnx,interrupt-demo-1.0"
//! reg = [0x41200000, 0x10000]
//! ```

use crate::config::ConfigError;
use crate::consts::MAX_DEVICES;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A physical register address range (`base`, `length`).
///
/// Deserialized from a two-element `reg` array, like a device-tree `reg`
/// property with one address cell and one size cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(u64, u64)", into = "(u64, u64)")]
pub struct RegisterRange {
    /// Physical base address
    pub base: u64,
    /// Length in bytes
    pub length: u64,
}

impl RegisterRange {
    /// Create a new range.
    pub const fn new(base: u64, length: u64) -> Self {
        Self { base, length }
    }

    /// Exclusive end address, or `None` if the range wraps the address space.
    pub fn end(&self) -> Option<u64> {
        self.base.checked_add(self.length)
    }

    /// Non-empty and not wrapping.
    pub fn is_valid(&self) -> bool {
        self.length > 0 && self.end().is_some()
    }

    /// True if both ranges share at least one byte.
    pub fn overlaps(&self, other: &RegisterRange) -> bool {
        let (Some(a_end), Some(b_end)) = (self.end(), other.end()) else {
            return true;
        };
        self.base < b_end && other.base < a_end
    }
}

impl From<(u64, u64)> for RegisterRange {
    fn from((base, length): (u64, u64)) -> Self {
        Self { base, length }
    }
}

impl From<RegisterRange> for (u64, u64) {
    fn from(range: RegisterRange) -> Self {
        (range.base, range.length)
    }
}

impl fmt::Display for RegisterRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#x}..+{:#x}]", self.base, self.length)
    }
}

/// One hardware instance as supplied by the platform description.
///
/// Immutable; consumed by the binding manager at bind time and not
/// retained afterward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareInstanceDescriptor {
    /// Unique instance name (device-tree node name)
    pub name: String,
    /// Compatibility string matched against the driver's table
    pub compatible: String,
    /// Register range
    pub reg: RegisterRange,
}

impl HardwareInstanceDescriptor {
    /// Create a descriptor.
    pub fn new(name: impl Into<String>, compatible: impl Into<String>, reg: RegisterRange) -> Self {
        Self {
            name: name.into(),
            compatible: compatible.into(),
            reg,
        }
    }
}

/// The list of hardware instances present on the platform.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// All described instances, in discovery order.
    #[serde(default)]
    pub devices: Vec<HardwareInstanceDescriptor>,
}

impl PlatformConfig {
    /// Validate the platform description.
    ///
    /// # Validation Rules
    /// 1. At most `MAX_DEVICES` entries
    /// 2. `name` and `compatible` not empty
    /// 3. `reg` length > 0 and `base + length` does not overflow
    /// 4. Names unique
    ///
    /// Overlapping ranges are not rejected here; the reservation table
    /// refuses the second claim at bind time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.devices.len() > MAX_DEVICES {
            return Err(ConfigError::ValidationError(format!(
                "Too many devices: {} (max {})",
                self.devices.len(),
                MAX_DEVICES
            )));
        }

        let mut names = HashSet::new();
        for dev in &self.devices {
            if dev.name.is_empty() {
                return Err(ConfigError::ValidationError(
                    "device name cannot be empty".to_string(),
                ));
            }
            if dev.compatible.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "Device '{}': compatible cannot be empty",
                    dev.name
                )));
            }
            if !dev.reg.is_valid() {
                return Err(ConfigError::ValidationError(format!(
                    "Device '{}': invalid register range {}",
                    dev.name, dev.reg
                )));
            }
            if !names.insert(dev.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "Duplicate device name: {}",
                    dev.name
                )));
            }
        }

        Ok(())
    }
}
