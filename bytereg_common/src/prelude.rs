//! Prelude module for common re-exports.
//!
//! ```rust
//! use bytereg_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ByteregConfig, ConfigError, ConfigLoader, DriverConfig, LogLevel, SharedConfig};

// ─── Driver Constants ───────────────────────────────────────────────
pub use crate::consts::{COMPATIBLE_ID, DRIVER_NAME};

// ─── Errors ─────────────────────────────────────────────────────────
pub use crate::error::{DriverError, DriverResult};

// ─── Platform ───────────────────────────────────────────────────────
pub use crate::platform::{HardwareInstanceDescriptor, PlatformConfig, RegisterRange};
