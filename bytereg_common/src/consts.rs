//! Driver-wide constants.
//!
//! Single source of truth for the driver identity, the compatibility
//! identifier and the endpoint identifier space.

use static_assertions::const_assert;

/// Fixed driver identifier. Endpoint node names derive from it.
pub const DRIVER_NAME: &str = "simple";

/// The single compatibility identifier this driver binds against.
pub const COMPATIBLE_ID: &str = "xlnx,interrupt-demo-1.0";

/// First identifier handed out by the endpoint registry.
pub const FIRST_DYNAMIC_MINOR: u8 = 64;

/// Last identifier (inclusive) handed out by the endpoint registry.
pub const MAX_DYNAMIC_MINOR: u8 = 255;

/// Maximum length of an endpoint node name.
pub const NODE_NAME_MAX: usize = 32;

/// Maximum number of devices a platform description may list.
pub const MAX_DEVICES: usize = 64;

/// Default physical memory device.
pub const DEFAULT_MEM_DEVICE: &str = "/dev/mem";

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/bytereg/platform.toml";

const_assert!(FIRST_DYNAMIC_MINOR < MAX_DYNAMIC_MINOR);
const_assert!(DRIVER_NAME.len() + 3 <= NODE_NAME_MAX);
