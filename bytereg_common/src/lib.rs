//! bytereg Common Library
//!
//! Shared types for the bytereg workspace: the platform description that
//! stands in for the device tree, configuration loading, the fixed driver
//! constants and the error taxonomy used by the driver core.
//!
//! # Module Structure
//!
//! - [`config`] - Configuration loading traits and types
//! - [`platform`] - Hardware instance descriptors and register ranges
//! - [`consts`] - Driver name, compatibility identifier, identifier limits
//! - [`error`] - Bind-time error taxonomy
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use bytereg_common::prelude::*;
//! ```

pub mod config;
pub mod consts;
pub mod error;
pub mod platform;
pub mod prelude;
