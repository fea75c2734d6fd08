//! Error types for binding and endpoint lookup.
//!
//! Boundary-copy faults during `read`/`write` are deliberately absent: they
//! surface as zero bytes transferred, never as an error value.

use thiserror::Error;

/// Errors reported by the driver core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// Per-device state storage could not be obtained.
    #[error("Could not allocate per-device state")]
    AllocationFailure,

    /// The register range could not be reserved or mapped.
    #[error("Register range {base:#x}+{length:#x} unavailable: {reason}")]
    ResourceUnavailable {
        /// Physical base address
        base: u64,
        /// Range length in bytes
        length: u64,
        /// What went wrong
        reason: String,
    },

    /// The endpoint registry could not register a node.
    #[error("Endpoint registration failed: {0}")]
    RegistrationFailed(String),

    /// Descriptor is not listed in the compatibility table.
    #[error("Instance is not compatible with this driver: {0}")]
    NotCompatible(String),

    /// Instance already has a live per-device state.
    #[error("Instance already bound: {0}")]
    AlreadyBound(String),

    /// Removal requested for an instance that is not bound.
    #[error("Instance not bound: {0}")]
    NotBound(String),

    /// No endpoint is registered under the given name or identifier.
    #[error("No such endpoint: {0}")]
    NoSuchEndpoint(String),
}

impl DriverError {
    /// Shorthand for a `ResourceUnavailable` error.
    pub fn unavailable(base: u64, length: u64, reason: impl Into<String>) -> Self {
        Self::ResourceUnavailable {
            base,
            length,
            reason: reason.into(),
        }
    }
}

/// Result type for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;
