//! I/O Endpoint.
//!
//! [`EndpointRegistry`] is the device-node table: it hands out a dynamic
//! identifier and a node name per bound instance and resolves names back
//! to the owning [`DeviceState`]. [`Session`] is one open handle on a node
//! and implements the single-byte read/write contract.
//!
//! # Read/write contract
//!
//! | Call | `count == 0` | copy faults | success |
//! |------|--------------|-------------|---------|
//! | `read` | `0`, no load | `0` (byte loaded, not delivered) | `1` |
//! | `write` | `0`, no store | `0`, no store | `1` |
//!
//! At most one byte moves per call whatever `count` says, and the position
//! argument is accepted but never used or advanced.

use crate::state::DeviceState;
use crate::uaccess::{Transfer, UserReader, UserWriter};
use bytereg_common::consts::{DRIVER_NAME, FIRST_DYNAMIC_MINOR, MAX_DYNAMIC_MINOR, NODE_NAME_MAX};
use bytereg_common::error::{DriverError, DriverResult};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, trace};

/// Node name storage.
pub type NodeName = heapless::String<NODE_NAME_MAX>;

/// Identity of one registered endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EndpointId {
    /// Dynamically assigned identifier
    pub minor: u8,
    /// Per-driver instance slot the name was derived from
    pub slot: u8,
    /// Node name, e.g. `simple` or `simple1`
    pub name: NodeName,
}

impl EndpointId {
    /// Build the identity for `minor` and name slot `slot`.
    ///
    /// Slot 0 is named after the driver; later slots append their number.
    pub fn new(minor: u8, slot: u8) -> DriverResult<Self> {
        let mut name = NodeName::new();
        let res = if slot == 0 {
            name.push_str(DRIVER_NAME).map_err(|_| std::fmt::Error)
        } else {
            write!(name, "{DRIVER_NAME}{slot}")
        };
        res.map_err(|_| DriverError::RegistrationFailed("node name too long".to_string()))?;
        Ok(Self { minor, slot, name })
    }

    /// The identity the first registration receives.
    #[cfg(test)]
    pub(crate) fn first() -> Self {
        Self {
            minor: FIRST_DYNAMIC_MINOR,
            slot: 0,
            name: NodeName::try_from(DRIVER_NAME).unwrap_or_default(),
        }
    }
}

/// Registered endpoints, keyed by identifier.
#[derive(Debug, Default)]
pub struct EndpointRegistry {
    nodes: RwLock<BTreeMap<u8, Arc<DeviceState>>>,
}

impl EndpointRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new endpoint.
    ///
    /// Picks the lowest free identifier and name slot, builds the state
    /// with `make` and publishes it. If no identifier is free, `make` is
    /// never called and whatever it captured is dropped.
    ///
    /// # Errors
    /// `RegistrationFailed` when the identifier space is exhausted.
    pub fn register<F>(&self, make: F) -> DriverResult<Arc<DeviceState>>
    where
        F: FnOnce(EndpointId) -> DeviceState,
    {
        let mut nodes = self.nodes.write();

        let minor = (FIRST_DYNAMIC_MINOR..=MAX_DYNAMIC_MINOR)
            .find(|m| !nodes.contains_key(m))
            .ok_or_else(|| DriverError::RegistrationFailed("no free identifier".to_string()))?;
        let slot = (0..=u8::MAX)
            .find(|s| nodes.values().all(|st| st.endpoint().slot != *s))
            .ok_or_else(|| DriverError::RegistrationFailed("no free name slot".to_string()))?;

        let id = EndpointId::new(minor, slot)?;
        let state = Arc::new(make(id));
        nodes.insert(minor, Arc::clone(&state));
        trace!("Registered endpoint {} ({})", state.endpoint().name, minor);
        Ok(state)
    }

    /// Remove an endpoint. New opens fail from here on; open sessions keep
    /// their handle.
    pub fn unregister(&self, minor: u8) -> Option<Arc<DeviceState>> {
        let removed = self.nodes.write().remove(&minor);
        if let Some(state) = &removed {
            trace!("Unregistered endpoint {} ({})", state.endpoint().name, minor);
        }
        removed
    }

    /// Open the endpoint with identifier `minor`.
    pub fn open(&self, minor: u8) -> DriverResult<Session> {
        self.nodes
            .read()
            .get(&minor)
            .map(|state| Session::open(Arc::clone(state)))
            .ok_or_else(|| DriverError::NoSuchEndpoint(minor.to_string()))
    }

    /// Open the endpoint named `name`.
    pub fn open_by_name(&self, name: &str) -> DriverResult<Session> {
        self.nodes
            .read()
            .values()
            .find(|state| state.endpoint().name.as_str() == name)
            .map(|state| Session::open(Arc::clone(state)))
            .ok_or_else(|| DriverError::NoSuchEndpoint(name.to_string()))
    }

    /// Registered endpoints, ordered by identifier.
    pub fn list(&self) -> Vec<EndpointId> {
        self.nodes
            .read()
            .values()
            .map(|state| state.endpoint().clone())
            .collect()
    }

    /// Number of registered endpoints.
    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }
}

/// One open handle on an endpoint.
#[derive(Debug, Clone)]
pub struct Session {
    state: Arc<DeviceState>,
}

impl Session {
    /// Associate a session with its device. Does no other work.
    pub fn open(state: Arc<DeviceState>) -> Self {
        Self { state }
    }

    /// Drop the session. The register unit is unaffected.
    pub fn close(self) {}

    /// Device this session dispatches against.
    pub fn device(&self) -> &DeviceState {
        &self.state
    }

    /// Read one byte from the register into `buf`.
    ///
    /// Returns `1` on success and `0` when `count` is zero, the buffer
    /// faulted, or the device has been unbound.
    pub fn read<B>(&self, buf: &mut B, count: usize, _offset: &mut u64) -> usize
    where
        B: UserWriter + ?Sized,
    {
        self.read_transfer(buf, count).bytes()
    }

    /// Write the first byte of `buf` to the register.
    ///
    /// Returns `1` on success and `0` when `count` is zero, the buffer
    /// faulted (no store happens), or the device has been unbound.
    pub fn write<B>(&self, buf: &B, count: usize, _offset: &mut u64) -> usize
    where
        B: UserReader + ?Sized,
    {
        self.write_transfer(buf, count).bytes()
    }

    /// [`Session::read`] with the outcome kept distinct.
    pub fn read_transfer<B>(&self, buf: &mut B, count: usize) -> Transfer
    where
        B: UserWriter + ?Sized,
    {
        if count == 0 {
            return Transfer::Idle;
        }
        let Some(byte) = self.state.load() else {
            return Transfer::Detached;
        };
        match buf.copy_to_user(&[byte]) {
            Ok(()) => Transfer::Moved(1),
            Err(fault) => {
                debug!(node = %self.state.endpoint().name, "read: {fault}");
                Transfer::Fault(fault)
            }
        }
    }

    /// [`Session::write`] with the outcome kept distinct.
    pub fn write_transfer<B>(&self, buf: &B, count: usize) -> Transfer
    where
        B: UserReader + ?Sized,
    {
        if count == 0 {
            return Transfer::Idle;
        }
        let mut byte = [0u8; 1];
        if let Err(fault) = buf.copy_from_user(&mut byte) {
            debug!(node = %self.state.endpoint().name, "write: {fault}");
            return Transfer::Fault(fault);
        }
        if self.state.store(byte[0]) {
            Transfer::Moved(1)
        } else {
            Transfer::Detached
        }
    }
}
