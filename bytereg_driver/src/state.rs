//! Per-Device State.
//!
//! One [`DeviceState`] exists per bound hardware instance. It owns the
//! instance's Register Access Unit and records the endpoint that dispatches
//! against it. Sessions hold it through an `Arc` as a capability handle.
//!
//! The unit sits behind a read/write lock. Register accesses take the shared
//! side, so sessions never serialise against each other. Unbinding takes the
//! exclusive side to detach the unit, which waits out every in-flight access
//! and leaves later ones with nothing to touch.

use crate::endpoint::EndpointId;
use crate::register::RegisterAccessUnit;
use bytereg_common::platform::RegisterRange;
use parking_lot::RwLock;

/// Runtime state of one bound instance.
#[derive(Debug)]
pub struct DeviceState {
    instance: String,
    compatible: String,
    endpoint: EndpointId,
    range: RegisterRange,
    unit: RwLock<Option<RegisterAccessUnit>>,
}

impl DeviceState {
    /// Wrap a freshly acquired unit.
    pub fn new(
        instance: impl Into<String>,
        compatible: impl Into<String>,
        endpoint: EndpointId,
        unit: RegisterAccessUnit,
    ) -> Self {
        Self {
            instance: instance.into(),
            compatible: compatible.into(),
            endpoint,
            range: unit.range(),
            unit: RwLock::new(Some(unit)),
        }
    }

    /// Name of the bound instance.
    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// Compatibility string the instance was bound with.
    pub fn compatible(&self) -> &str {
        &self.compatible
    }

    /// Endpoint registered for this state.
    pub fn endpoint(&self) -> &EndpointId {
        &self.endpoint
    }

    /// Register range the unit maps.
    pub fn range(&self) -> RegisterRange {
        self.range
    }

    /// False once the unit has been detached.
    pub fn is_attached(&self) -> bool {
        self.unit.read().is_some()
    }

    /// Read the register, or `None` once detached.
    pub fn load(&self) -> Option<u8> {
        self.unit.read().as_ref().map(RegisterAccessUnit::load)
    }

    /// Write the register. Returns false once detached.
    pub fn store(&self, value: u8) -> bool {
        match self.unit.read().as_ref() {
            Some(unit) => {
                unit.store(value);
                true
            }
            None => false,
        }
    }

    /// Take the unit out, waiting for in-flight accesses to finish.
    pub(crate) fn detach(&self) -> Option<RegisterAccessUnit> {
        self.unit.write().take()
    }
}
