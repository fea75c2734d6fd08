//! Binding Manager.
//!
//! Drives one hardware instance through its lifecycle:
//!
//! ```text
//!   Unbound ──probe──► Binding ──ok──► Bound ──remove──► Unbinding ──► Unbound
//!                         │
//!                         └──err──► Failed (nothing left allocated)
//! ```
//!
//! Binding allocates the state slot, acquires the Register Access Unit and
//! registers the endpoint, in that order. Each step rolls back the earlier
//! ones on failure. Unbinding unregisters the endpoint first, then detaches
//! and releases the unit, then frees the state slot.
//!
//! Failed binds are reported to the caller and never retried here.

use crate::endpoint::{EndpointId, EndpointRegistry};
use crate::match_table::MatchTable;
use crate::register::{RegisterAccessUnit, RegisterMapper};
use crate::resource::ResourceTable;
use crate::state::DeviceState;
use bytereg_common::consts::MAX_DEVICES;
use bytereg_common::error::{DriverError, DriverResult};
use bytereg_common::platform::HardwareInstanceDescriptor;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Lifecycle controller for every instance of one driver.
pub struct BindingManager {
    table: MatchTable,
    mapper: Arc<dyn RegisterMapper>,
    resources: ResourceTable,
    endpoints: Arc<EndpointRegistry>,
    bound: HashMap<String, Arc<DeviceState>>,
    capacity: usize,
}

impl BindingManager {
    /// Create a manager with its own reservation table and endpoint registry.
    pub fn new(table: MatchTable, mapper: Arc<dyn RegisterMapper>) -> Self {
        Self::with_resources(table, mapper, ResourceTable::new(), Arc::new(EndpointRegistry::new()))
    }

    /// Create a manager sharing an existing reservation table and registry.
    pub fn with_resources(
        table: MatchTable,
        mapper: Arc<dyn RegisterMapper>,
        resources: ResourceTable,
        endpoints: Arc<EndpointRegistry>,
    ) -> Self {
        Self {
            table,
            mapper,
            resources,
            endpoints,
            bound: HashMap::new(),
            capacity: MAX_DEVICES,
        }
    }

    /// Limit the number of instances that can hold live state at once.
    ///
    /// Binds beyond the limit fail with `AllocationFailure`. Defaults to
    /// `MAX_DEVICES`.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Compatibility table this manager binds against.
    pub fn table(&self) -> &MatchTable {
        &self.table
    }

    /// Endpoint registry sessions are opened from.
    pub fn endpoints(&self) -> &Arc<EndpointRegistry> {
        &self.endpoints
    }

    /// Reservation table register units claim from.
    pub fn resources(&self) -> &ResourceTable {
        &self.resources
    }

    /// Bind a discovered instance.
    ///
    /// # Errors
    /// - `NotCompatible` if the descriptor is not in the table
    /// - `AlreadyBound` if the instance already has a live state
    /// - `AllocationFailure` if state storage cannot be obtained
    /// - `ResourceUnavailable` if the register range cannot be claimed or mapped
    /// - `RegistrationFailed` if no endpoint can be registered
    pub fn probe(&mut self, desc: &HardwareInstanceDescriptor) -> DriverResult<EndpointId> {
        if !self.table.matches(&desc.compatible) {
            return Err(DriverError::NotCompatible(desc.name.clone()));
        }
        if self.bound.contains_key(&desc.name) {
            warn!("{}: already bound, refusing second bind", desc.name);
            return Err(DriverError::AlreadyBound(desc.name.clone()));
        }

        if self.bound.len() >= self.capacity || self.bound.try_reserve(1).is_err() {
            error!("{}: could not allocate private state", desc.name);
            return Err(DriverError::AllocationFailure);
        }

        let unit = RegisterAccessUnit::acquire(
            &self.resources,
            self.mapper.as_ref(),
            &desc.name,
            desc.reg,
        )
        .inspect_err(|e| error!("{}: could not map physical memory: {e}", desc.name))?;

        let state = self
            .endpoints
            .register(|id| DeviceState::new(desc.name.as_str(), desc.compatible.as_str(), id, unit))
            .inspect_err(|e| error!("{}: {e}", desc.name))?;

        let endpoint = state.endpoint().clone();
        info!(
            "{}: bound {} as '{}' (id {})",
            desc.name, desc.reg, endpoint.name, endpoint.minor
        );
        self.bound.insert(desc.name.clone(), state);
        Ok(endpoint)
    }

    /// Unbind a previously bound instance.
    ///
    /// # Errors
    /// `NotBound` if `instance` has no live state.
    pub fn remove(&mut self, instance: &str) -> DriverResult<()> {
        let state = self
            .bound
            .remove(instance)
            .ok_or_else(|| DriverError::NotBound(instance.to_string()))?;
        Self::unbind(&self.endpoints, instance, state);
        Ok(())
    }

    /// Unbind every bound instance, in instance-name order.
    pub fn remove_all(&mut self) {
        let mut names: Vec<String> = self.bound.keys().cloned().collect();
        names.sort();
        for name in names {
            if let Some(state) = self.bound.remove(&name) {
                Self::unbind(&self.endpoints, &name, state);
            }
        }
    }

    fn unbind(endpoints: &EndpointRegistry, instance: &str, state: Arc<DeviceState>) {
        let endpoint = state.endpoint().clone();
        endpoints.unregister(endpoint.minor);
        if let Some(unit) = state.detach() {
            unit.release();
        }
        info!("{}: unbound '{}'", instance, endpoint.name);
    }

    /// True if `instance` is bound.
    pub fn is_bound(&self, instance: &str) -> bool {
        self.bound.contains_key(instance)
    }

    /// State of a bound instance.
    pub fn device(&self, instance: &str) -> Option<&Arc<DeviceState>> {
        self.bound.get(instance)
    }

    /// Names of bound instances, sorted.
    pub fn bound_instances(&self) -> Vec<String> {
        let mut names: Vec<String> = self.bound.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Drop for BindingManager {
    fn drop(&mut self) {
        self.remove_all();
    }
}
