//! Platform bus.
//!
//! Minimal registration/dispatch fabric: it receives hardware instance
//! descriptors (at startup or as hotplug events), matches them against the
//! driver's compatibility table and invokes bind/unbind on the
//! [`BindingManager`]. It serialises those calls by taking `&mut self`.
//!
//! A failed bind is local to its instance. The bus records it and moves on;
//! it never retries.

use crate::binding::BindingManager;
use crate::endpoint::{EndpointId, EndpointRegistry};
use bytereg_common::error::{DriverError, DriverResult};
use bytereg_common::platform::{HardwareInstanceDescriptor, PlatformConfig};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of populating the bus from a platform description.
#[derive(Debug, Default)]
pub struct BindReport {
    /// Instances bound, with their endpoints.
    pub bound: Vec<(String, EndpointId)>,
    /// Instances that matched but failed to bind.
    pub failed: Vec<(String, DriverError)>,
    /// Instances with no matching driver.
    pub skipped: Vec<String>,
}

impl BindReport {
    /// True if no matching instance failed.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Dispatches discovery and removal events to the binding manager.
pub struct PlatformBus {
    manager: BindingManager,
}

impl PlatformBus {
    /// Bus driving `manager`.
    pub fn new(manager: BindingManager) -> Self {
        Self { manager }
    }

    /// Endpoint registry of the bound driver.
    pub fn endpoints(&self) -> Arc<EndpointRegistry> {
        Arc::clone(self.manager.endpoints())
    }

    /// Underlying binding manager.
    pub fn manager(&self) -> &BindingManager {
        &self.manager
    }

    /// Discovery event for one instance.
    ///
    /// Returns `Ok(None)` when the instance does not match the table.
    pub fn add_device(
        &mut self,
        desc: &HardwareInstanceDescriptor,
    ) -> DriverResult<Option<EndpointId>> {
        if !self.manager.table().matches(&desc.compatible) {
            debug!(
                "{}: '{}' not handled by '{}'",
                desc.name,
                desc.compatible,
                self.manager.table().driver()
            );
            return Ok(None);
        }
        self.manager.probe(desc).map(Some)
    }

    /// Removal event for one instance.
    ///
    /// Returns `Ok(false)` if the instance was never bound.
    pub fn remove_device(&mut self, instance: &str) -> DriverResult<bool> {
        if !self.manager.is_bound(instance) {
            debug!("{}: removal ignored, not bound", instance);
            return Ok(false);
        }
        self.manager.remove(instance)?;
        Ok(true)
    }

    /// Deliver a discovery event for every described instance.
    pub fn populate(&mut self, platform: &PlatformConfig) -> BindReport {
        let mut report = BindReport::default();
        for desc in &platform.devices {
            match self.add_device(desc) {
                Ok(Some(id)) => report.bound.push((desc.name.clone(), id)),
                Ok(None) => report.skipped.push(desc.name.clone()),
                Err(e) => {
                    warn!("{}: bind failed: {e}", desc.name);
                    report.failed.push((desc.name.clone(), e));
                }
            }
        }
        info!(
            "Platform populated: {} bound, {} failed, {} skipped",
            report.bound.len(),
            report.failed.len(),
            report.skipped.len()
        );
        report
    }

    /// Remove every bound instance.
    pub fn shutdown(&mut self) {
        self.manager.remove_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::match_table::MatchTable;
    use crate::test_support::CountingMapper;
    use bytereg_common::consts::COMPATIBLE_ID;
    use bytereg_common::platform::RegisterRange;

    fn bus() -> PlatformBus {
        PlatformBus::new(BindingManager::new(
            MatchTable::simple(),
            Arc::new(CountingMapper::default()),
        ))
    }

    fn platform() -> PlatformConfig {
        PlatformConfig {
            devices: vec![
                HardwareInstanceDescriptor::new("a", COMPATIBLE_ID, RegisterRange::new(0x1000, 4)),
                HardwareInstanceDescriptor::new("uart", "ns16550a", RegisterRange::new(0x2000, 8)),
                HardwareInstanceDescriptor::new("b", COMPATIBLE_ID, RegisterRange::new(0x1002, 4)),
                HardwareInstanceDescriptor::new("c", COMPATIBLE_ID, RegisterRange::new(0x3000, 4)),
            ],
        }
    }

    #[test]
    fn test_populate_isolates_failures() {
        let mut bus = bus();
        let report = bus.populate(&platform());

        let bound: Vec<&str> = report.bound.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(bound, vec!["a", "c"]);
        assert_eq!(report.skipped, vec!["uart".to_string()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "b");
        assert!(!report.is_clean());

        let names: Vec<String> = bus.endpoints().list().iter().map(|id| id.name.to_string()).collect();
        assert_eq!(names, vec!["simple", "simple1"]);
    }

    #[test]
    fn test_hotplug_add_and_remove() {
        let mut bus = bus();
        let desc = HardwareInstanceDescriptor::new("hot", COMPATIBLE_ID, RegisterRange::new(0x4000, 1));

        let id = bus.add_device(&desc).unwrap().expect("matched");
        assert!(bus.endpoints().open(id.minor).is_ok());

        assert!(bus.remove_device("hot").unwrap());
        assert!(!bus.remove_device("hot").unwrap());
        assert!(bus.endpoints().open(id.minor).is_err());
    }

    #[test]
    fn test_shutdown_empties_registry() {
        let mut bus = bus();
        bus.populate(&platform());
        bus.shutdown();
        assert!(bus.endpoints().is_empty());
        assert!(bus.manager().bound_instances().is_empty());
    }
}
