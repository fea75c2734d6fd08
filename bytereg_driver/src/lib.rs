//! # bytereg Driver Library
//!
//! Binds hardware instances from a platform description to byte-stream
//! endpoints, each backed by one memory-mapped device register. Every
//! read or write on an endpoint moves exactly one byte to or from the
//! register.
//!
//! # Module Structure
//!
//! - [`register`] - Register Access Unit and the `/dev/mem` mapper
//! - [`resource`] - Exclusive physical range reservations
//! - [`uaccess`] - Caller-buffer copies across the trust boundary
//! - [`state`] - Per-device state
//! - [`endpoint`] - Endpoint registry and sessions (open/read/write/close)
//! - [`binding`] - Binding manager (probe/remove)
//! - [`match_table`] - Compatibility table
//! - [`bus`] - Platform bus driving discovery and removal events
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────┐   probe/remove   ┌──────────────────┐
//! │  PlatformBus  │─────────────────►│  BindingManager  │
//! └───────────────┘                  └────────┬─────────┘
//!                                             │ owns
//!          open ┌──────────────────┐          ▼
//!   caller ────►│ EndpointRegistry │──►┌─────────────┐   ┌────────────────────┐
//!               └──────────────────┘   │ DeviceState │──►│ RegisterAccessUnit │──► register
//!   Session ──── read/write ──────────►└─────────────┘   └────────────────────┘
//! ```

#![deny(missing_docs)]

pub mod binding;
pub mod bus;
pub mod endpoint;
pub mod match_table;
pub mod register;
pub mod resource;
pub mod state;
pub mod uaccess;

#[cfg(test)]
pub(crate) mod test_support;

pub use crate::binding::BindingManager;
pub use crate::bus::{BindReport, PlatformBus};
pub use crate::endpoint::{EndpointId, EndpointRegistry, Session};
pub use crate::match_table::{CompatibleId, MatchTable};
pub use crate::register::{DevMemMapper, RegisterAccessUnit, RegisterIo, RegisterMapper};
pub use crate::resource::ResourceTable;
pub use crate::state::DeviceState;
pub use crate::uaccess::{CopyFault, Transfer, UserReader, UserWriter};

use bytereg_common::config::DriverConfig;
use std::sync::Arc;

/// Platform bus with the bytereg driver attached, mapping registers from
/// the memory device named in `config`.
pub fn dev_mem_bus(config: &DriverConfig) -> PlatformBus {
    let mapper = DevMemMapper::new(&config.mem_device, config.sync);
    PlatformBus::new(BindingManager::new(MatchTable::simple(), Arc::new(mapper)))
}
