//! Compatibility table.
//!
//! The driver binds against a fixed, immutable list of compatibility
//! identifiers. The table is constructed once at startup and handed to the
//! platform bus by value; nothing about it is global or mutable.

use bytereg_common::consts::{COMPATIBLE_ID, DRIVER_NAME};

/// One entry of a compatibility table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompatibleId {
    /// Compatibility string as it appears in the platform description.
    pub compatible: &'static str,
    /// Optional per-entry match data.
    pub data: Option<&'static str>,
}

impl CompatibleId {
    /// Entry without match data.
    pub const fn new(compatible: &'static str) -> Self {
        Self {
            compatible,
            data: None,
        }
    }
}

/// Identifiers the bytereg driver binds against.
pub const SIMPLE_IDS: &[CompatibleId] = &[CompatibleId::new(COMPATIBLE_ID)];

/// A driver's name and its compatibility entries.
#[derive(Debug, Clone, Copy)]
pub struct MatchTable {
    driver: &'static str,
    ids: &'static [CompatibleId],
}

impl MatchTable {
    /// Table for `driver` over `ids`.
    pub const fn new(driver: &'static str, ids: &'static [CompatibleId]) -> Self {
        Self { driver, ids }
    }

    /// The bytereg driver's table.
    pub const fn simple() -> Self {
        Self::new(DRIVER_NAME, SIMPLE_IDS)
    }

    /// Driver identifier.
    pub fn driver(&self) -> &'static str {
        self.driver
    }

    /// All entries.
    pub fn ids(&self) -> &'static [CompatibleId] {
        self.ids
    }

    /// Entry matching `compatible` exactly, if any.
    pub fn lookup(&self, compatible: &str) -> Option<&'static CompatibleId> {
        self.ids.iter().find(|id| id.compatible == compatible)
    }

    /// True if `compatible` is listed.
    pub fn matches(&self, compatible: &str) -> bool {
        self.lookup(compatible).is_some()
    }
}

impl Default for MatchTable {
    fn default() -> Self {
        Self::simple()
    }
}
