//! Physical range reservation table.
//!
//! Every Register Access Unit holds a [`Reservation`] over its range for as
//! long as it lives. A second claim that overlaps a live one is refused, so
//! no two per-device states can ever reference the same register bytes.
//! Dropping the reservation returns the range to the table.

use bytereg_common::error::{DriverError, DriverResult};
use bytereg_common::platform::RegisterRange;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::trace;

#[derive(Debug)]
struct Claim {
    id: u64,
    range: RegisterRange,
    owner: String,
}

#[derive(Debug, Default)]
struct Claims {
    next_id: u64,
    live: Vec<Claim>,
}

/// Process-wide table of claimed physical ranges.
///
/// Cheap to clone; clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct ResourceTable {
    claims: Arc<Mutex<Claims>>,
}

impl ResourceTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `range` exclusively for `owner`.
    ///
    /// # Errors
    /// `ResourceUnavailable` if the range is empty, wraps the address space,
    /// or overlaps a live claim.
    pub fn reserve(&self, range: RegisterRange, owner: &str) -> DriverResult<Reservation> {
        if !range.is_valid() {
            return Err(DriverError::unavailable(
                range.base,
                range.length,
                "invalid range",
            ));
        }

        let mut claims = self.claims.lock();
        if let Some(busy) = claims.live.iter().find(|c| c.range.overlaps(&range)) {
            return Err(DriverError::unavailable(
                range.base,
                range.length,
                format!("overlaps {} claimed by '{}'", busy.range, busy.owner),
            ));
        }

        let id = claims.next_id;
        claims.next_id += 1;
        claims.live.push(Claim {
            id,
            range,
            owner: owner.to_string(),
        });
        trace!("Reserved {} for '{}'", range, owner);

        Ok(Reservation {
            table: Arc::clone(&self.claims),
            id,
            range,
        })
    }

    /// True if any live claim overlaps `range`.
    pub fn is_reserved(&self, range: &RegisterRange) -> bool {
        self.claims.lock().live.iter().any(|c| c.range.overlaps(range))
    }

    /// Snapshot of live claims as `(range, owner)` pairs.
    pub fn claims(&self) -> Vec<(RegisterRange, String)> {
        self.claims
            .lock()
            .live
            .iter()
            .map(|c| (c.range, c.owner.clone()))
            .collect()
    }
}

/// A live claim on a physical range. Released on drop.
#[derive(Debug)]
pub struct Reservation {
    table: Arc<Mutex<Claims>>,
    id: u64,
    range: RegisterRange,
}

impl Reservation {
    /// The claimed range.
    pub fn range(&self) -> RegisterRange {
        self.range
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        self.table.lock().live.retain(|c| c.id != self.id);
        trace!("Released {}", self.range);
    }
}
