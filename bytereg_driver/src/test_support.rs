//! Access-counting register double for unit tests.

use crate::register::{RegisterIo, RegisterMapper};
use bytereg_common::error::{DriverError, DriverResult};
use bytereg_common::platform::RegisterRange;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;

type UnmapHook = Arc<Mutex<Option<Box<dyn Fn() + Send + Sync>>>>;

/// Counters shared by every register a [`CountingMapper`] hands out.
#[derive(Debug, Default)]
pub struct Counters {
    pub value: AtomicU8,
    pub loads: AtomicUsize,
    pub stores: AtomicUsize,
    pub maps: AtomicUsize,
    pub unmaps: AtomicUsize,
}

impl Counters {
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn stores(&self) -> usize {
        self.stores.load(Ordering::SeqCst)
    }

    pub fn value(&self) -> u8 {
        self.value.load(Ordering::SeqCst)
    }

    pub fn live_maps(&self) -> usize {
        self.maps.load(Ordering::SeqCst) - self.unmaps.load(Ordering::SeqCst)
    }
}

#[derive(Default, Clone)]
pub struct CountingMapper {
    pub counters: Arc<Counters>,
    pub fail: Arc<AtomicBool>,
    on_unmap: UnmapHook,
}

impl CountingMapper {
    /// Run `hook` whenever a register handed out by this mapper is unmapped.
    pub fn on_unmap(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.on_unmap.lock() = Some(Box::new(hook));
    }
}

impl RegisterMapper for CountingMapper {
    fn map(&self, range: RegisterRange) -> DriverResult<Box<dyn RegisterIo>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DriverError::unavailable(range.base, range.length, "mapping refused"));
        }
        self.counters.maps.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(CountingRegister {
            counters: Arc::clone(&self.counters),
            on_unmap: Arc::clone(&self.on_unmap),
        }))
    }
}

struct CountingRegister {
    counters: Arc<Counters>,
    on_unmap: UnmapHook,
}

impl RegisterIo for CountingRegister {
    fn load(&self) -> u8 {
        self.counters.loads.fetch_add(1, Ordering::SeqCst);
        self.counters.value.load(Ordering::SeqCst)
    }

    fn store(&self, value: u8) {
        self.counters.stores.fetch_add(1, Ordering::SeqCst);
        self.counters.value.store(value, Ordering::SeqCst);
    }
}

impl Drop for CountingRegister {
    fn drop(&mut self) {
        self.counters.unmaps.fetch_add(1, Ordering::SeqCst);
        if let Some(hook) = self.on_unmap.lock().as_ref() {
            hook();
        }
    }
}
