//! Register Access Unit.
//!
//! A [`RegisterAccessUnit`] is one live mapping of a physical register range
//! plus the reservation that keeps the range exclusive. It either exists
//! fully mapped and usable or not at all; there is no half-acquired state.
//!
//! Hardware access goes through the [`RegisterIo`] seam so the core can run
//! against `/dev/mem` ([`DevMemMapper`]) or a test double.

use crate::resource::{Reservation, ResourceTable};
use bytereg_common::error::{DriverError, DriverResult};
use bytereg_common::platform::RegisterRange;
use memmap2::{MmapOptions, MmapRaw};
use nix::fcntl::OFlag;
use std::fs::OpenOptions;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::atomic::{fence, Ordering};
use tracing::debug;

/// Ordered single-byte access to one device register.
///
/// Implementations must not cache, merge or reorder accesses: every call
/// touches the register.
pub trait RegisterIo: Send + Sync {
    /// Read the register.
    fn load(&self) -> u8;

    /// Write the register.
    fn store(&self, value: u8);
}

/// Produces a [`RegisterIo`] for a physical range.
pub trait RegisterMapper: Send + Sync {
    /// Map `range` into the process.
    ///
    /// # Errors
    /// `ResourceUnavailable` if the range cannot be mapped.
    fn map(&self, range: RegisterRange) -> DriverResult<Box<dyn RegisterIo>>;
}

/// Maps register ranges from a physical memory character device.
#[derive(Debug, Clone)]
pub struct DevMemMapper {
    path: PathBuf,
    sync: bool,
}

impl DevMemMapper {
    /// Mapper over `path` (normally `/dev/mem`).
    ///
    /// With `sync` set the device is opened `O_SYNC`, which the kernel turns
    /// into an uncached mapping.
    pub fn new(path: impl AsRef<Path>, sync: bool) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            sync,
        }
    }
}

impl RegisterMapper for DevMemMapper {
    fn map(&self, range: RegisterRange) -> DriverResult<Box<dyn RegisterIo>> {
        let unavailable =
            |reason: String| DriverError::unavailable(range.base, range.length, reason);

        let len = usize::try_from(range.length)
            .map_err(|_| unavailable("length exceeds address space".to_string()))?;

        let mut options = OpenOptions::new();
        options.read(true).write(true);
        if self.sync {
            options.custom_flags(OFlag::O_SYNC.bits());
        }
        let file = options
            .open(&self.path)
            .map_err(|e| unavailable(format!("open {}: {e}", self.path.display())))?;

        // Pages past the end of a regular file fault on first access, so the
        // window must lie inside it. Character devices report no length.
        let meta = file
            .metadata()
            .map_err(|e| unavailable(format!("stat {}: {e}", self.path.display())))?;
        if meta.file_type().is_file() && range.end().is_none_or(|end| end > meta.len()) {
            return Err(unavailable(format!(
                "range beyond end of {}",
                self.path.display()
            )));
        }

        let map = MmapOptions::new()
            .offset(range.base)
            .len(len)
            .map_raw(&file)
            .map_err(|e| unavailable(format!("mmap: {e}")))?;

        debug!(
            "Mapped {} from {} at {:p}",
            range,
            self.path.display(),
            map.as_ptr()
        );
        Ok(Box::new(MappedRegister { map }))
    }
}

/// A register backed by a live `mmap` window. Unmapped on drop.
struct MappedRegister {
    map: MmapRaw,
}

impl RegisterIo for MappedRegister {
    fn load(&self) -> u8 {
        // SAFETY: the mapping is at least one byte long and stays valid for
        // the lifetime of `self`.
        let value = unsafe { ptr::read_volatile(self.map.as_ptr()) };
        fence(Ordering::SeqCst);
        value
    }

    fn store(&self, value: u8) {
        fence(Ordering::SeqCst);
        // SAFETY: see `load`; the mapping is writable.
        unsafe { ptr::write_volatile(self.map.as_mut_ptr(), value) };
    }
}

/// One exclusively owned, mapped register range.
///
/// Field order matters: the mapping is torn down before the reservation is
/// returned to the table.
pub struct RegisterAccessUnit {
    io: Box<dyn RegisterIo>,
    range: RegisterRange,
    _claim: Reservation,
}

impl RegisterAccessUnit {
    /// Reserve `range` for `owner` and map it.
    ///
    /// The reservation is dropped again if mapping fails.
    ///
    /// # Errors
    /// `ResourceUnavailable` if the range is already claimed, invalid, or
    /// cannot be mapped.
    pub fn acquire(
        resources: &ResourceTable,
        mapper: &dyn RegisterMapper,
        owner: &str,
        range: RegisterRange,
    ) -> DriverResult<Self> {
        let claim = resources.reserve(range, owner)?;
        let io = mapper.map(range)?;
        Ok(Self {
            io,
            range,
            _claim: claim,
        })
    }

    /// Single ordered byte read from the register.
    pub fn load(&self) -> u8 {
        self.io.load()
    }

    /// Single ordered byte write to the register.
    pub fn store(&self, value: u8) {
        self.io.store(value)
    }

    /// The mapped physical range.
    pub fn range(&self) -> RegisterRange {
        self.range
    }

    /// Unmap and give the range back.
    pub fn release(self) {
        debug!("Releasing register unit {}", self.range);
    }
}

impl std::fmt::Debug for RegisterAccessUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterAccessUnit")
            .field("range", &self.range)
            .finish_non_exhaustive()
    }
}
