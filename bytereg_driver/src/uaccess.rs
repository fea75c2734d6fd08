//! Trust-boundary copies between caller buffers and driver memory.
//!
//! Callers hand the endpoint a buffer it does not own. Every transfer goes
//! through [`UserWriter`] / [`UserReader`], which fail with [`CopyFault`]
//! instead of touching memory the caller did not make available.
//!
//! Internally an I/O call produces a [`Transfer`] so a fault stays
//! distinguishable from "nothing requested" in logs. Callers only ever see
//! the byte count, which is `0` in both cases.

use thiserror::Error;

/// The caller buffer could not be read or written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Bad address in caller buffer")]
pub struct CopyFault;

/// Destination of a driver-to-caller copy.
pub trait UserWriter {
    /// Copy all of `src` into the caller buffer, or nothing.
    fn copy_to_user(&mut self, src: &[u8]) -> Result<(), CopyFault>;
}

/// Source of a caller-to-driver copy.
pub trait UserReader {
    /// Fill all of `dst` from the caller buffer, or nothing.
    fn copy_from_user(&self, dst: &mut [u8]) -> Result<(), CopyFault>;
}

impl UserWriter for [u8] {
    fn copy_to_user(&mut self, src: &[u8]) -> Result<(), CopyFault> {
        let dst = self.get_mut(..src.len()).ok_or(CopyFault)?;
        dst.copy_from_slice(src);
        Ok(())
    }
}

impl UserReader for [u8] {
    fn copy_from_user(&self, dst: &mut [u8]) -> Result<(), CopyFault> {
        let src = self.get(..dst.len()).ok_or(CopyFault)?;
        dst.copy_from_slice(src);
        Ok(())
    }
}

impl<const N: usize> UserWriter for [u8; N] {
    fn copy_to_user(&mut self, src: &[u8]) -> Result<(), CopyFault> {
        self.as_mut_slice().copy_to_user(src)
    }
}

impl<const N: usize> UserReader for [u8; N] {
    fn copy_from_user(&self, dst: &mut [u8]) -> Result<(), CopyFault> {
        self.as_slice().copy_from_user(dst)
    }
}

impl UserWriter for Vec<u8> {
    fn copy_to_user(&mut self, src: &[u8]) -> Result<(), CopyFault> {
        self.as_mut_slice().copy_to_user(src)
    }
}

impl UserReader for Vec<u8> {
    fn copy_from_user(&self, dst: &mut [u8]) -> Result<(), CopyFault> {
        self.as_slice().copy_from_user(dst)
    }
}

/// Outcome of one endpoint I/O call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    /// Zero-length request; hardware untouched.
    Idle,
    /// Device was unbound underneath the session; hardware untouched.
    Detached,
    /// Caller buffer faulted.
    Fault(CopyFault),
    /// Bytes moved.
    Moved(usize),
}

impl Transfer {
    /// Byte count reported to the caller.
    pub fn bytes(self) -> usize {
        match self {
            Transfer::Moved(n) => n,
            Transfer::Idle | Transfer::Detached | Transfer::Fault(_) => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_to_user_fits() {
        let mut buf = [0u8; 4];
        assert!(buf.copy_to_user(&[0x7f]).is_ok());
        assert_eq!(buf, [0x7f, 0, 0, 0]);
    }

    #[test]
    fn test_copy_to_user_short_buffer_faults() {
        let mut buf: [u8; 0] = [];
        assert_eq!(buf.copy_to_user(&[1]), Err(CopyFault));
    }

    #[test]
    fn test_copy_from_user_takes_prefix() {
        let src = vec![0x11, 0x22, 0x33];
        let mut byte = [0u8; 1];
        src.copy_from_user(&mut byte).unwrap();
        assert_eq!(byte, [0x11]);
    }

    #[test]
    fn test_transfer_bytes_hides_fault() {
        assert_eq!(Transfer::Moved(1).bytes(), 1);
        assert_eq!(Transfer::Fault(CopyFault).bytes(), 0);
        assert_eq!(Transfer::Idle.bytes(), 0);
        assert_eq!(Transfer::Detached.bytes(), 0);
    }
}
