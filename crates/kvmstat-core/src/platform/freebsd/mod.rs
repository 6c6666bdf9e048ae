//! # FreeBSD libkvm Implementation
//!
//! [`KvmInterface`] on top of libkvm.
//!
//! The descriptor is opened against `/dev/null` rather than a core file, which
//! makes libkvm answer from the running kernel via sysctl. Reading swap
//! statistics this way still needs read access to kernel memory on some
//! releases, so running as root (or in the `kmem` group) is expected.
//!
//! ## Process Table Layout
//!
//! `kvm_getprocs()` returns an array of `struct kinfo_proc` owned by the
//! descriptor. We do not hand that out directly: each `kinfo_proc` is large
//! and its layout varies between releases. Instead we `calloc` a compact
//! [`ProcEntry`] array whose `name` points at `ki_comm` inside the libkvm
//! buffer and whose `status` points at a static abbreviation. The `ki_comm`
//! pointers stay valid until the next `kvm_getprocs()` or `kvm_close()` on
//! the descriptor, which the handle's lock rules out while it aggregates.

pub mod ffi;

use std::io;
use std::os::raw::{c_char, c_int};
use std::ptr::{self, NonNull};
use std::{mem, slice};

use tracing::debug;

use crate::error::FfiError;
use crate::interface::{KvmInterface, ProcEntry, RawProcTable};

/// State names indexed by `ki_stat` (`SIDL` = 1 through `SLOCK` = 7)
const STATE_ABBREV: [&[u8]; 8] = [
    b"\0", b"START\0", b"RUN\0", b"SLEEP\0", b"STOP\0", b"ZOMB\0", b"WAIT\0", b"LOCK\0",
];

/// Abbreviation for a `ki_stat` value; unknown states map to `""`
fn state_abbrev(stat: c_char) -> *const c_char
{
    let name = STATE_ABBREV.get(stat as u8 as usize).copied().unwrap_or(STATE_ABBREV[0]);
    name.as_ptr().cast()
}

/// An open libkvm descriptor
///
/// Only ever touched under the handle's lock, so moving it between threads is
/// fine even though libkvm descriptors are not thread-safe.
#[derive(Debug)]
pub struct KvmSession
{
    kd: NonNull<ffi::KvmT>,
}

// SAFETY: the descriptor is used by one thread at a time (see above)
unsafe impl Send for KvmSession {}

impl KvmSession
{
    fn as_ptr(&self) -> *mut ffi::KvmT
    {
        self.kd.as_ptr()
    }

    /// Build an `FfiError::Kvm` from the descriptor's last error message
    fn error(&self, operation: &'static str) -> FfiError
    {
        // SAFETY: `kd` is open; `kvm_geterr` returns a pointer into it
        let message = unsafe {
            let msg = ffi::kvm_geterr(self.as_ptr());
            if msg.is_null() {
                String::new()
            } else {
                std::ffi::CStr::from_ptr(msg).to_string_lossy().into_owned()
            }
        };
        let message = if message.is_empty() {
            io::Error::last_os_error().to_string()
        } else {
            message
        };
        FfiError::Kvm { operation, message }
    }
}

/// libkvm-backed [`KvmInterface`]
#[derive(Debug, Default, Clone, Copy)]
pub struct FreeBsdKvm;

// SAFETY: `process_table` only reports success after writing `count`
// initialized entries into a `calloc`'d array; their string pointers are either
// static or point into the `kinfo_proc` buffer that the session keeps alive
unsafe impl KvmInterface for FreeBsdKvm
{
    type Session = KvmSession;

    fn open(&self) -> Result<KvmSession, FfiError>
    {
        // SAFETY: all path arguments are null or NUL-terminated statics
        let kd = unsafe {
            ffi::kvm_open(
                ptr::null(),
                ffi::PATH_DEVNULL.as_ptr().cast(),
                ptr::null(),
                libc::O_RDONLY,
                ptr::null(),
            )
        };
        NonNull::new(kd)
            .map(|kd| KvmSession { kd })
            .ok_or_else(|| FfiError::OpenFailed(io::Error::last_os_error()))
    }

    fn swap_used_pages(&self, session: &mut KvmSession) -> Result<u64, FfiError>
    {
        let mut swap = ffi::KvmSwap::default();
        // SAFETY: `swap` has room for the single summary entry we ask for
        let ret = unsafe { ffi::kvm_getswapinfo(session.as_ptr(), &mut swap, 1, 0) };
        if ret == -1 {
            return Err(session.error("kvm_getswapinfo"));
        }
        Ok(u64::from(swap.ksw_used))
    }

    fn process_table(&self, session: &mut KvmSession, table: &mut RawProcTable) -> Result<(), FfiError>
    {
        let mut count: c_int = -1;
        // SAFETY: the session is open and `count` is a valid out-pointer
        let procs = unsafe { ffi::kvm_getprocs(session.as_ptr(), libc::KERN_PROC_PROC, 0, &mut count) };

        if procs.is_null() {
            if count == 0 {
                return Ok(());
            }
            return Err(session.error("kvm_getprocs"));
        }
        let len = usize::try_from(count).map_err(|_| FfiError::InconsistentSnapshot {
            count,
            null_table: false,
        })?;
        if len == 0 {
            return Ok(());
        }

        // SAFETY: plain allocation; zeroed memory is a valid (null) ProcEntry
        let entries = unsafe { libc::calloc(len, mem::size_of::<ProcEntry>()) }.cast::<ProcEntry>();
        if entries.is_null() {
            return Err(FfiError::AllocationFailed(len));
        }
        table.entries = entries;
        table.count = count;

        // SAFETY: libkvm returned `count` records at `procs`, and `entries`
        // was just allocated with room for `len` records
        let (procs, entries) = unsafe { (slice::from_raw_parts(procs, len), slice::from_raw_parts_mut(entries, len)) };
        for (entry, kp) in entries.iter_mut().zip(procs) {
            *entry = ProcEntry {
                name: kp.ki_comm.as_ptr(),
                status: state_abbrev(kp.ki_stat),
            };
        }
        Ok(())
    }

    fn release_process_table(&self, table: RawProcTable)
    {
        // SAFETY: `entries` is null or came from `calloc` in `process_table`
        unsafe { libc::free(table.entries.cast()) };
    }

    fn close(&self, session: KvmSession)
    {
        // SAFETY: the session is consumed, so this is the only close
        let ret = unsafe { ffi::kvm_close(session.as_ptr()) };
        if ret != 0 {
            debug!("kvm_close returned {ret}");
        }
    }
}

#[cfg(test)]
mod tests
{
    use std::ffi::CStr;

    use super::*;

    fn abbrev(stat: c_char) -> &'static str
    {
        unsafe { CStr::from_ptr(state_abbrev(stat)) }.to_str().unwrap()
    }

    #[test]
    fn test_state_abbrev_known_states()
    {
        assert_eq!(abbrev(1), "START");
        assert_eq!(abbrev(2), "RUN");
        assert_eq!(abbrev(3), "SLEEP");
        assert_eq!(abbrev(4), "STOP");
        assert_eq!(abbrev(5), "ZOMB");
        assert_eq!(abbrev(6), "WAIT");
        assert_eq!(abbrev(7), "LOCK");
    }

    #[test]
    fn test_state_abbrev_out_of_range()
    {
        assert_eq!(abbrev(0), "");
        assert_eq!(abbrev(8), "");
        assert_eq!(abbrev(c_char::MAX), "");
    }

    #[test]
    fn test_kvm_swap_layout()
    {
        assert_eq!(mem::size_of::<ffi::KvmSwap>(), 52);
    }
}
