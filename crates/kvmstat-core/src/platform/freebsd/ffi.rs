//! # libkvm FFI Declarations
//!
//! `extern "C"` declarations for the libkvm calls we need. `libc` provides
//! `kinfo_proc` and the sysctl constants, but not these functions or
//! `struct kvm_swap`.
//!
//! ## Safety Notes
//!
//! - Every function takes a `kvm_t *` that must come from `kvm_open()` and
//!   must not have been passed to `kvm_close()`
//! - `kvm_getprocs()` returns memory owned by the descriptor. It is
//!   overwritten by the next `kvm_getprocs()` and freed by `kvm_close()`
//!
//! ## References
//!
//! - [kvm_open(3)](https://man.freebsd.org/cgi/man.cgi?query=kvm_open&sektion=3)
//! - [kvm_getswapinfo(3)](https://man.freebsd.org/cgi/man.cgi?query=kvm_getswapinfo&sektion=3)
//! - [kvm_getprocs(3)](https://man.freebsd.org/cgi/man.cgi?query=kvm_getprocs&sektion=3)

// Allow doc comments in extern blocks - they're useful for developers even if rustdoc doesn't generate docs
#![allow(unused_doc_comments)]

use libc::{c_char, c_int, c_uint, kinfo_proc};

/// Opaque libkvm descriptor (`kvm_t`)
#[repr(C)]
pub struct KvmT
{
    _private: [u8; 0],
}

/// Mirror of `struct kvm_swap` from `<kvm.h>`
#[repr(C)]
#[derive(Debug)]
pub struct KvmSwap
{
    /// Swap device name, `"total"` for the summary entry
    pub ksw_devname: [c_char; 32],
    /// Pages in use
    pub ksw_used: c_uint,
    /// Total pages
    pub ksw_total: c_uint,
    /// Device flags
    pub ksw_flags: c_int,
    pub ksw_reserved1: c_int,
    pub ksw_reserved2: c_int,
}

impl Default for KvmSwap
{
    fn default() -> Self
    {
        Self {
            ksw_devname: [0; 32],
            ksw_used: 0,
            ksw_total: 0,
            ksw_flags: 0,
            ksw_reserved1: 0,
            ksw_reserved2: 0,
        }
    }
}

/// `/dev/null` as the core file makes libkvm read the live kernel through sysctl
pub const PATH_DEVNULL: &[u8] = b"/dev/null\0";

#[link(name = "kvm")]
extern "C" {
    /// Open a kernel memory descriptor
    ///
    /// Returns null on failure. With a null `errstr`, errors are not printed.
    pub fn kvm_open(
        execfile: *const c_char,
        corefile: *const c_char,
        swapfile: *const c_char,
        flags: c_int,
        errstr: *const c_char,
    ) -> *mut KvmT;

    /// Close a descriptor and free everything it owns
    pub fn kvm_close(kd: *mut KvmT) -> c_int;

    /// Last error message recorded on the descriptor
    pub fn kvm_geterr(kd: *mut KvmT) -> *mut c_char;

    /// Fill `info` with up to `maxswap` swap entries
    ///
    /// With `maxswap == 1` only the summary entry is written. Returns -1 on failure.
    pub fn kvm_getswapinfo(kd: *mut KvmT, info: *mut KvmSwap, maxswap: c_int, flags: c_int) -> c_int;

    /// Snapshot the process table
    ///
    /// Writes the number of records to `cnt`.
    pub fn kvm_getprocs(kd: *mut KvmT, op: c_int, arg: c_int, cnt: *mut c_int) -> *mut kinfo_proc;
}
