//! # Kvm Interface
//!
//! The foreign interface boundary between [`KvmHandle`](crate::handle::KvmHandle)
//! and the kernel memory interface.
//!
//! The handle never calls libkvm directly. It goes through this trait, which
//! has one native implementation per platform
//! ([`NativeKvm`](crate::platform::NativeKvm)) and can be implemented by tests
//! to inject failures or count calls.
//!
//! ## Process Table Shape
//!
//! libkvm hands back process information as a flat C array owned by the
//! library. We keep that shape across the boundary: a pointer to `count`
//! fixed-stride [`ProcEntry`] records plus the count itself
//! ([`RawProcTable`]). The handle walks the array, copies each string into an
//! owned `String`, and then gives the array back through
//! [`KvmInterface::release_process_table`].

use std::os::raw::{c_char, c_int};
use std::ptr;

use crate::error::FfiError;

/// One record in a raw process table
///
/// Both pointers reference NUL-terminated C strings owned by the interface.
/// A null pointer is read as an empty string.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ProcEntry
{
    /// Command name of the process
    pub name: *const c_char,
    /// Scheduler state abbreviation
    pub status: *const c_char,
}

/// A foreign-owned array of [`ProcEntry`] records
///
/// The default value (null, zero) is what the handle passes into
/// [`KvmInterface::process_table`]; implementations overwrite it as soon as
/// they own memory, so that the release path sees it even if a later step
/// fails.
#[derive(Debug)]
pub struct RawProcTable
{
    /// First record, or null for an empty table
    pub entries: *mut ProcEntry,
    /// Number of records `entries` points at
    pub count: c_int,
}

impl RawProcTable
{
    /// True when no memory is attached to the table
    pub fn is_null(&self) -> bool
    {
        self.entries.is_null()
    }
}

impl Default for RawProcTable
{
    fn default() -> Self
    {
        Self {
            entries: ptr::null_mut(),
            count: 0,
        }
    }
}

/// Raw kernel introspection operations
///
/// ## Lifecycle
///
/// 1. `open()` produces a `Session`
/// 2. Any number of `swap_used_pages()` / `process_table()` calls on it
/// 3. `close(session)` consumes it
///
/// Each `process_table()` call is paired with exactly one
/// `release_process_table()` call made by the caller, whether the call
/// succeeded or not.
///
/// ## Safety
///
/// The handle reads the process table through raw pointers, so implementors
/// must guarantee that after `process_table()` returns `Ok(())`:
///
/// - `table.count` is zero, or `table.entries` points at `table.count`
///   initialized, properly aligned [`ProcEntry`] values
/// - every non-null `name` / `status` pointer references a NUL-terminated
///   string
/// - all of that memory stays valid until `release_process_table()` is called
///   for the table, or until the next call on the same session, whichever
///   comes first
///
/// `release_process_table()` must accept any table previously written by
/// `process_table()` (including one left partially filled by a failure) and
/// the default null table.
pub unsafe trait KvmInterface
{
    /// An open kvm descriptor
    ///
    /// Owned by the handle and moved into [`close`](Self::close), so a
    /// session cannot be used after it is closed or closed twice.
    type Session: Send;

    /// Open a new session
    ///
    /// ## Errors
    ///
    /// - `OpenFailed`: the kernel interface could not be initialized
    /// - `Unsupported`: no kernel interface on this platform
    fn open(&self) -> Result<Self::Session, FfiError>;

    /// Read the number of swap pages currently in use
    ///
    /// ## Errors
    ///
    /// - `Kvm`: the library failed to read swap information
    fn swap_used_pages(&self, session: &mut Self::Session) -> Result<u64, FfiError>;

    /// Fill `table` with a snapshot of the process table
    ///
    /// `table` starts out as [`RawProcTable::default()`].
    ///
    /// ## Errors
    ///
    /// - `Kvm` / `InconsistentSnapshot`: the library failed or returned garbage
    /// - `AllocationFailed`: the record array could not be allocated
    fn process_table(&self, session: &mut Self::Session, table: &mut RawProcTable) -> Result<(), FfiError>;

    /// Free the memory behind a table written by [`process_table`](Self::process_table)
    fn release_process_table(&self, table: RawProcTable);

    /// Close a session
    fn close(&self, session: Self::Session);
}
