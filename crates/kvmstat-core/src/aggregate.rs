//! # Process Table Aggregation
//!
//! Turns a [`RawProcTable`] into owned [`ProcessStatusCounts`].
//!
//! This is the only place that dereferences process table pointers. Every
//! string is copied into a `String` here, so nothing returned from this module
//! borrows foreign memory and the table can be released right after.

use std::borrow::Cow;
use std::ffi::CStr;
use std::os::raw::c_char;
use std::slice;

use crate::error::FfiError;
use crate::interface::{ProcEntry, RawProcTable};
use crate::types::{ProcessStatus, ProcessStatusCounts};

/// Count processes per (name, status) pair
///
/// A zero count yields an empty mapping regardless of the pointer.
///
/// ## Errors
///
/// - `InconsistentSnapshot`: negative count, or a null table with a positive count
///
/// ## Safety
///
/// `table` must satisfy the [`KvmInterface`](crate::interface::KvmInterface)
/// contract: `count` initialized records behind `entries`, each holding null
/// or NUL-terminated string pointers, all valid for the duration of the call.
pub(crate) unsafe fn aggregate(table: &RawProcTable) -> Result<ProcessStatusCounts, FfiError>
{
    let count = usize::try_from(table.count).map_err(|_| FfiError::InconsistentSnapshot {
        count: table.count,
        null_table: table.is_null(),
    })?;
    if count == 0 {
        return Ok(ProcessStatusCounts::new());
    }
    if table.is_null() {
        return Err(FfiError::InconsistentSnapshot {
            count: table.count,
            null_table: true,
        });
    }

    // SAFETY: non-null, `count` records long per the caller's contract
    let entries: &[ProcEntry] = unsafe { slice::from_raw_parts(table.entries, count) };

    let mut counts = ProcessStatusCounts::new();
    for entry in entries {
        // SAFETY: string pointers are null or NUL-terminated per the contract
        let (name, status) = unsafe { (decode(entry.name), decode(entry.status)) };
        counts.increment(ProcessStatus::new(name, status));
    }
    Ok(counts)
}

/// Copy a C string into an owned `String`
///
/// Null reads as empty. Invalid UTF-8 is replaced rather than rejected;
/// `ki_comm` is whatever the process put in its `argv[0]`.
unsafe fn decode(ptr: *const c_char) -> String
{
    if ptr.is_null() {
        return String::new();
    }
    // SAFETY: forwarded from `aggregate`
    match unsafe { CStr::from_ptr(ptr) }.to_string_lossy() {
        Cow::Borrowed(s) => s.to_owned(),
        Cow::Owned(s) => s,
    }
}
