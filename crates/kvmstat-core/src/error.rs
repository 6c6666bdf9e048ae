//! # Error Types
//!
//! Errors raised at the two layers of the crate:
//!
//! - [`FfiError`]: a libkvm call (or a stand-in implementing
//!   [`KvmInterface`](crate::interface::KvmInterface)) failed
//! - [`QueryError`]: what a caller of [`KvmHandle`](crate::handle::KvmHandle) sees
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.

use std::io;

use thiserror::Error;

/// Failure reported by the foreign interface boundary
///
/// Every variant means the session can no longer be trusted. The handle
/// reacts to any of them by closing the session and becoming invalid.
#[derive(Error, Debug)]
pub enum FfiError
{
    /// `kvm_open()` returned a null descriptor
    ///
    /// Usually one of:
    /// - Missing read permission on `/dev/mem` or `/dev/kmem`
    /// - Running inside a jail without kernel memory access
    /// - File descriptor or memory exhaustion
    #[error("kvm_open failed: {0}")]
    OpenFailed(#[source] io::Error),

    /// A libkvm call on an open session returned an error
    ///
    /// `message` is the text from `kvm_geterr()` when libkvm provides one.
    #[error("{operation} failed: {message}")]
    Kvm
    {
        /// Name of the call that failed (e.g. `kvm_getswapinfo`)
        operation: &'static str,
        /// Details reported by the library
        message: String,
    },

    /// The process table pointer and count disagree
    ///
    /// A null table with a positive count, or a negative count. The data
    /// cannot be walked safely.
    #[error("inconsistent process table snapshot: count {count}, null table: {null_table}")]
    InconsistentSnapshot
    {
        /// Count reported alongside the table
        count: i32,
        /// Whether the table pointer was null
        null_table: bool,
    },

    /// Allocating the record array for a snapshot failed
    #[error("failed to allocate {0} process table entries")]
    AllocationFailed(usize),

    /// No kernel introspection interface exists on this platform
    #[error("kvm is not available on {0}")]
    Unsupported(&'static str),
}

/// Error returned by [`KvmHandle`](crate::handle::KvmHandle) operations
///
/// ## Caller Policy
///
/// None of these are retried by the handle. A collector receiving any of them
/// should skip the current cycle and build a fresh handle before the next one.
#[derive(Error, Debug)]
pub enum QueryError
{
    /// The kvm session could not be established
    ///
    /// Only returned by the eager constructors
    /// ([`KvmHandle::try_with_interface`](crate::handle::KvmHandle::try_with_interface)).
    /// The lazy constructors record the failure as an invalid handle instead.
    #[error("couldn't open kvm session")]
    OpenFailure(#[source] FfiError),

    /// The handle was invalidated by an earlier failure (or never opened)
    ///
    /// No foreign call was made.
    #[error("kvm handle is invalid")]
    HandleInvalid,

    /// Reading swap usage failed; the handle is now invalid
    #[error("couldn't get kvm swap used pages")]
    SwapRead(#[source] FfiError),

    /// Reading the process table failed; the handle is now invalid
    #[error("couldn't get kvm process count")]
    ProcessRead(#[source] FfiError),
}

/// Convenience type alias for `Result<T, QueryError>`
///
/// ```rust
/// use kvmstat_core::error::KvmResult;
/// fn foo() -> KvmResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type KvmResult<T> = std::result::Result<T, QueryError>;
