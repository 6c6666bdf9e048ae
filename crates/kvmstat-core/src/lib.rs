//! # kvmstat-core
//!
//! Thread-safe access to kernel statistics through libkvm.
//!
//! This crate provides:
//! - A [`KvmHandle`] that owns one kvm session and serializes every call on it
//! - Swap usage (pages in use)
//! - Process counts grouped by (command name, scheduler state)
//!
//! ## Platform Support
//!
//! - **FreeBSD**: libkvm (`kvm_open`, `kvm_getswapinfo`, `kvm_getprocs`)
//! - **Others**: builds, but every handle is invalid
//!
//! ## Why unsafe code is needed
//!
//! libkvm hands back raw pointers into memory it owns. Walking the process
//! table and copying strings out of it cannot be expressed in safe Rust. The
//! unsafe code lives in three places: the FFI declarations, the FreeBSD
//! interface, and the aggregation routine that reads the table.
//!
//! ## Error Policy
//!
//! Any failed foreign call closes the session and leaves the handle invalid
//! for good. Callers are expected to drop the handle and build a new one.

#![allow(unsafe_code)] // Required for libkvm FFI

mod aggregate;
pub mod error;
mod guards;
pub mod handle;
pub mod interface;
pub mod platform;
pub mod prelude;
pub mod types;

// Re-export commonly used types
pub use error::{FfiError, KvmResult, QueryError};
pub use handle::{HandleState, KvmHandle};
pub use interface::{KvmInterface, ProcEntry, RawProcTable};
pub use platform::NativeKvm;
pub use types::{ProcessStatus, ProcessStatusCounts, SwapPages};
