//! # Types
//!
//! Owned, platform-agnostic values produced by the handle.
//!
//! Nothing in here points into foreign memory. Strings are copied out of the
//! libkvm buffers before those buffers are released.

pub mod process;

// Re-export all public types
pub use process::{ProcessStatus, ProcessStatusCounts};

/// Number of swap pages in use at the instant of the query
pub type SwapPages = u64;
