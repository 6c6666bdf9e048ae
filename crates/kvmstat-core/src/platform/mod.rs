//! # Platform-Specific Implementations
//!
//! Native [`KvmInterface`](crate::interface::KvmInterface) implementations.
//!
//! - **FreeBSD**: libkvm (`kvm_open`, `kvm_getswapinfo`, `kvm_getprocs`)
//!   - See: [kvm(3) man page](https://man.freebsd.org/cgi/man.cgi?query=kvm&sektion=3)
//! - **Everything else**: a stub whose `open()` always fails, so handles built
//!   on it start invalid
//!
//! [`NativeKvm`] names whichever one applies to the target.

#[cfg(target_os = "freebsd")]
pub mod freebsd;

#[cfg(not(target_os = "freebsd"))]
pub mod unsupported;

/// The kvm interface for the current target
#[cfg(target_os = "freebsd")]
pub type NativeKvm = freebsd::FreeBsdKvm;

/// The kvm interface for the current target
#[cfg(not(target_os = "freebsd"))]
pub type NativeKvm = unsupported::UnsupportedKvm;
