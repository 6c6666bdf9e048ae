//! # Kvm Handle
//!
//! The thread-safe owner of one kvm session.
//!
//! ## State Machine
//!
//! ```text
//!            open() ok                 any foreign failure
//! new() ──────────────► Valid ───────────────────────────► Invalid
//!   │                                                        ▲
//!   └──────────────────── open() failed ─────────────────────┘
//! ```
//!
//! `Invalid` is terminal. A caller that sees an error drops the handle and
//! builds a new one; there is no reopen in place.
//!
//! ## Locking
//!
//! One `Mutex` guards the session and the state together. Every query holds
//! it for the whole foreign call, so at most one libkvm call is in flight per
//! handle, and the invalidate path runs under the same lock.

use std::mem;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace};

use crate::aggregate::aggregate;
use crate::error::{FfiError, KvmResult, QueryError};
use crate::guards::ProcTableGuard;
use crate::interface::KvmInterface;
use crate::platform::NativeKvm;
use crate::types::{ProcessStatusCounts, SwapPages};

/// Observable state of a [`KvmHandle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState
{
    /// The session is open and queries reach the kernel
    Valid,
    /// The session is closed (or was never opened); queries fail immediately
    Invalid,
}

/// Session slot guarded by the handle's lock
enum SessionState<S>
{
    Valid(S),
    Invalid,
}

impl<S> SessionState<S>
{
    fn session_mut(&mut self) -> Result<&mut S, QueryError>
    {
        match self {
            SessionState::Valid(session) => Ok(session),
            SessionState::Invalid => Err(QueryError::HandleInvalid),
        }
    }
}

/// Thread-safe kvm session handle
///
/// ## Lifecycle
///
/// 1. Create: [`KvmHandle::new()`] (or [`with_interface`](Self::with_interface))
/// 2. Query: [`swap_used_pages()`](Self::swap_used_pages),
///    [`process_status_counts()`](Self::process_status_counts), from any thread
/// 3. On any error: drop it and create a new one
///
/// Dropping a valid handle closes its session.
///
/// ## Example
///
/// ```rust,no_run
/// use kvmstat_core::KvmHandle;
///
/// let kvm = KvmHandle::new();
/// let used = kvm.swap_used_pages()?;
/// let procs = kvm.process_status_counts()?;
/// println!("{used} swap pages in use, {} processes", procs.total());
/// # Ok::<(), kvmstat_core::QueryError>(())
/// ```
pub struct KvmHandle<K: KvmInterface>
{
    kvm: K,
    state: Mutex<SessionState<K::Session>>,
}

impl KvmHandle<NativeKvm>
{
    /// Open a handle on the platform's kvm interface
    ///
    /// Never fails. If the session cannot be opened the handle starts out
    /// invalid and every query returns [`QueryError::HandleInvalid`].
    pub fn new() -> Self
    {
        Self::with_interface(NativeKvm::default())
    }

    /// Open a handle on the platform's kvm interface, reporting open failures
    ///
    /// ## Errors
    ///
    /// - `OpenFailure`: `kvm_open()` failed, or the platform has no kvm
    pub fn try_new() -> KvmResult<Self>
    {
        Self::try_with_interface(NativeKvm::default())
    }
}

impl Default for KvmHandle<NativeKvm>
{
    fn default() -> Self
    {
        Self::new()
    }
}

impl<K: KvmInterface> KvmHandle<K>
{
    /// Open a handle on an arbitrary interface implementation
    ///
    /// Like [`KvmHandle::new`], a failed open produces an invalid handle
    /// rather than an error.
    pub fn with_interface(kvm: K) -> Self
    {
        let state = match kvm.open() {
            Ok(session) => {
                debug!("kvm session opened");
                SessionState::Valid(session)
            }
            Err(err) => {
                debug!(error = %err, "kvm session unavailable, handle starts invalid");
                SessionState::Invalid
            }
        };
        Self {
            kvm,
            state: Mutex::new(state),
        }
    }

    /// Open a handle on an arbitrary interface, reporting open failures
    ///
    /// ## Errors
    ///
    /// - `OpenFailure`: the interface's `open()` failed
    pub fn try_with_interface(kvm: K) -> KvmResult<Self>
    {
        let session = kvm.open().map_err(QueryError::OpenFailure)?;
        debug!("kvm session opened");
        Ok(Self {
            kvm,
            state: Mutex::new(SessionState::Valid(session)),
        })
    }

    /// Current state of the handle
    pub fn state(&self) -> HandleState
    {
        match *self.lock() {
            SessionState::Valid(_) => HandleState::Valid,
            SessionState::Invalid => HandleState::Invalid,
        }
    }

    /// Shorthand for `state() == HandleState::Valid`
    pub fn is_valid(&self) -> bool
    {
        self.state() == HandleState::Valid
    }

    /// The interface this handle calls into
    pub fn interface(&self) -> &K
    {
        &self.kvm
    }

    /// Number of swap pages currently in use
    ///
    /// ## Errors
    ///
    /// - `HandleInvalid`: the handle is already invalid; nothing was called
    /// - `SwapRead`: the read failed; the handle is now invalid
    pub fn swap_used_pages(&self) -> KvmResult<SwapPages>
    {
        let mut state = self.lock();
        let session = state.session_mut()?;

        trace!("reading kvm swap info");
        let result = self.kvm.swap_used_pages(session);
        result.map_err(|err| {
            self.invalidate(&mut state, &err);
            QueryError::SwapRead(err)
        })
    }

    /// Count processes per (command name, state) pair
    ///
    /// The returned map is built from this call's snapshot only. The foreign
    /// table is released before this returns, on every path.
    ///
    /// ## Errors
    ///
    /// - `HandleInvalid`: the handle is already invalid; nothing was called
    /// - `ProcessRead`: the snapshot failed or was inconsistent; the handle
    ///   is now invalid and no partial counts are returned
    pub fn process_status_counts(&self) -> KvmResult<ProcessStatusCounts>
    {
        let mut state = self.lock();
        let session = state.session_mut()?;

        trace!("reading kvm process table");
        let mut table = ProcTableGuard::new(&self.kvm);
        let result = self.kvm.process_table(session, table.table_mut()).and_then(|()| {
            // SAFETY: `process_table` succeeded, so the table meets the
            // `KvmInterface` contract until it is released below
            unsafe { aggregate(table.table()) }
        });
        table.release();

        result.map_err(|err| {
            self.invalidate(&mut state, &err);
            QueryError::ProcessRead(err)
        })
    }

    /// Close the session and mark the handle invalid
    ///
    /// Called only from failure paths with the lock held. Taking the session
    /// out of the slot makes a second close impossible.
    fn invalidate(&self, state: &mut MutexGuard<'_, SessionState<K::Session>>, cause: &FfiError)
    {
        if let SessionState::Valid(session) = mem::replace(&mut **state, SessionState::Invalid) {
            debug!(error = %cause, "kvm call failed, closing session");
            self.kvm.close(session);
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState<K::Session>>
    {
        // Every transition is a single assignment, so a poisoned state is still coherent
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K: KvmInterface> Drop for KvmHandle<K>
{
    fn drop(&mut self)
    {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let SessionState::Valid(session) = mem::replace(state, SessionState::Invalid) {
            debug!("kvm handle dropped, closing session");
            self.kvm.close(session);
        }
    }
}

impl<K: KvmInterface> std::fmt::Debug for KvmHandle<K>
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("KvmHandle").field("state", &self.state()).finish()
    }
}
