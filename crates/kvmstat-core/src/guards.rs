//! # RAII Guards for Foreign Buffers
//!
//! libkvm-backed process tables are plain C memory. Nothing frees them for us,
//! and the query path has several ways to bail out early (the library call
//! fails, the snapshot is inconsistent, ...). Holding the table in a guard
//! ties the release to scope exit instead of to each return statement.
//!
//! ## Guards
//!
//! - **ProcTableGuard**: owns a [`RawProcTable`] slot and hands it back to the
//!   interface on drop

use std::mem;

use crate::interface::{KvmInterface, RawProcTable};

/// RAII guard that releases a raw process table when dropped.
///
/// The guard is created empty, *before* the foreign call, and the call writes
/// into [`table_mut`](Self::table_mut). That way memory the interface
/// allocated before failing is still released.
///
/// Release happens exactly once: on drop, or on an explicit
/// [`release`](Self::release).
pub(crate) struct ProcTableGuard<'a, K: KvmInterface + ?Sized>
{
    kvm: &'a K,
    table: RawProcTable,
    active: bool,
}

impl<'a, K: KvmInterface + ?Sized> ProcTableGuard<'a, K>
{
    /// Create a guard holding an empty table.
    pub(crate) fn new(kvm: &'a K) -> Self
    {
        Self {
            kvm,
            table: RawProcTable::default(),
            active: true,
        }
    }

    /// Slot for [`KvmInterface::process_table`] to fill.
    pub(crate) fn table_mut(&mut self) -> &mut RawProcTable
    {
        &mut self.table
    }

    /// The table as filled by the interface.
    pub(crate) fn table(&self) -> &RawProcTable
    {
        &self.table
    }

    /// Release the table before the guard goes out of scope.
    ///
    /// Dropping the guard afterwards is a no-op.
    pub(crate) fn release(mut self)
    {
        self.release_once();
    }

    fn release_once(&mut self)
    {
        if self.active {
            self.active = false;
            self.kvm.release_process_table(mem::take(&mut self.table));
        }
    }
}

impl<K: KvmInterface + ?Sized> Drop for ProcTableGuard<'_, K>
{
    fn drop(&mut self)
    {
        self.release_once();
    }
}
