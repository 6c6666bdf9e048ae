//! Instrumented in-memory `KvmInterface` for integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use kvmstat_core::{FfiError, KvmInterface, ProcEntry, RawProcTable};

/// Session token handed out by [`FakeKvm`]
#[derive(Debug)]
pub struct FakeSession
{
    pub id: usize,
}

/// Fake kvm interface that records every call
///
/// Process tables are heap-allocated `ProcEntry` arrays with leaked `CString`s,
/// so releasing them goes through the same raw-pointer path libkvm memory does.
#[derive(Default)]
pub struct FakeKvm
{
    open_fails: bool,
    delay: Duration,
    swap_pages: AtomicU64,
    records: Mutex<Vec<(String, String)>>,
    fail_swap: AtomicBool,
    fail_procs: AtomicBool,
    allocate_before_failing: AtomicBool,
    count_override: Mutex<Option<i32>>,
    allocations: Mutex<HashMap<usize, usize>>,
    in_flight: AtomicBool,

    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
    pub swap_calls: AtomicUsize,
    pub proc_calls: AtomicUsize,
    pub releases: AtomicUsize,
    pub overlaps: AtomicUsize,
}

impl FakeKvm
{
    pub fn new() -> Self
    {
        Self::default()
    }

    pub fn failing_open() -> Self
    {
        Self {
            open_fails: true,
            ..Self::default()
        }
    }

    pub fn with_swap(self, pages: u64) -> Self
    {
        self.set_swap(pages);
        self
    }

    pub fn with_records(self, records: &[(&str, &str)]) -> Self
    {
        self.set_records(records);
        self
    }

    /// Hold every foreign call open for `delay` to widen race windows
    pub fn with_delay(mut self, delay: Duration) -> Self
    {
        self.delay = delay;
        self
    }

    pub fn set_swap(&self, pages: u64)
    {
        self.swap_pages.store(pages, Ordering::SeqCst);
    }

    pub fn set_records(&self, records: &[(&str, &str)])
    {
        *self.records.lock().unwrap() = records.iter().map(|(n, s)| (n.to_string(), s.to_string())).collect();
    }

    pub fn fail_swap(&self, fail: bool)
    {
        self.fail_swap.store(fail, Ordering::SeqCst);
    }

    /// Make the next process table calls fail; with `allocate`, after filling the table
    pub fn fail_procs(&self, fail: bool, allocate: bool)
    {
        self.fail_procs.store(fail, Ordering::SeqCst);
        self.allocate_before_failing.store(allocate, Ordering::SeqCst);
    }

    /// Report `count` with a null table instead of the configured records
    pub fn report_count(&self, count: Option<i32>)
    {
        *self.count_override.lock().unwrap() = count;
    }

    pub fn foreign_calls(&self) -> usize
    {
        self.swap_calls.load(Ordering::SeqCst) + self.proc_calls.load(Ordering::SeqCst)
    }

    /// Tables handed out and not yet released
    pub fn outstanding(&self) -> usize
    {
        self.allocations.lock().unwrap().len()
    }

    pub fn count(counter: &AtomicUsize) -> usize
    {
        counter.load(Ordering::SeqCst)
    }

    /// Every foreign operation except `open` runs between `enter` and `exit`
    fn enter(&self)
    {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
    }

    fn exit(&self)
    {
        self.in_flight.store(false, Ordering::SeqCst);
    }

    fn allocate(&self, table: &mut RawProcTable)
    {
        let records = self.records.lock().unwrap().clone();
        if records.is_empty() {
            return;
        }
        let entries: Box<[ProcEntry]> = records
            .iter()
            .map(|(name, status)| ProcEntry {
                name: CString::new(name.as_str()).unwrap().into_raw(),
                status: CString::new(status.as_str()).unwrap().into_raw(),
            })
            .collect();
        let len = entries.len();
        let entries = Box::into_raw(entries).cast::<ProcEntry>();
        self.allocations.lock().unwrap().insert(entries as usize, len);
        table.entries = entries;
        table.count = i32::try_from(len).unwrap();
    }

    fn fill(&self, table: &mut RawProcTable) -> Result<(), FfiError>
    {
        if let Some(count) = *self.count_override.lock().unwrap() {
            table.count = count;
            return Ok(());
        }
        if self.fail_procs.load(Ordering::SeqCst) {
            if self.allocate_before_failing.load(Ordering::SeqCst) {
                self.allocate(table);
            }
            return Err(fake_error("kvm_getprocs"));
        }
        self.allocate(table);
        Ok(())
    }
}

fn fake_error(operation: &'static str) -> FfiError
{
    FfiError::Kvm {
        operation,
        message: "injected failure".to_string(),
    }
}

// SAFETY: `allocate` builds `count` entries of leaked CStrings that live until
// `release_process_table` reclaims them
unsafe impl KvmInterface for FakeKvm
{
    type Session = FakeSession;

    fn open(&self) -> Result<FakeSession, FfiError>
    {
        if self.open_fails {
            return Err(FfiError::OpenFailed(std::io::Error::from_raw_os_error(libc::EACCES)));
        }
        let id = self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(FakeSession { id })
    }

    fn swap_used_pages(&self, _session: &mut FakeSession) -> Result<u64, FfiError>
    {
        self.enter();
        self.swap_calls.fetch_add(1, Ordering::SeqCst);
        let result = if self.fail_swap.load(Ordering::SeqCst) {
            Err(fake_error("kvm_getswapinfo"))
        } else {
            Ok(self.swap_pages.load(Ordering::SeqCst))
        };
        self.exit();
        result
    }

    fn process_table(&self, _session: &mut FakeSession, table: &mut RawProcTable) -> Result<(), FfiError>
    {
        self.enter();
        self.proc_calls.fetch_add(1, Ordering::SeqCst);
        let result = self.fill(table);
        self.exit();
        result
    }

    fn release_process_table(&self, table: RawProcTable)
    {
        self.enter();
        self.releases.fetch_add(1, Ordering::SeqCst);
        if !table.entries.is_null() {
            let len = self
                .allocations
                .lock()
                .unwrap()
                .remove(&(table.entries as usize))
                .expect("released a table that was never handed out");
            unsafe {
                let entries = Box::from_raw(ptr::slice_from_raw_parts_mut(table.entries, len));
                for entry in entries.iter() {
                    drop(CString::from_raw(entry.name as *mut c_char));
                    drop(CString::from_raw(entry.status as *mut c_char));
                }
            }
        }
        self.exit();
    }

    fn close(&self, _session: FakeSession)
    {
        self.enter();
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.exit();
    }
}
