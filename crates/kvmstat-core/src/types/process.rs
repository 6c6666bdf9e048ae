//! Process status keys and their aggregated counts.

use std::collections::hash_map::{self, HashMap};
use std::fmt;

/// A distinct (command name, scheduler state) pair
///
/// Two processes belong to the same class when both the command name and the
/// state abbreviation match. Used as the aggregation key in
/// [`ProcessStatusCounts`].
///
/// ## Example
///
/// ```rust
/// use kvmstat_core::types::ProcessStatus;
///
/// let a = ProcessStatus::new("sshd", "SLEEP");
/// let b = ProcessStatus::new("sshd", "SLEEP");
/// assert_eq!(a, b);
/// assert_eq!(a.to_string(), "sshd/SLEEP");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessStatus
{
    name: String,
    status: String,
}

impl ProcessStatus
{
    /// Create a key from a command name and a state abbreviation
    pub fn new(name: impl Into<String>, status: impl Into<String>) -> Self
    {
        Self {
            name: name.into(),
            status: status.into(),
        }
    }

    /// Command name (`ki_comm` on FreeBSD)
    pub fn name(&self) -> &str
    {
        &self.name
    }

    /// Scheduler state abbreviation (`RUN`, `SLEEP`, ...)
    pub fn status(&self) -> &str
    {
        &self.status
    }
}

impl fmt::Display for ProcessStatus
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}/{}", self.name, self.status)
    }
}

/// Per-[`ProcessStatus`] process counts from one process table snapshot
///
/// Built fresh by every
/// [`KvmHandle::process_status_counts`](crate::handle::KvmHandle::process_status_counts)
/// call and never merged with another snapshot. Keys only enter the map through
/// [`increment`](Self::increment), so every stored count is at least one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessStatusCounts
{
    counts: HashMap<ProcessStatus, u64>,
}

impl ProcessStatusCounts
{
    /// Create an empty mapping
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Count one more process of the given class
    pub fn increment(&mut self, key: ProcessStatus)
    {
        *self.counts.entry(key).or_insert(0) += 1;
    }

    /// Number of processes seen with this name and status (zero if none)
    pub fn get(&self, name: &str, status: &str) -> u64
    {
        self.counts.get(&ProcessStatus::new(name, status)).copied().unwrap_or(0)
    }

    /// Number of distinct classes
    pub fn len(&self) -> usize
    {
        self.counts.len()
    }

    /// True when the snapshot held no processes
    pub fn is_empty(&self) -> bool
    {
        self.counts.is_empty()
    }

    /// Total number of processes across all classes
    pub fn total(&self) -> u64
    {
        self.counts.values().sum()
    }

    /// Iterate over `(key, count)` pairs in unspecified order
    pub fn iter(&self) -> hash_map::Iter<'_, ProcessStatus, u64>
    {
        self.counts.iter()
    }

    /// Entries sorted by descending count, then by name and status
    ///
    /// Useful for stable human-readable output.
    pub fn sorted(&self) -> Vec<(&ProcessStatus, u64)>
    {
        let mut entries: Vec<_> = self.counts.iter().map(|(k, v)| (k, *v)).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        entries
    }

    /// Consume the wrapper and return the underlying map
    pub fn into_inner(self) -> HashMap<ProcessStatus, u64>
    {
        self.counts
    }
}

impl<'a> IntoIterator for &'a ProcessStatusCounts
{
    type Item = (&'a ProcessStatus, &'a u64);
    type IntoIter = hash_map::Iter<'a, ProcessStatus, u64>;

    fn into_iter(self) -> Self::IntoIter
    {
        self.counts.iter()
    }
}

impl FromIterator<ProcessStatus> for ProcessStatusCounts
{
    fn from_iter<I: IntoIterator<Item = ProcessStatus>>(iter: I) -> Self
    {
        let mut counts = Self::new();
        for key in iter {
            counts.increment(key);
        }
        counts
    }
}
