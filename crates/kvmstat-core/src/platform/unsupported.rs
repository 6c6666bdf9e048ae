//! # Unsupported Platforms
//!
//! Stand-in interface for targets without libkvm.
//!
//! Lets the rest of the workspace build everywhere. A handle created on top of
//! it is invalid from the start; no query ever reaches a foreign call.

use std::convert::Infallible;
use std::env;

use crate::error::FfiError;
use crate::interface::{KvmInterface, RawProcTable};

/// Kvm interface that cannot open a session
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedKvm;

// SAFETY: `process_table` can never be called since no session can exist
unsafe impl KvmInterface for UnsupportedKvm
{
    type Session = Infallible;

    fn open(&self) -> Result<Self::Session, FfiError>
    {
        Err(FfiError::Unsupported(env::consts::OS))
    }

    fn swap_used_pages(&self, session: &mut Self::Session) -> Result<u64, FfiError>
    {
        match *session {}
    }

    fn process_table(&self, session: &mut Self::Session, _table: &mut RawProcTable) -> Result<(), FfiError>
    {
        match *session {}
    }

    fn release_process_table(&self, _table: RawProcTable) {}

    fn close(&self, session: Self::Session)
    {
        match session {}
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::error::QueryError;
    use crate::handle::{HandleState, KvmHandle};

    #[test]
    fn test_handle_starts_invalid()
    {
        let handle = KvmHandle::with_interface(UnsupportedKvm);
        assert_eq!(handle.state(), HandleState::Invalid);
        assert!(matches!(handle.swap_used_pages(), Err(QueryError::HandleInvalid)));
        assert!(matches!(handle.process_status_counts(), Err(QueryError::HandleInvalid)));
    }

    #[test]
    fn test_try_new_reports_unsupported()
    {
        let err = KvmHandle::try_new().unwrap_err();
        match err {
            QueryError::OpenFailure(FfiError::Unsupported(os)) => assert_eq!(os, env::consts::OS),
            other => panic!("unexpected error: {other}"),
        }
    }
}
