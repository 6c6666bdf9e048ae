//! Common module for library exports

pub use crate::error::{FfiError, KvmResult, QueryError};
pub use crate::handle::{HandleState, KvmHandle};
pub use crate::interface::{KvmInterface, ProcEntry, RawProcTable};
pub use crate::platform::NativeKvm;
pub use crate::types::{ProcessStatus, ProcessStatusCounts, SwapPages};
