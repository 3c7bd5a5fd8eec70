//! Runtime utilities for statuswatch.
#![allow(missing_docs)]
#![allow(clippy::uninlined_format_args)]

pub mod shutdown;

pub use shutdown::{Shutdown, ShutdownSignal, ShutdownToken, join_with_timeout};
