//! Statuswatch Driver crate root
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::cognitive_complexity)]

pub mod driver;
pub mod monitoring;

pub use driver::Driver;
