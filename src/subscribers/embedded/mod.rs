//! # Built-in subscribers
//!
//! - [`LogWriter`]: renders pool events as `tracing` records.

mod log;

pub use log::LogWriter;
