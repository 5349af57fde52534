//! Reporting utilities: human-readable prediction and schema output.

pub mod format;

pub use format::*;
