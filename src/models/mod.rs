//! Model and scaler implementations.
//!
//! Both are pure and read-only after construction so that a single loaded
//! instance can be shared across threads.

pub mod forest;
pub mod model;
pub mod scaler;

pub use forest::*;
pub use model::*;
pub use scaler::*;
