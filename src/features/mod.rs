//! Named indicators -> ordered feature vectors.

pub mod builder;

pub use builder::*;
