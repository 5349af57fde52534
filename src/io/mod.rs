//! Input/output helpers.
//!
//! - model/scaler artifacts (`artifact`)
//! - custom indicator schemas (`schema`)
//! - historical emissions for optional enrichment (`history`)
//! - CSV batch requests/results (`batch`)

pub mod artifact;
pub mod batch;
pub mod history;
pub mod schema;

pub use artifact::*;
pub use batch::*;
pub use history::*;
pub use schema::*;
