//! kp-core: stable foundation for the Kita planner.
//!
//! Contains:
//! - ids (scenario and data item identifiers)
//! - dates (the two date formats used by imported data)
//! - error (shared error types)

pub mod dates;
pub mod error;
pub mod ids;

// Re-exports: nice ergonomics for downstream crates
pub use dates::*;
pub use error::{KpError, KpResult};
pub use ids::*;
