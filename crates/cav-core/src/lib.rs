//! cav-core: stable foundation for the cavity simulator workspace.
//!
//! Contains:
//! - numeric (Real + tolerances + float helpers)
//! - convert (dB/linear, degree/radian, angular-frequency helpers)
//! - error (shared error types)

pub mod convert;
pub mod error;
pub mod numeric;

// Re-exports: nice ergonomics for downstream crates
pub use convert::*;
pub use error::{CavError, CavResult};
pub use numeric::*;
