//! Error types for simulation operations.

use thiserror::Error;

/// Errors encountered while building or stepping the simulation.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Initialization failed: {message}")]
    Init { message: String },

    #[error("Integrator failure: {what}")]
    IntegratorFailure { what: &'static str },
}

pub type SimResult<T> = Result<T, SimError>;

impl From<cav_mech::MechError> for SimError {
    fn from(e: cav_mech::MechError) -> Self {
        SimError::Init {
            message: e.to_string(),
        }
    }
}

impl From<cav_core::CavError> for SimError {
    fn from(e: cav_core::CavError) -> Self {
        SimError::Init {
            message: e.to_string(),
        }
    }
}
