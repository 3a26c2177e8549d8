//! cav-mech: mechanical-mode state-space models for cavity detuning.
//!
//! Builds the continuous-time model of the mechanical resonances that couple
//! stored RF field to frequency detuning, and discretizes it (zero-order
//! hold) over the simulation timestep. Both are constructed once at startup;
//! a failure here is fatal to initialization.

pub mod modes;
pub mod statespace;

pub use modes::{MechanicalMode, MechanicalModeSet};
pub use statespace::{DiscreteStateSpace, StateSpace, build_continuous, discretize_zoh};

pub type MechResult<T> = Result<T, MechError>;

#[derive(thiserror::Error, Debug)]
pub enum MechError {
    #[error("Invalid mode set: {what}")]
    InvalidModeSet { what: &'static str },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Discretization failed: {what}")]
    Discretization { what: &'static str },
}
