//! Parameter scanning: sweep one control parameter and sample the settled
//! response.
//!
//! A scan runs on a fresh, disposable engine seeded from the live
//! configuration and a snapshot of the live parameters. It never touches the
//! live cavity state or history, so a scan can proceed concurrently with the
//! stepping loop and the live swept parameter is unchanged afterward.

use crate::driver::{EngineParams, SimEngine};
use crate::error::SimError;
use crate::params::{ControlParameters, ScanParameter};
use cav_mech::MechanicalModeSet;
use thiserror::Error;
use tracing::{debug, info};

/// Scan request: sweep `parameter` over `[min, max]` inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanRequest {
    pub parameter: ScanParameter,
    pub min: f64,
    pub max: f64,
    /// Number of evenly spaced setpoints (endpoints included).
    pub num_points: usize,
    /// Steps run per setpoint before sampling, letting transients decay.
    pub settle_steps: usize,
}

impl ScanRequest {
    pub fn new(parameter: ScanParameter, min: f64, max: f64) -> Self {
        Self {
            parameter,
            min,
            max,
            num_points: 20,
            settle_steps: 100,
        }
    }
}

/// One swept setpoint and its settled response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanPoint {
    pub value: f64,
    /// Settled cavity voltage magnitude (MV).
    pub response_mv: f64,
}

/// Result of one scan invocation, replaced by the next scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanResult {
    pub parameter: ScanParameter,
    pub points: Vec<ScanPoint>,
}

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Invalid scan range: min {min} must be less than max {max}")]
    InvalidRange { min: f64, max: f64 },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error(transparent)]
    Sim(#[from] SimError),
}

/// Run a blocking scan on a disposable engine.
///
/// Microphonics are disabled for the sweep so the settled response is
/// deterministic per setpoint. Setpoints are visited in ascending order on
/// the same engine; the settling window absorbs the transient between
/// setpoints.
pub fn run_scan(
    engine_params: EngineParams,
    modes: &MechanicalModeSet,
    base: &ControlParameters,
    request: &ScanRequest,
) -> Result<ScanResult, ScanError> {
    if !(request.min < request.max) {
        return Err(ScanError::InvalidRange {
            min: request.min,
            max: request.max,
        });
    }
    if request.num_points < 2 {
        return Err(ScanError::InvalidArg {
            what: "a scan needs at least two setpoints",
        });
    }
    if request.settle_steps == 0 {
        return Err(ScanError::InvalidArg {
            what: "settling window must be positive",
        });
    }

    let mut params = engine_params;
    params.microphonics_sigma = 0.0;
    let mut engine = SimEngine::new(params, modes)?;
    engine.start();

    let mut ctrl = base.clone();
    let n = request.num_points;
    let span = request.max - request.min;
    let mut points = Vec::with_capacity(n);

    for i in 0..n {
        let value = if i == n - 1 {
            request.max
        } else {
            request.min + span * (i as f64) / ((n - 1) as f64)
        };
        request.parameter.apply(&mut ctrl, value);

        let mut response = 0.0;
        for _ in 0..request.settle_steps {
            response = engine.step(&ctrl)?.sample.vc_magnitude();
        }
        debug!(
            parameter = %request.parameter,
            value,
            response_mv = response * 1e-6,
            "scan setpoint settled"
        );
        points.push(ScanPoint {
            value,
            response_mv: response * 1e-6,
        });
    }

    info!(parameter = %request.parameter, points = n, "scan complete");
    Ok(ScanResult {
        parameter: request.parameter,
        points,
    })
}
