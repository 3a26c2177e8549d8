//! Cavity state and the per-step electromechanical integrator.
//!
//! The electrical model is the first-order baseband recursion
//!
//! ```text
//! vc' = (1 - dt*(wh - i*dw)) * vc + 2*wh*dt * (beta*vf/(beta+1) + vb)
//! vr  = vc' - vf
//! ```
//!
//! which is the integration law this simulator treats as authoritative (the
//! full library state-space voltage step produces a numerically different
//! trajectory). Mechanical detuning rides on the discrete state-space model
//! driven by the stored field magnitude squared.

use crate::error::{SimError, SimResult};
use cav_mech::DiscreteStateSpace;
use nalgebra::DVector;
use num_complex::Complex64;

/// Fixed electrical coefficients of the cavity model.
#[derive(Debug, Clone, Copy)]
pub struct CavityCoeffs {
    /// Half-bandwidth `pi*f0/QL` (rad/s).
    pub half_bw: f64,
    /// Load resistance `0.5*(R/Q)*QL` (ohm).
    pub rl: f64,
    /// Input coupling coefficient.
    pub beta: f64,
    /// Fixed timestep (s).
    pub dt: f64,
}

/// Mutable cavity state, exclusively owned by the simulation driver.
#[derive(Debug, Clone)]
pub struct CavityState {
    /// Stored RF field (V, complex baseband).
    pub voltage: Complex64,
    /// Mechanical mode state vector (two entries per mode).
    pub mech_state: DVector<f64>,
    /// Total detuning (rad/s).
    pub detuning: f64,
    /// Source oscillator phase accumulator (rad).
    pub phase_accum: f64,
    /// Pulse buffer index; wraps modulo the pulse period.
    pub buf_index: usize,
}

impl CavityState {
    pub fn new(mech_dim: usize) -> Self {
        Self {
            voltage: Complex64::ZERO,
            mech_state: DVector::zeros(mech_dim),
            detuning: 0.0,
            phase_accum: 0.0,
            buf_index: 0,
        }
    }

    /// Zero every field.
    pub fn reset(&mut self) {
        self.voltage = Complex64::ZERO;
        self.mech_state.fill(0.0);
        self.detuning = 0.0;
        self.phase_accum = 0.0;
        self.buf_index = 0;
    }
}

/// Output of one integrator step.
#[derive(Debug, Clone)]
pub struct CavityStepResult {
    pub vc: Complex64,
    pub vr: Complex64,
    /// New total detuning: injected perturbation + mechanical contribution
    /// (rad/s). The prior detuning enters the voltage recursion only.
    pub detuning: f64,
    pub mech_state: DVector<f64>,
}

/// Advance cavity voltage and mechanical state by one step.
///
/// Pure function of its inputs; the caller owns all state. Reports
/// [`SimError::IntegratorFailure`] instead of propagating non-finite values
/// into the state recursion.
#[allow(clippy::too_many_arguments)]
pub fn cavity_step(
    coeffs: &CavityCoeffs,
    dw_prev: f64,
    dw_micr: f64,
    vf: Complex64,
    vb: Complex64,
    vc_prev: Complex64,
    mech: &DiscreteStateSpace,
    mech_state: &DVector<f64>,
) -> SimResult<CavityStepResult> {
    let decay = Complex64::new(1.0 - coeffs.dt * coeffs.half_bw, coeffs.dt * dw_prev);
    let drive = coeffs.beta * vf / (coeffs.beta + 1.0) + vb;
    let vc = decay * vc_prev + 2.0 * coeffs.half_bw * coeffs.dt * drive;
    let vr = vc - vf;

    // Radiation pressure input in MV^2.
    let u = (vc.norm() * 1e-6).powi(2);
    let (mech_next, dw_mech) = mech.step(mech_state, u);
    let detuning = dw_micr + dw_mech;

    if !vc.re.is_finite() || !vc.im.is_finite() {
        return Err(SimError::IntegratorFailure {
            what: "non-finite cavity voltage",
        });
    }
    if !detuning.is_finite() {
        return Err(SimError::IntegratorFailure {
            what: "non-finite detuning",
        });
    }

    Ok(CavityStepResult {
        vc,
        vr,
        detuning,
        mech_state: mech_next,
    })
}
