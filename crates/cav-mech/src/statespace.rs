//! Continuous state-space construction and zero-order-hold discretization.
//!
//! Each mechanical mode is a damped second-order resonator driven by
//! radiation pressure (stored field magnitude squared, in MV^2). Per mode
//! `i` with `w = 2*pi*f_i`:
//!
//! ```text
//! x_i = [pos, vel]
//! A_i = [[0, 1], [-w^2, -w/Q_i]]     B_i = [0, -K_i * w^2]^T
//! ```
//!
//! The single output is the total mechanical detuning in rad/s,
//! `y = 2*pi * sum(pos_i)`, so each mode's DC contribution is `-K_i * u` Hz
//! for input `u` in MV^2 (Lorentz force pulls the resonance down for
//! positive coupling).

use crate::{MechError, MechResult, MechanicalModeSet};
use cav_core::hz_to_rad_s;
use nalgebra::{DMatrix, DVector};
use std::f64::consts::PI;

/// Continuous-time linear state-space model (A, B, C, D).
#[derive(Debug, Clone)]
pub struct StateSpace {
    pub a: DMatrix<f64>,
    pub b: DMatrix<f64>,
    pub c: DMatrix<f64>,
    pub d: DMatrix<f64>,
}

/// Discrete-time model over a fixed sample interval.
#[derive(Debug, Clone)]
pub struct DiscreteStateSpace {
    pub a: DMatrix<f64>,
    pub b: DMatrix<f64>,
    pub c: DMatrix<f64>,
    pub d: DMatrix<f64>,
    pub dt: f64,
}

impl DiscreteStateSpace {
    pub fn state_dim(&self) -> usize {
        self.a.nrows()
    }

    /// Zero state vector of the right dimension.
    pub fn zero_state(&self) -> DVector<f64> {
        DVector::zeros(self.state_dim())
    }

    /// Advance one sample with scalar input `u`.
    ///
    /// The output is computed from the prior state (the input feeds through
    /// `D` only), matching the simulation step convention: the detuning
    /// observed this step reflects the state before the update.
    pub fn step(&self, x: &DVector<f64>, u: f64) -> (DVector<f64>, f64) {
        let y = (&self.c * x)[(0, 0)] + self.d[(0, 0)] * u;
        let x_next = &self.a * x + self.b.column(0) * u;
        (x_next, y)
    }
}

/// Build the continuous-time model for a mode set.
///
/// Single input (stored field magnitude squared, MV^2), single output
/// (mechanical detuning, rad/s). State dimension is `2 * mode count`.
pub fn build_continuous(modes: &MechanicalModeSet) -> MechResult<StateSpace> {
    let n = modes.len();
    let mut a = DMatrix::zeros(2 * n, 2 * n);
    let mut b = DMatrix::zeros(2 * n, 1);
    let mut c = DMatrix::zeros(1, 2 * n);
    let d = DMatrix::zeros(1, 1);

    for (i, mode) in modes.iter().enumerate() {
        let w = hz_to_rad_s(mode.freq_hz);
        let r = 2 * i;
        a[(r, r + 1)] = 1.0;
        a[(r + 1, r)] = -w * w;
        a[(r + 1, r + 1)] = -w / mode.quality;
        b[(r + 1, 0)] = -mode.coupling * w * w;
        c[(0, r)] = 2.0 * PI;
    }

    Ok(StateSpace { a, b, c, d })
}

/// Zero-order-hold discretization over `dt`.
///
/// Uses the augmented-matrix exponential
/// `exp([[A, B], [0, 0]] * dt) = [[Ad, Bd], [0, I]]`, which needs no
/// inversion of `A`.
pub fn discretize_zoh(ss: &StateSpace, dt: f64) -> MechResult<DiscreteStateSpace> {
    if !(dt > 0.0) {
        return Err(MechError::InvalidArg {
            what: "dt must be positive",
        });
    }
    let n = ss.a.nrows();
    let m = ss.b.ncols();
    if ss.a.ncols() != n || ss.b.nrows() != n {
        return Err(MechError::InvalidArg {
            what: "A must be square and B row-conformant",
        });
    }

    let mut aug = DMatrix::zeros(n + m, n + m);
    aug.view_mut((0, 0), (n, n)).copy_from(&(&ss.a * dt));
    aug.view_mut((0, n), (n, m)).copy_from(&(&ss.b * dt));
    let e = aug.exp();

    if e.iter().any(|v| !v.is_finite()) {
        return Err(MechError::Discretization {
            what: "matrix exponential produced non-finite entries",
        });
    }

    Ok(DiscreteStateSpace {
        a: e.view((0, 0), (n, n)).into_owned(),
        b: e.view((0, n), (n, m)).into_owned(),
        c: ss.c.clone(),
        d: ss.d.clone(),
        dt,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cav_core::{Tolerances, nearly_equal};

    fn default_discrete(dt: f64) -> DiscreteStateSpace {
        let modes = MechanicalModeSet::default_table();
        let ss = build_continuous(&modes).unwrap();
        discretize_zoh(&ss, dt).unwrap()
    }

    #[test]
    fn dimensions_match_mode_count() {
        let modes = MechanicalModeSet::default_table();
        let ss = build_continuous(&modes).unwrap();
        assert_eq!(ss.a.nrows(), 10);
        assert_eq!(ss.b.nrows(), 10);
        assert_eq!(ss.c.ncols(), 10);
        assert_eq!(ss.d[(0, 0)], 0.0);
    }

    #[test]
    fn zoh_of_pure_integrator() {
        // xdot = u: Ad = 1, Bd = dt.
        let ss = StateSpace {
            a: DMatrix::zeros(1, 1),
            b: DMatrix::from_element(1, 1, 1.0),
            c: DMatrix::from_element(1, 1, 1.0),
            d: DMatrix::zeros(1, 1),
        };
        let dss = discretize_zoh(&ss, 1e-3).unwrap();
        let tol = Tolerances::default();
        assert!(nearly_equal(dss.a[(0, 0)], 1.0, tol));
        assert!(nearly_equal(dss.b[(0, 0)], 1e-3, tol));
    }

    #[test]
    fn discrete_model_is_stable() {
        let dss = default_discrete(1e-6);
        let radius = dss
            .a
            .complex_eigenvalues()
            .iter()
            .map(|l| l.norm())
            .fold(0.0_f64, f64::max);
        assert!(radius < 1.0, "spectral radius {radius} >= 1");
    }

    #[test]
    fn dc_gain_matches_continuous_model() {
        // Continuous DC gain: -C A^-1 B = -2*pi * sum(K_i).
        let modes = MechanicalModeSet::default_table();
        let k_sum: f64 = modes.iter().map(|m| m.coupling).sum();
        let expected = -2.0 * PI * k_sum;

        let dss = default_discrete(1e-6);
        let n = dss.state_dim();
        let i_minus_a = DMatrix::identity(n, n) - &dss.a;
        let x_ss = i_minus_a
            .lu()
            .solve(&dss.b.column(0).into_owned())
            .expect("I - Ad is invertible for a stable model");
        let gain = (&dss.c * &x_ss)[(0, 0)] + dss.d[(0, 0)];

        let tol = Tolerances {
            abs: 1e-9,
            rel: 1e-6,
        };
        assert!(
            nearly_equal(gain, expected, tol),
            "discrete DC gain {gain} vs continuous {expected}"
        );
    }

    #[test]
    fn step_settles_to_dc_value() {
        // Constant input for long enough settles near -2*pi*sum(K)*u rad/s.
        let modes = MechanicalModeSet::default_table();
        let dss = default_discrete(1e-3);
        let u = 0.5; // MV^2
        let mut x = dss.zero_state();
        let mut y = 0.0;
        for _ in 0..200_000 {
            let (x_next, y_now) = dss.step(&x, u);
            x = x_next;
            y = y_now;
        }
        let k_sum: f64 = modes.iter().map(|m| m.coupling).sum();
        let expected = -2.0 * PI * k_sum * u;
        assert!(
            (y - expected).abs() < 1e-3 * expected.abs(),
            "settled {y} vs expected {expected}"
        );
    }

    #[test]
    fn rejects_nonpositive_dt() {
        let modes = MechanicalModeSet::default_table();
        let ss = build_continuous(&modes).unwrap();
        assert!(discretize_zoh(&ss, 0.0).is_err());
    }
}
