//! Simulation driver: per-step pipeline and run state machine.

use crate::cavity::{CavityCoeffs, CavityState, cavity_step};
use crate::error::{SimError, SimResult};
use crate::params::ControlParameters;
use crate::rf::{self, WaveformBuffers};
use cav_core::deg_to_rad;
use cav_history::Sample;
use cav_mech::{DiscreteStateSpace, MechanicalModeSet, build_continuous, discretize_zoh};
use num_complex::Complex64;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use std::f64::consts::PI;
use tracing::{debug, info, warn};

/// Fixed engine parameters, set once at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineParams {
    /// Simulation timestep (s).
    pub dt: f64,
    /// Cavity nominal frequency (Hz).
    pub f0_hz: f64,
    /// Loaded quality factor.
    pub ql: f64,
    /// Shunt impedance over Q (ohm).
    pub roq: f64,
    /// Input coupling coefficient.
    pub beta: f64,
    /// Envelope buffer length (samples).
    pub buf_size: usize,
    /// End of the fill window (samples).
    pub t_fill: usize,
    /// End of the flat-top window (samples).
    pub t_flat: usize,
    /// Pulse period (samples); may exceed `buf_size`.
    pub pulse_len: usize,
    /// Microphonics detuning noise, standard deviation (rad/s).
    pub microphonics_sigma: f64,
    /// RNG seed; a fixed seed gives a reproducible noise sequence.
    pub seed: u64,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            dt: 1e-6,
            f0_hz: 1.3e9,
            ql: 3e6,
            roq: 1036.0,
            beta: 1e4,
            buf_size: 2048 * 8,
            t_fill: 510,
            t_flat: 1300,
            pulse_len: 2048 * 10,
            microphonics_sigma: 2.0 * PI * 10.0,
            seed: 0,
        }
    }
}

impl EngineParams {
    pub fn validate(&self) -> SimResult<()> {
        if !(self.dt > 0.0) {
            return Err(SimError::InvalidArg {
                what: "dt must be positive",
            });
        }
        if !(self.f0_hz > 0.0) || !(self.ql > 0.0) || !(self.roq > 0.0) {
            return Err(SimError::InvalidArg {
                what: "f0, QL and R/Q must be positive",
            });
        }
        if !(self.beta > 0.0) {
            return Err(SimError::InvalidArg {
                what: "coupling beta must be positive",
            });
        }
        if !(self.microphonics_sigma >= 0.0) {
            return Err(SimError::InvalidArg {
                what: "microphonics sigma must be non-negative",
            });
        }
        Ok(())
    }

    /// Half-bandwidth `pi*f0/QL` (rad/s).
    pub fn half_bw(&self) -> f64 {
        PI * self.f0_hz / self.ql
    }

    /// Load resistance `0.5*(R/Q)*QL` (ohm).
    pub fn rl(&self) -> f64 {
        0.5 * self.roq * self.ql
    }
}

/// Driver run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriverState {
    #[default]
    Stopped,
    Running,
}

/// One step's published output.
#[derive(Debug, Clone)]
pub struct StepOutput {
    pub sample: Sample,
    /// Per-mode displacement values, one per mechanical mode.
    pub mode_values: Vec<f64>,
}

/// The simulation engine: owns the cavity state and runs the per-step
/// pipeline source -> modulate -> amplify -> cavity integrator.
pub struct SimEngine {
    params: EngineParams,
    coeffs: CavityCoeffs,
    mech: DiscreteStateSpace,
    mode_count: usize,
    buffers: WaveformBuffers,
    state: CavityState,
    sim_time: f64,
    driver_state: DriverState,
    rng: StdRng,
    noise: Normal<f64>,
}

impl SimEngine {
    pub fn new(params: EngineParams, modes: &MechanicalModeSet) -> SimResult<Self> {
        params.validate()?;
        let ss = build_continuous(modes)?;
        let mech = discretize_zoh(&ss, params.dt)?;
        let buffers = WaveformBuffers::new(
            params.buf_size,
            params.t_fill,
            params.t_flat,
            params.pulse_len,
            ControlParameters::default().beam_current_a,
        )?;
        let noise = Normal::new(0.0, params.microphonics_sigma).map_err(|_| {
            SimError::InvalidArg {
                what: "microphonics sigma must be finite",
            }
        })?;

        let coeffs = CavityCoeffs {
            half_bw: params.half_bw(),
            rl: params.rl(),
            beta: params.beta,
            dt: params.dt,
        };
        info!(
            modes = modes.len(),
            dt = params.dt,
            half_bw = coeffs.half_bw,
            "simulation engine initialized"
        );

        Ok(Self {
            params,
            coeffs,
            mode_count: modes.len(),
            state: CavityState::new(mech.state_dim()),
            mech,
            buffers,
            sim_time: 0.0,
            driver_state: DriverState::Stopped,
            rng: StdRng::seed_from_u64(params.seed),
            noise,
        })
    }

    pub fn driver_state(&self) -> DriverState {
        self.driver_state
    }

    pub fn is_running(&self) -> bool {
        self.driver_state == DriverState::Running
    }

    /// Stopped -> Running; idempotent when already running.
    pub fn start(&mut self) {
        if self.driver_state == DriverState::Stopped {
            self.driver_state = DriverState::Running;
            debug!("driver started");
        }
    }

    pub fn stop(&mut self) {
        if self.driver_state == DriverState::Running {
            self.driver_state = DriverState::Stopped;
            debug!(sim_time = self.sim_time, "driver stopped");
        }
    }

    /// Force Stopped, zero the cavity state and simulated time, and reseed
    /// the noise sequence so a subsequent run reproduces a fresh instance.
    /// Control parameters are owned by the caller and are not touched.
    pub fn reset(&mut self) {
        self.driver_state = DriverState::Stopped;
        self.state.reset();
        self.sim_time = 0.0;
        self.rng = StdRng::seed_from_u64(self.params.seed);
        debug!("driver reset");
    }

    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    pub fn mode_count(&self) -> usize {
        self.mode_count
    }

    pub fn state(&self) -> &CavityState {
        &self.state
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    /// Execute one simulation step against a parameter snapshot.
    ///
    /// On integrator failure the driver transitions to Stopped and the error
    /// is returned to the caller; the cavity state keeps its last good
    /// values.
    pub fn step(&mut self, ctrl: &ControlParameters) -> SimResult<StepOutput> {
        ctrl.validate()?;
        self.buffers.set_beam_current(ctrl.beam_current_a);

        // RF signal chain
        let (s0, phase) = rf::source(
            ctrl.freq_offset_hz,
            ctrl.amplitude,
            self.state.phase_accum,
            self.coeffs.dt,
        );
        self.state.phase_accum = phase;
        let s0 = s0 * Complex64::from_polar(1.0, deg_to_rad(ctrl.phase_deg));
        let s1 = rf::modulate(s0, ctrl.pulsed, self.buffers.gate(), self.state.buf_index);
        let s2 = rf::amplify(s1, ctrl.amplifier_gain_db);

        // Microphonics: one zero-mean Gaussian detuning draw per step
        let dw_micr = self.noise.sample(&mut self.rng);

        // Beam loading
        let vb = if ctrl.pulsed {
            -self.coeffs.rl * self.buffers.beam_at(self.state.buf_index)
        } else {
            Complex64::new(-self.coeffs.rl * ctrl.beam_current_a, 0.0)
        };

        let out = match cavity_step(
            &self.coeffs,
            self.state.detuning,
            dw_micr,
            s2,
            vb,
            self.state.voltage,
            &self.mech,
            &self.state.mech_state,
        ) {
            Ok(out) => out,
            Err(e) => {
                self.driver_state = DriverState::Stopped;
                warn!(error = %e, sim_time = self.sim_time, "integrator failure, driver stopped");
                return Err(e);
            }
        };

        assert_eq!(
            out.mech_state.len(),
            2 * self.mode_count,
            "mechanical state dimension does not match mode count"
        );
        let mode_values: Vec<f64> = (0..self.mode_count)
            .map(|i| out.mech_state[2 * i])
            .collect();

        self.state.voltage = out.vc;
        self.state.detuning = out.detuning;
        self.state.mech_state = out.mech_state;
        if ctrl.pulsed {
            self.state.buf_index = (self.state.buf_index + 1) % self.buffers.pulse_len();
        }

        let sample = Sample {
            t: self.sim_time,
            vc: out.vc,
            vr: out.vr,
            detuning: out.detuning,
        };
        self.sim_time += self.coeffs.dt;

        Ok(StepOutput {
            sample,
            mode_values,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_params() -> EngineParams {
        EngineParams {
            microphonics_sigma: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn start_is_idempotent_and_stop_observes() {
        let modes = MechanicalModeSet::default_table();
        let mut engine = SimEngine::new(quiet_params(), &modes).unwrap();
        assert_eq!(engine.driver_state(), DriverState::Stopped);
        engine.start();
        engine.start();
        assert!(engine.is_running());
        engine.stop();
        assert_eq!(engine.driver_state(), DriverState::Stopped);
    }

    #[test]
    fn reset_zeroes_state_and_time() {
        let modes = MechanicalModeSet::default_table();
        let mut engine = SimEngine::new(quiet_params(), &modes).unwrap();
        let ctrl = ControlParameters::default();
        engine.start();
        for _ in 0..50 {
            engine.step(&ctrl).unwrap();
        }
        assert!(engine.sim_time() > 0.0);
        engine.reset();
        assert_eq!(engine.driver_state(), DriverState::Stopped);
        assert_eq!(engine.sim_time(), 0.0);
        assert_eq!(engine.state().voltage, Complex64::ZERO);
        assert_eq!(engine.state().phase_accum, 0.0);
        assert_eq!(engine.state().buf_index, 0);
    }

    #[test]
    fn pulsed_buffer_index_wraps() {
        let modes = MechanicalModeSet::default_table();
        let params = EngineParams {
            buf_size: 32,
            t_fill: 4,
            t_flat: 16,
            pulse_len: 8,
            microphonics_sigma: 0.0,
            ..Default::default()
        };
        let mut engine = SimEngine::new(params, &modes).unwrap();
        let ctrl = ControlParameters {
            pulsed: true,
            ..Default::default()
        };
        for _ in 0..20 {
            engine.step(&ctrl).unwrap();
            assert!(engine.state().buf_index < 8);
        }
    }

    #[test]
    fn pulse_period_longer_than_buffer_reads_clamp() {
        let modes = MechanicalModeSet::default_table();
        let params = EngineParams {
            buf_size: 32,
            t_fill: 4,
            t_flat: 16,
            pulse_len: 64,
            microphonics_sigma: 0.0,
            ..Default::default()
        };
        let mut engine = SimEngine::new(params, &modes).unwrap();
        let ctrl = ControlParameters {
            pulsed: true,
            ..Default::default()
        };
        // indices 32..63 read past the buffer end and must clamp, not panic
        for _ in 0..100 {
            engine.step(&ctrl).unwrap();
        }
    }

    #[test]
    fn invalid_control_parameters_rejected() {
        let modes = MechanicalModeSet::default_table();
        let mut engine = SimEngine::new(quiet_params(), &modes).unwrap();
        let ctrl = ControlParameters {
            beam_current_a: -1.0,
            ..Default::default()
        };
        assert!(engine.step(&ctrl).is_err());
    }
}
