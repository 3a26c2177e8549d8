//! Configuration schema.

use serde::{Deserialize, Serialize};

/// One mechanical mode entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModeDef {
    /// Resonance frequency (Hz).
    pub freq_hz: f64,
    /// Quality factor.
    pub quality: f64,
    /// Coupling strength (Hz of detuning per MV^2).
    pub coupling: f64,
}

/// Complete simulator configuration.
///
/// Defaults reproduce the 1.3 GHz, QL = 3e6 cavity the simulator was built
/// around, with a 1 us timestep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
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
    /// Pulse period (samples).
    pub pulse_len: usize,
    /// Microphonics detuning noise standard deviation (rad/s).
    pub microphonics_sigma: f64,
    /// RNG seed for the noise sequence.
    pub seed: u64,
    /// History store capacity (samples).
    pub history_capacity: usize,
    /// Wall-clock slowdown of the live loop: the worker sleeps
    /// `dt * slowdown` per step to keep a human-observable pace.
    pub slowdown: f64,
    /// Mechanical mode table.
    pub modes: Vec<ModeDef>,
}

impl Default for SimConfig {
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
            microphonics_sigma: 2.0 * std::f64::consts::PI * 10.0,
            seed: 0,
            history_capacity: 10_000,
            slowdown: 100.0,
            modes: vec![
                ModeDef {
                    freq_hz: 280.0,
                    quality: 40.0,
                    coupling: 2.0,
                },
                ModeDef {
                    freq_hz: 341.0,
                    quality: 20.0,
                    coupling: 0.8,
                },
                ModeDef {
                    freq_hz: 460.0,
                    quality: 50.0,
                    coupling: 2.0,
                },
                ModeDef {
                    freq_hz: 487.0,
                    quality: 80.0,
                    coupling: 0.6,
                },
                ModeDef {
                    freq_hz: 618.0,
                    quality: 100.0,
                    coupling: 0.2,
                },
            ],
        }
    }
}
