//! Translate configuration into engine runtime types.

use crate::error::AppResult;
use cav_config::{SimConfig, validate_config};
use cav_mech::MechanicalModeSet;
use cav_sim::EngineParams;

/// Runtime inputs derived once from a validated configuration.
#[derive(Debug, Clone)]
pub struct Runtime {
    pub engine_params: EngineParams,
    pub modes: MechanicalModeSet,
    pub history_capacity: usize,
    pub slowdown: f64,
}

pub fn compile_config(config: &SimConfig) -> AppResult<Runtime> {
    validate_config(config)?;

    let freq: Vec<f64> = config.modes.iter().map(|m| m.freq_hz).collect();
    let quality: Vec<f64> = config.modes.iter().map(|m| m.quality).collect();
    let coupling: Vec<f64> = config.modes.iter().map(|m| m.coupling).collect();
    let modes = MechanicalModeSet::from_tables(&freq, &quality, &coupling)?;

    let engine_params = EngineParams {
        dt: config.dt,
        f0_hz: config.f0_hz,
        ql: config.ql,
        roq: config.roq,
        beta: config.beta,
        buf_size: config.buf_size,
        t_fill: config.t_fill,
        t_flat: config.t_flat,
        pulse_len: config.pulse_len,
        microphonics_sigma: config.microphonics_sigma,
        seed: config.seed,
    };

    Ok(Runtime {
        engine_params,
        modes,
        history_capacity: config.history_capacity,
        slowdown: config.slowdown,
    })
}
