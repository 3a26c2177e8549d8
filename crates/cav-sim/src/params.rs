//! Foreground-controlled drive parameters.

use crate::error::{SimError, SimResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Drive parameters mutated by the foreground at any time and snapshotted
/// by the driver once per step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlParameters {
    /// RF source amplitude (arbitrary units, >= 0).
    pub amplitude: f64,
    /// Static drive phase offset (degrees).
    pub phase_deg: f64,
    /// Source frequency offset from the cavity nominal (Hz).
    pub freq_offset_hz: f64,
    /// Beam current (A, >= 0).
    pub beam_current_a: f64,
    /// Pulsed drive (gated by the baseband buffer) vs. continuous wave.
    pub pulsed: bool,
    /// Amplifier voltage gain (dB).
    pub amplifier_gain_db: f64,
}

impl Default for ControlParameters {
    fn default() -> Self {
        Self {
            amplitude: 1.0,
            phase_deg: 0.0,
            freq_offset_hz: -460.0,
            beam_current_a: 0.008,
            pulsed: false,
            amplifier_gain_db: 20.0 * 12e6_f64.log10(),
        }
    }
}

impl ControlParameters {
    pub fn validate(&self) -> SimResult<()> {
        if !(self.amplitude >= 0.0) {
            return Err(SimError::InvalidArg {
                what: "amplitude must be non-negative",
            });
        }
        if !(self.beam_current_a >= 0.0) {
            return Err(SimError::InvalidArg {
                what: "beam current must be non-negative",
            });
        }
        if !self.phase_deg.is_finite()
            || !self.freq_offset_hz.is_finite()
            || !self.amplifier_gain_db.is_finite()
        {
            return Err(SimError::InvalidArg {
                what: "control parameters must be finite",
            });
        }
        Ok(())
    }
}

/// A control parameter that can be swept by the scan controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanParameter {
    Amplitude,
    PhaseDeg,
    FreqOffsetHz,
    BeamCurrentA,
    AmplifierGainDb,
}

impl ScanParameter {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanParameter::Amplitude => "amplitude",
            ScanParameter::PhaseDeg => "phase_deg",
            ScanParameter::FreqOffsetHz => "freq_offset_hz",
            ScanParameter::BeamCurrentA => "beam_current_a",
            ScanParameter::AmplifierGainDb => "amplifier_gain_db",
        }
    }

    /// Write `value` into the named field.
    pub fn apply(&self, params: &mut ControlParameters, value: f64) {
        match self {
            ScanParameter::Amplitude => params.amplitude = value,
            ScanParameter::PhaseDeg => params.phase_deg = value,
            ScanParameter::FreqOffsetHz => params.freq_offset_hz = value,
            ScanParameter::BeamCurrentA => params.beam_current_a = value,
            ScanParameter::AmplifierGainDb => params.amplifier_gain_db = value,
        }
    }

    /// Read the named field.
    pub fn get(&self, params: &ControlParameters) -> f64 {
        match self {
            ScanParameter::Amplitude => params.amplitude,
            ScanParameter::PhaseDeg => params.phase_deg,
            ScanParameter::FreqOffsetHz => params.freq_offset_hz,
            ScanParameter::BeamCurrentA => params.beam_current_a,
            ScanParameter::AmplifierGainDb => params.amplifier_gain_db,
        }
    }
}

impl fmt::Display for ScanParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanParameter {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "amplitude" | "amp" => Ok(ScanParameter::Amplitude),
            "phase" | "phase_deg" => Ok(ScanParameter::PhaseDeg),
            "freq_offset" | "freq_offset_hz" | "fsrc" => Ok(ScanParameter::FreqOffsetHz),
            "beam_current" | "beam_current_a" | "ib" => Ok(ScanParameter::BeamCurrentA),
            "gain" | "amplifier_gain_db" => Ok(ScanParameter::AmplifierGainDb),
            _ => Err(SimError::InvalidArg {
                what: "unknown scan parameter name",
            }),
        }
    }
}
