//! Mechanical mode definitions.

use crate::{MechError, MechResult};
use serde::{Deserialize, Serialize};

/// One mechanical resonance coupling cavity deformation to detuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MechanicalMode {
    /// Resonance frequency (Hz).
    pub freq_hz: f64,
    /// Quality factor.
    pub quality: f64,
    /// Coupling strength (Hz of detuning per MV^2 of stored field).
    pub coupling: f64,
}

/// Ordered set of mechanical modes, fixed at initialization.
///
/// Defines the dimensionality of the mechanical state vector (two states per
/// mode) and the state-space model derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MechanicalModeSet {
    modes: Vec<MechanicalMode>,
}

impl MechanicalModeSet {
    pub fn new(modes: Vec<MechanicalMode>) -> MechResult<Self> {
        if modes.is_empty() {
            return Err(MechError::InvalidModeSet {
                what: "mode list must not be empty",
            });
        }
        for mode in &modes {
            if !(mode.freq_hz > 0.0) {
                return Err(MechError::InvalidModeSet {
                    what: "mode frequency must be positive",
                });
            }
            if !(mode.quality > 0.0) {
                return Err(MechError::InvalidModeSet {
                    what: "mode quality factor must be positive",
                });
            }
            if !mode.coupling.is_finite() {
                return Err(MechError::InvalidModeSet {
                    what: "mode coupling must be finite",
                });
            }
        }
        Ok(Self { modes })
    }

    /// Build from parallel frequency/quality/coupling tables.
    pub fn from_tables(freq_hz: &[f64], quality: &[f64], coupling: &[f64]) -> MechResult<Self> {
        if freq_hz.len() != quality.len() || freq_hz.len() != coupling.len() {
            return Err(MechError::InvalidModeSet {
                what: "frequency/quality/coupling tables must have equal length",
            });
        }
        let modes = freq_hz
            .iter()
            .zip(quality)
            .zip(coupling)
            .map(|((&f, &q), &k)| MechanicalMode {
                freq_hz: f,
                quality: q,
                coupling: k,
            })
            .collect();
        Self::new(modes)
    }

    /// The five-mode table of the TESLA-style cavity this simulator models.
    pub fn default_table() -> Self {
        Self::from_tables(
            &[280.0, 341.0, 460.0, 487.0, 618.0],
            &[40.0, 20.0, 50.0, 80.0, 100.0],
            &[2.0, 0.8, 2.0, 0.6, 0.2],
        )
        .expect("default mode table is valid")
    }

    pub fn len(&self) -> usize {
        self.modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }

    pub fn modes(&self) -> &[MechanicalMode] {
        &self.modes
    }

    pub fn iter(&self) -> impl Iterator<Item = &MechanicalMode> {
        self.modes.iter()
    }
}
