//! Fixed-capacity history of simulation samples.
//!
//! All channels move together: appending at capacity evicts index 0 from
//! every channel in the same call, so consumers always observe equal-length
//! channels. The parameter channel is populated only while recording is
//! enabled and is bounded by the same capacity.

use cav_core::{CavError, CavResult, rad_s_to_hz, rad_to_deg};
use num_complex::Complex64;
use std::collections::VecDeque;

/// One step's canonical output record.
///
/// Derived quantities (magnitude, phase, Hz detuning) are computed on
/// demand, not stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Simulated time (seconds).
    pub t: f64,
    /// Cavity voltage (V, complex baseband).
    pub vc: Complex64,
    /// Reflected voltage (V, complex baseband).
    pub vr: Complex64,
    /// Total detuning (rad/s).
    pub detuning: f64,
}

impl Sample {
    pub fn vc_magnitude(&self) -> f64 {
        self.vc.norm()
    }

    pub fn vc_phase_deg(&self) -> f64 {
        rad_to_deg(self.vc.arg())
    }

    pub fn vr_magnitude(&self) -> f64 {
        self.vr.norm()
    }

    pub fn detuning_hz(&self) -> f64 {
        rad_s_to_hz(self.detuning)
    }
}

/// Owned copy of the store contents at one observation point.
#[derive(Debug, Clone)]
pub struct HistorySnapshot<P> {
    pub samples: Vec<Sample>,
    /// One channel per mechanical mode, aligned with `samples`.
    pub modes: Vec<Vec<f64>>,
    /// Parameter snapshots captured while recording was enabled.
    pub params: Vec<P>,
}

/// Bounded multi-channel time series with ring-buffer eviction.
#[derive(Debug, Clone)]
pub struct HistoryStore<P> {
    capacity: usize,
    samples: VecDeque<Sample>,
    modes: Vec<VecDeque<f64>>,
    params: VecDeque<P>,
}

impl<P: Clone> HistoryStore<P> {
    pub fn new(mode_count: usize, capacity: usize) -> CavResult<Self> {
        if capacity == 0 {
            return Err(CavError::InvalidArg {
                what: "history capacity must be positive",
            });
        }
        Ok(Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
            modes: vec![VecDeque::with_capacity(capacity); mode_count],
            params: VecDeque::new(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn mode_count(&self) -> usize {
        self.modes.len()
    }

    pub fn recorded_params_len(&self) -> usize {
        self.params.len()
    }

    /// Append one step's output, evicting the oldest entry from every
    /// channel first when at capacity.
    ///
    /// `mode_values` must match the mode count the store was created with;
    /// a mismatch is a programming error, not a recoverable per-sample
    /// condition.
    pub fn append(&mut self, sample: Sample, mode_values: &[f64], params: Option<&P>) {
        assert_eq!(
            mode_values.len(),
            self.modes.len(),
            "mode value count does not match store mode count"
        );

        if self.samples.len() == self.capacity {
            self.samples.pop_front();
            for channel in &mut self.modes {
                channel.pop_front();
            }
            if !self.params.is_empty() {
                self.params.pop_front();
            }
        }

        self.samples.push_back(sample);
        for (channel, &value) in self.modes.iter_mut().zip(mode_values) {
            channel.push_back(value);
        }
        if let Some(p) = params {
            self.params.push_back(p.clone());
        }
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        for channel in &mut self.modes {
            channel.clear();
        }
        self.params.clear();
    }

    pub fn sample_at(&self, index: usize) -> Option<Sample> {
        self.samples.get(index).copied()
    }

    pub fn latest(&self) -> Option<Sample> {
        self.samples.back().copied()
    }

    /// Owned copy of every channel.
    pub fn snapshot(&self) -> HistorySnapshot<P> {
        HistorySnapshot {
            samples: self.samples.iter().copied().collect(),
            modes: self
                .modes
                .iter()
                .map(|c| c.iter().copied().collect())
                .collect(),
            params: self.params.iter().cloned().collect(),
        }
    }

    /// Defensive consistency check: every mode channel aligned with the
    /// sample channel, nothing past capacity. Violations indicate a bug in
    /// `append`.
    pub fn check_aligned(&self) -> CavResult<()> {
        if self.samples.len() > self.capacity {
            return Err(CavError::Invariant {
                what: "history exceeded capacity",
            });
        }
        for channel in &self.modes {
            if channel.len() != self.samples.len() {
                return Err(CavError::Invariant {
                    what: "mode channel length differs from sample channel",
                });
            }
        }
        if self.params.len() > self.samples.len() {
            return Err(CavError::Invariant {
                what: "parameter channel longer than sample channel",
            });
        }
        Ok(())
    }
}
