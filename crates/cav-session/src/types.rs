//! Session data types.

use crate::{SessionError, SessionResult};
use cav_history::{HistorySnapshot, HistoryStore, Sample};
use cav_mech::MechanicalModeSet;
use cav_sim::ControlParameters;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Capture metadata stored alongside the channel data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMeta {
    /// RFC 3339 capture timestamp.
    pub timestamp: String,
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
    pub modes: MechanicalModeSet,
}

impl SessionMeta {
    /// Metadata stamped with the current wall-clock time.
    pub fn now(dt: f64, f0_hz: f64, ql: f64, roq: f64, beta: f64, modes: MechanicalModeSet) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            dt,
            f0_hz,
            ql,
            roq,
            beta,
            modes,
        }
    }
}

/// A recorded session: metadata plus equal-length channels.
///
/// The tabular (CSV) encoding carries no metadata block, so `meta` is absent
/// on sessions loaded from CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub meta: Option<SessionMeta>,
    pub time_s: Vec<f64>,
    pub vc_re: Vec<f64>,
    pub vc_im: Vec<f64>,
    pub vr_re: Vec<f64>,
    pub vr_im: Vec<f64>,
    /// Total detuning (rad/s).
    pub detuning: Vec<f64>,
    /// One channel per mechanical mode.
    pub mode_channels: Vec<Vec<f64>>,
    /// Parameter snapshots captured while recording was enabled.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recorded_params: Vec<ControlParameters>,
}

impl SessionData {
    /// Build a session from a history snapshot.
    pub fn from_snapshot(
        meta: Option<SessionMeta>,
        snapshot: &HistorySnapshot<ControlParameters>,
    ) -> Self {
        Self {
            meta,
            time_s: snapshot.samples.iter().map(|s| s.t).collect(),
            vc_re: snapshot.samples.iter().map(|s| s.vc.re).collect(),
            vc_im: snapshot.samples.iter().map(|s| s.vc.im).collect(),
            vr_re: snapshot.samples.iter().map(|s| s.vr.re).collect(),
            vr_im: snapshot.samples.iter().map(|s| s.vr.im).collect(),
            detuning: snapshot.samples.iter().map(|s| s.detuning).collect(),
            mode_channels: snapshot.modes.clone(),
            recorded_params: snapshot.params.clone(),
        }
    }

    /// Number of rows (samples).
    pub fn len(&self) -> usize {
        self.time_s.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time_s.is_empty()
    }

    pub fn mode_count(&self) -> usize {
        self.mode_channels.len()
    }

    /// Verify every channel has the same length.
    pub fn check_channels(&self) -> SessionResult<()> {
        let n = self.time_s.len();
        let scalar_channels = [
            ("vc_re", self.vc_re.len()),
            ("vc_im", self.vc_im.len()),
            ("vr_re", self.vr_re.len()),
            ("vr_im", self.vr_im.len()),
            ("detuning", self.detuning.len()),
        ];
        for (name, len) in scalar_channels {
            if len != n {
                return Err(SessionError::Malformed {
                    what: format!("channel {name} has {len} rows, expected {n}"),
                });
            }
        }
        for (i, channel) in self.mode_channels.iter().enumerate() {
            if channel.len() != n {
                return Err(SessionError::Malformed {
                    what: format!(
                        "mode channel {i} has {} rows, expected {n}",
                        channel.len()
                    ),
                });
            }
        }
        if self.recorded_params.len() > n {
            return Err(SessionError::Malformed {
                what: "recorded parameter channel longer than sample channel".to_string(),
            });
        }
        Ok(())
    }

    /// Rebuild a history store for playback over this session.
    ///
    /// Recorded parameter snapshots stay in the session; playback reads only
    /// the sample channels. If the session is longer than `capacity`, the
    /// ring keeps the most recent rows.
    pub fn to_store(&self, capacity: usize) -> SessionResult<HistoryStore<ControlParameters>> {
        self.check_channels()?;
        let mut store = HistoryStore::new(self.mode_count(), capacity).map_err(|e| {
            SessionError::Malformed {
                what: e.to_string(),
            }
        })?;
        let mut mode_values = vec![0.0; self.mode_count()];
        for row in 0..self.len() {
            let sample = Sample {
                t: self.time_s[row],
                vc: Complex64::new(self.vc_re[row], self.vc_im[row]),
                vr: Complex64::new(self.vr_re[row], self.vr_im[row]),
                detuning: self.detuning[row],
            };
            for (value, channel) in mode_values.iter_mut().zip(&self.mode_channels) {
                *value = channel[row];
            }
            store.append(sample, &mode_values, None);
        }
        Ok(store)
    }
}
