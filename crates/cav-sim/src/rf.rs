//! RF chain stages and pulsed-mode waveform buffers.
//!
//! Each stage is a pure function of one complex baseband sample and the
//! current control values, composable into the per-step pipeline.

use crate::error::{SimError, SimResult};
use cav_core::db_to_linear;
use num_complex::Complex64;
use std::f64::consts::PI;

/// CW gate value: unity pass-through in steady operation.
const GATE_CW: f64 = 1.0;

/// Source oscillator: advance the phase accumulator by `2*pi*f*dt` and emit
/// `amplitude * exp(i * phase)`.
///
/// The phase is accumulated monotonically rather than recomputed from
/// `2*pi*f*t`; the product form cancels catastrophically once `t` reaches
/// millions of steps.
pub fn source(
    freq_offset_hz: f64,
    amplitude: f64,
    phase_accum: f64,
    dt: f64,
) -> (Complex64, f64) {
    let phase = phase_accum + 2.0 * PI * freq_offset_hz * dt;
    (Complex64::from_polar(amplitude, phase), phase)
}

/// I/Q modulator: gate the sample with the baseband envelope in pulsed mode,
/// or pass through the CW gate value.
///
/// An out-of-range index clamps to the last element (the inter-pulse gap).
pub fn modulate(
    sample: Complex64,
    pulsed: bool,
    gate: &[Complex64],
    buf_index: usize,
) -> Complex64 {
    if pulsed {
        let idx = buf_index.min(gate.len() - 1);
        sample * gate[idx]
    } else {
        sample * GATE_CW
    }
}

/// Ideal linear amplifier: multiply by `10^(gain_db/20)`.
///
/// No saturation is modeled; the amplifier is a deliberate linear
/// simplification of the klystron/SSA chain.
pub fn amplify(sample: Complex64, gain_db: f64) -> Complex64 {
    sample * db_to_linear(gain_db)
}

/// Precomputed circular envelope buffers for pulsed operation.
///
/// The gate envelope is 1.0 during fill+flat-top and zero after; the beam
/// envelope carries the beam current during the flat-top window. The pulse
/// period may exceed the buffer length, in which case reads during the tail
/// clamp to the final (zero) element.
#[derive(Debug, Clone)]
pub struct WaveformBuffers {
    beam: Vec<Complex64>,
    gate: Vec<Complex64>,
    pulse_len: usize,
    t_fill: usize,
    t_flat: usize,
    beam_current: f64,
}

impl WaveformBuffers {
    pub fn new(
        buf_size: usize,
        t_fill: usize,
        t_flat: usize,
        pulse_len: usize,
        beam_current: f64,
    ) -> SimResult<Self> {
        if buf_size == 0 {
            return Err(SimError::InvalidArg {
                what: "buffer size must be positive",
            });
        }
        if t_fill >= t_flat {
            return Err(SimError::InvalidArg {
                what: "fill time must precede flat-top end",
            });
        }
        if t_flat > buf_size {
            return Err(SimError::InvalidArg {
                what: "flat-top end must fit in the buffer",
            });
        }
        if pulse_len == 0 {
            return Err(SimError::InvalidArg {
                what: "pulse period must be positive",
            });
        }

        let mut gate = vec![Complex64::ZERO; buf_size];
        for g in gate.iter_mut().take(t_flat) {
            *g = Complex64::new(1.0, 0.0);
        }

        let mut buffers = Self {
            beam: vec![Complex64::ZERO; buf_size],
            gate,
            pulse_len,
            t_fill,
            t_flat,
            beam_current: f64::NAN,
        };
        buffers.set_beam_current(beam_current);
        Ok(buffers)
    }

    /// Rewrite the beam flat-top when the beam current changes.
    pub fn set_beam_current(&mut self, beam_current: f64) {
        if beam_current == self.beam_current {
            return;
        }
        for b in &mut self.beam[self.t_fill..self.t_flat] {
            *b = Complex64::new(beam_current, 0.0);
        }
        self.beam_current = beam_current;
    }

    pub fn beam_current(&self) -> f64 {
        self.beam_current
    }

    pub fn gate(&self) -> &[Complex64] {
        &self.gate
    }

    /// Beam envelope read with clamp-to-last semantics.
    pub fn beam_at(&self, buf_index: usize) -> Complex64 {
        self.beam[buf_index.min(self.beam.len() - 1)]
    }

    pub fn pulse_len(&self) -> usize {
        self.pulse_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cav_core::{Tolerances, nearly_equal};

    #[test]
    fn source_accumulates_phase() {
        let dt = 1e-6;
        let (s1, p1) = source(-460.0, 1.0, 0.0, dt);
        assert!(nearly_equal(
            p1,
            -2.0 * PI * 460.0 * dt,
            Tolerances::default()
        ));
        assert!(nearly_equal(s1.norm(), 1.0, Tolerances::default()));

        let (_, p2) = source(-460.0, 1.0, p1, dt);
        assert!(nearly_equal(p2, 2.0 * p1, Tolerances::default()));
    }

    #[test]
    fn cw_gate_is_unity() {
        let s = Complex64::new(0.3, -0.4);
        assert_eq!(modulate(s, false, &[Complex64::ZERO], 0), s);
    }

    #[test]
    fn pulsed_gate_clamps_out_of_range_index() {
        let gate = [Complex64::new(1.0, 0.0), Complex64::new(0.25, 0.0)];
        let s = Complex64::new(1.0, 0.0);
        assert_eq!(modulate(s, true, &gate, 100), s * gate[1]);
    }

    #[test]
    fn amplify_is_db_voltage_gain() {
        let s = Complex64::new(1.0, 1.0);
        let out = amplify(s, 20.0);
        assert!(nearly_equal(out.re, 10.0, Tolerances::default()));
        assert!(nearly_equal(out.im, 10.0, Tolerances::default()));
    }

    #[test]
    fn buffers_shape_envelopes() {
        let b = WaveformBuffers::new(16, 4, 12, 20, 0.008).unwrap();
        assert_eq!(b.gate()[0], Complex64::new(1.0, 0.0));
        assert_eq!(b.gate()[11], Complex64::new(1.0, 0.0));
        assert_eq!(b.gate()[12], Complex64::ZERO);
        assert_eq!(b.beam_at(3), Complex64::ZERO);
        assert_eq!(b.beam_at(4), Complex64::new(0.008, 0.0));
        assert_eq!(b.beam_at(11), Complex64::new(0.008, 0.0));
        // reads past the buffer clamp to the final zero element
        assert_eq!(b.beam_at(500), Complex64::ZERO);
    }

    #[test]
    fn beam_rewrite_on_current_change() {
        let mut b = WaveformBuffers::new(16, 4, 12, 20, 0.008).unwrap();
        b.set_beam_current(0.016);
        assert_eq!(b.beam_at(8), Complex64::new(0.016, 0.0));
        assert_eq!(b.beam_current(), 0.016);
    }

    #[test]
    fn invalid_windows_rejected() {
        assert!(WaveformBuffers::new(0, 0, 1, 1, 0.0).is_err());
        assert!(WaveformBuffers::new(16, 12, 12, 1, 0.0).is_err());
        assert!(WaveformBuffers::new(16, 4, 17, 1, 0.0).is_err());
        assert!(WaveformBuffers::new(16, 4, 12, 0, 0.0).is_err());
    }
}
