use crate::CavError;
use num_complex::Complex64;

/// Floating point type used throughout the system
pub type Real = f64;

/// One tolerance for everything
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CavError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CavError::NonFinite { what, value: v })
    }
}

pub fn ensure_finite_complex(v: Complex64, what: &'static str) -> Result<Complex64, CavError> {
    if v.re.is_finite() && v.im.is_finite() {
        Ok(v)
    } else {
        Err(CavError::NonFinite {
            what,
            value: v.norm_sqr(),
        })
    }
}
