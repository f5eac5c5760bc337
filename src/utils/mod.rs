/////////////////////////////////////////////////////////////////////////////////////////////\
//
// Numeric helpers shared by proposals, models and posterior summaries.
//
// Created on: 19 Oct 2026
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Utilities
//!
//! Numeric helpers shared by the proposal kernels, the speciation model, and
//! the chain summaries.

use num_traits::ToPrimitive;

/// Log ratios below this value exponentiate to exactly zero.
pub const SAFE_EXP_FLOOR: f64 = -300.0;

/// Exponentiate a log acceptance ratio without overflow.
///
/// Positive inputs are clamped to `1.0`, so any proposal that improves the
/// target is accepted unconditionally. Inputs below [`SAFE_EXP_FLOOR`] and
/// `NaN` map to `0.0`.
#[must_use]
pub fn safe_exp(log_value: f64) -> f64 {
    if log_value.is_nan() || log_value < SAFE_EXP_FLOOR {
        0.0
    } else if log_value > 0.0 {
        1.0
    } else {
        log_value.exp()
    }
}

#[must_use]
pub fn usize_to_f64(value: usize) -> f64 {
    f64::from(u32::try_from(value).unwrap_or(u32::MAX))
}

/// Linear-interpolated percentile of an already sorted slice.
#[must_use]
pub fn percentile(sorted_values: &[f64], probability: f64) -> f64 {
    if sorted_values.is_empty() {
        return f64::NAN;
    }

    let clamped = probability.clamp(0.0, 1.0);
    let last = sorted_values.len() - 1;
    let position = clamped * usize_to_f64(last);
    let lower = position.floor().to_usize().unwrap_or(0);
    let upper = position.ceil().to_usize().unwrap_or(last);

    if lower == upper {
        sorted_values[lower]
    } else {
        let weight = position - usize_to_f64(lower);
        (1.0 - weight).mul_add(sorted_values[lower], weight * sorted_values[upper])
    }
}
