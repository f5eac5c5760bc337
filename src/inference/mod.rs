//! Reusable inference and MCMC utility types.

pub mod proposals;
pub mod random;

use thiserror::Error;

use crate::utils::{safe_exp, usize_to_f64};

pub use proposals::{Bounds, ScaleDraw, scale_move, window_move};
pub use random::RandomSource;

/// Errors for generic MCMC configuration.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum InferenceError {
    #[error("iterations must be positive")]
    InvalidIterations,
    #[error("burn-in ({burn_in}) must be smaller than iterations ({iterations})")]
    InvalidBurnIn { burn_in: usize, iterations: usize },
    #[error("thinning interval must be positive")]
    InvalidThinning,
    #[error("proposal bounds must be finite with min < max; found [{min}, {max}]")]
    InvalidBounds { min: f64, max: f64 },
}

/// Generic MCMC schedule.
#[derive(Debug, Clone, Copy)]
pub struct McmcConfig {
    pub iterations: usize,
    pub burn_in: usize,
    pub thin: usize,
    pub seed: u64,
}

impl Default for McmcConfig {
    fn default() -> Self {
        Self {
            iterations: 4_000,
            burn_in: 1_000,
            thin: 4,
            seed: 42,
        }
    }
}

impl McmcConfig {
    /// # Errors
    ///
    /// Returns `InferenceError` if schedule values are invalid.
    pub const fn validate(self) -> Result<(), InferenceError> {
        if self.iterations == 0 {
            return Err(InferenceError::InvalidIterations);
        }
        if self.burn_in >= self.iterations {
            return Err(InferenceError::InvalidBurnIn {
                burn_in: self.burn_in,
                iterations: self.iterations,
            });
        }
        if self.thin == 0 {
            return Err(InferenceError::InvalidThinning);
        }
        Ok(())
    }

    /// Number of retained draws implied by this configuration.
    #[must_use]
    pub const fn retained_draws(self) -> usize {
        (self.iterations - self.burn_in).div_ceil(self.thin)
    }

    /// Whether iteration `iter` (zero-based) is kept in the trace.
    #[must_use]
    pub const fn retains(self, iter: usize) -> bool {
        iter >= self.burn_in && (iter - self.burn_in).is_multiple_of(self.thin)
    }
}

/// Proposal counters for a single Metropolis-Hastings block.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProposalStats {
    pub proposed: usize,
    pub accepted: usize,
}

impl ProposalStats {
    /// Record one proposal and whether it was accepted.
    pub const fn record(&mut self, accepted: bool) {
        self.proposed += 1;
        if accepted {
            self.accepted += 1;
        }
    }

    /// Fold another block's counters into this one.
    pub const fn merge(&mut self, other: Self) {
        self.proposed += other.proposed;
        self.accepted += other.accepted;
    }

    /// Acceptance rate in `[0, 1]`, or `0` if no proposals were made.
    #[must_use]
    pub fn acceptance_rate(self) -> f64 {
        if self.proposed == 0 {
            0.0
        } else {
            usize_to_f64(self.accepted) / usize_to_f64(self.proposed)
        }
    }
}

/// Metropolis-Hastings test on a log acceptance ratio.
///
/// Always consumes exactly one uniform draw, so chains that share a random
/// stream stay aligned whether or not the ratio is positive.
pub fn should_accept<R: RandomSource + ?Sized>(log_ratio: f64, rng: &mut R) -> bool {
    rng.uniform() < safe_exp(log_ratio)
}
