//! Contract shared by every sampled model parameter.

use crate::inference::RandomSource;
use crate::models::context::ModelContext;

/// A parameter updated by Metropolis-Hastings inside a larger sampler.
pub trait Parameter {
    /// Short identifier used in output headers.
    fn name(&self) -> &str;

    /// Run one update.
    ///
    /// Returns the log Metropolis-Hastings ratio the caller still has to
    /// test. Parameters that resolve their own moves return `0.0`.
    #[must_use]
    fn update<C, R>(&mut self, context: &mut C, rng: &mut R, current_log_likelihood: f64) -> f64
    where
        C: ModelContext + ?Sized,
        R: RandomSource + ?Sized;

    /// Log prior density of the current value.
    fn log_prior(&self) -> f64;

    /// One line for the parameter log; empty when there is nothing to report.
    fn write_param(&self) -> String;
}
