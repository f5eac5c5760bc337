/////////////////////////////////////////////////////////////////////////////////////////////\
//
// Gamma shape parameter for discrete among-site rate variation.
//
// Created on: 19 Oct 2026
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Gamma shape of among-site rate variation.
//!
//! The shape `alpha` defines `num_categories` discrete-gamma rate classes,
//! each the mean of its equal-probability slice of a `Gamma(alpha, alpha)`
//! density. It carries an exponential prior and is updated with the same
//! scale move as net diversification.

use std::fmt;

use statrs::distribution::{ContinuousCDF, Gamma};
use statrs::function::gamma::gamma_lr;
use thiserror::Error;

use crate::inference::{Bounds, InferenceError, RandomSource, scale_move};
use crate::models::context::ModelContext;
use crate::models::parameter::Parameter;
use crate::utils::usize_to_f64;

/// Identifier the shape parameter reports itself under.
pub const SHAPE_PARAMETER_NAME: &str = "SH";

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum ShapeError {
    #[error("gamma shape must be finite and > 0; found {0}")]
    InvalidShape(f64),
    #[error("at least one rate category is required")]
    NoCategories,
    #[error("exponential prior rate must be finite and > 0; found {0}")]
    InvalidPriorRate(f64),
    #[error("scale-move tuning must be finite and > 0; found {0}")]
    InvalidTuning(f64),
    #[error(transparent)]
    Inference(#[from] InferenceError),
}

/// Settings for [`GammaShape`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeConfig {
    pub num_categories: usize,
    /// Rate of the exponential prior on `alpha`.
    pub prior_rate: f64,
    /// Keep `alpha` at its starting value.
    pub fixed: bool,
    /// Starting value; drawn from the prior when `None`.
    pub initial_alpha: Option<f64>,
    pub tuning: f64,
    pub bounds: Bounds,
}

impl Default for ShapeConfig {
    fn default() -> Self {
        Self {
            num_categories: 4,
            prior_rate: 2.0,
            fixed: false,
            initial_alpha: None,
            tuning: std::f64::consts::LN_2,
            bounds: Bounds::unchecked(0.0001, 300.0),
        }
    }
}

impl ShapeConfig {
    /// # Errors
    ///
    /// Returns `ShapeError` for an empty category set, a non-positive prior
    /// rate or tuning, or bounds that admit non-positive shapes.
    pub fn validate(&self) -> Result<(), ShapeError> {
        if self.num_categories == 0 {
            return Err(ShapeError::NoCategories);
        }
        if !(self.prior_rate.is_finite() && self.prior_rate > 0.0) {
            return Err(ShapeError::InvalidPriorRate(self.prior_rate));
        }
        if !(self.tuning.is_finite() && self.tuning > 0.0) {
            return Err(ShapeError::InvalidTuning(self.tuning));
        }
        Bounds::new(self.bounds.min(), self.bounds.max())?;
        if self.bounds.min() <= 0.0 {
            return Err(ShapeError::InvalidShape(self.bounds.min()));
        }
        Ok(())
    }
}

/// Mean rate of each equal-probability category of `Gamma(alpha, alpha)`.
///
/// Category `i` spans the `(i-1)/k` to `i/k` quantiles; its mean is
/// `k * [P(alpha + 1, alpha * x_i) - P(alpha + 1, alpha * x_{i-1})]` with `P`
/// the regularized lower incomplete gamma function. The means average to one.
///
/// # Errors
///
/// Returns `ShapeError` for a non-positive shape or zero categories.
pub fn discrete_gamma_rates(alpha: f64, num_categories: usize) -> Result<Vec<f64>, ShapeError> {
    if !(alpha.is_finite() && alpha > 0.0) {
        return Err(ShapeError::InvalidShape(alpha));
    }
    if num_categories == 0 {
        return Err(ShapeError::NoCategories);
    }
    let gamma = Gamma::new(alpha, alpha).map_err(|_| ShapeError::InvalidShape(alpha))?;
    let k = usize_to_f64(num_categories);

    let mut rates = Vec::with_capacity(num_categories);
    let mut lower = 0.0;
    for i in 1..=num_categories {
        let upper = if i == num_categories {
            1.0
        } else {
            let cut = gamma.inverse_cdf(usize_to_f64(i) / k);
            gamma_lr(alpha + 1.0, cut * alpha)
        };
        rates.push((upper - lower) * k);
        lower = upper;
    }
    Ok(rates)
}

/// Alpha and its category rates, for restoring after a rejected update.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeState {
    pub alpha: f64,
    pub rates: Vec<f64>,
}

/// Gamma shape parameter with discrete rate categories.
#[derive(Debug, Clone)]
pub struct GammaShape {
    alpha: f64,
    rates: Vec<f64>,
    config: ShapeConfig,
}

impl GammaShape {
    /// # Errors
    ///
    /// Returns `ShapeError` if the configuration or the starting shape is invalid.
    pub fn new<R: RandomSource + ?Sized>(
        rng: &mut R,
        config: ShapeConfig,
    ) -> Result<Self, ShapeError> {
        config.validate()?;
        let alpha = match config.initial_alpha {
            Some(alpha) => alpha,
            // Inverse-CDF draw from Exp(prior_rate), folded into the support.
            None => config
                .bounds
                .reflect_multiplicative(-(1.0 - rng.uniform()).ln() / config.prior_rate),
        };
        let rates = discrete_gamma_rates(alpha, config.num_categories)?;
        Ok(Self {
            alpha,
            rates,
            config,
        })
    }

    #[must_use]
    pub const fn alpha(&self) -> f64 {
        self.alpha
    }

    #[must_use]
    pub fn rates(&self) -> &[f64] {
        &self.rates
    }

    #[must_use]
    pub fn rate(&self, category: usize) -> Option<f64> {
        self.rates.get(category).copied()
    }

    #[must_use]
    pub const fn is_fixed(&self) -> bool {
        self.config.fixed
    }

    #[must_use]
    pub fn state(&self) -> ShapeState {
        ShapeState {
            alpha: self.alpha,
            rates: self.rates.clone(),
        }
    }

    pub fn restore(&mut self, state: ShapeState) {
        self.alpha = state.alpha;
        self.rates = state.rates;
    }

    /// Move `alpha` to `alpha` and recompute the category rates.
    ///
    /// # Errors
    ///
    /// Returns `ShapeError::InvalidShape` and leaves the state untouched when
    /// `alpha` is not a valid shape.
    pub fn set_alpha(&mut self, alpha: f64) -> Result<(), ShapeError> {
        self.rates = discrete_gamma_rates(alpha, self.config.num_categories)?;
        self.alpha = alpha;
        Ok(())
    }
}

impl Parameter for GammaShape {
    fn name(&self) -> &str {
        SHAPE_PARAMETER_NAME
    }

    fn update<C, R>(&mut self, context: &mut C, rng: &mut R, _current_log_likelihood: f64) -> f64
    where
        C: ModelContext + ?Sized,
        R: RandomSource + ?Sized,
    {
        if self.config.fixed {
            return 0.0;
        }
        let old_alpha = self.alpha;
        let draw = scale_move(rng, old_alpha, self.config.bounds, self.config.tuning);
        if self.set_alpha(draw.value).is_err() {
            return f64::NEG_INFINITY;
        }
        context.mark_likelihood_valid(false);
        self.config.prior_rate * (old_alpha - draw.value) + draw.log_jacobian
    }

    fn log_prior(&self) -> f64 {
        self.config.prior_rate.ln() - self.config.prior_rate * self.alpha
    }

    fn write_param(&self) -> String {
        format!("{:.4}\t", self.alpha)
    }
}

impl fmt::Display for GammaShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shape = {:.4} (", self.alpha)?;
        for (i, rate) in self.rates.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{rate:.4}")?;
        }
        writeln!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::models::context::{ChainContext, TreePriorOracle};
    use crate::models::speciation::TreeTimePrior;

    struct Fixed(f64);

    impl RandomSource for Fixed {
        fn uniform(&mut self) -> f64 {
            self.0
        }
    }

    struct NoTree;

    impl TreePriorOracle for NoTree {
        fn num_taxa(&self) -> usize {
            2
        }

        fn birth_death_log_prob(&self, _: f64, _: f64) -> f64 {
            0.0
        }

        fn birth_death_sampling_log_prob(&self, _: f64, _: f64, _: f64, _: f64, _: f64) -> f64 {
            0.0
        }

        fn calibrated_bdss_log_prob(&self, _: f64, _: f64, _: f64, _: f64) -> f64 {
            0.0
        }

        fn ancestral_calibrated_bdss_log_prob(&self, _: f64, _: f64, _: f64, _: f64) -> f64 {
            0.0
        }
    }

    fn shape_at(alpha: f64, fixed: bool) -> GammaShape {
        let config = ShapeConfig {
            initial_alpha: Some(alpha),
            fixed,
            ..ShapeConfig::default()
        };
        GammaShape::new(&mut Fixed(0.5), config).expect("valid shape")
    }

    #[test]
    fn category_means_average_to_one_and_increase() {
        for alpha in [0.2, 0.5, 1.0, 3.0, 20.0] {
            let rates = discrete_gamma_rates(alpha, 4).expect("valid shape");
            let mean = rates.iter().sum::<f64>() / 4.0;
            assert_relative_eq!(mean, 1.0, epsilon = 1.0e-9);
            assert!(rates.windows(2).all(|pair| pair[0] < pair[1]));
            assert!(rates.iter().all(|rate| *rate >= 0.0));
        }
    }

    #[test]
    fn single_category_is_unit_rate() {
        let rates = discrete_gamma_rates(0.7, 1).expect("valid shape");
        assert_eq!(rates.len(), 1);
        assert_relative_eq!(rates[0], 1.0);
    }

    #[test]
    fn invalid_shapes_are_rejected() {
        assert_eq!(
            discrete_gamma_rates(0.0, 4),
            Err(ShapeError::InvalidShape(0.0))
        );
        assert_eq!(discrete_gamma_rates(1.0, 0), Err(ShapeError::NoCategories));
        let config = ShapeConfig {
            prior_rate: -1.0,
            ..ShapeConfig::default()
        };
        assert_eq!(config.validate(), Err(ShapeError::InvalidPriorRate(-1.0)));
    }

    #[test]
    fn update_returns_prior_ratio_plus_jacobian() {
        let mut shape = shape_at(1.0, false);
        let mut context = ChainContext::new(NoTree, TreeTimePrior::BirthDeath);
        context.mark_likelihood_valid(true);
        let log_ratio = shape.update(&mut context, &mut Fixed(0.75), -5.0);
        let c = std::f64::consts::LN_2 * 0.25;
        let new_alpha = c.exp();
        assert_relative_eq!(shape.alpha(), new_alpha, epsilon = 1.0e-12);
        assert_relative_eq!(log_ratio, 2.0 * (1.0 - new_alpha) + c, epsilon = 1.0e-12);
        assert!(!context.likelihood_valid());
        assert_eq!(shape.rates().len(), 4);
    }

    #[test]
    fn fixed_shape_never_moves() {
        let mut shape = shape_at(0.8, true);
        let mut context = ChainContext::new(NoTree, TreeTimePrior::Uniform);
        let before = shape.state();
        assert_relative_eq!(shape.update(&mut context, &mut Fixed(0.9), -1.0), 0.0);
        assert_eq!(shape.state(), before);
    }

    #[test]
    fn restore_undoes_an_update() {
        let mut shape = shape_at(1.5, false);
        let before = shape.state();
        let mut context = ChainContext::new(NoTree, TreeTimePrior::Yule);
        let mut rng = StdRng::seed_from_u64(12);
        let _ = shape.update(&mut context, &mut rng, 0.0);
        shape.restore(before.clone());
        assert_eq!(shape.state(), before);
    }

    #[test]
    fn random_start_follows_exponential_prior() {
        let shape = GammaShape::new(&mut Fixed(0.5), ShapeConfig::default()).expect("valid");
        assert_relative_eq!(shape.alpha(), std::f64::consts::LN_2 / 2.0, epsilon = 1.0e-12);
        assert_relative_eq!(
            shape.log_prior(),
            2.0f64.ln() - std::f64::consts::LN_2,
            epsilon = 1.0e-12
        );
    }
}
