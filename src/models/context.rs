//! Interfaces the parameters consume from the surrounding sampler.
//!
//! Parameters never reach into shared globals: the tree, the time scale, the
//! active regime and the likelihood bookkeeping all arrive through a
//! [`ModelContext`] passed into each call.

use crate::models::speciation::TreeTimePrior;
use crate::utils::safe_exp;

/// Branching-time densities of the active tree under each speciation regime.
pub trait TreePriorOracle {
    /// Number of tips in the tree.
    fn num_taxa(&self) -> usize;

    /// Node-age log density under the conditioned birth-death process.
    fn birth_death_log_prob(&self, net_diversification: f64, relative_death: f64) -> f64;

    /// Node-age log density under birth-death serial sampling from `origin_time`.
    fn birth_death_sampling_log_prob(
        &self,
        net_diversification: f64,
        relative_death: f64,
        fossil_rate: f64,
        extant_sample_rate: f64,
        origin_time: f64,
    ) -> f64;

    /// Calibrated birth-death serial-sampling log density on absolute rates.
    fn calibrated_bdss_log_prob(
        &self,
        birth_rate: f64,
        death_rate: f64,
        fossil_rate: f64,
        extant_sample_rate: f64,
    ) -> f64;

    /// Calibrated birth-death serial-sampling log density with sampled ancestors.
    fn ancestral_calibrated_bdss_log_prob(
        &self,
        birth_rate: f64,
        death_rate: f64,
        fossil_rate: f64,
        extant_sample_rate: f64,
    ) -> f64;
}

/// Source of the tree's origin time.
pub trait TimeScale {
    fn origin_time(&self) -> f64;
}

impl TimeScale for f64 {
    fn origin_time(&self) -> f64 {
        *self
    }
}

/// Model container seen by a parameter during an update.
pub trait ModelContext {
    type Tree: TreePriorOracle;
    type TimeScale: TimeScale;

    fn active_tree(&self) -> &Self::Tree;

    fn active_time_scale(&self) -> &Self::TimeScale;

    /// Regime selecting the tree-time prior.
    fn tree_time_prior(&self) -> TreeTimePrior;

    /// Whether startup values are fixed rather than drawn.
    fn is_fixed_startup_run(&self) -> bool;

    /// Overflow-safe exponentiation of a log acceptance ratio.
    fn safe_exp(&self, log_value: f64) -> f64 {
        safe_exp(log_value)
    }

    fn mark_likelihood_valid(&mut self, valid: bool);

    fn set_current_log_likelihood(&mut self, log_likelihood: f64);
}

/// Minimal [`ModelContext`] owning a tree oracle and a fixed origin time.
#[derive(Debug, Clone)]
pub struct ChainContext<T> {
    tree: T,
    origin_time: f64,
    tree_time_prior: TreeTimePrior,
    fixed_startup_run: bool,
    likelihood_valid: bool,
    current_log_likelihood: f64,
}

impl<T: TreePriorOracle> ChainContext<T> {
    #[must_use]
    pub const fn new(tree: T, tree_time_prior: TreeTimePrior) -> Self {
        Self {
            tree,
            origin_time: 0.0,
            tree_time_prior,
            fixed_startup_run: false,
            likelihood_valid: false,
            current_log_likelihood: 0.0,
        }
    }

    #[must_use]
    pub const fn with_origin_time(mut self, origin_time: f64) -> Self {
        self.origin_time = origin_time;
        self
    }

    #[must_use]
    pub const fn with_fixed_startup(mut self, fixed: bool) -> Self {
        self.fixed_startup_run = fixed;
        self
    }

    pub const fn set_tree_time_prior(&mut self, tree_time_prior: TreeTimePrior) {
        self.tree_time_prior = tree_time_prior;
    }

    pub const fn tree_mut(&mut self) -> &mut T {
        &mut self.tree
    }

    #[must_use]
    pub const fn likelihood_valid(&self) -> bool {
        self.likelihood_valid
    }

    #[must_use]
    pub const fn current_log_likelihood(&self) -> f64 {
        self.current_log_likelihood
    }
}

impl<T: TreePriorOracle> ModelContext for ChainContext<T> {
    type Tree = T;
    type TimeScale = f64;

    fn active_tree(&self) -> &T {
        &self.tree
    }

    fn active_time_scale(&self) -> &f64 {
        &self.origin_time
    }

    fn tree_time_prior(&self) -> TreeTimePrior {
        self.tree_time_prior
    }

    fn is_fixed_startup_run(&self) -> bool {
        self.fixed_startup_run
    }

    fn mark_likelihood_valid(&mut self, valid: bool) {
        self.likelihood_valid = valid;
    }

    fn set_current_log_likelihood(&mut self, log_likelihood: f64) {
        self.current_log_likelihood = log_likelihood;
    }
}
