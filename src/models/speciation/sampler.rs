//! Chain driver for the speciation parameter.

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::debug;

use crate::inference::{McmcConfig, RandomSource};
use crate::models::context::{ChainContext, ModelContext, TreePriorOracle};

use super::model::SpeciationModel;
use super::moves::UpdateOutcome;
use super::posterior::{
    SpeciationDraw, SpeciationPosteriorSummary, SpeciationTrace, summarize_trace,
};
use super::types::{SpeciationAcceptanceRates, SpeciationConfig, SpeciationError, TreeTimePrior};

/// Output of one speciation chain.
#[derive(Debug, Clone)]
pub struct SpeciationChainReport {
    pub iterations_completed: usize,
    pub trace: SpeciationTrace,
    pub summary: Option<SpeciationPosteriorSummary>,
    pub acceptance_rates: SpeciationAcceptanceRates,
}

/// Settings for [`fit_speciation_chain`].
#[derive(Debug, Clone, Copy)]
pub struct SpeciationFitOptions {
    pub tree_time_prior: TreeTimePrior,
    /// Origin of the tree, read by the serial-sampling regimes.
    pub origin_time: f64,
    pub fixed_startup: bool,
    pub speciation: SpeciationConfig,
    pub mcmc: McmcConfig,
}

impl Default for SpeciationFitOptions {
    fn default() -> Self {
        Self {
            tree_time_prior: TreeTimePrior::BirthDeath,
            origin_time: 1.0,
            fixed_startup: false,
            speciation: SpeciationConfig::default(),
            mcmc: McmcConfig::default(),
        }
    }
}

/// Run `config.iterations` updates of `model`.
///
/// Deferred moves are tested here against the context's `safe_exp` and undone
/// by restoring the rates held before the update. Draws are retained after
/// burn-in every `thin` iterations.
///
/// # Errors
///
/// Returns `SpeciationError::Inference` if the schedule is invalid.
pub fn run_speciation_chain<C, R>(
    model: &mut SpeciationModel,
    context: &mut C,
    rng: &mut R,
    config: McmcConfig,
    current_log_likelihood: f64,
) -> Result<SpeciationChainReport, SpeciationError>
where
    C: ModelContext + ?Sized,
    R: RandomSource + ?Sized,
{
    config.validate()?;
    let mut trace = SpeciationTrace::with_capacity(config.retained_draws());

    for iter in 0..config.iterations {
        let snapshot = model.rates();
        if let UpdateOutcome::Deferred {
            rate_move,
            log_ratio,
        } = model.step(context, rng, current_log_likelihood)
        {
            let accepted = rng.uniform() < context.safe_exp(log_ratio);
            if !accepted {
                model.restore_rates(snapshot);
            }
            model.record_decision(rate_move, accepted);
        }

        if config.retains(iter) {
            let ln_tree_prob = model.ln_tree_prob(&*context);
            trace.push(SpeciationDraw::from_rates(iter, &model.rates(), ln_tree_prob));
        }
    }

    let acceptance_rates = model.acceptance_rates();
    let summary = if trace.is_empty() {
        None
    } else {
        Some(summarize_trace(&trace))
    };
    debug!(
        regime = model.tree_time_prior().tag(),
        iterations = config.iterations,
        retained = trace.len(),
        relative_death_acceptance = acceptance_rates.relative_death,
        net_diversification_acceptance = acceptance_rates.net_diversification,
        prob_speciation_s_acceptance = acceptance_rates.prob_speciation_s,
        "speciation chain finished"
    );

    Ok(SpeciationChainReport {
        iterations_completed: config.iterations,
        trace,
        summary,
        acceptance_rates,
    })
}

/// Build a context around `tree`, seed a model from `options.mcmc.seed` and
/// run one chain.
///
/// # Errors
///
/// Returns `SpeciationError` if the configuration or startup values are invalid.
pub fn fit_speciation_chain<T: TreePriorOracle>(
    tree: T,
    options: SpeciationFitOptions,
) -> Result<(SpeciationModel, SpeciationChainReport), SpeciationError> {
    options.mcmc.validate()?;
    let mut context = ChainContext::new(tree, options.tree_time_prior)
        .with_origin_time(options.origin_time)
        .with_fixed_startup(options.fixed_startup);
    let mut rng = StdRng::seed_from_u64(options.mcmc.seed);
    let mut model = SpeciationModel::new(&mut rng, &context, options.speciation)?;
    let report = run_speciation_chain(&mut model, &mut context, &mut rng, options.mcmc, 0.0)?;
    Ok((model, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::speciation::StartupValues;

    /// With the `(n - 1) ln d` term added, the Yule density peaks at `d = 1`.
    struct YuleTree;

    impl TreePriorOracle for YuleTree {
        fn num_taxa(&self) -> usize {
            8
        }

        fn birth_death_log_prob(&self, net_div: f64, rel_death: f64) -> f64 {
            -14.0 * net_div / 2.0 - rel_death
        }

        fn birth_death_sampling_log_prob(&self, d: f64, r: f64, _: f64, _: f64, _: f64) -> f64 {
            self.birth_death_log_prob(d, r)
        }

        fn calibrated_bdss_log_prob(&self, b: f64, m: f64, _: f64, _: f64) -> f64 {
            self.birth_death_log_prob(b - m, m / b)
        }

        fn ancestral_calibrated_bdss_log_prob(&self, b: f64, m: f64, _: f64, _: f64) -> f64 {
            self.birth_death_log_prob(b - m, m / b)
        }
    }

    fn options(prior: TreeTimePrior) -> SpeciationFitOptions {
        SpeciationFitOptions {
            tree_time_prior: prior,
            origin_time: 5.0,
            fixed_startup: true,
            speciation: SpeciationConfig {
                startup: StartupValues::fixed(1.0, 0.2, 0.5),
                ..SpeciationConfig::default()
            },
            mcmc: McmcConfig {
                iterations: 400,
                burn_in: 100,
                thin: 3,
                seed: 7,
            },
        }
    }

    #[test]
    fn chain_retains_thinned_draws() {
        let (_, report) =
            fit_speciation_chain(YuleTree, options(TreeTimePrior::BirthDeath)).expect("chain runs");
        assert_eq!(report.iterations_completed, 400);
        assert_eq!(report.trace.len(), options(TreeTimePrior::BirthDeath).mcmc.retained_draws());
        assert_eq!(report.trace.draws[0].iteration, 100);
        assert_eq!(report.trace.draws[1].iteration, 103);
        assert!(report.summary.is_some());
    }

    #[test]
    fn yule_chain_keeps_relative_death_at_zero() {
        let (model, report) =
            fit_speciation_chain(YuleTree, options(TreeTimePrior::Yule)).expect("chain runs");
        assert!(report.trace.draws.iter().all(|draw| draw.relative_death == 0.0));
        assert!(report.acceptance_rates.net_diversification > 0.0);
        assert!(model.net_diversification() > 0.0);
    }

    #[test]
    fn uniform_chain_never_moves() {
        let (model, report) =
            fit_speciation_chain(YuleTree, options(TreeTimePrior::Uniform)).expect("chain runs");
        assert!(report.trace.draws.iter().all(|draw| draw.net_diversification == 0.0));
        assert!(model.acceptance_rates().net_diversification.abs() < f64::EPSILON);
    }

    #[test]
    fn invalid_schedule_is_reported() {
        let mut bad = options(TreeTimePrior::BirthDeath);
        bad.mcmc.thin = 0;
        let err = fit_speciation_chain(YuleTree, bad).expect_err("thin 0 is invalid");
        assert!(matches!(err, SpeciationError::Inference(_)));
    }

    #[test]
    fn same_seed_reproduces_the_chain() {
        let (_, first) =
            fit_speciation_chain(YuleTree, options(TreeTimePrior::BirthDeathSampling))
                .expect("chain runs");
        let (_, second) =
            fit_speciation_chain(YuleTree, options(TreeTimePrior::BirthDeathSampling))
                .expect("chain runs");
        assert_eq!(first.trace.draws, second.trace.draws);
    }
}
