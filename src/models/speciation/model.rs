/////////////////////////////////////////////////////////////////////////////////////////////\
//
// Birth-death(-sampling) speciation parameter and its Metropolis-Hastings moves.
//
// Created on: 19 Oct 2026
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! The speciation parameter: birth-death(-sampling) rates and their moves.

use std::fmt;

use tracing::{info, trace};

use crate::inference::{Bounds, ProposalStats, RandomSource, scale_move, window_move};
use crate::models::context::{ModelContext, TimeScale};
use crate::models::parameter::Parameter;

use super::moves::{MoveSchedule, Proposal, RateMove, UpdateOutcome};
use super::rates::{PrimaryRate, SpeciationRates};
use super::types::{
    SPECIATION_PARAMETER_NAME, SpeciationAcceptanceRates, SpeciationConfig, SpeciationError,
    SpeciationProposalTuning, TreeTimePrior,
};

#[derive(Debug, Clone, Copy, Default)]
struct MoveCounts {
    relative_death: ProposalStats,
    net_diversification: ProposalStats,
    prob_speciation_s: ProposalStats,
    extant_sample_rate: ProposalStats,
    fossil_rate: ProposalStats,
}

impl MoveCounts {
    const fn record(&mut self, rate_move: RateMove, accepted: bool) {
        let stats = match rate_move {
            RateMove::RelativeDeath => &mut self.relative_death,
            RateMove::NetDiversification => &mut self.net_diversification,
            RateMove::ProbSpeciationS => &mut self.prob_speciation_s,
            RateMove::ExtantSampleRate => &mut self.extant_sample_rate,
            RateMove::FossilRate => &mut self.fossil_rate,
        };
        stats.record(accepted);
    }

    fn rates(&self) -> SpeciationAcceptanceRates {
        SpeciationAcceptanceRates {
            relative_death: self.relative_death.acceptance_rate(),
            net_diversification: self.net_diversification.acceptance_rate(),
            prob_speciation_s: self.prob_speciation_s.acceptance_rate(),
            extant_sample_rate: self.extant_sample_rate.acceptance_rate(),
            fossil_rate: self.fossil_rate.acceptance_rate(),
        }
    }
}

/// Speciation-process parameter of a tree-dating sampler.
///
/// Owns relative death, net diversification, the speciation sampling
/// fraction and the extant sampling probability; birth, death and fossil
/// rates are derived from them after every write. The active regime is read
/// from the [`ModelContext`] on each update.
#[derive(Debug)]
pub struct SpeciationModel {
    rates: SpeciationRates,
    tree_time_prior: TreeTimePrior,
    tuning: SpeciationProposalTuning,
    net_diversification_bounds: Bounds,
    counts: MoveCounts,
}

impl SpeciationModel {
    /// Seed the rates, either from uniform draws or from the fixed startup
    /// values when the context asks for a fixed run.
    ///
    /// # Errors
    ///
    /// Returns `SpeciationError` when the tuning is invalid or the startup
    /// rates cannot define a birth-death process (relative death `>= 1` or
    /// net diversification `<= 0`). Other startup values pass through to the
    /// regime clamps.
    pub fn new<C, R>(
        rng: &mut R,
        context: &C,
        config: SpeciationConfig,
    ) -> Result<Self, SpeciationError>
    where
        C: ModelContext + ?Sized,
        R: RandomSource + ?Sized,
    {
        config.validate()?;
        let tuning = config.tuning;
        let net_diversification_bounds = tuning.net_diversification_bounds()?;
        let max_div = tuning.max_diversification;
        let tree_time_prior = context.tree_time_prior();

        let mut relative_death = rng.uniform();
        let mut net_diversification = rng.uniform() * max_div;
        let mut prob_speciation_s = rng.uniform();
        if context.is_fixed_startup_run() {
            let startup = config.startup;
            relative_death = startup.relative_death;
            net_diversification = startup.net_diversification;
            prob_speciation_s = startup.prob_speciation_s;
            if startup.draws_randomly() {
                relative_death = rng.uniform();
                net_diversification = rng.uniform() * max_div;
            }
        }
        validate_startup(relative_death, net_diversification)?;

        match tree_time_prior {
            TreeTimePrior::Uniform => {
                relative_death = 0.0;
                net_diversification = 0.0;
            }
            TreeTimePrior::Yule => relative_death = 0.0,
            _ => {}
        }
        if net_diversification >= max_div {
            net_diversification = max_div * max_div / net_diversification;
        }

        let rates =
            SpeciationRates::new(relative_death, net_diversification, prob_speciation_s, 1.0);
        if tree_time_prior.uses_calibrated_rates() {
            info!(
                net_diversification = rates.net_diversification(),
                relative_death = rates.relative_death(),
                prob_speciation_s = rates.prob_speciation_s(),
                birth_rate = rates.birth_rate(),
                death_rate = rates.death_rate(),
                fossil_rate = rates.fossil_rate(),
                "speciation parameters are fixed"
            );
        }

        Ok(Self {
            rates,
            tree_time_prior,
            tuning,
            net_diversification_bounds,
            counts: MoveCounts::default(),
        })
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        SPECIATION_PARAMETER_NAME
    }

    /// Snapshot of the full rate state.
    #[must_use]
    pub const fn rates(&self) -> SpeciationRates {
        self.rates
    }

    /// Restore a snapshot taken with [`Self::rates`].
    pub const fn restore_rates(&mut self, rates: SpeciationRates) {
        self.rates = rates;
    }

    /// Regime seen at construction or at the most recent update.
    #[must_use]
    pub const fn tree_time_prior(&self) -> TreeTimePrior {
        self.tree_time_prior
    }

    #[must_use]
    pub const fn tuning(&self) -> &SpeciationProposalTuning {
        &self.tuning
    }

    #[must_use]
    pub const fn relative_death(&self) -> f64 {
        self.rates.relative_death()
    }

    #[must_use]
    pub const fn net_diversification(&self) -> f64 {
        self.rates.net_diversification()
    }

    #[must_use]
    pub const fn prob_speciation_s(&self) -> f64 {
        self.rates.prob_speciation_s()
    }

    #[must_use]
    pub const fn extant_sample_rate(&self) -> f64 {
        self.rates.extant_sample_rate()
    }

    #[must_use]
    pub const fn birth_rate(&self) -> f64 {
        self.rates.birth_rate()
    }

    #[must_use]
    pub const fn death_rate(&self) -> f64 {
        self.rates.death_rate()
    }

    #[must_use]
    pub const fn fossil_rate(&self) -> f64 {
        self.rates.fossil_rate()
    }

    /// Acceptance rates of every move resolved so far.
    #[must_use]
    pub fn acceptance_rates(&self) -> SpeciationAcceptanceRates {
        self.counts.rates()
    }

    /// Record the caller's decision on a deferred move.
    pub const fn record_decision(&mut self, rate_move: RateMove, accepted: bool) {
        self.counts.record(rate_move, accepted);
    }

    /// Copy the primary rates of `other`, recomputing derived rates.
    pub fn assign_from(&mut self, other: &Self) {
        self.rates = rebuilt(&other.rates);
    }

    /// Log probability of the tree's branching times at the current rates.
    pub fn ln_tree_prob<C: ModelContext + ?Sized>(&self, context: &C) -> f64 {
        context
            .tree_time_prior()
            .query(&self.rates, || context.active_time_scale().origin_time())
            .evaluate(context.active_tree())
    }

    /// One MCMC update under the context's regime.
    ///
    /// The context is told that the data likelihood is still valid and
    /// receives `current_log_likelihood` unchanged: speciation moves only
    /// change the tree-prior term.
    pub fn step<C, R>(
        &mut self,
        context: &mut C,
        rng: &mut R,
        current_log_likelihood: f64,
    ) -> UpdateOutcome
    where
        C: ModelContext + ?Sized,
        R: RandomSource + ?Sized,
    {
        let prior = context.tree_time_prior();
        self.tree_time_prior = prior;

        let outcome = match prior.schedule() {
            MoveSchedule::Idle => UpdateOutcome::Idle,
            MoveSchedule::Deferred(rate_move) => {
                let old_prob = self.ln_tree_prob(&*context);
                let proposal = self.propose_rate(rate_move, rng);
                if !prior.moves_relative_death() {
                    self.rates.set(PrimaryRate::RelativeDeath, 0.0);
                }
                let new_prob = self.ln_tree_prob(&*context);
                UpdateOutcome::Deferred {
                    rate_move,
                    log_ratio: (new_prob - old_prob) + proposal.log_hastings_ratio,
                }
            }
            MoveSchedule::Compound(compound) => {
                let mut accepted = 0;
                for &rate_move in compound.steps() {
                    accepted += usize::from(self.update_rate_with_tree(rate_move, &*context, rng));
                }
                UpdateOutcome::Resolved {
                    accepted,
                    proposed: compound.steps().len(),
                }
            }
        };

        context.mark_likelihood_valid(true);
        context.set_current_log_likelihood(current_log_likelihood);
        outcome
    }

    /// Apply one raw move without any acceptance test.
    pub fn propose_rate<R: RandomSource + ?Sized>(
        &mut self,
        rate_move: RateMove,
        rng: &mut R,
    ) -> Proposal {
        let target = rate_move.target();
        let previous = self.rates.get(target);
        let tuning = self.tuning;

        let log_hastings_ratio = match rate_move {
            RateMove::RelativeDeath => {
                let value = window_move(
                    rng,
                    previous,
                    tuning.relative_death_bounds,
                    tuning.relative_death_window,
                );
                self.rates.set(target, value);
                0.0
            }
            RateMove::NetDiversification => {
                let draw = scale_move(
                    rng,
                    previous,
                    self.net_diversification_bounds,
                    tuning.net_diversification_tuning,
                );
                self.rates.set(target, draw.value);
                draw.log_jacobian
            }
            RateMove::ProbSpeciationS | RateMove::ExtantSampleRate => {
                let value =
                    window_move(rng, previous, tuning.sampling_bounds, tuning.sampling_window);
                self.rates.set(target, value);
                0.0
            }
            RateMove::FossilRate => {
                let death_rate = self.rates.death_rate();
                // psi = s / (1 - s) * mu has no inverse when mu == 0.
                if death_rate > 0.0 {
                    let draw = scale_move(
                        rng,
                        self.rates.fossil_rate(),
                        tuning.fossil_rate_bounds,
                        tuning.fossil_rate_tuning,
                    );
                    self.rates.set(target, draw.value / (death_rate + draw.value));
                    draw.log_jacobian
                } else {
                    0.0
                }
            }
        };

        Proposal {
            rate_move,
            previous,
            log_hastings_ratio,
        }
    }

    /// Undo a raw move.
    pub fn revert(&mut self, proposal: Proposal) {
        self.rates.set(proposal.rate_move.target(), proposal.previous);
    }

    /// Apply one move and resolve it with its own Metropolis-Hastings test
    /// against the tree-prior ratio. Returns whether it was accepted.
    pub fn update_rate_with_tree<C, R>(
        &mut self,
        rate_move: RateMove,
        context: &C,
        rng: &mut R,
    ) -> bool
    where
        C: ModelContext + ?Sized,
        R: RandomSource + ?Sized,
    {
        let old_prob = self.ln_tree_prob(context);
        let proposal = self.propose_rate(rate_move, rng);
        let new_prob = self.ln_tree_prob(context);
        let log_ratio = (new_prob - old_prob) + proposal.log_hastings_ratio;
        let accepted = rng.uniform() < context.safe_exp(log_ratio);
        if !accepted {
            self.revert(proposal);
        }
        self.counts.record(rate_move, accepted);
        trace!(
            rate = rate_move.label(),
            log_ratio,
            accepted,
            "speciation move resolved"
        );
        accepted
    }

    /// Sliding-window move on relative death; returns the log proposal ratio.
    pub fn update_relative_death<R: RandomSource + ?Sized>(&mut self, rng: &mut R) -> f64 {
        self.propose_rate(RateMove::RelativeDeath, rng)
            .log_hastings_ratio
    }

    pub fn update_relative_death_with_tree<C, R>(&mut self, context: &C, rng: &mut R) -> bool
    where
        C: ModelContext + ?Sized,
        R: RandomSource + ?Sized,
    {
        self.update_rate_with_tree(RateMove::RelativeDeath, context, rng)
    }

    /// Scale move on net diversification; returns the log proposal ratio.
    pub fn update_net_diversification<R: RandomSource + ?Sized>(&mut self, rng: &mut R) -> f64 {
        self.propose_rate(RateMove::NetDiversification, rng)
            .log_hastings_ratio
    }

    pub fn update_net_diversification_with_tree<C, R>(&mut self, context: &C, rng: &mut R) -> bool
    where
        C: ModelContext + ?Sized,
        R: RandomSource + ?Sized,
    {
        self.update_rate_with_tree(RateMove::NetDiversification, context, rng)
    }

    pub fn update_extant_sample_rate<R: RandomSource + ?Sized>(&mut self, rng: &mut R) -> f64 {
        self.propose_rate(RateMove::ExtantSampleRate, rng)
            .log_hastings_ratio
    }

    pub fn update_extant_sample_rate_with_tree<C, R>(&mut self, context: &C, rng: &mut R) -> bool
    where
        C: ModelContext + ?Sized,
        R: RandomSource + ?Sized,
    {
        self.update_rate_with_tree(RateMove::ExtantSampleRate, context, rng)
    }

    pub fn update_prob_speciation_s<R: RandomSource + ?Sized>(&mut self, rng: &mut R) -> f64 {
        self.propose_rate(RateMove::ProbSpeciationS, rng)
            .log_hastings_ratio
    }

    pub fn update_prob_speciation_s_with_tree<C, R>(&mut self, context: &C, rng: &mut R) -> bool
    where
        C: ModelContext + ?Sized,
        R: RandomSource + ?Sized,
    {
        self.update_rate_with_tree(RateMove::ProbSpeciationS, context, rng)
    }

    /// Scale move on the fossil rate; returns the log proposal ratio.
    pub fn update_fossil_rate<R: RandomSource + ?Sized>(&mut self, rng: &mut R) -> f64 {
        self.propose_rate(RateMove::FossilRate, rng)
            .log_hastings_ratio
    }

    pub fn update_fossil_rate_with_tree<C, R>(&mut self, context: &C, rng: &mut R) -> bool
    where
        C: ModelContext + ?Sized,
        R: RandomSource + ?Sized,
    {
        self.update_rate_with_tree(RateMove::FossilRate, context, rng)
    }
}

impl Clone for SpeciationModel {
    fn clone(&self) -> Self {
        Self {
            rates: rebuilt(&self.rates),
            tree_time_prior: self.tree_time_prior,
            tuning: self.tuning,
            net_diversification_bounds: self.net_diversification_bounds,
            counts: self.counts,
        }
    }

    /// Copy-assignment: only the rate state travels.
    fn clone_from(&mut self, source: &Self) {
        self.assign_from(source);
    }
}

impl Parameter for SpeciationModel {
    fn name(&self) -> &str {
        SPECIATION_PARAMETER_NAME
    }

    fn update<C, R>(&mut self, context: &mut C, rng: &mut R, current_log_likelihood: f64) -> f64
    where
        C: ModelContext + ?Sized,
        R: RandomSource + ?Sized,
    {
        self.step(context, rng, current_log_likelihood).log_ratio()
    }

    fn log_prior(&self) -> f64 {
        0.0
    }

    fn write_param(&self) -> String {
        if !self.tree_time_prior.is_informative() {
            return String::new();
        }
        format!(
            "Speciation parameters: m/l = {:.4} , l-m = {:.4} , s = {:.4} , psi = {:.4} , l = {:.4} , m = {:.4}\n",
            self.rates.relative_death(),
            self.rates.net_diversification(),
            self.rates.prob_speciation_s(),
            self.rates.fossil_rate(),
            self.rates.birth_rate(),
            self.rates.death_rate(),
        )
    }
}

impl fmt::Display for SpeciationModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.tree_time_prior.is_informative() {
            return Ok(());
        }
        writeln!(
            f,
            "Speciation parameters: d/b = {:.4} , b-d = {:.4} {:.4} {:.4} {:.4} {:.4} ",
            self.rates.relative_death(),
            self.rates.net_diversification(),
            self.rates.prob_speciation_s(),
            self.rates.fossil_rate(),
            self.rates.birth_rate(),
            self.rates.death_rate(),
        )
    }
}

fn validate_startup(relative_death: f64, net_diversification: f64) -> Result<(), SpeciationError> {
    if relative_death.is_nan() || relative_death >= 1.0 {
        return Err(SpeciationError::RelativeDeathOutOfRange(relative_death));
    }
    if net_diversification.is_nan() || net_diversification <= 0.0 {
        return Err(SpeciationError::NonPositiveNetDiversification(
            net_diversification,
        ));
    }
    Ok(())
}

fn rebuilt(rates: &SpeciationRates) -> SpeciationRates {
    SpeciationRates::new(
        rates.relative_death(),
        rates.net_diversification(),
        rates.prob_speciation_s(),
        rates.extant_sample_rate(),
    )
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::models::context::{ChainContext, TreePriorOracle};
    use crate::models::speciation::StartupValues;

    /// Replays scripted uniforms, then falls back to a seeded generator.
    struct Scripted {
        queue: VecDeque<f64>,
        fallback: StdRng,
    }

    impl Scripted {
        fn new(values: &[f64]) -> Self {
            Self {
                queue: values.iter().copied().collect(),
                fallback: StdRng::seed_from_u64(99),
            }
        }
    }

    impl RandomSource for Scripted {
        fn uniform(&mut self) -> f64 {
            self.queue
                .pop_front()
                .unwrap_or_else(|| self.fallback.uniform())
        }
    }

    /// Log density peaked at `d = 1`, `r = 0.25`, `psi = 0.5`.
    #[derive(Debug, Clone, Copy)]
    struct PeakedTree;

    impl TreePriorOracle for PeakedTree {
        fn num_taxa(&self) -> usize {
            6
        }

        fn birth_death_log_prob(&self, net_div: f64, rel_death: f64) -> f64 {
            -8.0 * (net_div - 1.0).powi(2) - 20.0 * (rel_death - 0.25).powi(2)
        }

        fn birth_death_sampling_log_prob(
            &self,
            net_div: f64,
            rel_death: f64,
            fossil: f64,
            _: f64,
            _: f64,
        ) -> f64 {
            self.birth_death_log_prob(net_div, rel_death) - 4.0 * (fossil - 0.5).powi(2)
        }

        fn calibrated_bdss_log_prob(&self, birth: f64, death: f64, fossil: f64, rho: f64) -> f64 {
            self.birth_death_sampling_log_prob(birth - death, death / birth, fossil, rho, 0.0)
        }

        fn ancestral_calibrated_bdss_log_prob(
            &self,
            birth: f64,
            death: f64,
            fossil: f64,
            rho: f64,
        ) -> f64 {
            self.calibrated_bdss_log_prob(birth, death, fossil, rho)
        }
    }

    fn fixed_context(prior: TreeTimePrior) -> ChainContext<PeakedTree> {
        ChainContext::new(PeakedTree, prior)
            .with_origin_time(10.0)
            .with_fixed_startup(true)
    }

    fn fixed_config() -> SpeciationConfig {
        SpeciationConfig {
            startup: StartupValues::fixed(1.0, 0.5, 0.3),
            ..SpeciationConfig::default()
        }
    }

    fn fixed_model(prior: TreeTimePrior) -> SpeciationModel {
        let mut rng = StdRng::seed_from_u64(1);
        SpeciationModel::new(&mut rng, &fixed_context(prior), fixed_config())
            .expect("valid startup")
    }

    #[test]
    fn fixed_startup_sets_primary_and_derived_rates() {
        let model = fixed_model(TreeTimePrior::BirthDeath);
        assert_relative_eq!(model.net_diversification(), 1.0);
        assert_relative_eq!(model.relative_death(), 0.5);
        assert_relative_eq!(model.birth_rate(), 2.0);
        assert_relative_eq!(model.death_rate(), 1.0);
        assert_relative_eq!(model.fossil_rate(), 0.3 / 0.7, epsilon = 1.0e-12);
        assert_relative_eq!(model.extant_sample_rate(), 1.0);
    }

    #[test]
    fn invalid_relative_death_is_rejected() {
        let config = SpeciationConfig {
            startup: StartupValues::fixed(1.0, 1.2, 0.3),
            ..SpeciationConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let err = SpeciationModel::new(&mut rng, &fixed_context(TreeTimePrior::BirthDeath), config)
            .expect_err("relative death >= 1 must fail");
        assert_eq!(err, SpeciationError::RelativeDeathOutOfRange(1.2));
    }

    #[test]
    fn negative_relative_death_is_zeroed_under_yule() {
        let config = SpeciationConfig {
            startup: StartupValues::fixed(1.0, -0.5, 0.3),
            ..SpeciationConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let model = SpeciationModel::new(&mut rng, &fixed_context(TreeTimePrior::Yule), config)
            .expect("negative relative death is accepted");
        assert_relative_eq!(model.relative_death(), 0.0);
        assert_relative_eq!(model.net_diversification(), 1.0);
        assert_relative_eq!(model.birth_rate(), 1.0);
    }

    #[test]
    fn sampling_fraction_is_not_a_startup_condition() {
        for (prior, prob_s) in [
            (TreeTimePrior::Uniform, 1.0),
            (TreeTimePrior::Uniform, -0.2),
            (TreeTimePrior::BirthDeath, 1.0),
        ] {
            let config = SpeciationConfig {
                startup: StartupValues::fixed(1.0, 0.5, prob_s),
                ..SpeciationConfig::default()
            };
            let mut rng = StdRng::seed_from_u64(1);
            let model = SpeciationModel::new(&mut rng, &fixed_context(prior), config)
                .expect("sampling fraction is not validated");
            assert_relative_eq!(model.prob_speciation_s(), prob_s);
        }
    }

    #[test]
    fn nan_startup_is_rejected() {
        let config = SpeciationConfig {
            startup: StartupValues::fixed(f64::NAN, 0.5, 0.3),
            ..SpeciationConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let err = SpeciationModel::new(&mut rng, &fixed_context(TreeTimePrior::BirthDeath), config)
            .expect_err("NaN net diversification must fail");
        assert!(matches!(err, SpeciationError::NonPositiveNetDiversification(d) if d.is_nan()));
    }

    #[test]
    fn non_positive_net_diversification_is_rejected() {
        let config = SpeciationConfig {
            startup: StartupValues::fixed(0.0, 0.5, 0.3),
            ..SpeciationConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let err = SpeciationModel::new(&mut rng, &fixed_context(TreeTimePrior::BirthDeath), config)
            .expect_err("zero net diversification must fail");
        assert_eq!(err, SpeciationError::NonPositiveNetDiversification(0.0));
    }

    #[test]
    fn regime_clamps_apply_after_validation() {
        let uniform = fixed_model(TreeTimePrior::Uniform);
        assert_relative_eq!(uniform.relative_death(), 0.0);
        assert_relative_eq!(uniform.net_diversification(), 0.0);
        let yule = fixed_model(TreeTimePrior::Yule);
        assert_relative_eq!(yule.relative_death(), 0.0);
        assert_relative_eq!(yule.net_diversification(), 1.0);
        assert_relative_eq!(yule.death_rate(), 0.0);
    }

    #[test]
    fn startup_above_ceiling_is_reflected() {
        let config = SpeciationConfig {
            startup: StartupValues::fixed(60_000.0, 0.5, 0.3),
            ..SpeciationConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let model = SpeciationModel::new(&mut rng, &fixed_context(TreeTimePrior::BirthDeath), config)
            .expect("valid startup");
        assert_relative_eq!(model.net_diversification(), 15_000.0);
    }

    #[test]
    fn random_startup_scales_net_diversification() {
        let context = ChainContext::new(PeakedTree, TreeTimePrior::BirthDeath);
        let mut rng = Scripted::new(&[0.25, 0.5, 0.75]);
        let model =
            SpeciationModel::new(&mut rng, &context, SpeciationConfig::default()).expect("valid");
        assert_relative_eq!(model.relative_death(), 0.25);
        assert_relative_eq!(model.net_diversification(), 15_000.0);
        assert_relative_eq!(model.prob_speciation_s(), 0.75);
    }

    #[test]
    fn negative_sentinels_redraw_startup_values() {
        let config = SpeciationConfig {
            startup: StartupValues::fixed(-1.0, -1.0, 0.3),
            ..SpeciationConfig::default()
        };
        let mut rng = Scripted::new(&[0.9, 0.9, 0.9, 0.4, 0.001]);
        let model = SpeciationModel::new(&mut rng, &fixed_context(TreeTimePrior::BirthDeath), config)
            .expect("sentinels redraw");
        assert_relative_eq!(model.relative_death(), 0.4);
        assert_relative_eq!(model.net_diversification(), 30.0, epsilon = 1.0e-9);
        assert_relative_eq!(model.prob_speciation_s(), 0.3);
    }

    #[test]
    fn uniform_regime_reports_zero_tree_probability() {
        let context = fixed_context(TreeTimePrior::Uniform);
        let mut model = fixed_model(TreeTimePrior::Uniform);
        assert_relative_eq!(model.ln_tree_prob(&context), 0.0);
        let mut rng = StdRng::seed_from_u64(4);
        model.update_net_diversification(&mut rng);
        assert_relative_eq!(model.ln_tree_prob(&context), 0.0);
    }

    #[test]
    fn uniform_regime_update_is_idle() {
        let mut context = fixed_context(TreeTimePrior::Uniform);
        let mut model = fixed_model(TreeTimePrior::Uniform);
        let before = model.rates();
        let mut rng = StdRng::seed_from_u64(4);
        let outcome = model.step(&mut context, &mut rng, -12.0);
        assert_eq!(outcome, UpdateOutcome::Idle);
        assert_eq!(model.rates(), before);
        assert!(context.likelihood_valid());
        assert_relative_eq!(context.current_log_likelihood(), -12.0);
    }

    #[test]
    fn yule_update_defers_and_pins_relative_death() {
        let mut context = fixed_context(TreeTimePrior::Yule);
        let mut model = fixed_model(TreeTimePrior::Yule);
        let old_prob = model.ln_tree_prob(&context);
        let mut rng = Scripted::new(&[0.8]);
        let outcome = model.step(&mut context, &mut rng, -3.5);
        let c = std::f64::consts::LN_2 * 0.3;
        assert_relative_eq!(model.net_diversification(), c.exp(), epsilon = 1.0e-12);
        assert_relative_eq!(model.relative_death(), 0.0);
        let expected = model.ln_tree_prob(&context) - old_prob + c;
        let UpdateOutcome::Deferred {
            rate_move,
            log_ratio,
        } = outcome
        else {
            panic!("yule updates are deferred");
        };
        assert_eq!(rate_move, RateMove::NetDiversification);
        assert_relative_eq!(log_ratio, expected, epsilon = 1.0e-12);
        assert!(context.likelihood_valid());
        assert_relative_eq!(context.current_log_likelihood(), -3.5);
    }

    #[test]
    fn rejected_nested_move_restores_state_exactly() {
        let context = fixed_context(TreeTimePrior::BirthDeath);
        let mut model = fixed_model(TreeTimePrior::BirthDeath);
        let before = model.rates();
        // Window draw to the upper edge, then a uniform that always rejects.
        let mut rng = Scripted::new(&[0.99, 0.999_999_9]);
        let accepted = model.update_relative_death_with_tree(&context, &mut rng);
        assert!(!accepted);
        assert_eq!(model.rates(), before);
    }

    #[test]
    fn accepted_nested_move_keeps_derived_rates_in_sync() {
        let context = fixed_context(TreeTimePrior::BirthDeath);
        let mut model = fixed_model(TreeTimePrior::BirthDeath);
        // Moving relative death from 0.5 towards the 0.25 peak raises the tree prior.
        let mut rng = Scripted::new(&[0.0, 0.5]);
        assert!(model.update_relative_death_with_tree(&context, &mut rng));
        assert_relative_eq!(model.relative_death(), 0.4, epsilon = 1.0e-12);
        assert_relative_eq!(
            model.death_rate() / model.birth_rate(),
            model.relative_death(),
            epsilon = 1.0e-12
        );
        assert_relative_eq!(
            model.birth_rate() - model.death_rate(),
            model.net_diversification(),
            epsilon = 1.0e-12
        );
    }

    #[test]
    fn compound_regimes_resolve_internally() {
        for prior in [
            TreeTimePrior::BirthDeath,
            TreeTimePrior::BirthDeathSampling,
            TreeTimePrior::CalibratedBirthDeathSampling,
        ] {
            let mut context = fixed_context(prior);
            let mut model = fixed_model(prior);
            let mut rng = StdRng::seed_from_u64(8);
            let outcome = model.step(&mut context, &mut rng, -1.0);
            let UpdateOutcome::Resolved { accepted, proposed } = outcome else {
                panic!("{prior:?} resolves internally");
            };
            assert_eq!(proposed, prior.schedule_len());
            assert!(accepted <= proposed);
            assert_relative_eq!(outcome.log_ratio(), 0.0);
            assert!(context.likelihood_valid());
        }
    }

    #[test]
    fn parameter_update_returns_zero_for_resolved_regimes() {
        let mut context = fixed_context(TreeTimePrior::BirthDeathSamplingConditioned);
        let mut model = fixed_model(TreeTimePrior::BirthDeathSamplingConditioned);
        let mut rng = StdRng::seed_from_u64(21);
        for _ in 0..20 {
            assert_relative_eq!(model.update(&mut context, &mut rng, -2.0), 0.0);
        }
        let rates = model.acceptance_rates();
        assert!((0.0..=1.0).contains(&rates.prob_speciation_s));
    }

    #[test]
    fn fossil_rate_move_round_trips_through_sampling_fraction() {
        let mut model = fixed_model(TreeTimePrior::BirthDeathSampling);
        let death = model.death_rate();
        let mut rng = Scripted::new(&[0.7]);
        let proposal = model.propose_rate(RateMove::FossilRate, &mut rng);
        let c = std::f64::consts::LN_2 * 0.2;
        assert_relative_eq!(proposal.log_hastings_ratio, c);
        let psi = (0.3 / 0.7) * c.exp();
        assert_relative_eq!(model.fossil_rate(), psi, epsilon = 1.0e-12);
        assert_relative_eq!(model.prob_speciation_s(), psi / (death + psi), epsilon = 1.0e-12);
        model.revert(proposal);
        assert_relative_eq!(model.prob_speciation_s(), 0.3);
    }

    #[test]
    fn fossil_rate_move_is_a_no_op_without_deaths() {
        let mut model = fixed_model(TreeTimePrior::Yule);
        let before = model.rates();
        let mut rng = Scripted::new(&[0.9]);
        assert_relative_eq!(model.update_fossil_rate(&mut rng), 0.0);
        assert_eq!(model.rates(), before);
    }

    #[test]
    fn clone_recomputes_derived_and_assign_copies_rates() {
        let source = fixed_model(TreeTimePrior::BirthDeath);
        let copy = source.clone();
        assert_eq!(copy.rates(), source.rates());
        assert_eq!(copy.name(), "SP");

        let mut target = fixed_model(TreeTimePrior::BirthDeath);
        let mut rng = StdRng::seed_from_u64(2);
        target.update_net_diversification(&mut rng);
        target.clone_from(&source);
        assert_eq!(target.rates(), source.rates());
    }

    #[test]
    fn printing_is_silent_for_the_uniform_regime() {
        assert!(fixed_model(TreeTimePrior::Uniform).to_string().is_empty());
        assert!(fixed_model(TreeTimePrior::Uniform).write_param().is_empty());
        let printed = fixed_model(TreeTimePrior::BirthDeath).to_string();
        assert_eq!(
            printed,
            "Speciation parameters: d/b = 0.5000 , b-d = 1.0000 0.3000 0.4286 2.0000 1.0000 \n"
        );
        let written = fixed_model(TreeTimePrior::BirthDeath).write_param();
        assert!(written.starts_with("Speciation parameters: m/l = 0.5000 , l-m = 1.0000"));
        assert!(written.contains("psi = 0.4286"));
    }

    #[test]
    fn log_prior_is_flat() {
        assert_relative_eq!(fixed_model(TreeTimePrior::BirthDeath).log_prior(), 0.0);
    }

    impl TreeTimePrior {
        fn schedule_len(self) -> usize {
            match self.schedule() {
                MoveSchedule::Idle => 0,
                MoveSchedule::Deferred(_) => 1,
                MoveSchedule::Compound(compound) => compound.steps().len(),
            }
        }
    }
}
