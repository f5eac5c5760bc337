//! Regime-specific tree-prior queries.

use crate::models::context::TreePriorOracle;
use crate::utils::usize_to_f64;

use super::rates::{DerivedRates, SpeciationRates};
use super::types::TreeTimePrior;

/// One tree-prior evaluation, carrying only the rates its regime reads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TreePriorQuery {
    /// Uniform prior on branching times; contributes nothing.
    Flat,
    /// Pure-birth density; `relative_death` is passed to the tree as held but
    /// adds no closed-form term.
    Yule {
        net_diversification: f64,
        relative_death: f64,
    },
    /// Conditioned birth-death on the ratio parameterization.
    BirthDeath {
        net_diversification: f64,
        relative_death: f64,
    },
    /// Birth-death serial sampling from the tree origin.
    BirthDeathSampling {
        net_diversification: f64,
        relative_death: f64,
        fossil_rate: f64,
        extant_sample_rate: f64,
        origin_time: f64,
    },
    /// Calibrated birth-death serial sampling on absolute rates.
    Calibrated {
        birth_rate: f64,
        death_rate: f64,
        fossil_rate: f64,
        extant_sample_rate: f64,
    },
    /// Calibrated birth-death serial sampling with sampled ancestors.
    AncestralCalibrated {
        birth_rate: f64,
        death_rate: f64,
        fossil_rate: f64,
        extant_sample_rate: f64,
    },
}

impl TreeTimePrior {
    /// Build the query for this regime. `origin_time` is only invoked for
    /// regimes conditioned on the origin.
    pub fn query(self, rates: &SpeciationRates, origin_time: impl FnOnce() -> f64) -> TreePriorQuery {
        match self {
            Self::Uniform => TreePriorQuery::Flat,
            Self::Yule => TreePriorQuery::Yule {
                net_diversification: rates.net_diversification(),
                relative_death: rates.relative_death(),
            },
            Self::BirthDeath => TreePriorQuery::BirthDeath {
                net_diversification: rates.net_diversification(),
                relative_death: rates.relative_death(),
            },
            Self::BirthDeathSampling | Self::BirthDeathSamplingConditioned => {
                TreePriorQuery::BirthDeathSampling {
                    net_diversification: rates.net_diversification(),
                    relative_death: rates.relative_death(),
                    fossil_rate: rates.fossil_rate(),
                    extant_sample_rate: rates.extant_sample_rate(),
                    origin_time: origin_time(),
                }
            }
            Self::CalibratedBirthDeathSampling => {
                let derived = recomputed(rates);
                TreePriorQuery::Calibrated {
                    birth_rate: derived.birth_rate,
                    death_rate: derived.death_rate,
                    fossil_rate: derived.fossil_rate,
                    extant_sample_rate: rates.extant_sample_rate(),
                }
            }
            Self::AncestralCalibratedBirthDeathSampling => {
                let derived = recomputed(rates);
                TreePriorQuery::AncestralCalibrated {
                    birth_rate: derived.birth_rate,
                    death_rate: derived.death_rate,
                    fossil_rate: derived.fossil_rate,
                    extant_sample_rate: rates.extant_sample_rate(),
                }
            }
        }
    }
}

// Calibrated regimes read absolute rates, so they are taken fresh from the
// primaries rather than from the cached block.
fn recomputed(rates: &SpeciationRates) -> DerivedRates {
    DerivedRates::from_primary(
        rates.net_diversification(),
        rates.relative_death(),
        rates.prob_speciation_s(),
    )
}

impl TreePriorQuery {
    /// Log probability of the tree's branching times.
    ///
    /// The conditioned birth-death density adds the closed-form terms
    /// `(n - 1) ln d + n ln(1 - r)` to the oracle's node-age density. Yule
    /// adds only `(n - 1) ln d`.
    pub fn evaluate<T: TreePriorOracle + ?Sized>(self, tree: &T) -> f64 {
        match self {
            Self::Flat => 0.0,
            Self::Yule {
                net_diversification,
                relative_death,
            } => {
                let taxa = usize_to_f64(tree.num_taxa());
                (taxa - 1.0).mul_add(
                    net_diversification.ln(),
                    tree.birth_death_log_prob(net_diversification, relative_death),
                )
            }
            Self::BirthDeath {
                net_diversification,
                relative_death,
            } => {
                let taxa = usize_to_f64(tree.num_taxa());
                let constant = (taxa - 1.0)
                    .mul_add(net_diversification.ln(), taxa * (1.0 - relative_death).ln());
                constant + tree.birth_death_log_prob(net_diversification, relative_death)
            }
            Self::BirthDeathSampling {
                net_diversification,
                relative_death,
                fossil_rate,
                extant_sample_rate,
                origin_time,
            } => tree.birth_death_sampling_log_prob(
                net_diversification,
                relative_death,
                fossil_rate,
                extant_sample_rate,
                origin_time,
            ),
            Self::Calibrated {
                birth_rate,
                death_rate,
                fossil_rate,
                extant_sample_rate,
            } => tree.calibrated_bdss_log_prob(
                birth_rate,
                death_rate,
                fossil_rate,
                extant_sample_rate,
            ),
            Self::AncestralCalibrated {
                birth_rate,
                death_rate,
                fossil_rate,
                extant_sample_rate,
            } => tree.ancestral_calibrated_bdss_log_prob(
                birth_rate,
                death_rate,
                fossil_rate,
                extant_sample_rate,
            ),
        }
    }
}
