//! Rate moves, the compound move, and the outcome of one update.
//!
//! Every move has one acceptance protocol. A raw move mutates a single
//! primary rate and returns a [`Proposal`] holding the previous value and
//! the log Hastings ratio. Whoever owns the Metropolis-Hastings test for that
//! move restores `previous` on rejection:
//!
//! - a deferred move ([`UpdateOutcome::Deferred`]) hands its ratio to the
//!   outer driver, which tests it and restores its rate snapshot on rejection;
//! - a [`CompoundMove`] resolves each of its steps with a nested test against
//!   the tree-prior ratio before the next step runs, so the caller receives
//!   [`UpdateOutcome::Resolved`] and has nothing left to decide.

use super::rates::PrimaryRate;
use super::types::TreeTimePrior;

/// Single-rate proposal moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateMove {
    /// Sliding window on relative death.
    RelativeDeath,
    /// Scale move on net diversification.
    NetDiversification,
    /// Sliding window on the speciation sampling fraction.
    ProbSpeciationS,
    /// Sliding window on the extant sampling probability.
    ExtantSampleRate,
    /// Scale move on the fossil rate, written back through the sampling fraction.
    FossilRate,
}

impl RateMove {
    /// Primary rate written by the move.
    #[must_use]
    pub const fn target(self) -> PrimaryRate {
        match self {
            Self::RelativeDeath => PrimaryRate::RelativeDeath,
            Self::NetDiversification => PrimaryRate::NetDiversification,
            Self::ProbSpeciationS | Self::FossilRate => PrimaryRate::ProbSpeciationS,
            Self::ExtantSampleRate => PrimaryRate::ExtantSampleRate,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::RelativeDeath => "relative_death",
            Self::NetDiversification => "net_diversification",
            Self::ProbSpeciationS => "prob_speciation_s",
            Self::ExtantSampleRate => "extant_sample_rate",
            Self::FossilRate => "fossil_rate",
        }
    }
}

/// A raw move that has already been applied to the rate state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Proposal {
    pub rate_move: RateMove,
    /// Value of `rate_move.target()` before the move.
    pub previous: f64,
    /// Log proposal ratio; zero for symmetric moves.
    pub log_hastings_ratio: f64,
}

/// Ordered sequence of moves, each accepted or reverted on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompoundMove {
    steps: &'static [RateMove],
}

impl CompoundMove {
    #[must_use]
    pub const fn new(steps: &'static [RateMove]) -> Self {
        Self { steps }
    }

    #[must_use]
    pub const fn steps(&self) -> &'static [RateMove] {
        self.steps
    }
}

const BIRTH_DEATH_STEPS: &[RateMove] = &[RateMove::RelativeDeath, RateMove::NetDiversification];

const SAMPLING_STEPS: &[RateMove] = &[
    RateMove::RelativeDeath,
    RateMove::NetDiversification,
    RateMove::ProbSpeciationS,
];

/// What one update of a regime does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveSchedule {
    /// No speciation parameter is free.
    Idle,
    /// One move whose test is left to the caller.
    Deferred(RateMove),
    /// Moves resolved internally.
    Compound(CompoundMove),
}

impl TreeTimePrior {
    #[must_use]
    pub const fn schedule(self) -> MoveSchedule {
        match self {
            Self::Uniform => MoveSchedule::Idle,
            Self::Yule => MoveSchedule::Deferred(RateMove::NetDiversification),
            Self::BirthDeath => MoveSchedule::Compound(CompoundMove::new(BIRTH_DEATH_STEPS)),
            Self::BirthDeathSampling
            | Self::BirthDeathSamplingConditioned
            | Self::CalibratedBirthDeathSampling
            | Self::AncestralCalibratedBirthDeathSampling => {
                MoveSchedule::Compound(CompoundMove::new(SAMPLING_STEPS))
            }
        }
    }
}

/// Result of one update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UpdateOutcome {
    /// Nothing was proposed.
    Idle,
    /// A move is in place; the caller must test `log_ratio` and restore the
    /// rates it held before the update on rejection.
    Deferred { rate_move: RateMove, log_ratio: f64 },
    /// Every step was accepted or reverted internally.
    Resolved { accepted: usize, proposed: usize },
}

impl UpdateOutcome {
    /// Log Metropolis-Hastings ratio left for the caller; `0.0` unless deferred.
    #[must_use]
    pub const fn log_ratio(self) -> f64 {
        match self {
            Self::Deferred { log_ratio, .. } => log_ratio,
            Self::Idle | Self::Resolved { .. } => 0.0,
        }
    }

    #[must_use]
    pub const fn needs_decision(self) -> bool {
        matches!(self, Self::Deferred { .. })
    }
}
