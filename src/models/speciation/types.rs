//! Core public types for the speciation module.

use thiserror::Error;

use crate::inference::{Bounds, InferenceError};

/// Upper bound on net diversification (`lambda - mu`).
pub const MAX_DIVERSIFICATION: f64 = 30_000.0;

/// Identifier the speciation parameter reports itself under.
pub const SPECIATION_PARAMETER_NAME: &str = "SP";

/// Errors returned by speciation configuration and construction.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum SpeciationError {
    #[error("the relative death rate (-bda) must be < 1; found {0}")]
    RelativeDeathOutOfRange(f64),
    #[error("the net diversification rate (-bdr) must be > 0; found {0}")]
    NonPositiveNetDiversification(f64),
    #[error("unknown tree-time prior tag {0}; expected 1 through 7")]
    UnknownTreeTimePrior(i64),
    #[error("invalid speciation proposal tuning")]
    InvalidProposalTuning,
    #[error(transparent)]
    Inference(#[from] InferenceError),
}

/// Tree-time prior regime selecting the speciation parameterization.
///
/// Tags `1..=7` match the numbering used on the command line of dating
/// programs built on this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeTimePrior {
    /// No informative prior on branching times.
    Uniform,
    /// Pure-birth process; relative death pinned at zero.
    Yule,
    /// Birth-death process conditioned on the root.
    BirthDeath,
    /// Birth-death with serial (fossil) sampling, conditioned on the origin.
    BirthDeathSampling,
    /// Same speciation parameterization as [`Self::BirthDeathSampling`]; the
    /// tree applies its alternative conditioning.
    BirthDeathSamplingConditioned,
    /// Calibrated birth-death serial sampling on absolute rates.
    CalibratedBirthDeathSampling,
    /// Calibrated birth-death serial sampling allowing sampled ancestors.
    AncestralCalibratedBirthDeathSampling,
}

impl TreeTimePrior {
    /// # Errors
    ///
    /// Returns `SpeciationError::UnknownTreeTimePrior` outside `1..=7`.
    pub const fn from_tag(tag: i64) -> Result<Self, SpeciationError> {
        match tag {
            1 => Ok(Self::Uniform),
            2 => Ok(Self::Yule),
            3 => Ok(Self::BirthDeath),
            4 => Ok(Self::BirthDeathSampling),
            5 => Ok(Self::BirthDeathSamplingConditioned),
            6 => Ok(Self::CalibratedBirthDeathSampling),
            7 => Ok(Self::AncestralCalibratedBirthDeathSampling),
            other => Err(SpeciationError::UnknownTreeTimePrior(other)),
        }
    }

    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::Uniform => 1,
            Self::Yule => 2,
            Self::BirthDeath => 3,
            Self::BirthDeathSampling => 4,
            Self::BirthDeathSamplingConditioned => 5,
            Self::CalibratedBirthDeathSampling => 6,
            Self::AncestralCalibratedBirthDeathSampling => 7,
        }
    }

    /// All regimes in tag order.
    #[must_use]
    pub const fn all() -> [Self; 7] {
        [
            Self::Uniform,
            Self::Yule,
            Self::BirthDeath,
            Self::BirthDeathSampling,
            Self::BirthDeathSamplingConditioned,
            Self::CalibratedBirthDeathSampling,
            Self::AncestralCalibratedBirthDeathSampling,
        ]
    }

    /// Whether the regime puts any density on branching times.
    #[must_use]
    pub const fn is_informative(self) -> bool {
        !matches!(self, Self::Uniform)
    }

    /// Whether relative death is a free parameter.
    #[must_use]
    pub const fn moves_relative_death(self) -> bool {
        !matches!(self, Self::Uniform | Self::Yule)
    }

    /// Whether the regime models fossil sampling.
    #[must_use]
    pub const fn samples_fossils(self) -> bool {
        self.tag() >= 4
    }

    /// Whether the tree-prior query needs the origin time of the time scale.
    #[must_use]
    pub const fn needs_origin_time(self) -> bool {
        matches!(
            self,
            Self::BirthDeathSampling | Self::BirthDeathSamplingConditioned
        )
    }

    /// Whether the regime is expressed in absolute birth/death/fossil rates.
    #[must_use]
    pub const fn uses_calibrated_rates(self) -> bool {
        matches!(
            self,
            Self::CalibratedBirthDeathSampling | Self::AncestralCalibratedBirthDeathSampling
        )
    }
}

/// Fixed startup values used for test runs.
///
/// When both `net_diversification` and `relative_death` are negative the
/// values are redrawn at random instead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StartupValues {
    /// Fixed `lambda - mu` (`-bdr`).
    pub net_diversification: f64,
    /// Fixed `mu / lambda` (`-bda`).
    pub relative_death: f64,
    /// Fixed fraction of sampled lineages that are extant samples (`-bds`).
    pub prob_speciation_s: f64,
}

impl Default for StartupValues {
    fn default() -> Self {
        Self {
            net_diversification: -1.0,
            relative_death: -1.0,
            prob_speciation_s: 0.5,
        }
    }
}

impl StartupValues {
    #[must_use]
    pub const fn fixed(net_diversification: f64, relative_death: f64, prob_speciation_s: f64) -> Self {
        Self {
            net_diversification,
            relative_death,
            prob_speciation_s,
        }
    }

    /// Whether the values are the "draw at random" sentinel.
    #[must_use]
    pub fn draws_randomly(self) -> bool {
        self.relative_death < 0.0 && self.net_diversification < 0.0
    }
}

/// Proposal widths and parameter supports for the speciation moves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeciationProposalTuning {
    /// Sliding-window width for relative death.
    pub relative_death_window: f64,
    /// Support of relative death.
    pub relative_death_bounds: Bounds,
    /// Scale-move tuning for net diversification.
    pub net_diversification_tuning: f64,
    /// Lower bound for net diversification.
    pub net_diversification_min: f64,
    /// Upper bound for net diversification, also used for startup reflection.
    pub max_diversification: f64,
    /// Sliding-window width for the speciation sampling fraction and `rho`.
    pub sampling_window: f64,
    /// Support of the speciation sampling fraction and `rho`.
    pub sampling_bounds: Bounds,
    /// Scale-move tuning for the fossil rate.
    pub fossil_rate_tuning: f64,
    /// Support of the fossil rate.
    pub fossil_rate_bounds: Bounds,
}

impl Default for SpeciationProposalTuning {
    fn default() -> Self {
        Self {
            relative_death_window: 0.2,
            relative_death_bounds: Bounds::unchecked(0.0, 0.99999),
            net_diversification_tuning: std::f64::consts::LN_2,
            net_diversification_min: 0.0001,
            max_diversification: MAX_DIVERSIFICATION,
            sampling_window: 0.2,
            sampling_bounds: Bounds::unchecked(0.0, 0.9999),
            fossil_rate_tuning: std::f64::consts::LN_2,
            fossil_rate_bounds: Bounds::unchecked(0.0001, 100.0),
        }
    }
}

impl SpeciationProposalTuning {
    /// Support of net diversification, `[net_diversification_min, max_diversification]`.
    ///
    /// # Errors
    ///
    /// Returns `InferenceError::InvalidBounds` for an empty range.
    pub fn net_diversification_bounds(&self) -> Result<Bounds, InferenceError> {
        Bounds::new(self.net_diversification_min, self.max_diversification)
    }

    /// Whether tuning settings are numerically valid.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        let positive = |value: f64| value.is_finite() && value > 0.0;
        positive(self.relative_death_window)
            && positive(self.net_diversification_tuning)
            && positive(self.net_diversification_min)
            && positive(self.sampling_window)
            && positive(self.fossil_rate_tuning)
            && self.fossil_rate_bounds.min() > 0.0
            && self.relative_death_bounds.min() >= 0.0
            && self.relative_death_bounds.max() < 1.0
            && self.sampling_bounds.min() >= 0.0
            && self.sampling_bounds.max() < 1.0
            && self.net_diversification_bounds().is_ok()
    }
}

/// Full configuration of a speciation parameter.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpeciationConfig {
    pub startup: StartupValues,
    pub tuning: SpeciationProposalTuning,
}

impl SpeciationConfig {
    /// # Errors
    ///
    /// Returns `SpeciationError::InvalidProposalTuning` if the tuning block is invalid.
    pub fn validate(&self) -> Result<(), SpeciationError> {
        if !self.tuning.is_valid() {
            return Err(SpeciationError::InvalidProposalTuning);
        }
        Ok(())
    }
}

/// Per-move acceptance rates of the speciation sampler.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpeciationAcceptanceRates {
    pub relative_death: f64,
    pub net_diversification: f64,
    pub prob_speciation_s: f64,
    pub extant_sample_rate: f64,
    pub fossil_rate: f64,
}
