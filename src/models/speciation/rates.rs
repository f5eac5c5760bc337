//! Primary speciation rates and the rates derived from them.

/// Independently proposed speciation rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimaryRate {
    /// `mu / lambda`, in `[0, 1)`.
    RelativeDeath,
    /// `lambda - mu`, in `(0, max_diversification]`.
    NetDiversification,
    /// Fraction of sampled lineages that are extant samples, in `[0, 1)`.
    ProbSpeciationS,
    /// Sampling probability at the present (`rho`), in `[0, 1)`.
    ExtantSampleRate,
}

/// Birth, death and fossil-sampling rates implied by the primary rates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedRates {
    pub birth_rate: f64,
    pub death_rate: f64,
    pub fossil_rate: f64,
}

impl DerivedRates {
    /// `lambda = d / (1 - r)`, `mu = r d / (1 - r)`, `psi = s / (1 - s) * mu`.
    #[must_use]
    pub fn from_primary(
        net_diversification: f64,
        relative_death: f64,
        prob_speciation_s: f64,
    ) -> Self {
        let death_rate = (relative_death * net_diversification) / (1.0 - relative_death);
        Self {
            birth_rate: net_diversification / (1.0 - relative_death),
            death_rate,
            fossil_rate: (prob_speciation_s / (1.0 - prob_speciation_s)) * death_rate,
        }
    }
}

/// Complete rate state of a speciation parameter.
///
/// Derived rates are recomputed on every write to a primary rate, so a
/// snapshot restored after a rejected move is identical to the state before
/// the proposal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeciationRates {
    relative_death: f64,
    net_diversification: f64,
    prob_speciation_s: f64,
    extant_sample_rate: f64,
    derived: DerivedRates,
}

impl SpeciationRates {
    #[must_use]
    pub fn new(
        relative_death: f64,
        net_diversification: f64,
        prob_speciation_s: f64,
        extant_sample_rate: f64,
    ) -> Self {
        Self {
            relative_death,
            net_diversification,
            prob_speciation_s,
            extant_sample_rate,
            derived: DerivedRates::from_primary(
                net_diversification,
                relative_death,
                prob_speciation_s,
            ),
        }
    }

    #[must_use]
    pub const fn get(&self, rate: PrimaryRate) -> f64 {
        match rate {
            PrimaryRate::RelativeDeath => self.relative_death,
            PrimaryRate::NetDiversification => self.net_diversification,
            PrimaryRate::ProbSpeciationS => self.prob_speciation_s,
            PrimaryRate::ExtantSampleRate => self.extant_sample_rate,
        }
    }

    /// Overwrite one primary rate and recompute the derived rates.
    pub fn set(&mut self, rate: PrimaryRate, value: f64) {
        match rate {
            PrimaryRate::RelativeDeath => self.relative_death = value,
            PrimaryRate::NetDiversification => self.net_diversification = value,
            PrimaryRate::ProbSpeciationS => self.prob_speciation_s = value,
            PrimaryRate::ExtantSampleRate => self.extant_sample_rate = value,
        }
        self.refresh_derived();
    }

    fn refresh_derived(&mut self) {
        self.derived = DerivedRates::from_primary(
            self.net_diversification,
            self.relative_death,
            self.prob_speciation_s,
        );
    }

    #[must_use]
    pub const fn relative_death(&self) -> f64 {
        self.relative_death
    }

    #[must_use]
    pub const fn net_diversification(&self) -> f64 {
        self.net_diversification
    }

    #[must_use]
    pub const fn prob_speciation_s(&self) -> f64 {
        self.prob_speciation_s
    }

    #[must_use]
    pub const fn extant_sample_rate(&self) -> f64 {
        self.extant_sample_rate
    }

    #[must_use]
    pub const fn derived(&self) -> DerivedRates {
        self.derived
    }

    #[must_use]
    pub const fn birth_rate(&self) -> f64 {
        self.derived.birth_rate
    }

    #[must_use]
    pub const fn death_rate(&self) -> f64 {
        self.derived.death_rate
    }

    #[must_use]
    pub const fn fossil_rate(&self) -> f64 {
        self.derived.fossil_rate
    }
}
