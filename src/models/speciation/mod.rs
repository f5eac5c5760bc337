//! Speciation-process parameter for tree-dating samplers.
//!
//! The parameter holds relative death, net diversification, the fraction of
//! sampled lineages that are extant samples and the extant sampling
//! probability. Birth, death and fossil-recovery rates are derived from
//! them. Seven tree-time prior regimes select which rates move and which
//! tree-prior density the moves are tested against.

pub mod model;
pub mod moves;
pub mod posterior;
pub mod query;
pub mod rates;
pub mod sampler;
pub mod types;

pub use model::SpeciationModel;
pub use moves::{CompoundMove, MoveSchedule, Proposal, RateMove, UpdateOutcome};
pub use posterior::{
    ParameterSummary, SpeciationDraw, SpeciationPosteriorSummary, SpeciationTrace,
    autocorrelation, effective_sample_size, render_summary_table, summarize_scalar,
    summarize_trace,
};
pub use query::TreePriorQuery;
pub use rates::{DerivedRates, PrimaryRate, SpeciationRates};
pub use sampler::{
    SpeciationChainReport, SpeciationFitOptions, fit_speciation_chain, run_speciation_chain,
};
pub use types::{
    MAX_DIVERSIFICATION, SPECIATION_PARAMETER_NAME, SpeciationAcceptanceRates, SpeciationConfig,
    SpeciationError, SpeciationProposalTuning, StartupValues, TreeTimePrior,
};
