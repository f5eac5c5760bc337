#![forbid(unsafe_code)]

//! # `speciation_models`
//!
//! Birth-death(-sampling) speciation parameters for Bayesian divergence-time
//! samplers: constrained proposal kernels, the regime-dependent update of
//! the speciation rates, a sibling gamma-shape parameter, and a small chain
//! driver with posterior summaries.
//!
//! The host sampler supplies the tree densities through
//! [`TreePriorOracle`] and the rest of its state through [`ModelContext`].

pub mod inference;
pub mod models;
pub mod utils;

pub use inference::{
    Bounds, InferenceError, McmcConfig, ProposalStats, RandomSource, ScaleDraw, scale_move,
    should_accept, window_move,
};
pub use models::context::{ChainContext, ModelContext, TimeScale, TreePriorOracle};
pub use models::parameter::Parameter;
pub use models::shape::{
    GammaShape, SHAPE_PARAMETER_NAME, ShapeConfig, ShapeError, ShapeState, discrete_gamma_rates,
};
pub use models::speciation::{
    CompoundMove, DerivedRates, MAX_DIVERSIFICATION, MoveSchedule, ParameterSummary, PrimaryRate,
    Proposal, RateMove, SPECIATION_PARAMETER_NAME, SpeciationAcceptanceRates,
    SpeciationChainReport, SpeciationConfig, SpeciationDraw, SpeciationError,
    SpeciationFitOptions, SpeciationModel, SpeciationPosteriorSummary, SpeciationProposalTuning,
    SpeciationRates, SpeciationTrace, StartupValues, TreePriorQuery, TreeTimePrior,
    UpdateOutcome, autocorrelation, effective_sample_size, fit_speciation_chain,
    render_summary_table, run_speciation_chain, summarize_scalar, summarize_trace,
};
pub use utils::safe_exp;
