//! Posterior trace storage, summaries and convergence heuristics.

use comfy_table::{Cell, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};

use crate::utils::{percentile, usize_to_f64};

use super::rates::SpeciationRates;

/// One retained state of the speciation chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeciationDraw {
    pub iteration: usize,
    pub relative_death: f64,
    pub net_diversification: f64,
    pub prob_speciation_s: f64,
    pub extant_sample_rate: f64,
    pub birth_rate: f64,
    pub death_rate: f64,
    pub fossil_rate: f64,
    pub ln_tree_prob: f64,
}

impl SpeciationDraw {
    #[must_use]
    pub const fn from_rates(iteration: usize, rates: &SpeciationRates, ln_tree_prob: f64) -> Self {
        Self {
            iteration,
            relative_death: rates.relative_death(),
            net_diversification: rates.net_diversification(),
            prob_speciation_s: rates.prob_speciation_s(),
            extant_sample_rate: rates.extant_sample_rate(),
            birth_rate: rates.birth_rate(),
            death_rate: rates.death_rate(),
            fossil_rate: rates.fossil_rate(),
            ln_tree_prob,
        }
    }
}

/// Retained draws in iteration order.
#[derive(Debug, Clone, Default)]
pub struct SpeciationTrace {
    pub draws: Vec<SpeciationDraw>,
}

impl SpeciationTrace {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            draws: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, draw: SpeciationDraw) {
        self.draws.push(draw);
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.draws.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    /// Values of one field across all draws.
    pub fn column(&self, field: impl Fn(&SpeciationDraw) -> f64) -> Vec<f64> {
        self.draws.iter().map(field).collect()
    }
}

/// Marginal posterior summary of one scalar.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ParameterSummary {
    pub mean: f64,
    pub std_dev: f64,
    pub q025: f64,
    pub q50: f64,
    pub q975: f64,
    /// Effective sample size.
    pub ess: f64,
}

/// Summaries of every primary and derived rate.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpeciationPosteriorSummary {
    pub relative_death: ParameterSummary,
    pub net_diversification: ParameterSummary,
    pub prob_speciation_s: ParameterSummary,
    pub extant_sample_rate: ParameterSummary,
    pub birth_rate: ParameterSummary,
    pub death_rate: ParameterSummary,
    pub fossil_rate: ParameterSummary,
    pub draw_count: usize,
}

impl SpeciationPosteriorSummary {
    /// Rows in display order.
    #[must_use]
    pub const fn rows(&self) -> [(&'static str, ParameterSummary); 7] {
        [
            ("relative_death", self.relative_death),
            ("net_diversification", self.net_diversification),
            ("prob_speciation_s", self.prob_speciation_s),
            ("extant_sample_rate", self.extant_sample_rate),
            ("birth_rate", self.birth_rate),
            ("death_rate", self.death_rate),
            ("fossil_rate", self.fossil_rate),
        ]
    }
}

/// Compute posterior summaries for all stored rates.
#[must_use]
pub fn summarize_trace(trace: &SpeciationTrace) -> SpeciationPosteriorSummary {
    let draw_count = trace.len();
    if draw_count == 0 {
        return SpeciationPosteriorSummary::default();
    }

    SpeciationPosteriorSummary {
        relative_death: summarize_scalar(&trace.column(|d| d.relative_death)),
        net_diversification: summarize_scalar(&trace.column(|d| d.net_diversification)),
        prob_speciation_s: summarize_scalar(&trace.column(|d| d.prob_speciation_s)),
        extant_sample_rate: summarize_scalar(&trace.column(|d| d.extant_sample_rate)),
        birth_rate: summarize_scalar(&trace.column(|d| d.birth_rate)),
        death_rate: summarize_scalar(&trace.column(|d| d.death_rate)),
        fossil_rate: summarize_scalar(&trace.column(|d| d.fossil_rate)),
        draw_count,
    }
}

/// Mean, population standard deviation, quantiles and ESS of a chain.
#[must_use]
pub fn summarize_scalar(values: &[f64]) -> ParameterSummary {
    if values.is_empty() {
        return ParameterSummary::default();
    }

    let n = usize_to_f64(values.len());
    let mean = values.iter().sum::<f64>() / n;
    let variance = values
        .iter()
        .map(|value| {
            let centered = value - mean;
            centered * centered
        })
        .sum::<f64>()
        / n;

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    ParameterSummary {
        mean,
        std_dev: variance.sqrt(),
        q025: percentile(&sorted, 0.025),
        q50: percentile(&sorted, 0.5),
        q975: percentile(&sorted, 0.975),
        ess: effective_sample_size(values),
    }
}

/// Lag-`k` autocorrelation for a scalar chain.
#[must_use]
pub fn autocorrelation(series: &[f64], lag: usize) -> f64 {
    if series.is_empty() || lag >= series.len() {
        return 0.0;
    }

    let mean = series.iter().sum::<f64>() / usize_to_f64(series.len());
    let denominator = series
        .iter()
        .map(|value| (value - mean) * (value - mean))
        .sum::<f64>();
    if denominator <= 0.0 {
        return 0.0;
    }

    let numerator = series
        .iter()
        .zip(&series[lag..])
        .map(|(a, b)| (a - mean) * (b - mean))
        .sum::<f64>();
    numerator / denominator
}

/// Effective sample size, truncating the autocorrelation sum at the first
/// non-positive lag.
#[must_use]
pub fn effective_sample_size(series: &[f64]) -> f64 {
    let n = series.len();
    if n < 2 {
        return usize_to_f64(n);
    }

    let mut rho_sum = 0.0;
    for lag in 1..n {
        let rho = autocorrelation(series, lag);
        if rho <= 0.0 {
            break;
        }
        rho_sum += rho;
    }

    usize_to_f64(n) / 2.0f64.mul_add(rho_sum, 1.0).max(1.0)
}

/// Render a summary as a `comfy_table` table.
#[must_use]
pub fn render_summary_table(summary: &SpeciationPosteriorSummary) -> Table {
    let mut table = make_table(&["rate", "mean", "sd", "2.5%", "50%", "97.5%", "ess"]);
    for (name, row) in summary.rows() {
        table.add_row(vec![
            Cell::new(name),
            Cell::new(format!("{:.4}", row.mean)),
            Cell::new(format!("{:.4}", row.std_dev)),
            Cell::new(format!("{:.4}", row.q025)),
            Cell::new(format!("{:.4}", row.q50)),
            Cell::new(format!("{:.4}", row.q975)),
            Cell::new(format!("{:.1}", row.ess)),
        ]);
    }
    table
}

fn make_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.iter().map(|h| Cell::new(*h)).collect::<Vec<_>>());
    table
}
