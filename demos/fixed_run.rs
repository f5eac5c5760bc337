//! Start a speciation parameter from fixed values and run a few updates.
//!
//! ```bash
//! cargo run --example fixed_run -- <regime 1-7> <net diversification> <relative death> <sampling fraction>
//! ```
//!
//! Invalid startup values end the program with status 1. Updates go through
//! the chain driver, which finishes the deferred test of the Yule regime.

use rand::SeedableRng;
use rand::rngs::StdRng;
use speciation_models::{
    ChainContext, McmcConfig, Parameter, SpeciationConfig, SpeciationModel, StartupValues,
    TreePriorOracle, TreeTimePrior, run_speciation_chain,
};

/// Internal node ages of a small ultrametric tree.
struct SmallTree {
    node_ages: [f64; 5],
}

impl TreePriorOracle for SmallTree {
    fn num_taxa(&self) -> usize {
        self.node_ages.len() + 1
    }

    fn birth_death_log_prob(&self, net_div: f64, rel_death: f64) -> f64 {
        self.node_ages
            .iter()
            .map(|age| -net_div * age - 2.0 * (1.0 - rel_death * (-net_div * age).exp()).ln())
            .sum()
    }

    fn birth_death_sampling_log_prob(
        &self,
        net_div: f64,
        rel_death: f64,
        fossil_rate: f64,
        _rho: f64,
        origin_time: f64,
    ) -> f64 {
        self.birth_death_log_prob(net_div, rel_death) - fossil_rate * origin_time
    }

    fn calibrated_bdss_log_prob(&self, birth: f64, death: f64, fossil_rate: f64, rho: f64) -> f64 {
        self.birth_death_sampling_log_prob(birth - death, death / birth, fossil_rate, rho, 3.0)
    }

    fn ancestral_calibrated_bdss_log_prob(
        &self,
        birth: f64,
        death: f64,
        fossil_rate: f64,
        rho: f64,
    ) -> f64 {
        self.calibrated_bdss_log_prob(birth, death, fossil_rate, rho)
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_target(false).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let arg = |index: usize, default: &str| -> String {
        args.get(index).cloned().unwrap_or_else(|| default.to_string())
    };
    let prior = TreeTimePrior::from_tag(arg(0, "3").parse()?)?;
    let startup = StartupValues::fixed(
        arg(1, "1.0").parse()?,
        arg(2, "0.5").parse()?,
        arg(3, "0.3").parse()?,
    );

    let mut context = ChainContext::new(
        SmallTree {
            node_ages: [2.8, 1.9, 1.1, 0.6, 0.2],
        },
        prior,
    )
    .with_origin_time(3.0)
    .with_fixed_startup(true);
    let config = SpeciationConfig {
        startup,
        ..SpeciationConfig::default()
    };

    let mut rng = StdRng::seed_from_u64(2_026);
    let mut model = SpeciationModel::new(&mut rng, &context, config)?;
    println!("regime {} ({prior:?})", prior.tag());
    print!("{model}");

    let mcmc = McmcConfig {
        iterations: 25,
        burn_in: 0,
        thin: 1,
        seed: 2_026,
    };
    let report = run_speciation_chain(&mut model, &mut context, &mut rng, mcmc, 0.0)?;
    print!("{}", model.write_param());

    let rates = report.acceptance_rates;
    println!(
        "Acceptance rates: relative death={:.2}, net diversification={:.2}, sampling fraction={:.2}",
        rates.relative_death, rates.net_diversification, rates.prob_speciation_s
    );
    Ok(())
}
