use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use cosmo_output::{OutputConfig, OutputFormat};
use cosmo_sampler::{PostprocessMeta, RunConfig, SeedPolicy};

use super::run::execute;

#[derive(Args, Debug)]
pub struct DemoArgs {
    /// Sampler to run against the reference pipeline.
    #[arg(long, default_value = "emcee")]
    pub sampler: String,
    /// Master seed.
    #[arg(long, default_value_t = 2024)]
    pub seed: u64,
    /// Pooled workers; zero evaluates inline.
    #[arg(long, default_value_t = 0)]
    pub workers: usize,
    /// Output directory for the chain, plots and manifest.
    #[arg(long, default_value = "demo-out")]
    pub out: PathBuf,
}

/// Configuration used by `demo`: a text chain plus plots named after the sampler.
pub fn demo_config(args: &DemoArgs) -> RunConfig {
    let mut config = RunConfig::for_sampler(args.sampler.to_lowercase());
    config.seed_policy = SeedPolicy {
        master_seed: args.seed,
        label: Some("demo".to_owned()),
    };
    config.pool.workers = args.workers;
    config.output = OutputConfig {
        format: OutputFormat::Text,
        path: Some(PathBuf::from("chain.csv")),
    };
    config.postprocess = Some(PostprocessMeta {
        outdir: PathBuf::from("plots"),
        prefix: Some(config.sampler.clone()),
        ..PostprocessMeta::default()
    });
    config
}

pub fn run(args: &DemoArgs) -> Result<(), Box<dyn Error>> {
    let manifest = execute(&demo_config(args), &args.out)?;
    println!("{}", serde_json::to_string_pretty(&manifest)?);
    Ok(())
}
