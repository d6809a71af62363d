use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use cosmo_core::{CosmoError, ErrorInfo};
use cosmo_output::{open_sink, OutputFormat};
use cosmo_post::postprocess_sampler;
use cosmo_sampler::{Coordinator, RunConfig, RunManifest, SamplerRegistry, SamplerRun};
use tracing::info;

use crate::pipeline::reference_factory;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// YAML configuration describing the sampler run.
    #[arg(long)]
    pub config: PathBuf,
    /// Output directory for the manifest; relative chain and plot paths land here too.
    #[arg(long)]
    pub out: PathBuf,
    /// Override the configured number of pooled workers.
    #[arg(long)]
    pub workers: Option<usize>,
}

pub fn run(args: &RunArgs) -> Result<(), Box<dyn Error>> {
    let mut config = RunConfig::load(&args.config)?;
    if let Some(workers) = args.workers {
        config.pool.workers = workers;
    }
    let manifest = execute(&config, &args.out)?;
    println!("{}", serde_json::to_string_pretty(&manifest.summary)?);
    Ok(())
}

/// Runs `config` to completion, postprocesses and writes `manifest.json`
/// under `out`.
pub fn execute(config: &RunConfig, out: &Path) -> Result<RunManifest, CosmoError> {
    fs::create_dir_all(out).map_err(|err| {
        CosmoError::Output(
            ErrorInfo::new("run-mkdir", "failed to create the run directory")
                .with_context("path", out.display().to_string())
                .with_hint(err.to_string()),
        )
    })?;
    let config = rooted(config, out);
    let registry = SamplerRegistry::builtin()?;
    let options = config.sampler_options()?;
    let coordinator = Coordinator::pooled(reference_factory(&config)?, config.pool.workers)?;
    let mut output = open_sink(&config.output)?;
    info!(
        sampler = %config.sampler,
        workers = config.pool.workers,
        seed = config.seed_policy.master_seed,
        "starting run"
    );

    let mut sampler_run = SamplerRun::new(
        &registry,
        &config.sampler,
        options,
        coordinator,
        config.seed_policy.master_seed,
    )?;
    let summary = sampler_run.run(&mut *output)?;

    let mut manifest = RunManifest::new(&config, summary, config.pool.workers)?;
    if config.output.format == OutputFormat::Memory {
        manifest.chain = None;
    }
    if let Some(meta) = &config.postprocess {
        manifest.artifacts = postprocess_sampler(&registry, &config.sampler, &*output, meta)?;
    }
    manifest.write(&out.join("manifest.json"))?;
    info!(
        rows = manifest.summary.rows,
        artifacts = manifest.artifacts.len(),
        out = %out.display(),
        "run complete"
    );
    Ok(manifest)
}

/// Resolves relative chain and plot locations against the run directory.
fn rooted(config: &RunConfig, out: &Path) -> RunConfig {
    let mut config = config.clone();
    if let Some(path) = config.output.path.as_mut() {
        if path.is_relative() {
            *path = out.join(&*path);
        }
    }
    if let Some(meta) = config.postprocess.as_mut() {
        if meta.outdir.is_relative() {
            meta.outdir = out.join(&meta.outdir);
        }
    }
    config
}
