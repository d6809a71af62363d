use std::fs;
use std::sync::Arc;

use cosmo_core::{CosmoError, GaussianSumPipeline, Pipeline};
use cosmo_output::{InMemoryOutput, OutputSink};
use cosmo_sampler::checkpoint::EnsembleCheckpoint;
use cosmo_sampler::{Coordinator, PipelineFactory, SamplerOptions, SamplerRegistry, SamplerRun};
use tempfile::tempdir;

fn factory() -> PipelineFactory {
    Arc::new(|| Ok(Box::new(GaussianSumPipeline::new()?) as Box<dyn Pipeline>))
}

fn run_emcee(options: SamplerOptions) -> Result<InMemoryOutput, CosmoError> {
    let registry = SamplerRegistry::builtin()?;
    let coordinator = Coordinator::pooled(factory(), 0)?;
    let mut run = SamplerRun::new(&registry, "emcee", options, coordinator, 77)?;
    let mut output = InMemoryOutput::new();
    run.run(&mut output)?;
    Ok(output)
}

#[test]
fn start_file_with_wrong_shape_is_rejected() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("start.txt");
    fs::write(&path, "0.1 0.2\n0.3 0.4\n0.5 0.6\n").expect("write");
    let options = SamplerOptions::new("emcee")
        .with("walkers", 4)
        .with("samples", 2)
        .with("start_points", path.display().to_string());
    let err = run_emcee(options).unwrap_err();
    assert!(matches!(err, CosmoError::Configuration(_)));
    assert_eq!(err.info().code, "start-shape");
    assert_eq!(err.info().context["expected"], "(4, 2)");
    assert_eq!(err.info().context["actual"], "(3, 2)");
}

#[test]
fn start_file_seeds_the_walkers() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("start.txt");
    fs::write(&path, "# p1 p2\n0.1 0.2\n-0.3 0.4\n0.5 -0.6\n0.7 0.8\n").expect("write");
    let options = SamplerOptions::new("emcee")
        .with("walkers", 4)
        .with("samples", 3)
        .with("nsteps", 3)
        .with("start_points", path.display().to_string());
    let output = run_emcee(options).expect("run");
    assert_eq!(output.len(), 12);
}

#[test]
fn dashed_start_key_is_accepted() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("start.txt");
    fs::write(&path, "0.1 0.2
-0.3 0.4
0.5 -0.6
0.7 0.8
").expect("write");
    let options = |key: &str| {
        SamplerOptions::new("emcee")
            .with("walkers", 4)
            .with("samples", 3)
            .with("nsteps", 3)
            .with(key, path.display().to_string())
    };
    let underscored = run_emcee(options("start_points")).expect("run");
    let dashed = run_emcee(options("start-points")).expect("run");
    let bits = |output: &InMemoryOutput| -> Vec<u64> {
        output
            .rows()
            .expect("rows")
            .iter()
            .flatten()
            .map(|value| value.to_bits())
            .collect()
    };
    assert_eq!(bits(&underscored), bits(&dashed));

    fs::write(&path, "0.1 0.2
").expect("write");
    let err = run_emcee(options("start-points")).unwrap_err();
    assert_eq!(err.info().code, "start-shape");
}

#[test]
fn resumed_run_continues_the_chain() {
    let dir = tempdir().expect("tempdir");
    let checkpoint = dir.path().join("state/emcee.json");
    let base = SamplerOptions::new("emcee")
        .with("walkers", 6)
        .with("nsteps", 5)
        .with("checkpoint", checkpoint.display().to_string());

    let full = run_emcee(base.clone().with("samples", 20)).expect("full run");

    run_emcee(base.clone().with("samples", 10)).expect("first half");
    let saved = EnsembleCheckpoint::load(&checkpoint).expect("checkpoint");
    assert_eq!(saved.steps, 10);
    assert_eq!(saved.walkers.len(), 6);

    let second = run_emcee(base.with("samples", 20).with("resume", true)).expect("second half");
    assert_eq!(second.len(), 10 * 6);
    let full_rows = full.rows().expect("rows");
    let tail = &full_rows[full_rows.len() - second.len()..];
    let resumed = second.rows().expect("rows");
    for (a, b) in tail.iter().zip(&resumed) {
        for (x, y) in a.iter().zip(b) {
            assert!(x == y || (x.is_nan() && y.is_nan()));
        }
    }
}

#[test]
fn checkpoint_of_another_ensemble_is_rejected() {
    let dir = tempdir().expect("tempdir");
    let checkpoint = dir.path().join("emcee.json");
    let options = SamplerOptions::new("emcee")
        .with("walkers", 6)
        .with("samples", 5)
        .with("checkpoint", checkpoint.display().to_string());
    run_emcee(options.clone()).expect("first run");
    let err = run_emcee(options.with("walkers", 8).with("resume", true)).unwrap_err();
    assert_eq!(err.info().code, "checkpoint-shape");
}
