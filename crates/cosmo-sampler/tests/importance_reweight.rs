use std::fs;
use std::path::Path;
use std::sync::Arc;

use cosmo_core::{CosmoError, GaussianSumPipeline, Pipeline};
use cosmo_output::{InMemoryOutput, OutputSink, TextOutput};
use cosmo_sampler::{
    ChainShape, Coordinator, PipelineFactory, RunState, RunSummary, SamplerOptions,
    SamplerRegistry, SamplerRun,
};
use tempfile::tempdir;

fn factory() -> PipelineFactory {
    Arc::new(|| Ok(Box::new(GaussianSumPipeline::new()?) as Box<dyn Pipeline>))
}

fn run_into(
    name: &str,
    options: SamplerOptions,
    workers: usize,
    output: &mut dyn OutputSink,
) -> Result<RunSummary, CosmoError> {
    let registry = SamplerRegistry::builtin()?;
    let coordinator = Coordinator::pooled(factory(), workers)?;
    let mut run = SamplerRun::new(&registry, name, options, coordinator, 17)?;
    run.run(output)
}

fn reweight(
    input: &Path,
    chunk: usize,
    workers: usize,
) -> Result<(InMemoryOutput, RunSummary), CosmoError> {
    let options = SamplerOptions::new("importance")
        .with("input", input.display().to_string())
        .with("chunk", chunk);
    let mut output = InMemoryOutput::new();
    let summary = run_into("importance", options, workers, &mut output)?;
    Ok((output, summary))
}

#[test]
fn same_pipeline_gives_zero_log_weights() {
    let dir = tempdir().unwrap();
    let chain = dir.path().join("emcee.csv");
    let mut text = TextOutput::create(&chain).unwrap();
    let options = SamplerOptions::new("emcee")
        .with("walkers", 8)
        .with("samples", 20)
        .with("nsteps", 5);
    run_into("emcee", options, 0, &mut text).unwrap();

    let (output, summary) = reweight(&chain, 37, 2).unwrap();
    assert_eq!(summary.state, RunState::Converged);
    assert_eq!(summary.shape, ChainShape::Weighted);
    assert_eq!(output.len(), 160);
    // 160 rows in chunks of 37
    assert_eq!(summary.chunks, 5);

    let source = TextOutput::open(&chain).unwrap();
    assert_eq!(
        output.column("parameters--p1").unwrap(),
        source.column("parameters--p1").unwrap()
    );
    assert_eq!(output.column("old_post").unwrap(), source.column("post").unwrap());
    assert!(output.column("log_weight").unwrap().iter().all(|lw| *lw == 0.0));
    assert!(output.column("weight").unwrap().iter().all(|w| *w == 1.0));
}

#[test]
fn earlier_weights_carry_over() {
    let dir = tempdir().unwrap();
    let logged = dir.path().join("logged.csv");
    fs::write(
        &logged,
        "parameters--p1,parameters--p2,post,log_weight\n0.0,0.0,0.0,0.5\n1.0,-1.0,-2.0,-0.25\n",
    )
    .unwrap();
    let (output, _) = reweight(&logged, 100, 0).unwrap();
    let post = output.column("post").unwrap();
    let log_weight = output.column("log_weight").unwrap();
    assert_eq!(output.column("old_post").unwrap(), vec![0.0, -2.0]);
    assert!((log_weight[0] - (post[0] + 0.5)).abs() < 1e-12);
    assert!((log_weight[1] - (post[1] + 2.0 - 0.25)).abs() < 1e-12);

    let weighted = dir.path().join("weighted.csv");
    fs::write(
        &weighted,
        "parameters--p1,parameters--p2,post,weight\n0.5,0.5,-1.0,2.0\n",
    )
    .unwrap();
    let (output, _) = reweight(&weighted, 100, 0).unwrap();
    let post = output.column("post").unwrap()[0];
    let log_weight = output.column("log_weight").unwrap()[0];
    assert!((log_weight - (post + 1.0 + 2.0_f64.ln())).abs() < 1e-12);
}

#[test]
fn rejected_rows_get_zero_weight() {
    let dir = tempdir().unwrap();
    let chain = dir.path().join("rejected.csv");
    fs::write(
        &chain,
        "parameters--p1,parameters--p2,post\n0.0,0.0,-inf\n0.0,0.0,-1.0\n",
    )
    .unwrap();
    let (output, _) = reweight(&chain, 100, 0).unwrap();
    let log_weight = output.column("log_weight").unwrap();
    assert_eq!(log_weight[0], f64::NEG_INFINITY);
    assert_eq!(output.column("weight").unwrap()[0], 0.0);
    assert!(log_weight[1].is_finite());
}

#[test]
fn input_chain_needs_post_and_every_parameter() {
    let dir = tempdir().unwrap();
    let no_post = dir.path().join("no_post.csv");
    fs::write(&no_post, "parameters--p1,parameters--p2,prior\n0.0,0.0,-3.5\n").unwrap();
    match reweight(&no_post, 100, 0) {
        Err(CosmoError::Configuration(info)) => {
            assert_eq!(info.code, "importance-column");
            assert_eq!(info.context["column"], "post");
        }
        other => panic!("unexpected result: {other:?}"),
    }

    let no_p2 = dir.path().join("no_p2.csv");
    fs::write(&no_p2, "parameters--p1,post\n0.0,-1.0\n").unwrap();
    match reweight(&no_p2, 100, 0) {
        Err(CosmoError::Configuration(info)) => {
            assert_eq!(info.code, "importance-column");
            assert_eq!(info.context["column"], "parameters--p2");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn input_option_is_required() {
    let mut output = InMemoryOutput::new();
    let err = run_into("importance", SamplerOptions::new("importance"), 0, &mut output).unwrap_err();
    assert_eq!(err.info().code, "option-missing");
    assert_eq!(err.info().context["section"], "importance");
    assert_eq!(err.info().context["key"], "input");
}
