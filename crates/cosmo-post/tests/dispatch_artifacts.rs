use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cosmo_core::{
    ColumnName, CosmoError, GaussianSumPipeline, ParameterSpace, Pipeline, PipelineOutput,
};
use cosmo_output::{InMemoryOutput, OutputSink, TextOutput};
use cosmo_post::{dispatch, postprocess, postprocess_sampler, PostprocessMeta, PostprocessorKind};
use cosmo_sampler::{Coordinator, PipelineFactory, SamplerOptions, SamplerRegistry, SamplerRun};
use tempfile::tempdir;

fn factory() -> PipelineFactory {
    Arc::new(|| Ok(Box::new(GaussianSumPipeline::new()?) as Box<dyn Pipeline>))
}

fn run_into(name: &str, options: SamplerOptions, output: &mut dyn OutputSink) {
    let registry = SamplerRegistry::builtin().expect("registry");
    let coordinator = Coordinator::pooled(factory(), 0).expect("coordinator");
    let mut run = SamplerRun::new(&registry, name, options, coordinator, 11).expect("run");
    run.run(output).expect("run to completion");
}

fn run_sampler(name: &str, options: SamplerOptions) -> InMemoryOutput {
    let mut output = InMemoryOutput::new();
    run_into(name, options, &mut output);
    output
}

fn meta(outdir: &Path, prefix: Option<&str>) -> PostprocessMeta {
    PostprocessMeta {
        outdir: outdir.to_path_buf(),
        prefix: prefix.map(str::to_owned),
        ..PostprocessMeta::default()
    }
}

fn expect_files(dir: &Path, prefix: &str, stems: &[&str], files: &[PathBuf]) {
    for stem in stems {
        let wanted = dir.join(format!("{prefix}_{stem}.png"));
        assert!(files.contains(&wanted), "missing {}", wanted.display());
        assert!(wanted.exists(), "not on disk: {}", wanted.display());
    }
}

#[test]
fn dispatch_follows_the_registered_chain_shape() {
    let registry = SamplerRegistry::builtin().unwrap();
    let expected = [
        ("emcee", Some(PostprocessorKind::Chain)),
        ("metropolis", Some(PostprocessorKind::Chain)),
        ("nested", Some(PostprocessorKind::Weighted)),
        ("importance", Some(PostprocessorKind::Weighted)),
        ("grid", Some(PostprocessorKind::Grid)),
        ("star", Some(PostprocessorKind::Star)),
        ("maxlike", Some(PostprocessorKind::SinglePoint)),
        ("test", None),
        ("apriori", None),
        ("EMCEE", Some(PostprocessorKind::Chain)),
    ];
    for (name, kind) in expected {
        assert_eq!(dispatch(&registry, name).unwrap(), kind, "{name}");
    }
    match dispatch(&registry, "multinest") {
        Err(CosmoError::Configuration(info)) => {
            assert_eq!(info.code, "sampler-unknown");
            assert_eq!(info.context["sampler"], "multinest");
        }
        other => panic!("unexpected dispatch result: {other:?}"),
    }
}

#[test]
fn emcee_chain_gets_marginals_pairs_and_extras() {
    let output = run_sampler(
        "emcee",
        SamplerOptions::new("emcee")
            .with("walkers", 8)
            .with("samples", 100)
            .with("nsteps", 25),
    );
    let dir = tempdir().unwrap();
    let mut settings = meta(dir.path(), Some("emcee"));
    settings.truth = Some(vec![0.0, 0.0]);
    settings.burn = 0.2;
    let files = postprocess(PostprocessorKind::Chain, &output, &settings).unwrap();
    expect_files(
        dir.path(),
        "emcee",
        &[
            "parameters--p1",
            "parameters--p2",
            "parameters--p3",
            "2D_parameters--p2_parameters--p1",
            "2D_parameters--p3_parameters--p1",
            "2D_parameters--p3_parameters--p2",
        ],
        &files,
    );
    let means = dir.path().join("emcee_means.txt");
    assert_eq!(files.last(), Some(&means));
    let summary = fs::read_to_string(&means).unwrap();
    let p1_line = summary
        .lines()
        .find(|line| line.starts_with("parameters--p1\t"))
        .expect("p1 summary");
    let mean: f64 = p1_line.split('\t').nth(1).unwrap().parse().unwrap();
    assert!(mean.abs() < 1.0, "p1 mean {mean}");
    assert_eq!(files.len(), 7);
}

#[test]
fn extras_can_be_left_out() {
    let output = run_sampler(
        "metropolis",
        SamplerOptions::new("metropolis")
            .with("samples", 200)
            .with("nsteps", 50),
    );
    let dir = tempdir().unwrap();
    let mut settings = meta(dir.path(), Some("metropolis"));
    settings.include_extras = false;
    let files = postprocess(PostprocessorKind::Chain, &output, &settings).unwrap();
    assert!(files
        .iter()
        .all(|path| !path.to_string_lossy().contains("p3")));
    assert_eq!(files.len(), 4);
}

#[test]
fn grid_plots_parameters_only() {
    let output = run_sampler(
        "grid",
        SamplerOptions::new("grid").with("nsample_dimension", 8),
    );
    let dir = tempdir().unwrap();
    let registry = SamplerRegistry::builtin().unwrap();
    let files = postprocess_sampler(&registry, "grid", &output, &meta(dir.path(), Some("grid")))
        .unwrap();
    expect_files(
        dir.path(),
        "grid",
        &[
            "parameters--p1",
            "parameters--p2",
            "2D_parameters--p2_parameters--p1",
        ],
        &files,
    );
    assert!(!dir.path().join("grid_parameters--p3.png").exists());
    assert_eq!(files.len(), 4);
}

#[test]
fn star_has_no_pairs() {
    let output = run_sampler(
        "star",
        SamplerOptions::new("star").with("nsample_dimension", 9),
    );
    let dir = tempdir().unwrap();
    let files = postprocess(PostprocessorKind::Star, &output, &meta(dir.path(), Some("star"))).unwrap();
    expect_files(dir.path(), "star", &["parameters--p1", "parameters--p2"], &files);
    assert!(files
        .iter()
        .all(|path| !path.to_string_lossy().contains("2D_")));
    let summary = fs::read_to_string(dir.path().join("star_means.txt")).unwrap();
    assert!(summary.starts_with("# column\tbest_fit"));
    // The scan through the origin peaks at the centre of each axis.
    for line in summary.lines().skip(1) {
        let best: f64 = line.split('\t').nth(1).unwrap().parse().unwrap();
        assert!(best.abs() < 1e-9, "{line}");
    }
}

#[test]
fn single_point_reports_the_best_fit() {
    let output = run_sampler("maxlike", SamplerOptions::new("maxlike"));
    let dir = tempdir().unwrap();
    let files =
        postprocess(PostprocessorKind::SinglePoint, &output, &meta(dir.path(), Some("maxlike")))
            .unwrap();
    expect_files(
        dir.path(),
        "maxlike",
        &["parameters--p1", "parameters--p2", "parameters--p3"],
        &files,
    );
    assert!(files
        .iter()
        .all(|path| !path.to_string_lossy().contains("2D_")));
    let summary = fs::read_to_string(dir.path().join("maxlike_means.txt")).unwrap();
    assert!(summary.lines().any(|line| line.starts_with("post\t")));
}

#[test]
fn names_without_a_prefix_drop_the_separator() {
    let output = run_sampler(
        "nested",
        SamplerOptions::new("nested")
            .with("live_points", 40)
            .with("nsteps", 50),
    );
    let dir = tempdir().unwrap();
    let files = postprocess(PostprocessorKind::Weighted, &output, &meta(dir.path(), None)).unwrap();
    for stem in [
        "parameters--p1.png",
        "parameters--p2.png",
        "2D_parameters--p2_parameters--p1.png",
        "means.txt",
    ] {
        let wanted = dir.path().join(stem);
        assert!(files.contains(&wanted), "missing {stem}");
    }
}

/// Reference likelihood shifted far below the range where `exp` is representable.
struct Offset {
    inner: GaussianSumPipeline,
}

impl Pipeline for Offset {
    fn parameters(&self) -> &ParameterSpace {
        self.inner.parameters()
    }

    fn extra_outputs(&self) -> &[ColumnName] {
        self.inner.extra_outputs()
    }

    fn evaluate(&self, vector: &[f64]) -> Result<PipelineOutput, CosmoError> {
        let mut output = self.inner.evaluate(vector)?;
        output.posterior -= 1000.0;
        Ok(output)
    }
}

#[test]
fn weighted_means_survive_tiny_likelihoods() {
    let factory: PipelineFactory = Arc::new(|| {
        Ok(Box::new(Offset {
            inner: GaussianSumPipeline::new()?,
        }) as Box<dyn Pipeline>)
    });
    let registry = SamplerRegistry::builtin().unwrap();
    let coordinator = Coordinator::pooled(factory, 0).unwrap();
    let options = SamplerOptions::new("nested")
        .with("live_points", 50)
        .with("max_iterations", 400);
    let mut run = SamplerRun::new(&registry, "nested", options, coordinator, 11).unwrap();
    let mut output = InMemoryOutput::new();
    run.run(&mut output).unwrap();
    assert!(output.column("weight").unwrap().iter().all(|w| *w == 0.0));

    let dir = tempdir().unwrap();
    let files = postprocess_sampler(&registry, "nested", &output, &meta(dir.path(), Some("n")))
        .unwrap();
    expect_files(
        dir.path(),
        "n",
        &["parameters--p1", "parameters--p2", "2D_parameters--p2_parameters--p1"],
        &files,
    );
    let summary = fs::read_to_string(dir.path().join("n_means.txt")).unwrap();
    for line in summary.lines().skip(1) {
        let mut fields = line.split('\t').skip(1);
        let mean: f64 = fields.next().unwrap().parse().unwrap();
        let std: f64 = fields.next().unwrap().parse().unwrap();
        assert!(mean.is_finite() && std.is_finite(), "{line}");
    }
}

#[test]
fn samplers_without_postprocessor_write_nothing() {
    let output = run_sampler("test", SamplerOptions::new("test"));
    let dir = tempdir().unwrap();
    let outdir = dir.path().join("plots");
    let registry = SamplerRegistry::builtin().unwrap();
    let files = postprocess_sampler(&registry, "test", &output, &meta(&outdir, None)).unwrap();
    assert!(files.is_empty());
    assert!(!outdir.exists());
}

#[test]
fn chain_read_back_from_disk_postprocesses_like_memory() {
    let dir = tempdir().unwrap();
    let chain = dir.path().join("chain.csv");
    let options = || {
        SamplerOptions::new("emcee")
            .with("walkers", 8)
            .with("samples", 40)
            .with("nsteps", 10)
    };
    let mut text = TextOutput::create(&chain).unwrap();
    run_into("emcee", options(), &mut text);
    let reopened = TextOutput::open(&chain).unwrap();
    let memory = run_sampler("emcee", options());

    let disk_dir = dir.path().join("disk");
    let memory_dir = dir.path().join("memory");
    let from_disk = postprocess(PostprocessorKind::Chain, &reopened, &meta(&disk_dir, Some("c"))).unwrap();
    let from_memory =
        postprocess(PostprocessorKind::Chain, &memory, &meta(&memory_dir, Some("c"))).unwrap();
    let strip = |files: &[PathBuf], base: &Path| -> Vec<PathBuf> {
        files
            .iter()
            .map(|path| path.strip_prefix(base).unwrap().to_path_buf())
            .collect()
    };
    assert_eq!(strip(&from_disk, &disk_dir), strip(&from_memory, &memory_dir));
    assert_eq!(
        fs::read_to_string(disk_dir.join("c_means.txt")).unwrap(),
        fs::read_to_string(memory_dir.join("c_means.txt")).unwrap()
    );
}

#[test]
fn bad_settings_fail_before_plotting() {
    let output = run_sampler(
        "emcee",
        SamplerOptions::new("emcee")
            .with("walkers", 8)
            .with("samples", 10)
            .with("nsteps", 10),
    );
    let dir = tempdir().unwrap();

    let mut burned = meta(dir.path(), Some("emcee"));
    burned.burn = 1000.0;
    match postprocess(PostprocessorKind::Chain, &output, &burned) {
        Err(CosmoError::Configuration(info)) => assert_eq!(info.code, "postprocess-burn"),
        other => panic!("unexpected result: {other:?}"),
    }

    let mut truth = meta(dir.path(), Some("emcee"));
    truth.truth = Some(vec![0.0]);
    match postprocess(PostprocessorKind::Chain, &output, &truth) {
        Err(CosmoError::Configuration(info)) => {
            assert_eq!(info.code, "truth-length");
            assert_eq!(info.context["expected"], "2");
        }
        other => panic!("unexpected result: {other:?}"),
    }

    let empty = InMemoryOutput::new();
    match postprocess(PostprocessorKind::Chain, &empty, &meta(dir.path(), None)) {
        Err(CosmoError::Output(info)) => assert_eq!(info.code, "postprocess-empty"),
        other => panic!("unexpected result: {other:?}"),
    }
}
