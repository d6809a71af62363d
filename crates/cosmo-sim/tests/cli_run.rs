use std::fs;

use cosmo_core::CosmoError;
use cosmo_sampler::{RunConfig, RunManifest, RunState};
use cosmo_sim::commands::demo::{demo_config, DemoArgs};
use cosmo_sim::commands::run::execute;
use tempfile::tempdir;

const CONFIG: &str = r#"
sampler: emcee
seed_policy: { master_seed: 1234 }
pool: { workers: 2 }
output: { format: text, path: chain.csv }
postprocess: { outdir: plots, prefix: emcee, burn: 0.1 }
emcee: { walkers: 8, samples: 40, nsteps: 10 }
"#;

#[test]
fn yaml_run_writes_chain_plots_and_manifest() {
    let dir = tempdir().unwrap();
    let config = RunConfig::from_yaml(CONFIG).unwrap();
    let manifest = execute(&config, dir.path()).unwrap();

    assert_eq!(manifest.summary.state, RunState::Converged);
    assert_eq!(manifest.summary.rows, 320);
    assert_eq!(manifest.provenance.seed, 1234);
    assert_eq!(manifest.provenance.workers, 2);
    assert_eq!(manifest.provenance.config_hash.len(), 64);
    assert_eq!(manifest.chain, Some(dir.path().join("chain.csv")));
    assert!(dir.path().join("chain.csv").exists());
    assert!(dir.path().join("chain.csv.meta.json").exists());

    let plot = dir.path().join("plots").join("emcee_2D_parameters--p2_parameters--p1.png");
    assert!(manifest.artifacts.contains(&plot));
    for artifact in &manifest.artifacts {
        assert!(artifact.exists(), "{}", artifact.display());
    }

    let reloaded = RunManifest::load(&dir.path().join("manifest.json")).unwrap();
    assert_eq!(reloaded.summary, manifest.summary);
    assert_eq!(reloaded.artifacts, manifest.artifacts);
}

#[test]
fn demo_chain_does_not_depend_on_worker_count() {
    let dir = tempdir().unwrap();
    let chains: Vec<String> = [0usize, 3]
        .into_iter()
        .map(|workers| {
            let out = dir.path().join(format!("workers-{workers}"));
            let args = DemoArgs {
                sampler: "metropolis".to_owned(),
                seed: 99,
                workers,
                out: out.clone(),
            };
            let mut config = demo_config(&args);
            config.sections.insert(
                "metropolis".to_owned(),
                serde_yaml_value(&[("samples", 120), ("nsteps", 40)]),
            );
            execute(&config, &out).unwrap();
            fs::read_to_string(out.join("chain.csv")).unwrap()
        })
        .collect();
    assert_eq!(chains[0], chains[1]);
}

#[test]
fn samplers_without_postprocessor_leave_no_artifacts() {
    let dir = tempdir().unwrap();
    let config = RunConfig::from_yaml(
        "sampler: apriori\npostprocess: { outdir: plots }\napriori: { nsample: 30 }\n",
    )
    .unwrap();
    let manifest = execute(&config, dir.path()).unwrap();
    assert!(manifest.artifacts.is_empty());
    assert_eq!(manifest.chain, None);
    assert_eq!(manifest.summary.rows, 30);
}

#[test]
fn configuration_errors_stop_before_the_manifest() {
    let dir = tempdir().unwrap();
    let unknown = RunConfig::from_yaml("sampler: multinest\n").unwrap();
    match execute(&unknown, dir.path()) {
        Err(CosmoError::Configuration(info)) => assert_eq!(info.code, "sampler-unknown"),
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(!dir.path().join("manifest.json").exists());

    let bad_sigma = RunConfig::from_yaml("sampler: test\npipeline: { sigma: -1.0 }\n").unwrap();
    match execute(&bad_sigma, dir.path()) {
        Err(CosmoError::Configuration(info)) => {
            assert_eq!(info.code, "option-value");
            assert_eq!(info.context["section"], "pipeline");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

fn serde_yaml_value(entries: &[(&str, u64)]) -> serde_yaml::Value {
    let mut map = serde_yaml::Mapping::new();
    for (key, value) in entries {
        map.insert((*key).into(), (*value).into());
    }
    serde_yaml::Value::Mapping(map)
}
