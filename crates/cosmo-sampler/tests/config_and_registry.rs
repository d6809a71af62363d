use cosmo_core::CosmoError;
use cosmo_output::OutputFormat;
use cosmo_sampler::samplers::test::TestSampler;
use cosmo_sampler::{ChainShape, RegistryBuilder, RunConfig, SamplerRegistry};

#[test]
fn builtin_registry_lists_every_variant_in_order() {
    let registry = SamplerRegistry::builtin().expect("registry");
    assert_eq!(
        registry.names(),
        vec![
            "test",
            "apriori",
            "emcee",
            "metropolis",
            "grid",
            "star",
            "maxlike",
            "nested",
            "importance"
        ]
    );
    assert_eq!(registry.lookup("EMCEE").expect("emcee").shape, ChainShape::Chain);
    assert_eq!(registry.lookup("star").expect("star").create().name(), "star");
}

#[test]
fn unknown_sampler_names_the_known_ones() {
    let registry = SamplerRegistry::builtin().expect("registry");
    let err = registry.lookup("multinest").unwrap_err();
    assert!(matches!(err, CosmoError::Configuration(_)));
    assert_eq!(err.info().context["sampler"], "multinest");
    assert!(err.info().context["known"].contains("nested"));
}

#[test]
fn duplicate_registration_is_rejected() {
    let err = RegistryBuilder::new()
        .register("test", ChainShape::None, TestSampler::boxed)
        .and_then(|builder| builder.register("Test", ChainShape::None, TestSampler::boxed))
        .unwrap_err();
    assert_eq!(err.info().code, "sampler-duplicate");
}

#[test]
fn run_config_reads_sections_and_defaults() {
    let yaml = r#"
sampler: emcee
seed_policy: { master_seed: 1234 }
pool: { workers: 4 }
output: { format: text, path: out/chain.csv }
postprocess: { outdir: out/plots, prefix: emcee }
emcee: { walkers: 8, samples: 100, nsteps: 10 }
"#;
    let config = RunConfig::from_yaml(yaml).expect("config");
    assert_eq!(config.seed_policy.master_seed, 1234);
    assert_eq!(config.pool.workers, 4);
    assert_eq!(config.output.format, OutputFormat::Text);
    let post = config.postprocess.as_ref().expect("postprocess");
    assert_eq!(post.prefix.as_deref(), Some("emcee"));
    assert_eq!(post.image_suffix, "png");
    assert_eq!(post.burn, 0.0);
    let options = config.sampler_options().expect("options");
    assert_eq!(options.usize_or("walkers", 0).expect("walkers"), 8);
    assert_eq!(options.f64_or("a", 2.0).expect("a"), 2.0);
}

#[test]
fn sampler_section_must_be_a_mapping() {
    let config = RunConfig::from_yaml("sampler: grid\ngrid: 12\n").expect("config");
    let err = config.sampler_options().unwrap_err();
    assert_eq!(err.info().code, "option-section");
    assert_eq!(err.info().context["section"], "grid");
}

#[test]
fn missing_sampler_key_is_a_configuration_error() {
    let err = RunConfig::from_yaml("pool: { workers: 2 }\n").unwrap_err();
    assert!(matches!(err, CosmoError::Configuration(_)));
}
