use cosmo_core::errors::{CosmoError, ErrorInfo};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("sampler", "emcee")
        .with_context("reason", "example")
}

#[test]
fn configuration_error_surface() {
    let err = CosmoError::Configuration(sample_info("sampler-unknown", "no such sampler"));
    assert_eq!(err.info().code, "sampler-unknown");
    assert!(err.info().context.contains_key("sampler"));
    assert!(err.is_fatal());
}

#[test]
fn evaluation_error_is_not_fatal() {
    let err = CosmoError::Evaluation(sample_info("E001", "solver diverged"));
    assert_eq!(err.info().code, "E001");
    assert!(!err.is_fatal());
}

#[test]
fn contract_error_surface() {
    let err = CosmoError::Contract(sample_info("vector-length", "wrong length"));
    assert!(err.info().context.contains_key("reason"));
    assert!(err.is_fatal());
}

#[test]
fn worker_and_output_errors_are_fatal() {
    assert!(CosmoError::Worker(sample_info("W001", "worker exited")).is_fatal());
    assert!(CosmoError::Output(sample_info("O001", "disk full")).is_fatal());
    assert!(CosmoError::Serde(sample_info("S001", "schema mismatch")).is_fatal());
}

#[test]
fn display_includes_context_and_hint() {
    let err = CosmoError::Configuration(
        sample_info("start-shape", "bad start file").with_hint("regenerate the file"),
    );
    let rendered = err.to_string();
    assert!(rendered.starts_with("configuration error: bad start file (code: start-shape)"));
    assert!(rendered.contains("sampler=emcee"));
    assert!(rendered.contains("hint: regenerate the file"));
}

#[test]
fn errors_serialize_with_family_tag() {
    let err = CosmoError::contract("extra-missing", "declared extra output was not produced");
    let json = serde_json::to_value(&err).expect("serialize");
    assert_eq!(json["family"], "Contract");
    assert_eq!(json["detail"]["code"], "extra-missing");
    let back: CosmoError = serde_json::from_value(json).expect("deserialize");
    assert_eq!(back, err);
}
