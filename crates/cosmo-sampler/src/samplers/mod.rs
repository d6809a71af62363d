//! Built-in sampler variants.

pub mod apriori;
pub mod emcee;
pub mod grid;
pub mod importance;
pub mod maxlike;
pub mod metropolis;
pub mod nested;
pub mod star;
pub mod test;

use cosmo_core::{CosmoError, ErrorInfo, Evaluation};
use cosmo_output::{OutputSink, RowLayout};

/// Records one row per `(vector, evaluation)` pair with no extra derived values.
pub(crate) fn record_all(
    output: &mut dyn OutputSink,
    layout: &RowLayout,
    vectors: &[Vec<f64>],
    evaluations: &[Evaluation],
) -> Result<(), CosmoError> {
    for (vector, evaluation) in vectors.iter().zip(evaluations) {
        output.record(layout.row(vector, evaluation, &[])?)?;
    }
    Ok(())
}

/// Error for chunk calls made before `configure` succeeded.
pub(crate) fn unconfigured(sampler: &str) -> CosmoError {
    CosmoError::Contract(
        ErrorInfo::new("sampler-unconfigured", "sampler used before configure")
            .with_context("sampler", sampler),
    )
}

/// Error for an option value outside its allowed range.
pub(crate) fn invalid_option(section: &str, key: &str, reason: &str, value: String) -> CosmoError {
    CosmoError::Configuration(
        ErrorInfo::new("option-value", reason)
            .with_context("section", section)
            .with_context("key", key)
            .with_context("value", value),
    )
}
