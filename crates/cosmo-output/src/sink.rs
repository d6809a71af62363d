use std::collections::BTreeMap;

use cosmo_core::{CosmoError, ErrorInfo};

use crate::row::SampleRow;
use crate::schema::ColumnSchema;

/// Append-only store of sample rows with a frozen column schema.
///
/// Only the master mutates a sink. Row indices are assigned in recording order
/// starting at zero.
pub trait OutputSink: Send {
    /// Appends a row, freezing the schema on the first call.
    fn record(&mut self, row: SampleRow) -> Result<usize, CosmoError>;

    /// Frozen schema, `None` until the first row is recorded.
    fn schema(&self) -> Option<&ColumnSchema>;

    /// Number of recorded rows.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Values of one column in row order. Lookup accepts either separator and
    /// ignores case.
    fn column(&self, name: &str) -> Result<Vec<f64>, CosmoError>;

    /// All rows in recording order.
    fn rows(&self) -> Result<Vec<Vec<f64>>, CosmoError>;

    /// Attaches a metadata entry (sampler name, options, evidence, ...).
    fn set_metadata(&mut self, key: &str, value: String) -> Result<(), CosmoError>;

    fn metadata(&self) -> &BTreeMap<String, String>;

    /// Makes recorded rows durable.
    fn flush(&mut self) -> Result<(), CosmoError>;

    /// Flushes and closes the sink; later writes are rejected.
    fn finalize(&mut self) -> Result<(), CosmoError>;
}

/// Freezes `schema` from `row` or checks `row` against it.
pub(crate) fn freeze_or_check(
    schema: &mut Option<ColumnSchema>,
    row: &SampleRow,
) -> Result<bool, CosmoError> {
    match schema {
        Some(frozen) => {
            frozen.check(row.columns())?;
            Ok(false)
        }
        None => {
            *schema = Some(ColumnSchema::new(row.columns().to_vec())?);
            Ok(true)
        }
    }
}

pub(crate) fn column_index(schema: Option<&ColumnSchema>, name: &str) -> Result<usize, CosmoError> {
    let known = schema.map(|schema| schema.header().join(",")).unwrap_or_default();
    schema
        .and_then(|schema| schema.index_of(name))
        .ok_or_else(|| {
            CosmoError::Output(
                ErrorInfo::new("column-unknown", "no such column in the output")
                    .with_context("column", name)
                    .with_context("known", known),
            )
        })
}

pub(crate) fn closed_error(what: &str) -> CosmoError {
    CosmoError::Output(
        ErrorInfo::new("sink-finalized", "output sink has already been finalized")
            .with_context("operation", what),
    )
}
