use std::collections::BTreeMap;

use cosmo_core::CosmoError;

use crate::row::SampleRow;
use crate::schema::ColumnSchema;
use crate::sink::{closed_error, column_index, freeze_or_check, OutputSink};

/// Sink keeping every row in memory.
#[derive(Debug, Default)]
pub struct InMemoryOutput {
    schema: Option<ColumnSchema>,
    rows: Vec<Vec<f64>>,
    metadata: BTreeMap<String, String>,
    finalized: bool,
}

impl InMemoryOutput {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputSink for InMemoryOutput {
    fn record(&mut self, row: SampleRow) -> Result<usize, CosmoError> {
        if self.finalized {
            return Err(closed_error("record"));
        }
        freeze_or_check(&mut self.schema, &row)?;
        self.rows.push(row.into_values());
        Ok(self.rows.len() - 1)
    }

    fn schema(&self) -> Option<&ColumnSchema> {
        self.schema.as_ref()
    }

    fn len(&self) -> usize {
        self.rows.len()
    }

    fn column(&self, name: &str) -> Result<Vec<f64>, CosmoError> {
        let idx = column_index(self.schema.as_ref(), name)?;
        Ok(self.rows.iter().map(|row| row[idx]).collect())
    }

    fn rows(&self) -> Result<Vec<Vec<f64>>, CosmoError> {
        Ok(self.rows.clone())
    }

    fn set_metadata(&mut self, key: &str, value: String) -> Result<(), CosmoError> {
        if self.finalized {
            return Err(closed_error("metadata"));
        }
        self.metadata.insert(key.to_owned(), value);
        Ok(())
    }

    fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    fn flush(&mut self) -> Result<(), CosmoError> {
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), CosmoError> {
        self.finalized = true;
        Ok(())
    }
}
