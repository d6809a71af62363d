use std::sync::Arc;

use cosmo_core::{ColumnName, CosmoError, ErrorInfo, Evaluation, Pipeline};

use crate::schema::{Column, ColumnKind};

/// One recorded sample: values aligned with its column list.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRow {
    columns: Arc<Vec<Column>>,
    values: Vec<f64>,
}

impl SampleRow {
    /// Builds a row from explicit columns and values of equal length.
    pub fn new(columns: Arc<Vec<Column>>, values: Vec<f64>) -> Result<Self, CosmoError> {
        if columns.len() != values.len() {
            return Err(CosmoError::Contract(
                ErrorInfo::new("row-width", "row has a different number of values and columns")
                    .with_context("columns", columns.len().to_string())
                    .with_context("values", values.len().to_string()),
            ));
        }
        Ok(Self { columns, values })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }
}

/// Column layout shared by every row a sampler records.
///
/// Order: varied parameters, declared extras, then `prior`, `post` and any
/// sampler-specific derived scalars.
#[derive(Debug, Clone)]
pub struct RowLayout {
    columns: Arc<Vec<Column>>,
    parameters: usize,
    extras: usize,
}

impl RowLayout {
    /// Layout for `pipeline` with the given sampler-derived columns appended
    /// after `prior` and `post`.
    pub fn for_pipeline(pipeline: &dyn Pipeline, derived: &[&str]) -> Result<Self, CosmoError> {
        let parameters = pipeline.parameters().names();
        let extras = pipeline.extra_outputs().to_vec();
        Self::new(parameters, extras, derived)
    }

    pub fn new(
        parameters: Vec<ColumnName>,
        extras: Vec<ColumnName>,
        derived: &[&str],
    ) -> Result<Self, CosmoError> {
        let (n_params, n_extras) = (parameters.len(), extras.len());
        let mut columns = Vec::with_capacity(n_params + n_extras + 2 + derived.len());
        columns.extend(
            parameters
                .into_iter()
                .map(|name| Column::new(name, ColumnKind::Parameter)),
        );
        columns.extend(
            extras
                .into_iter()
                .map(|name| Column::new(name, ColumnKind::Extra)),
        );
        for name in ["prior", "post"].iter().chain(derived) {
            columns.push(Column::new(ColumnName::plain(name)?, ColumnKind::Derived));
        }
        // reuse the schema duplicate check
        crate::schema::ColumnSchema::new(columns.clone())?;
        Ok(Self {
            columns: Arc::new(columns),
            parameters: n_params,
            extras: n_extras,
        })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Number of sampler-derived columns beyond `prior` and `post`.
    pub fn derived_count(&self) -> usize {
        self.columns.len() - self.parameters - self.extras - 2
    }

    /// Assembles a row from a vector, its evaluation and the derived values.
    pub fn row(
        &self,
        vector: &[f64],
        evaluation: &Evaluation,
        derived: &[f64],
    ) -> Result<SampleRow, CosmoError> {
        if vector.len() != self.parameters
            || evaluation.extras.len() != self.extras
            || derived.len() != self.derived_count()
        {
            return Err(CosmoError::Contract(
                ErrorInfo::new("row-layout", "sample does not fit the row layout")
                    .with_context("parameters", format!("{}/{}", vector.len(), self.parameters))
                    .with_context(
                        "extras",
                        format!("{}/{}", evaluation.extras.len(), self.extras),
                    )
                    .with_context(
                        "derived",
                        format!("{}/{}", derived.len(), self.derived_count()),
                    ),
            ));
        }
        let mut values = Vec::with_capacity(self.columns.len());
        values.extend_from_slice(vector);
        values.extend_from_slice(&evaluation.extras);
        values.push(evaluation.prior);
        values.push(evaluation.posterior);
        values.extend_from_slice(derived);
        SampleRow::new(Arc::clone(&self.columns), values)
    }
}
