use cosmo_core::{ColumnName, CosmoError, ErrorInfo};
use serde::{Deserialize, Serialize};

/// Origin of a recorded column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Varied parameter.
    Parameter,
    /// Extra output declared by the pipeline.
    Extra,
    /// Scalar written by the sampler (`prior`, `post`, `weight`, ...).
    Derived,
}

/// Named, typed column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    pub name: ColumnName,
    pub kind: ColumnKind,
}

impl Column {
    pub fn new(name: ColumnName, kind: ColumnKind) -> Self {
        Self { name, kind }
    }
}

/// Ordered column set of a sink; frozen on the first recorded row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    columns: Vec<Column>,
}

impl ColumnSchema {
    /// Builds a schema, rejecting duplicate column names.
    pub fn new(columns: Vec<Column>) -> Result<Self, CosmoError> {
        for (idx, column) in columns.iter().enumerate() {
            if columns[..idx].iter().any(|other| other.name == column.name) {
                return Err(CosmoError::Contract(
                    ErrorInfo::new("schema-duplicate", "column appears twice in the schema")
                        .with_context("column", column.name.as_str()),
                ));
            }
        }
        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Position of the column addressed by `raw` under any accepted spelling.
    pub fn index_of(&self, raw: &str) -> Option<usize> {
        let wanted = ColumnName::parse(raw).ok()?;
        self.columns.iter().position(|column| column.name == wanted)
    }

    /// Columns of the given kind, in schema order.
    pub fn of_kind(&self, kind: ColumnKind) -> impl Iterator<Item = (usize, &Column)> {
        self.columns
            .iter()
            .enumerate()
            .filter(move |(_, column)| column.kind == kind)
    }

    /// Header strings in schema order.
    pub fn header(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|column| column.name.as_str().to_owned())
            .collect()
    }

    /// Fails unless `columns` equals this schema exactly.
    pub fn check(&self, columns: &[Column]) -> Result<(), CosmoError> {
        if self.columns.as_slice() == columns {
            return Ok(());
        }
        let render = |cols: &[Column]| {
            cols.iter()
                .map(|column| column.name.as_str())
                .collect::<Vec<_>>()
                .join(",")
        };
        Err(CosmoError::Contract(
            ErrorInfo::new("schema-mismatch", "row columns differ from the frozen schema")
                .with_context("expected", render(&self.columns))
                .with_context("actual", render(columns)),
        ))
    }
}
