use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use cosmo_core::{ColumnName, CosmoError, ErrorInfo};
use csv::{ReaderBuilder, Writer, WriterBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::row::SampleRow;
use crate::schema::{Column, ColumnKind, ColumnSchema};
use crate::sink::{closed_error, column_index, freeze_or_check, OutputSink};

/// Sink writing rows to a CSV file with a JSON metadata sidecar.
///
/// The sidecar lives next to the chain as `<path>.meta.json` and records the
/// typed schema, the row count and the metadata map. Reads always go back to
/// the file on disk.
#[derive(Debug)]
pub struct TextOutput {
    path: PathBuf,
    writer: Option<Mutex<Writer<BufWriter<File>>>>,
    schema: Option<ColumnSchema>,
    rows: usize,
    metadata: BTreeMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Sidecar {
    schema: Option<ColumnSchema>,
    rows: usize,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

impl TextOutput {
    /// Creates (or truncates) a chain file at `path`.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, CosmoError> {
        let path = path.into();
        ensure_parent(&path)?;
        let file = File::create(&path).map_err(|err| io_error("output-create", &path, err))?;
        let writer = WriterBuilder::new()
            .has_headers(false)
            .from_writer(BufWriter::new(file));
        Ok(Self {
            path,
            writer: Some(Mutex::new(writer)),
            schema: None,
            rows: 0,
            metadata: BTreeMap::new(),
        })
    }

    /// Opens an existing chain read-only.
    ///
    /// Without a sidecar the schema is inferred from the header: sectioned
    /// names become parameters and plain names derived columns.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CosmoError> {
        let path = path.into();
        let sidecar_path = sidecar_path(&path);
        let mut output = Self {
            path,
            writer: None,
            schema: None,
            rows: 0,
            metadata: BTreeMap::new(),
        };
        if sidecar_path.exists() {
            let bytes =
                fs::read(&sidecar_path).map_err(|err| io_error("sidecar-read", &sidecar_path, err))?;
            let sidecar: Sidecar = serde_json::from_slice(&bytes).map_err(|err| {
                CosmoError::Serde(
                    ErrorInfo::new("sidecar-decode", "failed to decode chain metadata")
                        .with_context("path", sidecar_path.display().to_string())
                        .with_hint(err.to_string()),
                )
            })?;
            output.schema = sidecar.schema;
            output.metadata = sidecar.metadata;
        } else {
            output.schema = Some(output.infer_schema()?);
        }
        output.rows = output.read_rows()?.len();
        Ok(output)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Location of the metadata sidecar.
    pub fn sidecar(&self) -> PathBuf {
        sidecar_path(&self.path)
    }

    fn infer_schema(&self) -> Result<ColumnSchema, CosmoError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .from_path(&self.path)
            .map_err(|err| wrap_csv("output-open", &self.path, err))?;
        let headers = reader
            .headers()
            .map_err(|err| wrap_csv("output-header", &self.path, err))?;
        let mut columns = Vec::with_capacity(headers.len());
        for raw in headers {
            let name = ColumnName::parse(raw)?;
            let kind = if name.section().is_some() {
                ColumnKind::Parameter
            } else {
                ColumnKind::Derived
            };
            columns.push(Column::new(name, kind));
        }
        ColumnSchema::new(columns)
    }

    fn read_rows(&self) -> Result<Vec<Vec<f64>>, CosmoError> {
        if self.schema.is_none() {
            return Ok(Vec::new());
        }
        self.flush_writer()?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .from_path(&self.path)
            .map_err(|err| wrap_csv("output-open", &self.path, err))?;
        let mut rows = Vec::new();
        for (line, result) in reader.records().enumerate() {
            let record = result.map_err(|err| wrap_csv("output-record", &self.path, err))?;
            let mut values = Vec::with_capacity(record.len());
            for field in record.iter() {
                let value = field.trim().parse::<f64>().map_err(|err| {
                    CosmoError::Output(
                        ErrorInfo::new("output-value", "chain file holds a non-numeric value")
                            .with_context("path", self.path.display().to_string())
                            .with_context("row", line.to_string())
                            .with_context("value", field)
                            .with_hint(err.to_string()),
                    )
                })?;
                values.push(value);
            }
            rows.push(values);
        }
        Ok(rows)
    }

    fn flush_writer(&self) -> Result<(), CosmoError> {
        if let Some(writer) = &self.writer {
            let mut guard = writer.lock().map_err(|_| poisoned(&self.path))?;
            guard
                .flush()
                .map_err(|err| io_error("output-flush", &self.path, err))?;
        }
        Ok(())
    }

    fn write_sidecar(&self) -> Result<(), CosmoError> {
        let sidecar = Sidecar {
            schema: self.schema.clone(),
            rows: self.rows,
            metadata: self.metadata.clone(),
        };
        let path = self.sidecar();
        let bytes = serde_json::to_vec_pretty(&sidecar).map_err(|err| {
            CosmoError::Serde(
                ErrorInfo::new("sidecar-encode", "failed to encode chain metadata")
                    .with_hint(err.to_string()),
            )
        })?;
        fs::write(&path, bytes).map_err(|err| io_error("sidecar-write", &path, err))
    }
}

impl OutputSink for TextOutput {
    fn record(&mut self, row: SampleRow) -> Result<usize, CosmoError> {
        let Some(writer) = &self.writer else {
            return Err(closed_error("record"));
        };
        let first = freeze_or_check(&mut self.schema, &row)?;
        let mut guard = writer.lock().map_err(|_| poisoned(&self.path))?;
        if first {
            let header = self
                .schema
                .as_ref()
                .map(ColumnSchema::header)
                .unwrap_or_default();
            guard
                .write_record(&header)
                .map_err(|err| wrap_csv("output-write-header", &self.path, err))?;
        }
        guard
            .write_record(row.values().iter().map(|value| value.to_string()))
            .map_err(|err| wrap_csv("output-write-row", &self.path, err))?;
        self.rows += 1;
        Ok(self.rows - 1)
    }

    fn schema(&self) -> Option<&ColumnSchema> {
        self.schema.as_ref()
    }

    fn len(&self) -> usize {
        self.rows
    }

    fn column(&self, name: &str) -> Result<Vec<f64>, CosmoError> {
        let idx = column_index(self.schema.as_ref(), name)?;
        Ok(self.read_rows()?.into_iter().map(|row| row[idx]).collect())
    }

    fn rows(&self) -> Result<Vec<Vec<f64>>, CosmoError> {
        self.read_rows()
    }

    fn set_metadata(&mut self, key: &str, value: String) -> Result<(), CosmoError> {
        if self.writer.is_none() {
            return Err(closed_error("metadata"));
        }
        self.metadata.insert(key.to_owned(), value);
        Ok(())
    }

    fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    fn flush(&mut self) -> Result<(), CosmoError> {
        if self.writer.is_none() {
            return Ok(());
        }
        self.flush_writer()?;
        self.write_sidecar()
    }

    fn finalize(&mut self) -> Result<(), CosmoError> {
        if self.writer.is_none() {
            return Ok(());
        }
        self.flush()?;
        self.writer = None;
        debug!(path = %self.path.display(), rows = self.rows, "chain file finalized");
        Ok(())
    }
}

fn sidecar_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".meta.json");
    PathBuf::from(name)
}

fn ensure_parent(path: &Path) -> Result<(), CosmoError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|err| io_error("output-mkdir", parent, err))
        }
        _ => Ok(()),
    }
}

fn io_error(code: &str, path: &Path, err: std::io::Error) -> CosmoError {
    CosmoError::Output(
        ErrorInfo::new(code, "chain file I/O failed")
            .with_context("path", path.display().to_string())
            .with_hint(err.to_string()),
    )
}

fn wrap_csv(code: &str, path: &Path, err: csv::Error) -> CosmoError {
    CosmoError::Output(
        ErrorInfo::new(code, "CSV chain operation failed")
            .with_context("path", path.display().to_string())
            .with_hint(err.to_string()),
    )
}

fn poisoned(path: &Path) -> CosmoError {
    CosmoError::Output(
        ErrorInfo::new("output-poisoned", "chain writer lock poisoned")
            .with_context("path", path.display().to_string()),
    )
}
