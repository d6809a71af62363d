use std::path::PathBuf;

use cosmo_core::{CosmoError, ErrorInfo};
use indexmap::IndexMap;
use serde_yaml::Value;

/// Free-form option section for one sampler, read through typed getters.
///
/// Getters fall back to the given default when a key is absent and fail with
/// a configuration error naming the section and key when a value has the
/// wrong type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SamplerOptions {
    section: String,
    values: IndexMap<String, Value>,
}

impl SamplerOptions {
    /// Empty section named `section`.
    pub fn new(section: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            values: IndexMap::new(),
        }
    }

    /// Reads a section from a YAML value. `None` and `null` give an empty section.
    pub fn from_value(section: impl Into<String>, value: Option<&Value>) -> Result<Self, CosmoError> {
        let mut options = Self::new(section);
        match value {
            None | Some(Value::Null) => {}
            Some(Value::Mapping(mapping)) => {
                for (key, value) in mapping {
                    let key = key.as_str().ok_or_else(|| {
                        CosmoError::Configuration(
                            ErrorInfo::new("option-key", "option keys must be strings")
                                .with_context("section", options.section.clone()),
                        )
                    })?;
                    options.values.insert(key.to_owned(), value.clone());
                }
            }
            Some(_) => {
                return Err(CosmoError::Configuration(
                    ErrorInfo::new("option-section", "sampler section must be a mapping")
                        .with_context("section", options.section.clone()),
                ))
            }
        }
        Ok(options)
    }

    /// Sets `key`, replacing any previous value.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.values.insert(key.to_owned(), value.into());
        self
    }

    pub fn section(&self) -> &str {
        &self.section
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn usize_or(&self, key: &str, default: usize) -> Result<usize, CosmoError> {
        match self.values.get(key) {
            None => Ok(default),
            Some(value) => value
                .as_u64()
                .and_then(|raw| usize::try_from(raw).ok())
                .ok_or_else(|| self.malformed(key, "a non-negative integer", value)),
        }
    }

    pub fn f64_or(&self, key: &str, default: f64) -> Result<f64, CosmoError> {
        match self.values.get(key) {
            None => Ok(default),
            Some(value) => value
                .as_f64()
                .ok_or_else(|| self.malformed(key, "a number", value)),
        }
    }

    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool, CosmoError> {
        match self.values.get(key) {
            None => Ok(default),
            Some(value) => value
                .as_bool()
                .ok_or_else(|| self.malformed(key, "a boolean", value)),
        }
    }

    pub fn string(&self, key: &str) -> Result<Option<String>, CosmoError> {
        match self.values.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_str()
                .map(|raw| Some(raw.to_owned()))
                .ok_or_else(|| self.malformed(key, "a string", value)),
        }
    }

    pub fn path(&self, key: &str) -> Result<Option<PathBuf>, CosmoError> {
        Ok(self.string(key)?.map(PathBuf::from))
    }

    /// Like [`path`](Self::path) but absence is an error.
    pub fn require_path(&self, key: &str) -> Result<PathBuf, CosmoError> {
        self.path(key)?.ok_or_else(|| {
            CosmoError::Configuration(
                ErrorInfo::new("option-missing", "required sampler option is missing")
                    .with_context("section", self.section.clone())
                    .with_context("key", key),
            )
        })
    }

    pub fn f64_list(&self, key: &str) -> Result<Option<Vec<f64>>, CosmoError> {
        match self.values.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => {
                let items = value
                    .as_sequence()
                    .ok_or_else(|| self.malformed(key, "a list of numbers", value))?;
                items
                    .iter()
                    .map(|item| {
                        item.as_f64()
                            .ok_or_else(|| self.malformed(key, "a list of numbers", value))
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Some)
            }
        }
    }

    fn malformed(&self, key: &str, expected: &str, value: &Value) -> CosmoError {
        let rendered = serde_yaml::to_string(value)
            .map(|text| text.trim().to_owned())
            .unwrap_or_default();
        CosmoError::Configuration(
            ErrorInfo::new("option-type", format!("sampler option must be {expected}"))
                .with_context("section", self.section.clone())
                .with_context("key", key)
                .with_context("value", rendered),
        )
    }
}
