//! Column identifiers shared by pipelines, output sinks and postprocessors.

use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{CosmoError, ErrorInfo};

/// Separator used between a section and a name inside a column identifier.
pub const SECTION_SEPARATOR: &str = "--";

/// Normalised column identifier.
///
/// Sectioned identifiers are written `section--name`; declarations may also use
/// `section/name`. Sections and names are case-insensitive and stored in lower
/// case so that a recorded column is found by any spelling of its declaration.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ColumnName(String);

impl ColumnName {
    /// Builds a sectioned identifier from its two components.
    pub fn sectioned(section: &str, name: &str) -> Result<Self, CosmoError> {
        let section = clean_component(section, "section")?;
        let name = clean_component(name, "name")?;
        Ok(Self(format!("{section}{SECTION_SEPARATOR}{name}")))
    }

    /// Builds an unsectioned identifier (`prior`, `post`, `weight`, ...).
    pub fn plain(name: &str) -> Result<Self, CosmoError> {
        Ok(Self(clean_component(name, "name")?))
    }

    /// Parses `section/name`, `section--name` or a plain name.
    pub fn parse(raw: &str) -> Result<Self, CosmoError> {
        let trimmed = raw.trim();
        if let Some((section, name)) = trimmed.split_once('/') {
            return Self::sectioned(section, name);
        }
        if let Some((section, name)) = trimmed.split_once(SECTION_SEPARATOR) {
            return Self::sectioned(section, name);
        }
        Self::plain(trimmed)
    }

    /// Returns the normalised identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the section component when the identifier is sectioned.
    pub fn section(&self) -> Option<&str> {
        self.0.split_once(SECTION_SEPARATOR).map(|(section, _)| section)
    }

    /// Returns the name component.
    pub fn name(&self) -> &str {
        self.0
            .split_once(SECTION_SEPARATOR)
            .map(|(_, name)| name)
            .unwrap_or(&self.0)
    }

    /// Whether `raw` addresses this column under any accepted spelling.
    pub fn matches(&self, raw: &str) -> bool {
        Self::parse(raw).map(|parsed| parsed == *self).unwrap_or(false)
    }
}

fn clean_component(raw: &str, what: &str) -> Result<String, CosmoError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CosmoError::Configuration(
            ErrorInfo::new("column-empty", format!("column {what} must not be empty"))
                .with_context("raw", raw),
        ));
    }
    if trimmed.contains('/') || trimmed.contains(SECTION_SEPARATOR) || trimmed.contains(',') {
        return Err(CosmoError::Configuration(
            ErrorInfo::new(
                "column-invalid",
                format!("column {what} contains a reserved separator"),
            )
            .with_context("raw", raw),
        ));
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(CosmoError::Configuration(
            ErrorInfo::new("column-invalid", format!("column {what} contains whitespace"))
                .with_context("raw", raw),
        ));
    }
    Ok(trimmed.to_ascii_lowercase())
}

impl Display for ColumnName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ColumnName {
    type Err = CosmoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ColumnName {
    type Error = CosmoError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ColumnName> for String {
    fn from(value: ColumnName) -> Self {
        value.0
    }
}
