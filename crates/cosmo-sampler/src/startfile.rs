use std::fs;
use std::path::Path;

use cosmo_core::{CosmoError, ErrorInfo};

/// Reads a whitespace-separated start file with exactly `rows` rows of
/// `columns` values each. Lines starting with `#` and blank lines are skipped.
pub fn load_start_points(
    path: &Path,
    rows: usize,
    columns: usize,
) -> Result<Vec<Vec<f64>>, CosmoError> {
    let contents = fs::read_to_string(path).map_err(|err| {
        CosmoError::Configuration(
            ErrorInfo::new("start-read", "failed to read start file")
                .with_context("path", path.display().to_string())
                .with_hint(err.to_string()),
        )
    })?;
    let points = parse_start_points(&contents).map_err(|err| match err {
        CosmoError::Configuration(info) => {
            CosmoError::Configuration(info.with_context("path", path.display().to_string()))
        }
        other => other,
    })?;
    let actual_rows = points.len();
    let ragged = points.iter().find(|row| row.len() != columns);
    if actual_rows != rows || ragged.is_some() {
        let actual_columns = ragged
            .or_else(|| points.first())
            .map(Vec::len)
            .unwrap_or(0);
        return Err(CosmoError::Configuration(
            ErrorInfo::new("start-shape", "start file has the wrong shape")
                .with_context("path", path.display().to_string())
                .with_context("expected", format!("({rows}, {columns})"))
                .with_context("actual", format!("({actual_rows}, {actual_columns})"))
                .with_hint("one row per walker, one column per varied parameter"),
        ));
    }
    Ok(points)
}

fn parse_start_points(contents: &str) -> Result<Vec<Vec<f64>>, CosmoError> {
    let mut points = Vec::new();
    for (number, line) in contents.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let row = trimmed
            .split_whitespace()
            .map(|token| {
                token.parse::<f64>().map_err(|_| {
                    CosmoError::Configuration(
                        ErrorInfo::new("start-value", "start file holds a non-numeric token")
                            .with_context("line", (number + 1).to_string())
                            .with_context("token", token),
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        points.push(row);
    }
    Ok(points)
}
