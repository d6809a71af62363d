use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use cosmo_core::{ColumnName, CosmoError, ErrorInfo};
use cosmo_output::{ColumnKind, ColumnSchema, OutputSink};
use cosmo_sampler::{PostprocessMeta, SamplerRegistry};
use tracing::{debug, info};

use crate::dispatch::{dispatch, PostprocessorKind};
use crate::naming::ArtifactNames;
use crate::render;
use crate::stats::{
    argmax, burn_rows, distinct, grid_marginal, weighted_moments, weights_from_log, Histogram,
    Histogram2d,
};

const BINS: usize = 24;

struct Plotted {
    index: usize,
    name: ColumnName,
    truth: Option<f64>,
}

/// Dispatches on `sampler` and postprocesses its rows.
///
/// Samplers without a postprocessor produce no artifacts.
pub fn postprocess_sampler(
    registry: &SamplerRegistry,
    sampler: &str,
    output: &dyn OutputSink,
    meta: &PostprocessMeta,
) -> Result<Vec<PathBuf>, CosmoError> {
    match dispatch(registry, sampler)? {
        Some(kind) => postprocess(kind, output, meta),
        None => {
            info!(sampler, "sampler has no postprocessor; skipping");
            Ok(Vec::new())
        }
    }
}

/// Writes the diagnostic artifacts of `kind` for the rows in `output`.
///
/// Returns every file written, plots first and the means summary last.
pub fn postprocess(
    kind: PostprocessorKind,
    output: &dyn OutputSink,
    meta: &PostprocessMeta,
) -> Result<Vec<PathBuf>, CosmoError> {
    let schema = output
        .schema()
        .filter(|_| !output.is_empty())
        .ok_or_else(|| {
            CosmoError::Output(ErrorInfo::new(
                "postprocess-empty",
                "nothing to postprocess: the output holds no rows",
            ))
        })?;
    let names = ArtifactNames::new(&meta.outdir, meta.prefix.as_deref(), &meta.image_suffix);
    fs::create_dir_all(names.outdir()).map_err(|err| {
        CosmoError::Output(
            ErrorInfo::new("postprocess-mkdir", "failed to create the plot directory")
                .with_context("path", names.outdir().display().to_string())
                .with_hint(err.to_string()),
        )
    })?;

    let mut rows = output.rows()?;
    if kind.uses_burn() {
        let skip = burn_rows(meta.burn, rows.len())?;
        rows.drain(..skip);
    }
    let plotted = plotted_columns(schema, kind, meta)?;
    let post = values(&rows, required(schema, "post")?);

    let mut files = Vec::new();
    let summary = match kind {
        PostprocessorKind::Chain | PostprocessorKind::Weighted => {
            let weights = match kind {
                PostprocessorKind::Weighted => sample_weights(schema, &rows),
                _ => vec![1.0; rows.len()],
            };
            sampled(&names, &plotted, &rows, &weights, false, &mut files)?
        }
        PostprocessorKind::Grid => {
            let weights = weights_from_log(&post);
            sampled(&names, &plotted, &rows, &weights, true, &mut files)?
        }
        PostprocessorKind::Star => star(&names, &plotted, &rows, &post, &mut files)?,
        PostprocessorKind::SinglePoint => single_point(&names, &plotted, &rows, &post, &mut files)?,
    };

    let means = names.means();
    fs::write(&means, summary).map_err(|err| {
        CosmoError::Output(
            ErrorInfo::new("postprocess-write", "failed to write the means summary")
                .with_context("path", means.display().to_string())
                .with_hint(err.to_string()),
        )
    })?;
    files.push(means);
    info!(
        kind = ?kind,
        rows = rows.len(),
        files = files.len(),
        outdir = %names.outdir().display(),
        "postprocessing complete"
    );
    Ok(files)
}

/// Histograms, pairwise densities and weighted moments.
fn sampled(
    names: &ArtifactNames,
    plotted: &[Plotted],
    rows: &[Vec<f64>],
    weights: &[f64],
    grid: bool,
    files: &mut Vec<PathBuf>,
) -> Result<String, CosmoError> {
    let mut summary = String::from("# column\tmean\tstd\n");
    for column in plotted {
        let path = names.one_d(&column.name);
        let xs = values(rows, column.index);
        if grid {
            render::curve(&path, &grid_marginal(&xs, weights), column.truth)?;
        } else {
            match Histogram::weighted(&xs, weights, BINS) {
                Some(hist) => render::histogram(&path, &hist, column.truth)?,
                None => render::curve(&path, &[], column.truth)?,
            }
        }
        pushed(files, path);
        let (mean, std) = weighted_moments(&xs, weights).unwrap_or((f64::NAN, f64::NAN));
        let _ = writeln!(summary, "{}\t{mean}\t{std}", column.name);
    }
    for (later_idx, later) in plotted.iter().enumerate() {
        for earlier in &plotted[..later_idx] {
            let path = names.two_d(&later.name, &earlier.name);
            let xs = values(rows, later.index);
            let ys = values(rows, earlier.index);
            let (x_bins, y_bins) = if grid {
                (distinct(&xs), distinct(&ys))
            } else {
                (BINS, BINS)
            };
            match Histogram2d::weighted(&xs, &ys, weights, x_bins, y_bins) {
                Some(hist) => render::density(&path, &hist, (later.truth, earlier.truth))?,
                None => render::curve(&path, &[], None)?,
            }
            pushed(files, path);
        }
    }
    Ok(summary)
}

/// Posterior along each axis scan; rows hold one equal-length block per parameter.
fn star(
    names: &ArtifactNames,
    plotted: &[Plotted],
    rows: &[Vec<f64>],
    post: &[f64],
    files: &mut Vec<PathBuf>,
) -> Result<String, CosmoError> {
    let block = rows.len() / plotted.len().max(1);
    if block == 0 {
        return Err(CosmoError::Output(
            ErrorInfo::new("star-shape", "too few rows for one scan per parameter")
                .with_context("rows", rows.len().to_string())
                .with_context("parameters", plotted.len().to_string()),
        ));
    }
    let mut summary = String::from("# column\tbest_fit\n");
    for (axis, column) in plotted.iter().enumerate() {
        let range = axis * block..(axis + 1) * block;
        let xs = values(&rows[range.clone()], column.index);
        let points: Vec<(f64, f64)> = xs.iter().copied().zip(post[range].iter().copied()).collect();
        let path = names.one_d(&column.name);
        render::curve(&path, &points, column.truth)?;
        pushed(files, path);
        let best = argmax(&points.iter().map(|(_, y)| *y).collect::<Vec<_>>())
            .map_or(f64::NAN, |idx| xs[idx]);
        let _ = writeln!(summary, "{}\t{best}", column.name);
    }
    Ok(summary)
}

/// Best-fit markers for a chain holding a single optimum.
fn single_point(
    names: &ArtifactNames,
    plotted: &[Plotted],
    rows: &[Vec<f64>],
    post: &[f64],
    files: &mut Vec<PathBuf>,
) -> Result<String, CosmoError> {
    let best = argmax(post).unwrap_or(0);
    let row = &rows[best];
    let mut summary = String::from("# column\tbest_fit\n");
    for column in plotted {
        let path = names.one_d(&column.name);
        render::marker(&path, row[column.index], column.truth)?;
        pushed(files, path);
        let _ = writeln!(summary, "{}\t{}", column.name, row[column.index]);
    }
    let _ = writeln!(summary, "post\t{}", post[best]);
    Ok(summary)
}

fn plotted_columns(
    schema: &ColumnSchema,
    kind: PostprocessorKind,
    meta: &PostprocessMeta,
) -> Result<Vec<Plotted>, CosmoError> {
    let parameters = schema.of_kind(ColumnKind::Parameter).count();
    if let Some(truth) = &meta.truth {
        if truth.len() != parameters {
            return Err(CosmoError::Configuration(
                ErrorInfo::new("truth-length", "truth values must match the varied parameters")
                    .with_context("expected", parameters.to_string())
                    .with_context("actual", truth.len().to_string()),
            ));
        }
    }
    let extras = kind.plots_extras() && meta.include_extras;
    let mut parameter = 0;
    let mut plotted = Vec::new();
    for (index, column) in schema.columns().iter().enumerate() {
        match column.kind {
            ColumnKind::Parameter => {
                let truth = meta.truth.as_ref().map(|truth| truth[parameter]);
                parameter += 1;
                plotted.push(Plotted {
                    index,
                    name: column.name.clone(),
                    truth,
                });
            }
            ColumnKind::Extra if extras => plotted.push(Plotted {
                index,
                name: column.name.clone(),
                truth: None,
            }),
            _ => {}
        }
    }
    Ok(plotted)
}

/// Row weights scaled to the heaviest row; raw `weight` only without `log_weight`.
fn sample_weights(schema: &ColumnSchema, rows: &[Vec<f64>]) -> Vec<f64> {
    if let Some(idx) = schema.index_of("log_weight") {
        return weights_from_log(&values(rows, idx));
    }
    if let Some(idx) = schema.index_of("weight") {
        return values(rows, idx);
    }
    vec![1.0; rows.len()]
}

fn required(schema: &ColumnSchema, name: &str) -> Result<usize, CosmoError> {
    schema.index_of(name).ok_or_else(|| {
        CosmoError::Output(
            ErrorInfo::new("column-unknown", "postprocessing needs this column")
                .with_context("column", name)
                .with_context("known", schema.header().join(",")),
        )
    })
}

fn values(rows: &[Vec<f64>], idx: usize) -> Vec<f64> {
    rows.iter().map(|row| row[idx]).collect()
}

fn pushed(files: &mut Vec<PathBuf>, path: PathBuf) {
    debug!(path = %path.display(), "wrote plot");
    files.push(path);
}
