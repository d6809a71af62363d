use std::error::Error;

use clap::Args;
use cosmo_post::{dispatch, PostprocessorKind};
use cosmo_sampler::{ChainShape, SamplerRegistry};
use serde::Serialize;

#[derive(Args, Debug)]
pub struct SamplersArgs {
    /// Emit the table as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct SamplerRow {
    name: String,
    shape: ChainShape,
    postprocessor: Option<PostprocessorKind>,
}

pub fn run(args: &SamplersArgs) -> Result<(), Box<dyn Error>> {
    let registry = SamplerRegistry::builtin()?;
    let mut rows = Vec::new();
    for entry in registry.entries() {
        rows.push(SamplerRow {
            name: entry.name.clone(),
            shape: entry.shape,
            postprocessor: dispatch(&registry, &entry.name)?,
        });
    }
    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    for row in rows {
        let post = row
            .postprocessor
            .map(|kind| format!("{kind:?}"))
            .unwrap_or_else(|| "-".to_owned());
        println!("{:<12} {:<12} {}", row.name, format!("{:?}", row.shape), post);
    }
    Ok(())
}
