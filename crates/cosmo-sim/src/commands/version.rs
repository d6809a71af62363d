use std::collections::BTreeMap;
use std::error::Error;

use clap::Args;

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Emit package and platform metadata as JSON.
    #[arg(long)]
    pub long: bool,
}

pub fn run(args: &VersionArgs) -> Result<(), Box<dyn Error>> {
    if !args.long {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }
    let info = BTreeMap::from([
        ("name", env!("CARGO_PKG_NAME")),
        ("version", env!("CARGO_PKG_VERSION")),
        ("arch", std::env::consts::ARCH),
        ("os", std::env::consts::OS),
    ]);
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}
