use std::error::Error;

use clap::{Parser, Subcommand};
use cosmo_sim::commands::{
    demo::{self, DemoArgs},
    run::{self, RunArgs},
    samplers::{self, SamplersArgs},
    version::{self, VersionArgs},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "cosmo-sim", about = "Cosmological parameter sampler CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute a sampler run described by a YAML configuration.
    Run(RunArgs),
    /// Run a built-in sampler against the reference Gaussian pipeline.
    Demo(DemoArgs),
    /// List the registered samplers and their postprocessors.
    Samplers(SamplersArgs),
    /// Print version information.
    Version(VersionArgs),
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run::run(&args),
        Command::Demo(args) => demo::run(&args),
        Command::Samplers(args) => samplers::run(&args),
        Command::Version(args) => version::run(&args),
    }
}
