use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sst-extract")]
#[command(about = "Extract monthly SST values inside areas of interest into CSV tables")]
#[command(version)]
pub struct Args {
    /// JSON run configuration (working_dir, dataset, months, areas)
    #[arg(short, long, value_name = "FILE")]
    pub config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}
