mod cli;
mod config;
mod error;
mod extent;
mod extraction;
mod readers;
mod table;
mod time_index;
mod toolbox;
mod utils;

use clap::Parser;
use env_logger::Env;
use log::info;

use cli::Args;
use config::Config;
use error::Result;
use readers::NcTimeReader;
use toolbox::GdalToolbox;

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    info!("=== SST monthly extraction ===");

    let config = Config::from_file(&args.config)?;
    info!(
        "Working directory: {}, {} area(s), months {}",
        config.working_dir().display(),
        config.areas().len(),
        config.months()
    );

    let mut toolbox = GdalToolbox::new();
    let report = extraction::run(&config, &mut toolbox, &NcTimeReader)?;
    let outputs = report.into_result()?;

    info!("=== Done! {} table(s) written ===", outputs.len());
    Ok(())
}
