//! ecugrid - batch ECU log analyzer
//!
//! Reads one or more CSV engine logs and prints fuel trim, knock and AFR
//! tuning grids. The report goes to stdout; progress logging goes to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use ecugrid::config::{default_config_path, Config};
use ecugrid::report::{render_json, TextReport};
use ecugrid::session::AnalysisSession;

#[derive(Parser, Debug)]
#[command(name = "ecugrid")]
#[command(version, about = "Aggregate ECU CSV logs into tuning grids", long_about = None)]
struct Cli {
    /// Log files to analyze, processed in the given order
    #[arg(value_name = "FILES", required = true)]
    files: Vec<PathBuf>,

    /// Configuration file (defaults to ./analyzer.conf, then the user config dir)
    #[arg(short, long, env = "ECUGRID_CONFIG")]
    config: Option<PathBuf>,

    /// Print the finalized results as JSON instead of the text report
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config_path = cli.config.unwrap_or_else(default_config_path);
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;

    let mut session = AnalysisSession::new(config).context("Invalid configuration")?;
    session
        .process_paths(&cli.files)
        .context("Failed to analyze logs")?;
    let results = session.finalize();

    if cli.json {
        println!("{}", render_json(&results).context("Failed to serialize results")?);
    } else {
        print!("{}", TextReport(&results));
    }

    Ok(())
}
