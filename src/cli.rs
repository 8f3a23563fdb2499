//! Command-line interface for the tactics sandbox
//!
//! Supports both graphical (default) and headless modes.

use clap::Parser;
use std::path::PathBuf;

/// Real-time tactics ability sandbox
#[derive(Parser, Debug)]
#[command(name = "tactics-abilities")]
#[command(about = "Real-time tactics ability sandbox")]
#[command(version)]
pub struct Args {
    /// Run headless with the specified JSON scenario file
    #[arg(long, value_name = "SCENARIO_FILE")]
    pub scenario: Option<PathBuf>,

    /// Output path for the ability log (headless mode only)
    #[arg(long, value_name = "OUTPUT_PATH")]
    pub output: Option<PathBuf>,

    /// Override the scenario's duration in seconds (headless mode only)
    #[arg(long)]
    pub max_duration: Option<f32>,

    /// Ability catalog to load instead of assets/config/abilities.ron
    #[arg(long, value_name = "RON_FILE")]
    pub abilities: Option<PathBuf>,
}

pub fn parse_args() -> Args {
    Args::parse()
}
