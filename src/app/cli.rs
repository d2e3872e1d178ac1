//! Command line interface definition.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::collector::ActivityType;
use super::orchestrator::DEFAULT_MAX_CONCURRENT_REGIONS;

#[derive(Parser, Debug)]
#[command(name = "trailscope")]
#[command(version)]
#[command(about = "Summarizes recent AWS account activity recorded in CloudTrail")]
pub struct Cli {
    /// Type of CloudTrail records to analyze
    #[arg(long, value_enum, default_value_t = ActivityType::All)]
    pub activity_type: ActivityType,

    /// Write the raw records received from CloudTrail to files, one per region
    #[arg(long)]
    pub dump_raw_cloudtrail_data: bool,

    /// Hours of CloudTrail data to analyze, counting back from now
    #[arg(long, default_value_t = 336, value_parser = clap::value_parser!(u32).range(1..=2160))]
    pub past_hours: u32,

    /// Render bar charts of the collected activity
    #[arg(long)]
    pub plot_results: bool,

    /// Named AWS profile to use instead of the default credentials
    #[arg(long)]
    pub profile: Option<String>,

    /// Skip records whose identity cannot be interpreted instead of
    /// failing the whole region
    #[arg(long)]
    pub lenient_identity: bool,

    /// Upper bound on regions read concurrently
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENT_REGIONS)]
    pub max_concurrent_regions: usize,

    /// Analyze only these regions instead of all enabled regions
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    pub regions: Vec<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Regenerate charts from an existing result file
    Replot {
        /// Result file written by an earlier run
        #[arg(long)]
        file: PathBuf,
    },
}

/// The command line this process was invoked with, recorded in the
/// result file metadata.
pub fn invocation_command() -> String {
    std::env::args().collect::<Vec<_>>().join(" ")
}
