//! Result envelope assembly and on-disk output.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::aggregate::ActivitySummary;

pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";
const RESULTS_DIRECTORY: &str = "results";

/// Run-scoped facts serialized under `_metadata`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub account_id: String,
    pub account_principal: String,
    pub activity_type: String,
    pub cloudtrail_data_analyzed: AnalyzedWindow,
    pub invocation: String,
    pub regions_enabled: Vec<String>,
    pub regions_failed: BTreeMap<String, String>,
    pub run_timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedWindow {
    pub from_timestamp: String,
    pub to_timestamp: String,
}

/// The full output document. Struct fields are declared in sorted key
/// order and every map inside is ordered, so the serialized document is
/// deterministically key-sorted end to end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityReport {
    #[serde(rename = "_metadata")]
    pub metadata: RunMetadata,
    #[serde(flatten)]
    pub summary: ActivitySummary,
}

/// Where this run's artifacts land under `results/`.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    pub report_file: PathBuf,
    pub raw_data_directory: Option<PathBuf>,
    pub plots_directory: Option<PathBuf>,
}

impl OutputLayout {
    /// Creates the results directory tree for one run under `results/`
    /// in the working directory.
    pub fn prepare(
        account_id: &str,
        run_timestamp: &str,
        dump_raw_data: bool,
        plot_results: bool,
    ) -> Result<Self> {
        Self::prepare_in(
            Path::new(RESULTS_DIRECTORY),
            account_id,
            run_timestamp,
            dump_raw_data,
            plot_results,
        )
    }

    fn prepare_in(
        results_directory: &Path,
        account_id: &str,
        run_timestamp: &str,
        dump_raw_data: bool,
        plot_results: bool,
    ) -> Result<Self> {
        fs::create_dir_all(results_directory).with_context(|| {
            format!(
                "Cannot create results directory {}",
                results_directory.display()
            )
        })?;

        let stem = format!("account_activity_{}_{}", account_id, run_timestamp);
        let report_file = results_directory.join(format!("{}.json", stem));

        let raw_data_directory = if dump_raw_data {
            let directory = results_directory.join(format!("{}_raw_cloudtrail_data", stem));
            fs::create_dir_all(&directory).with_context(|| {
                format!("Cannot create raw data directory {}", directory.display())
            })?;
            Some(directory)
        } else {
            None
        };

        let plots_directory = if plot_results {
            let directory = results_directory.join(format!("{}_plots", stem));
            fs::create_dir_all(&directory)
                .with_context(|| format!("Cannot create plots directory {}", directory.display()))?;
            Some(directory)
        } else {
            None
        };

        Ok(Self {
            report_file,
            raw_data_directory,
            plots_directory,
        })
    }
}

pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

pub fn write_report(report: &ActivityReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Cannot serialize results")?;
    fs::write(path, json)
        .with_context(|| format!("Cannot write output file {}", path.display()))?;
    Ok(())
}

pub fn load_report(path: &Path) -> Result<ActivityReport> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Cannot read result file {}", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("Not a valid result file: {}", path.display()))
}

/// Validates a result file name and extracts its account id and run
/// timestamp, e.g. `account_activity_112233445566_20240601120000.json`.
pub fn parse_report_file_name(path: &Path) -> Result<(String, String)> {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("Invalid result file path: {}", path.display()))?;
    let pattern = Regex::new(r"^account_activity_(\d+)_(\d+)\.json$")
        .context("Cannot compile result file name pattern")?;
    let captures = pattern
        .captures(name)
        .ok_or_else(|| anyhow!("File name does not look like a result file: {}", name))?;
    Ok((captures[1].to_string(), captures[2].to_string()))
}
