//! Top-level command execution.

use anyhow::Result;
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::chart;
use super::cli::{self, Cli, Command};
use super::collector::CollectOptions;
use super::identity;
use super::orchestrator;
use super::regions;
use super::report::{self, ActivityReport, AnalyzedWindow, OutputLayout, RunMetadata};
use super::session::AwsSessions;
use super::source::{CloudTrailEventSource, EventSource, TimeWindow};

/// Runs the command selected on the command line.
pub async fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Some(Command::Replot { file }) => replot(file),
        None => summarize(cli).await,
    }
}

/// Collects CloudTrail activity across all analyzed regions and writes
/// the result artifacts.
async fn summarize(cli: Cli) -> Result<()> {
    let sessions = Arc::new(AwsSessions::new(cli.profile.clone()));
    let caller = identity::caller_identity(&sessions).await?;
    info!("Analyzing account ID {}", caller.account_id);

    let regions_enabled = if cli.regions.is_empty() {
        regions::enabled_regions(&sessions).await?
    } else {
        let mut selected = cli.regions.clone();
        selected.sort();
        selected.dedup();
        selected
    };

    let run_timestamp = Utc::now();
    let window = TimeWindow::past_hours(run_timestamp, cli.past_hours);
    let run_timestamp_str = report::format_timestamp(run_timestamp);

    let layout = OutputLayout::prepare(
        &caller.account_id,
        &run_timestamp_str,
        cli.dump_raw_cloudtrail_data,
        cli.plot_results,
    )?;

    let cancel = CancellationToken::new();
    let interrupt_guard = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping region collection");
            interrupt_guard.cancel();
        }
    });

    let options = CollectOptions {
        activity_type: cli.activity_type,
        lenient_identity: cli.lenient_identity,
        raw_dump_directory: layout.raw_data_directory.clone(),
    };
    let source: Arc<dyn EventSource> = Arc::new(CloudTrailEventSource::new(Arc::clone(&sessions)));
    let outcome = orchestrator::collect_all_regions(
        source,
        &regions_enabled,
        window,
        options,
        cli.max_concurrent_regions,
        cancel,
    )
    .await;

    let report = ActivityReport {
        metadata: RunMetadata {
            account_id: caller.account_id,
            account_principal: caller.arn,
            activity_type: cli.activity_type.label().to_string(),
            cloudtrail_data_analyzed: AnalyzedWindow {
                from_timestamp: report::format_timestamp(window.start),
                to_timestamp: run_timestamp_str.clone(),
            },
            invocation: cli::invocation_command(),
            regions_enabled,
            regions_failed: outcome.regions_failed,
            run_timestamp: run_timestamp_str,
        },
        summary: outcome.summary,
    };
    report::write_report(&report, &layout.report_file)?;
    info!("Output file written to {}", layout.report_file.display());
    if let Some(directory) = &layout.raw_data_directory {
        info!("Raw CloudTrail data written to {}", directory.display());
    }
    if let Some(directory) = &layout.plots_directory {
        if report.summary.api_calls_by_principal.is_empty() {
            info!("No API call activity to plot");
        } else {
            info!("Generating plots");
            chart::generate_chart_files(&report.summary, directory)?;
            info!("Plot files written to {}", directory.display());
        }
    }
    Ok(())
}

/// Regenerates the chart files for a result file written by an earlier
/// run, next to that file.
fn replot(file: &Path) -> Result<()> {
    let (account_id, run_timestamp) = report::parse_report_file_name(file)?;
    let report = report::load_report(file)?;
    if report.summary.api_calls_by_principal.is_empty() {
        info!("No API call activity to plot");
        return Ok(());
    }

    let parent = file.parent().unwrap_or_else(|| Path::new("."));
    let plots_directory = parent.join(format!(
        "account_activity_{}_{}_plots",
        account_id, run_timestamp
    ));
    info!("Generating plots");
    chart::generate_chart_files(&report.summary, &plots_directory)?;
    info!("Plot files written to {}", plots_directory.display());
    Ok(())
}
