//! Per-region collection of audit activity.

use clap::ValueEnum;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::aggregate::ActivitySummary;
use super::errors::CollectionError;
use super::principal::principal_for_record;
use super::record::ActivityRecord;
use super::source::{EventSource, TimeWindow};

const STATUS_MESSAGE_RECORD_INTERVAL: u64 = 1000;

/// Failure reason recorded for regions whose collection was interrupted
/// by a run-level cancellation.
pub const CANCELLED_REASON: &str = "Cancelled";

/// Which records feed the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "UPPER")]
pub enum ActivityType {
    All,
    Successful,
    Failed,
}

impl ActivityType {
    pub fn label(&self) -> &'static str {
        match self {
            ActivityType::All => "ALL",
            ActivityType::Successful => "SUCCESSFUL",
            ActivityType::Failed => "FAILED",
        }
    }

    fn includes(&self, successful: bool) -> bool {
        match self {
            ActivityType::All => true,
            ActivityType::Successful => successful,
            ActivityType::Failed => !successful,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CollectOptions {
    pub activity_type: ActivityType,
    /// Skip records whose identity cannot be interpreted instead of
    /// failing the region. Masks data loss, so off by default.
    pub lenient_identity: bool,
    /// When set, every fetched record is appended to
    /// `<dir>/<region>.jsonl` before any filtering.
    pub raw_dump_directory: Option<PathBuf>,
}

/// Collects one region's activity into a region-local summary.
///
/// All-or-nothing: any failure discards the counts gathered so far for
/// this region and surfaces one `CollectionError`. A raw-dump file, when
/// enabled, keeps the lines already written before a failure.
pub async fn collect_region(
    source: &dyn EventSource,
    region: &str,
    window: TimeWindow,
    options: &CollectOptions,
    cancel: &CancellationToken,
) -> Result<ActivitySummary, CollectionError> {
    let mut summary = ActivitySummary::new();
    let mut dump = RawDump::create(options.raw_dump_directory.as_deref(), region)?;
    let mut status = StatusReporter::new();
    let mut next_token: Option<String> = None;

    loop {
        if cancel.is_cancelled() {
            return Err(CollectionError::new(region, CANCELLED_REASON));
        }
        let page = tokio::select! {
            _ = cancel.cancelled() => {
                return Err(CollectionError::new(region, CANCELLED_REASON));
            }
            result = source.fetch_page(region, window, next_token.take()) => {
                result.map_err(|err| CollectionError::new(region, err.reason))?
            }
        };

        for raw in &page.records {
            // The dump mirrors the fetched stream, so it comes before any
            // parsing or filtering; a record that fails to parse still
            // lands in the file for later inspection.
            dump.write_line(region, raw)?;

            let record = match ActivityRecord::from_json(raw) {
                Ok(record) => record,
                Err(err) => {
                    if options.lenient_identity {
                        status.skip_record();
                        warn!("Skipping record in region {}: {}", region, err);
                        continue;
                    }
                    return Err(CollectionError::new(region, err.to_string()));
                }
            };

            if let Some(message) = status.on_record(region, &record.event_time) {
                info!("{}", message);
            }

            if !options.activity_type.includes(record.is_successful()) {
                continue;
            }

            let principal = match principal_for_record(&record) {
                Ok(principal) => principal,
                Err(err) => {
                    if options.lenient_identity {
                        warn!("Skipping record in region {}: {}", region, err);
                        continue;
                    }
                    return Err(CollectionError::new(region, err.to_string()));
                }
            };

            summary.count_api_call(region, &principal, &record.api_call());
            summary.count_ip_address(&principal, record.source_ip());
            summary.count_user_agent(&principal, record.user_agent());
            if let Some(error_id) = record.error_id() {
                summary.count_error_code(&principal, &error_id);
            }
        }

        next_token = page.next_token;
        if next_token.is_none() {
            break;
        }
    }

    dump.finish(region)?;
    info!("Finished region {}", region);
    Ok(summary)
}

/// Cadence of the per-region status messages: one for the first record,
/// then one every [`STATUS_MESSAGE_RECORD_INTERVAL`] records. Counts
/// every fetched record, including ones leniently skipped, so the
/// cadence tracks the stream rather than the parseable subset.
struct StatusReporter {
    records_seen: u64,
}

impl StatusReporter {
    fn new() -> Self {
        Self { records_seen: 0 }
    }

    /// Counts one record and returns the status message due at this
    /// point in the stream, if any.
    fn on_record(&mut self, region: &str, event_time: &str) -> Option<String> {
        let due = self.records_seen % STATUS_MESSAGE_RECORD_INTERVAL == 0;
        let message = if !due {
            None
        } else if self.records_seen == 0 {
            Some(format!("Reading CloudTrail records from region {}", region))
        } else {
            Some(format!(
                "Reading CloudTrail records from region {} (count: {}, currently at: {})",
                region, self.records_seen, event_time
            ))
        };
        self.records_seen += 1;
        message
    }

    /// Counts a record that produces no message of its own (its skip
    /// warning takes that place).
    fn skip_record(&mut self) {
        self.records_seen += 1;
    }
}

/// Optional JSONL copy of everything fetched for one region. Lines are
/// written as records stream in, so a file can hold a partial dump when
/// its region fails midway.
struct RawDump {
    writer: Option<BufWriter<File>>,
}

impl RawDump {
    fn create(directory: Option<&Path>, region: &str) -> Result<Self, CollectionError> {
        let writer = match directory {
            Some(directory) => {
                let path = directory.join(format!("{}.jsonl", region));
                let file = File::create(&path).map_err(|err| {
                    CollectionError::new(region, format!("cannot create raw data file: {}", err))
                })?;
                Some(BufWriter::new(file))
            }
            None => None,
        };
        Ok(Self { writer })
    }

    fn write_line(&mut self, region: &str, raw: &str) -> Result<(), CollectionError> {
        if let Some(writer) = &mut self.writer {
            writeln!(writer, "{}", raw).map_err(|err| {
                CollectionError::new(region, format!("cannot write raw data file: {}", err))
            })?;
        }
        Ok(())
    }

    fn finish(mut self, region: &str) -> Result<(), CollectionError> {
        if let Some(writer) = &mut self.writer {
            writer.flush().map_err(|err| {
                CollectionError::new(region, format!("cannot write raw data file: {}", err))
            })?;
        }
        Ok(())
    }
}
