//! Paged access to the audit event stream.

use async_trait::async_trait;
use aws_sdk_cloudtrail as cloudtrail;
use aws_smithy_runtime_api::client::result::SdkError;
use aws_smithy_types::error::metadata::ProvideErrorMetadata;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use thiserror::Error;

use super::session::AwsSessions;

/// The lookup API caps pages at 50 events.
const PAGE_SIZE: i32 = 50;

/// Time window of one run. Both bounds are inclusive, which is how the
/// lookup API treats `StartTime` and `EndTime`; collectors forward the
/// window verbatim and apply no time filtering of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn past_hours(end: DateTime<Utc>, hours: u32) -> Self {
        Self {
            start: end - Duration::hours(i64::from(hours)),
            end,
        }
    }
}

/// One page of raw record payloads plus the continuation token, if any.
#[derive(Debug, Clone, Default)]
pub struct EventPage {
    pub records: Vec<String>,
    pub next_token: Option<String>,
}

/// Transport-level failure while fetching a page.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct SourceError {
    pub reason: String,
}

impl SourceError {
    pub fn new(reason: impl Into<String>) -> Self {
        SourceError {
            reason: reason.into(),
        }
    }

    /// Prefers the provider's error code (`AccessDeniedException`,
    /// `ThrottlingException`, ...) over the full display chain, so the
    /// failure map stays readable.
    fn from_sdk<E, R>(err: SdkError<E, R>) -> Self
    where
        E: ProvideErrorMetadata,
        SdkError<E, R>: std::fmt::Display,
    {
        if let SdkError::ServiceError(service_err) = &err {
            if let Some(code) = service_err.err().code() {
                return SourceError::new(code);
            }
        }
        SourceError::new(err.to_string())
    }
}

/// Paged read access to one region's audit events. The production
/// implementation wraps the CloudTrail lookup API; tests substitute
/// scripted sources.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn fetch_page(
        &self,
        region: &str,
        window: TimeWindow,
        next_token: Option<String>,
    ) -> Result<EventPage, SourceError>;
}

/// `LookupEvents`-backed event source reading the 90-day event history.
pub struct CloudTrailEventSource {
    sessions: Arc<AwsSessions>,
}

impl CloudTrailEventSource {
    pub fn new(sessions: Arc<AwsSessions>) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl EventSource for CloudTrailEventSource {
    async fn fetch_page(
        &self,
        region: &str,
        window: TimeWindow,
        next_token: Option<String>,
    ) -> Result<EventPage, SourceError> {
        let aws_config = self.sessions.config_for_region(region).await;
        let client = cloudtrail::Client::new(&aws_config);

        let mut request = client
            .lookup_events()
            .start_time(aws_smithy_types::DateTime::from_millis(
                window.start.timestamp_millis(),
            ))
            .end_time(aws_smithy_types::DateTime::from_millis(
                window.end.timestamp_millis(),
            ))
            .max_results(PAGE_SIZE);
        if let Some(token) = next_token {
            request = request.next_token(token);
        }

        let response = request.send().await.map_err(SourceError::from_sdk)?;

        let records = response
            .events
            .unwrap_or_default()
            .into_iter()
            .filter_map(|event| event.cloud_trail_event)
            .collect();
        Ok(EventPage {
            records,
            next_token: response.next_token,
        })
    }
}
