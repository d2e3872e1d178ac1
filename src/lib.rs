//! TrailScope - AWS CloudTrail Account Activity Summarizer
//!
//! TrailScope analyzes the CloudTrail data of an AWS account and generates a
//! summary of recently active IAM principals, the API calls they made and the
//! regions, IP addresses and user agents they used. Results are written as a
//! JSON file and can optionally be rendered as bar charts.
//!
//! # Core Features
//!
//! - **Principal Resolution**: Every CloudTrail `userIdentity` variant is
//!   reduced to one canonical principal string, so activity of the same actor
//!   aggregates under one key
//! - **Concurrent Collection**: All enabled regions are read concurrently
//!   with a bounded number of in-flight regions and a single merge point
//! - **Partial Failure Isolation**: A region that cannot be read is recorded
//!   in the result metadata without affecting the other regions
//! - **Activity Filtering**: Analysis can be restricted to successful or to
//!   declined API calls
//! - **Raw Data Dumps**: The unmodified records received from CloudTrail can
//!   be kept as JSONL files for later inspection
//!
//! # Architecture Overview
//!
//! The crate follows a small layered architecture:
//!
//! - **Record Interpretation** ([`app::record`], [`app::principal`]): pure
//!   functions from a CloudTrail log record to principal, API call, source IP
//!   address, user agent and error identifier
//! - **Collection Pipeline** ([`app::source`], [`app::collector`],
//!   [`app::orchestrator`]): paged event retrieval behind a trait seam, one
//!   counting task per region, bounded fan-out and race-free merging
//! - **Output** ([`app::report`], [`app::chart`]): deterministic result files
//!   and SVG charts
//!
//! # Getting Started
//!
//! The binary entry point parses [`app::Cli`] and hands it to [`app::run`],
//! which coordinates the full collection run.

#![warn(clippy::all, rust_2018_idioms)]

pub mod app;
pub use app::{run, Cli};
