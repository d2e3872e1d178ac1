//! Core application modules for TrailScope.
//!
//! This module contains the business logic for summarizing the account
//! activity recorded in AWS CloudTrail across the regions enabled in an
//! account.
//!
//! # Module Organization
//!
//! ## Record Interpretation
//! - [`record`] - CloudTrail log record model and per-record accessors
//! - [`principal`] - Canonical principal resolution for every identity kind
//! - [`errors`] - Record-level and region-level error types
//!
//! ## Collection Pipeline
//! - [`source`] - Paged CloudTrail event retrieval behind a trait seam
//! - [`collector`] - Per-region record processing and counting
//! - [`orchestrator`] - Bounded fan-out across regions with a single merge point
//! - [`aggregate`] - Counter families and their merge rules
//!
//! ## AWS Integration
//! - [`session`] - Per-region SDK configuration cache
//! - [`identity`] - Caller account and principal lookup
//! - [`regions`] - Enumeration of the regions enabled in the account
//!
//! ## Output
//! - [`report`] - Result file assembly and the on-disk layout
//! - [`chart`] - Bar chart rendering for collected activity
//!
//! # Architecture
//!
//! [`commands`] wires the pieces together: it resolves the caller
//! identity, fans out one collection task per region through the
//! [`orchestrator`], merges the per-region summaries and writes the
//! result artifacts.

pub mod aggregate;
pub mod chart;
pub mod cli;
pub mod collector;
pub mod commands;
pub mod errors;
pub mod identity;
pub mod orchestrator;
pub mod principal;
pub mod record;
pub mod regions;
pub mod report;
pub mod session;
pub mod source;

pub use cli::Cli;
pub use commands::run;
