// ABOUTME: Main library entry point for the lifelog health snapshot sync pipeline
// ABOUTME: Aggregates per-metric health data into one snapshot and uploads it to a collector
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

#![deny(unsafe_code)]

//! # Lifelog Sync
//!
//! Health snapshot aggregation and upload: fan out one asynchronous fetch
//! per configured metric kind against an injected data source, wait for all
//! of them behind one barrier, assemble one composite [`models::Snapshot`],
//! and deliver it to a remote lifelog collector with a single JSON POST.
//!
//! ## Design
//!
//! - **Data source as a seam**: the platform health store is hidden behind
//!   [`source::HealthDataSource`]; tests and demos run against
//!   [`source::SyntheticSource`] with no device dependency.
//! - **Partial-failure tolerance**: one metric's error or timeout degrades
//!   that metric to an empty batch; it never aborts the run. Only
//!   authorization denial, bad input, or cancellation fail a run.
//! - **No partial uploads**: the uploader only ever sees a snapshot that
//!   carries an outcome for every configured metric kind.
//!
//! ## Example
//!
//! ```rust,no_run
//! use lifelog_sync::aggregator::SnapshotAggregator;
//! use lifelog_sync::source::SyntheticSource;
//! use lifelog_sync::sync::SyncService;
//! use lifelog_sync::uploader::{SnapshotUploader, UploadConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = Arc::new(SyntheticSource::new());
//! let aggregator = SnapshotAggregator::new(source);
//! let uploader = SnapshotUploader::new(UploadConfig::new(
//!     "https://collector.example.com/m/lifelog/put".parse()?,
//!     "session-token",
//! ))?;
//!
//! let service = SyncService::new(aggregator, uploader);
//! let report = service.sync("subject-1").await?;
//! println!("accepted with status {}", report.receipt.status);
//! # Ok(())
//! # }
//! ```

/// Snapshot aggregation: fan-out/fan-in over all configured metric kinds
pub mod aggregator;

/// Environment-driven pipeline configuration
pub mod config;

/// Typed error taxonomy for fetch, aggregation, and upload failures
pub mod errors;

/// Structured logging setup
pub mod logging;

/// Metric samples, composite snapshots, and collector response models
pub mod models;

/// Data source trait and the synthetic in-memory implementation
pub mod source;

/// End-to-end aggregate-and-upload workflow with run state tracking
pub mod sync;

/// Snapshot delivery to the remote collector
pub mod uploader;

pub use aggregator::{AggregatorConfig, SnapshotAggregator};
pub use errors::{AggregationError, MetricFetchError, SyncError, UploadError};
pub use models::{MetricKind, MetricSamples, Snapshot, UploadReceipt};
pub use source::{Authorization, FetchOutcome, HealthDataSource, SyntheticSource, TimeRange};
pub use sync::{RunPhase, SyncReport, SyncService};
pub use uploader::{RetryPolicy, SnapshotUploader, UploadConfig};
