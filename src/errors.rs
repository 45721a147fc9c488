// ABOUTME: Typed error taxonomy for the aggregation and upload pipeline
// ABOUTME: Separates per-metric recoverable errors from run-level and upload-level failures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Error types for the pipeline.
//!
//! Three layers with different propagation rules:
//!
//! - [`MetricFetchError`]: one metric's fetch failed. Absorbed by the
//!   aggregator - the kind contributes an empty batch and the run continues.
//! - [`AggregationError`]: the run itself cannot proceed (authorization
//!   denied, bad input, cancelled). Surfaced to the caller before or instead
//!   of a snapshot; never produced by a single metric failing.
//! - [`UploadError`]: delivery of a complete snapshot failed. Surfaced to
//!   the workflow caller; never retried automatically.

use crate::models::MetricKind;
use std::time::Duration;
use thiserror::Error;

/// Failure of one metric kind's fetch.
///
/// Recovered locally by the aggregator: the affected kind is recorded as
/// empty in the final snapshot and the error is logged, not propagated.
#[derive(Debug, Error)]
pub enum MetricFetchError {
    /// The data source could not serve this metric kind.
    #[error("{kind} unavailable: {reason}")]
    Unavailable {
        /// Metric kind the fetch targeted
        kind: MetricKind,
        /// Source-reported reason
        reason: String,
    },

    /// The fetch did not resolve within the configured per-metric timeout.
    #[error("{kind} fetch timed out after {waited:?}")]
    Timeout {
        /// Metric kind the fetch targeted
        kind: MetricKind,
        /// How long the aggregator waited
        waited: Duration,
    },

    /// The data source returned an underlying error for this metric kind.
    #[error("{kind} fetch failed")]
    Source {
        /// Metric kind the fetch targeted
        kind: MetricKind,
        /// Underlying source error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl MetricFetchError {
    /// The metric kind this error belongs to.
    #[must_use]
    pub const fn kind(&self) -> MetricKind {
        match self {
            Self::Unavailable { kind, .. }
            | Self::Timeout { kind, .. }
            | Self::Source { kind, .. } => *kind,
        }
    }
}

/// Run-level failure of one aggregation run.
///
/// Produced before any fetch (precondition failures) or when the run is
/// cancelled; a single metric's fetch error never becomes one of these.
#[derive(Debug, Error)]
pub enum AggregationError {
    /// The subject declined (or has not granted) read access.
    #[error("health data access not authorized")]
    AuthorizationDenied,

    /// The backing health data store is unreachable or unsupported.
    #[error("health data store unavailable: {0}")]
    StoreUnavailable(String),

    /// The caller passed an unusable subject identifier.
    #[error("invalid subject id: {0}")]
    InvalidSubject(String),

    /// The run was cancelled before completion; no upload was attempted.
    #[error("aggregation run cancelled")]
    Cancelled,
}

/// Failure to deliver a complete snapshot to the collector.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The request never produced an HTTP response (DNS, connect, timeout).
    #[error("transport failure during upload")]
    Transport(#[from] reqwest::Error),

    /// The collector answered but refused the snapshot.
    #[error("collector rejected snapshot: {status} {message}")]
    Rejected {
        /// HTTP status (or nested envelope code mapped onto it)
        status: u16,
        /// Collector-provided failure message, body text when absent
        message: String,
    },

    /// The snapshot could not be serialized to the wire format.
    #[error("snapshot serialization failed")]
    Serialization(#[from] serde_json::Error),
}

impl UploadError {
    /// Whether a caller-supplied retry policy may retry after this error.
    ///
    /// Transport failures and server-side (5xx) rejections are considered
    /// transient; client-side rejections and serialization failures are not.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Rejected { status, .. } => *status >= 500,
            Self::Serialization(_) => false,
        }
    }
}

/// Top-level failure of one aggregate-and-upload workflow run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The aggregation phase failed; no upload was attempted.
    #[error(transparent)]
    Aggregation(#[from] AggregationError),

    /// Aggregation succeeded but delivery failed.
    #[error(transparent)]
    Upload(#[from] UploadError),
}
