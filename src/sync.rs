// ABOUTME: End-to-end workflow composing one aggregation run with one best-effort upload
// ABOUTME: Tracks the run state machine and guarantees no success report for an incomplete snapshot
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! The aggregate-and-upload workflow.
//!
//! One [`SyncService::sync`] call walks the run state machine
//! `Idle -> AwaitingAuthorization -> FetchingMetrics -> Serializing ->
//! Uploading -> Done | Failed`. The caller receives either a confirmed
//! [`UploadReceipt`] alongside the uploaded snapshot, or a typed failure -
//! never a success for a snapshot that was not complete and delivered.

use crate::aggregator::SnapshotAggregator;
use crate::errors::SyncError;
use crate::models::{Snapshot, UploadReceipt};
use crate::uploader::{RetryPolicy, SnapshotUploader};
use std::fmt;
use tracing::{error, info};
use uuid::Uuid;

/// Phase of one aggregate-and-upload run.
///
/// `Done` and `Failed` are terminal; no run transitions out of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// Run created, nothing started
    Idle,
    /// Waiting on the store's authorization decision
    AwaitingAuthorization,
    /// Per-metric fetches in flight behind the barrier
    FetchingMetrics,
    /// Snapshot complete, encoding to the wire format
    Serializing,
    /// Upload request in flight
    Uploading,
    /// Snapshot delivered and acknowledged
    Done,
    /// Run aborted; nothing was or will be uploaded for it
    Failed,
}

impl RunPhase {
    /// Whether the run can make no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::AwaitingAuthorization => "awaiting_authorization",
            Self::FetchingMetrics => "fetching_metrics",
            Self::Serializing => "serializing",
            Self::Uploading => "uploading",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Outcome of one completed workflow run.
#[derive(Debug, Clone)]
pub struct SyncReport {
    /// Identifier correlating this run's log records
    pub run_id: Uuid,
    /// The snapshot that was uploaded
    pub snapshot: Snapshot,
    /// The collector's acknowledgement
    pub receipt: UploadReceipt,
}

/// Composes an aggregator and an uploader into one workflow.
pub struct SyncService {
    aggregator: SnapshotAggregator,
    uploader: SnapshotUploader,
    retry: Option<RetryPolicy>,
}

impl SyncService {
    /// Create a workflow without automatic upload retries (the baseline).
    #[must_use]
    pub fn new(aggregator: SnapshotAggregator, uploader: SnapshotUploader) -> Self {
        Self {
            aggregator,
            uploader,
            retry: None,
        }
    }

    /// Opt in to a bounded retry policy for the upload leg.
    #[must_use]
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Access to the aggregator, e.g. for its cancellation token.
    #[must_use]
    pub const fn aggregator(&self) -> &SnapshotAggregator {
        &self.aggregator
    }

    /// Run one aggregate-and-upload cycle for the given subject.
    ///
    /// # Errors
    ///
    /// [`SyncError::Aggregation`] when the run could not produce a complete
    /// snapshot (authorization denied, cancelled, bad subject) - no upload
    /// is attempted. [`SyncError::Upload`] when the complete snapshot could
    /// not be delivered.
    pub async fn sync(&self, subject_id: &str) -> Result<SyncReport, SyncError> {
        let run_id = Uuid::new_v4();
        advance(run_id, RunPhase::Idle, RunPhase::AwaitingAuthorization);

        // Authorization and the fetch barrier both live inside the
        // aggregator; its result marks the end of FetchingMetrics.
        advance(
            run_id,
            RunPhase::AwaitingAuthorization,
            RunPhase::FetchingMetrics,
        );
        let snapshot = match self.aggregator.run_snapshot(subject_id).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                error!(%run_id, phase = %RunPhase::Failed, error = %err, "aggregation failed");
                return Err(err.into());
            }
        };

        advance(run_id, RunPhase::FetchingMetrics, RunPhase::Serializing);
        advance(run_id, RunPhase::Serializing, RunPhase::Uploading);
        let upload = match &self.retry {
            Some(policy) => self.uploader.upload_with_retry(&snapshot, policy).await,
            None => self.uploader.upload(&snapshot).await,
        };

        match upload {
            Ok(receipt) => {
                advance(run_id, RunPhase::Uploading, RunPhase::Done);
                Ok(SyncReport {
                    run_id,
                    snapshot,
                    receipt,
                })
            }
            Err(err) => {
                error!(%run_id, phase = %RunPhase::Failed, error = %err, "upload failed");
                Err(err.into())
            }
        }
    }
}

fn advance(run_id: Uuid, from: RunPhase, to: RunPhase) {
    info!(%run_id, from = %from, to = %to, "run phase transition");
}
