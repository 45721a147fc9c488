// ABOUTME: Snapshot aggregator driving one fan-out/fan-in run over all configured metric kinds
// ABOUTME: Joins every per-metric fetch behind one barrier and substitutes empty batches for failures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! One end-to-end aggregation run.
//!
//! The aggregator fans out one independent fetch per configured metric kind,
//! waits for all of them behind a single join, and assembles the outcomes
//! into one complete [`Snapshot`]. A metric-level error or timeout degrades
//! that kind to an empty batch; only precondition failures (authorization,
//! invalid subject) or cancellation fail the run as a whole.

use crate::errors::{AggregationError, MetricFetchError};
use crate::models::{MetricKind, MetricSamples, Snapshot};
use crate::source::{Authorization, HealthDataSource, TimeRange};
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default per-metric fetch timeout.
pub const DEFAULT_METRIC_TIMEOUT: Duration = Duration::from_secs(10);

/// Default historical lookback window, in days.
pub const DEFAULT_LOOKBACK_DAYS: i64 = 14;

/// Configuration for one aggregator instance.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Metric kinds to request each run; duplicates are ignored
    pub kinds: Vec<MetricKind>,
    /// Upper bound on any single metric fetch
    pub per_metric_timeout: Duration,
    /// Historical window each fetch covers, in days back from now
    pub lookback_days: i64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            kinds: MetricKind::ALL.to_vec(),
            per_metric_timeout: DEFAULT_METRIC_TIMEOUT,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
        }
    }
}

/// Drives one aggregation run against an injected data source.
///
/// The source is behind `Arc<dyn HealthDataSource>` so tests and callers can
/// swap in any implementation; the aggregator never reaches for a global
/// store.
pub struct SnapshotAggregator {
    source: Arc<dyn HealthDataSource>,
    config: AggregatorConfig,
    cancel: CancellationToken,
}

impl SnapshotAggregator {
    /// Create an aggregator over all metric kinds with default timeouts.
    #[must_use]
    pub fn new(source: Arc<dyn HealthDataSource>) -> Self {
        Self::with_config(source, AggregatorConfig::default())
    }

    /// Create an aggregator with explicit configuration.
    #[must_use]
    pub fn with_config(source: Arc<dyn HealthDataSource>, config: AggregatorConfig) -> Self {
        Self {
            source,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Handle for cancelling in-flight runs.
    ///
    /// Once triggered, the current run resolves to
    /// [`AggregationError::Cancelled`] and no snapshot escapes.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The configured metric kinds, deduplicated in configuration order.
    #[must_use]
    pub fn kinds(&self) -> Vec<MetricKind> {
        let mut kinds = Vec::with_capacity(self.config.kinds.len());
        for kind in &self.config.kinds {
            if !kinds.contains(kind) {
                kinds.push(*kind);
            }
        }
        kinds
    }

    /// Run one aggregation: authorize, fan out every configured metric
    /// fetch, join behind the barrier, and assemble one complete snapshot.
    ///
    /// Each fetch is independent; an error or timeout on one kind records
    /// that kind as empty and does not block the others. The returned
    /// snapshot always carries a slot outcome for every configured kind.
    ///
    /// # Errors
    ///
    /// - [`AggregationError::InvalidSubject`] for an empty subject id
    /// - [`AggregationError::AuthorizationDenied`] when the store denies
    ///   read access; no fetch is attempted
    /// - [`AggregationError::StoreUnavailable`] when the store cannot answer
    ///   the authorization request
    /// - [`AggregationError::Cancelled`] when the cancellation token fires
    ///   before the barrier resolves
    pub async fn run_snapshot(&self, subject_id: &str) -> Result<Snapshot, AggregationError> {
        if subject_id.trim().is_empty() {
            return Err(AggregationError::InvalidSubject(
                "subject id must be non-empty".to_owned(),
            ));
        }
        if self.cancel.is_cancelled() {
            return Err(AggregationError::Cancelled);
        }

        let kinds = self.kinds();
        info!(
            source = self.source.name(),
            subject_id,
            metrics = kinds.len(),
            "starting aggregation run"
        );

        match self.source.request_authorization(&kinds).await? {
            Authorization::Authorized => {}
            Authorization::Denied => {
                warn!(subject_id, "authorization denied; aborting before any fetch");
                return Err(AggregationError::AuthorizationDenied);
            }
        }

        let range = TimeRange::last_days(self.config.lookback_days);
        let fetches = kinds
            .iter()
            .map(|&kind| self.fetch_one(kind, subject_id, range));

        // Single barrier: join_all resolves exactly once, strictly after
        // every configured kind has produced an outcome.
        let outcomes = tokio::select! {
            outcomes = join_all(fetches) => outcomes,
            () = self.cancel.cancelled() => {
                warn!(subject_id, "aggregation run cancelled mid-fetch");
                return Err(AggregationError::Cancelled);
            }
        };

        let mut snapshot = Snapshot::new(subject_id);
        for outcome in outcomes {
            match outcome {
                Ok(batch) => {
                    debug!(kind = %batch.kind(), samples = batch.len(), "metric resolved");
                    snapshot.absorb(batch);
                }
                Err(err) => {
                    warn!(kind = %err.kind(), error = %err, "metric failed; recording empty batch");
                    snapshot.absorb(MetricSamples::empty(err.kind()));
                }
            }
        }

        info!(
            subject_id,
            samples = snapshot.sample_count(),
            "aggregation run complete"
        );
        Ok(snapshot)
    }

    async fn fetch_one(
        &self,
        kind: MetricKind,
        subject_id: &str,
        range: TimeRange,
    ) -> Result<MetricSamples, MetricFetchError> {
        let timeout = self.config.per_metric_timeout;
        match tokio::time::timeout(timeout, self.source.fetch_metric(kind, subject_id, &range))
            .await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(MetricFetchError::Timeout {
                kind,
                waited: timeout,
            }),
        }
    }
}
