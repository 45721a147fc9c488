// ABOUTME: Data source seam for per-metric health queries plus a synthetic in-memory implementation
// ABOUTME: The aggregator only ever talks to the HealthDataSource trait, never a concrete store
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! The data source collaborator.
//!
//! Platform health stores are modeled as one injectable capability: request
//! authorization for a set of metric kinds, then fetch one metric kind over
//! a time range. Real adapters (device health stores, vendor APIs) live
//! outside this crate; [`SyntheticSource`] covers development, demos, and
//! deterministic tests.

use crate::errors::{AggregationError, MetricFetchError};
use crate::models::{MetricKind, MetricSamples};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Duration;
use tracing::debug;

/// Authorization decision from the backing health data store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    /// Read access granted for the requested kinds
    Authorized,
    /// Read access denied; no fetch may be attempted
    Denied,
}

/// Outcome of one metric kind's fetch: a typed batch or a typed error.
pub type FetchOutcome = Result<MetricSamples, MetricFetchError>;

/// Half-open query window `[start, end)` in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    /// Inclusive window start
    pub start: DateTime<Utc>,
    /// Exclusive window end
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Window covering the last `days` days up to now.
    #[must_use]
    pub fn last_days(days: i64) -> Self {
        let end = Utc::now();
        Self {
            start: end - ChronoDuration::days(days),
            end,
        }
    }

    /// Window from midnight UTC today up to now.
    #[must_use]
    pub fn today() -> Self {
        let end = Utc::now();
        Self {
            start: end
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .map_or(end, |start| start.and_utc()),
            end,
        }
    }
}

/// Injectable capability providing per-metric historical sample queries.
///
/// Implementations must be `Send + Sync`; one instance is shared across the
/// concurrent per-metric fetches of a run. Fetches for different kinds are
/// independent - a failure for one kind must not poison another.
#[async_trait]
pub trait HealthDataSource: Send + Sync {
    /// Short source name for logs (e.g. "synthetic", "health_kit").
    fn name(&self) -> &'static str;

    /// Ask the store for read access to the given metric kinds.
    ///
    /// Called once per run, before any fetch.
    ///
    /// # Errors
    ///
    /// Returns [`AggregationError::StoreUnavailable`] when the store cannot
    /// answer at all (as opposed to answering [`Authorization::Denied`]).
    async fn request_authorization(
        &self,
        kinds: &[MetricKind],
    ) -> Result<Authorization, AggregationError>;

    /// Fetch one metric kind's samples for a subject over a time range.
    ///
    /// Returns an empty batch when the store has no data for the window;
    /// an error only when the query itself failed.
    async fn fetch_metric(
        &self,
        kind: MetricKind,
        subject_id: &str,
        range: &TimeRange,
    ) -> FetchOutcome;
}

/// Configured behavior for one metric kind in a [`SyntheticSource`].
#[derive(Debug, Clone, Default)]
struct KindBehavior {
    batch: Option<MetricSamples>,
    failure: Option<String>,
    delay: Option<Duration>,
}

/// In-memory data source for development, demos, and deterministic tests.
///
/// Each metric kind can independently be preloaded with a batch, primed to
/// fail with a given reason, or delayed by an artificial latency - enough to
/// exercise every barrier and error-substitution path in the aggregator
/// without a real device store.
pub struct SyntheticSource {
    behaviors: RwLock<HashMap<MetricKind, KindBehavior>>,
    authorized: RwLock<Authorization>,
    fetch_counts: RwLock<HashMap<MetricKind, usize>>,
    auth_requests: AtomicUsize,
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticSource {
    /// Create an authorized source with no data: every fetch resolves to an
    /// empty batch of the requested kind.
    #[must_use]
    pub fn new() -> Self {
        Self {
            behaviors: RwLock::new(HashMap::new()),
            authorized: RwLock::new(Authorization::Authorized),
            fetch_counts: RwLock::new(HashMap::new()),
            auth_requests: AtomicUsize::new(0),
        }
    }

    /// Create an authorized source preloaded with the given batches.
    #[must_use]
    pub fn with_batches(batches: Vec<MetricSamples>) -> Self {
        let source = Self::new();
        for batch in batches {
            source.set_batch(batch);
        }
        source
    }

    /// Preload (or replace) one kind's batch.
    pub fn set_batch(&self, batch: MetricSamples) {
        let kind = batch.kind();
        if let Ok(mut behaviors) = self.behaviors.write() {
            behaviors.entry(kind).or_default().batch = Some(batch);
        }
    }

    /// Prime one kind to fail with the given reason.
    pub fn fail_metric(&self, kind: MetricKind, reason: impl Into<String>) {
        if let Ok(mut behaviors) = self.behaviors.write() {
            behaviors.entry(kind).or_default().failure = Some(reason.into());
        }
    }

    /// Add artificial latency before one kind's fetch resolves.
    pub fn delay_metric(&self, kind: MetricKind, delay: Duration) {
        if let Ok(mut behaviors) = self.behaviors.write() {
            behaviors.entry(kind).or_default().delay = Some(delay);
        }
    }

    /// Make `request_authorization` answer [`Authorization::Denied`].
    pub fn deny_authorization(&self) {
        if let Ok(mut authorized) = self.authorized.write() {
            *authorized = Authorization::Denied;
        }
    }

    /// How many fetches have been issued for one kind.
    #[must_use]
    pub fn fetch_count(&self, kind: MetricKind) -> usize {
        self.fetch_counts
            .read()
            .map(|counts| counts.get(&kind).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Total fetches issued across all kinds.
    #[must_use]
    pub fn total_fetches(&self) -> usize {
        self.fetch_counts
            .read()
            .map(|counts| counts.values().sum())
            .unwrap_or(0)
    }

    /// How many times authorization has been requested.
    #[must_use]
    pub fn authorization_requests(&self) -> usize {
        self.auth_requests.load(Ordering::SeqCst)
    }

    fn behavior_for(&self, kind: MetricKind) -> KindBehavior {
        self.behaviors
            .read()
            .ok()
            .and_then(|behaviors| behaviors.get(&kind).cloned())
            .unwrap_or_default()
    }
}

#[async_trait]
impl HealthDataSource for SyntheticSource {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    async fn request_authorization(
        &self,
        kinds: &[MetricKind],
    ) -> Result<Authorization, AggregationError> {
        self.auth_requests.fetch_add(1, Ordering::SeqCst);
        debug!(source = self.name(), kinds = kinds.len(), "authorization requested");
        self.authorized
            .read()
            .map(|authorized| *authorized)
            .map_err(|_| AggregationError::StoreUnavailable("authorization state poisoned".into()))
    }

    async fn fetch_metric(
        &self,
        kind: MetricKind,
        subject_id: &str,
        range: &TimeRange,
    ) -> FetchOutcome {
        if let Ok(mut counts) = self.fetch_counts.write() {
            *counts.entry(kind).or_insert(0) += 1;
        }
        debug!(%kind, subject_id, start = %range.start, end = %range.end, "synthetic fetch");

        let behavior = self.behavior_for(kind);
        if let Some(delay) = behavior.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(reason) = behavior.failure {
            return Err(MetricFetchError::Unavailable { kind, reason });
        }
        Ok(behavior
            .batch
            .unwrap_or_else(|| MetricSamples::empty(kind)))
    }
}
