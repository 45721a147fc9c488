// ABOUTME: Integration tests for the snapshot aggregator's barrier, error substitution, and preconditions
// ABOUTME: Exercises out-of-order completions, timeouts, cancellation, and authorization denial
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use chrono::{NaiveDate, Utc};
use lifelog_sync::aggregator::{AggregatorConfig, SnapshotAggregator};
use lifelog_sync::errors::AggregationError;
use lifelog_sync::models::{
    HeartRateSample, MetricKind, MetricSamples, StepSample, WeightSample,
};
use lifelog_sync::source::{HealthDataSource, SyntheticSource};
use std::sync::Arc;
use std::time::Duration;

fn step_batch(counts: &[u64]) -> MetricSamples {
    let base = NaiveDate::from_ymd_opt(2024, 11, 1).unwrap();
    MetricSamples::Steps(
        counts
            .iter()
            .enumerate()
            .map(|(i, &count)| StepSample {
                count,
                date: base + chrono::Duration::days(i as i64),
            })
            .collect(),
    )
}

fn three_metric_config() -> AggregatorConfig {
    AggregatorConfig {
        kinds: vec![MetricKind::Steps, MetricKind::Weight, MetricKind::HeartRate],
        ..AggregatorConfig::default()
    }
}

#[tokio::test]
async fn run_issues_exactly_one_fetch_per_configured_kind() {
    let source = Arc::new(SyntheticSource::new());
    let aggregator = SnapshotAggregator::new(Arc::clone(&source) as Arc<dyn HealthDataSource>);

    aggregator.run_snapshot("subject-1").await.unwrap();

    for kind in MetricKind::ALL {
        assert_eq!(source.fetch_count(kind), 1, "kind {kind}");
    }
    assert_eq!(source.authorization_requests(), 1);
}

#[tokio::test]
async fn barrier_waits_for_out_of_order_completions() {
    // Steps resolves last, weight immediately, heart rate in between; the
    // snapshot must still carry every slot when the run resolves.
    let source = Arc::new(SyntheticSource::with_batches(vec![
        step_batch(&[10, 20]),
        MetricSamples::Weight(vec![WeightSample {
            kilograms: 70.0,
            measured_at: Utc::now(),
        }]),
        MetricSamples::HeartRate(vec![HeartRateSample {
            min_bpm: 55,
            max_bpm: 150,
            avg_bpm: 72,
            measured_at: Utc::now(),
        }]),
    ]));
    source.delay_metric(MetricKind::Steps, Duration::from_millis(80));
    source.delay_metric(MetricKind::HeartRate, Duration::from_millis(30));

    let aggregator = SnapshotAggregator::with_config(
        Arc::clone(&source) as Arc<dyn HealthDataSource>,
        three_metric_config(),
    );
    let snapshot = aggregator.run_snapshot("subject-1").await.unwrap();

    assert_eq!(snapshot.steps.len(), 2);
    assert_eq!(snapshot.weight.len(), 1);
    assert_eq!(snapshot.heart_rate.len(), 1);
    assert_eq!(source.total_fetches(), 3);
}

#[tokio::test]
async fn simultaneous_completions_resolve_the_barrier_once() {
    // All kinds complete synchronously; the run must still produce exactly
    // one snapshot with one fetch per kind.
    let source = Arc::new(SyntheticSource::new());
    let aggregator = SnapshotAggregator::new(Arc::clone(&source) as Arc<dyn HealthDataSource>);

    let snapshot = aggregator.run_snapshot("subject-1").await.unwrap();

    assert_eq!(source.total_fetches(), MetricKind::ALL.len());
    assert_eq!(snapshot.sample_count(), 0);
}

#[tokio::test]
async fn metric_error_is_substituted_with_empty_batch() {
    // Steps yield two samples, weight yields nothing, heart rate errors.
    let source = Arc::new(SyntheticSource::with_batches(vec![step_batch(&[10, 20])]));
    source.fail_metric(MetricKind::HeartRate, "simulated sensor failure");

    let aggregator = SnapshotAggregator::with_config(
        Arc::clone(&source) as Arc<dyn HealthDataSource>,
        three_metric_config(),
    );
    let snapshot = aggregator.run_snapshot("subject-1").await.unwrap();

    assert_eq!(
        snapshot.steps.iter().map(|s| s.count).collect::<Vec<_>>(),
        vec![10, 20]
    );
    assert!(snapshot.weight.is_empty());
    assert!(snapshot.heart_rate.is_empty());
    // The failing metric did not block the others.
    assert_eq!(source.total_fetches(), 3);
}

#[tokio::test]
async fn stalled_metric_times_out_and_is_recorded_empty() {
    let source = Arc::new(SyntheticSource::with_batches(vec![step_batch(&[500])]));
    source.delay_metric(MetricKind::Weight, Duration::from_secs(60));

    let config = AggregatorConfig {
        kinds: vec![MetricKind::Steps, MetricKind::Weight],
        per_metric_timeout: Duration::from_millis(100),
        ..AggregatorConfig::default()
    };
    let aggregator =
        SnapshotAggregator::with_config(Arc::clone(&source) as Arc<dyn HealthDataSource>, config);

    let snapshot = aggregator.run_snapshot("subject-1").await.unwrap();

    assert_eq!(snapshot.steps.len(), 1);
    assert!(snapshot.weight.is_empty());
}

#[tokio::test]
async fn authorization_denial_short_circuits_before_any_fetch() {
    let source = Arc::new(SyntheticSource::new());
    source.deny_authorization();

    let aggregator = SnapshotAggregator::new(Arc::clone(&source) as Arc<dyn HealthDataSource>);
    let err = aggregator.run_snapshot("subject-1").await.unwrap_err();

    assert!(matches!(err, AggregationError::AuthorizationDenied));
    assert_eq!(source.total_fetches(), 0);
}

#[tokio::test]
async fn identical_source_data_produces_identical_snapshots() {
    let source = Arc::new(SyntheticSource::with_batches(vec![
        step_batch(&[10, 20]),
        MetricSamples::Weight(vec![WeightSample {
            kilograms: 70.0,
            measured_at: NaiveDate::from_ymd_opt(2024, 11, 5)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap()
                .and_utc(),
        }]),
    ]));
    let aggregator = SnapshotAggregator::new(Arc::clone(&source) as Arc<dyn HealthDataSource>);

    let mut first = aggregator.run_snapshot("subject-1").await.unwrap();
    let mut second = aggregator.run_snapshot("subject-1").await.unwrap();

    // recorded_at is wall-clock; everything else must match.
    let epoch = Utc::now();
    first.recorded_at = epoch;
    second.recorded_at = epoch;
    assert_eq!(first, second);
}

#[tokio::test]
async fn pre_cancelled_run_fails_without_fetching() {
    let source = Arc::new(SyntheticSource::new());
    let aggregator = SnapshotAggregator::new(Arc::clone(&source) as Arc<dyn HealthDataSource>);
    aggregator.cancellation_token().cancel();

    let err = aggregator.run_snapshot("subject-1").await.unwrap_err();
    assert!(matches!(err, AggregationError::Cancelled));
    assert_eq!(source.total_fetches(), 0);
}

#[tokio::test]
async fn cancellation_mid_fetch_suppresses_the_snapshot() {
    let source = Arc::new(SyntheticSource::new());
    source.delay_metric(MetricKind::Steps, Duration::from_secs(60));

    let config = AggregatorConfig {
        kinds: vec![MetricKind::Steps],
        per_metric_timeout: Duration::from_secs(120),
        ..AggregatorConfig::default()
    };
    let aggregator = Arc::new(SnapshotAggregator::with_config(
        Arc::clone(&source) as Arc<dyn HealthDataSource>,
        config,
    ));

    let token = aggregator.cancellation_token();
    let runner = Arc::clone(&aggregator);
    let handle = tokio::spawn(async move { runner.run_snapshot("subject-1").await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    token.cancel();

    let err = handle.await.unwrap().unwrap_err();
    assert!(matches!(err, AggregationError::Cancelled));
}
