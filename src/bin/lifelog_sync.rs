// ABOUTME: Demo binary running one aggregate-and-upload cycle against the synthetic data source
// ABOUTME: Seeds plausible health data, builds a snapshot, and reports the collector's verdict
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Lifelog sync demo runner.
//!
//! Usage:
//! ```bash
//! # One run with seeded synthetic data against the configured collector
//! LIFELOG_ENDPOINT=https://collector.example.com/m/lifelog/put \
//! LIFELOG_SESSION_TOKEN=... \
//! cargo run --bin lifelog-sync -- --subject subject-1
//!
//! # Dry run: aggregate only, print the snapshot JSON, skip the upload
//! cargo run --bin lifelog-sync -- --subject subject-1 --dry-run
//! ```

use anyhow::{Context, Result};
use chrono::{Duration as ChronoDuration, Utc};
use clap::Parser;
use lifelog_sync::aggregator::SnapshotAggregator;
use lifelog_sync::config::SyncConfig;
use lifelog_sync::logging::LoggingConfig;
use lifelog_sync::models::{
    BloodGlucoseSample, BloodPressureSample, ExerciseSample, HeartRateSample, MetricSamples,
    OxygenSaturationSample, StepSample, WeightSample,
};
use lifelog_sync::source::SyntheticSource;
use lifelog_sync::sync::SyncService;
use lifelog_sync::uploader::{RetryPolicy, SnapshotUploader};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "lifelog-sync",
    about = "Run one health snapshot aggregation and upload cycle",
    long_about = "Aggregates synthetic health metrics into one snapshot and delivers it to the configured lifelog collector"
)]
struct SyncArgs {
    /// Subject id to aggregate for (falls back to LIFELOG_SUBJECT_ID)
    #[arg(long)]
    subject: Option<String>,

    /// Aggregate and print the snapshot without uploading
    #[arg(long)]
    dry_run: bool,

    /// Retry transient upload failures with bounded backoff
    #[arg(long)]
    retry: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    LoggingConfig::from_env().init()?;
    let args = SyncArgs::parse();

    let source = Arc::new(seeded_source());

    if args.dry_run {
        let subject = args
            .subject
            .or_else(|| std::env::var("LIFELOG_SUBJECT_ID").ok())
            .context("a subject id is required (--subject or LIFELOG_SUBJECT_ID)")?;
        let aggregator = SnapshotAggregator::new(source);
        let snapshot = aggregator
            .run_snapshot(&subject)
            .await
            .context("aggregation failed")?;
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    let config = SyncConfig::from_env().context("invalid configuration")?;
    let subject = args
        .subject
        .or(config.subject_id.clone())
        .context("a subject id is required (--subject or LIFELOG_SUBJECT_ID)")?;

    let aggregator = SnapshotAggregator::with_config(source, config.aggregator_config());
    let uploader =
        SnapshotUploader::new(config.upload_config()).context("failed to build HTTP client")?;
    let mut service = SyncService::new(aggregator, uploader);
    if args.retry {
        service = service.with_retry(RetryPolicy::default());
    }

    let report = service.sync(&subject).await?;
    info!(
        run_id = %report.run_id,
        status = report.receipt.status,
        samples = report.snapshot.sample_count(),
        created_at = report.receipt.created_at.as_deref().unwrap_or("-"),
        "snapshot delivered"
    );
    Ok(())
}

/// Synthetic source preloaded with two weeks of plausible health data.
fn seeded_source() -> SyntheticSource {
    let now = Utc::now();
    let today = now.date_naive();

    let steps = (0..14)
        .filter_map(|days_back| {
            today
                .checked_sub_signed(ChronoDuration::days(days_back))
                .map(|date| StepSample {
                    count: 6500 + (days_back as u64 * 317) % 4200,
                    date,
                })
        })
        .collect();

    let weight = vec![
        WeightSample {
            kilograms: 71.8,
            measured_at: now - ChronoDuration::days(1),
        },
        WeightSample {
            kilograms: 72.1,
            measured_at: now - ChronoDuration::days(4),
        },
    ];

    let heart_rate = vec![HeartRateSample {
        min_bpm: 52,
        max_bpm: 164,
        avg_bpm: 74,
        measured_at: now,
    }];

    let blood_pressure = vec![BloodPressureSample {
        systolic_mmhg: 118,
        diastolic_mmhg: 76,
        measured_at: now - ChronoDuration::days(2),
    }];

    let blood_glucose = vec![BloodGlucoseSample {
        mg_per_dl: 94.0,
        measured_at: now - ChronoDuration::hours(6),
    }];

    let oxygen = vec![OxygenSaturationSample {
        percent: 97.5,
        measured_at: now - ChronoDuration::hours(3),
    }];

    let exercise = vec![ExerciseSample {
        activity: "Walking".to_owned(),
        burned_kcal: 215.3,
        duration_seconds: 2700,
        distance_meters: Some(3400.0),
        step_count: Some(4480),
        started_at: now - ChronoDuration::hours(26),
        ended_at: now - ChronoDuration::hours(25),
    }];

    SyntheticSource::with_batches(vec![
        MetricSamples::Steps(steps),
        MetricSamples::Weight(weight),
        MetricSamples::HeartRate(heart_rate),
        MetricSamples::BloodPressure(blood_pressure),
        MetricSamples::BloodGlucose(blood_glucose),
        MetricSamples::OxygenSaturation(oxygen),
        MetricSamples::Exercise(exercise),
    ])
}
