// ABOUTME: Domain models for health metric samples, composite snapshots, and collector responses
// ABOUTME: Every sample type carries exactly one canonical unit per metric kind
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Shared data models for the aggregation and upload pipeline.
//!
//! All numeric values use one canonical unit per metric kind: kilograms for
//! weight, counts/minute for heart rate, mmHg for blood pressure, mg/dL for
//! blood glucose, percent (0-100) for oxygen saturation, meters for distance,
//! and kilocalories for energy. Samples are plain immutable data once
//! produced; conversion from source-native units is the data source's job.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed provider tag stamped on every snapshot this pipeline produces.
pub const PROVIDER_TAG: &str = "health_kit";

/// One category of health observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Daily step totals
    Steps,
    /// Body weight measurements
    Weight,
    /// Heart rate min/max/avg statistics
    HeartRate,
    /// Blood pressure readings (systolic/diastolic)
    BloodPressure,
    /// Blood glucose readings
    BloodGlucose,
    /// Blood oxygen saturation readings
    OxygenSaturation,
    /// Exercise sessions (workouts)
    Exercise,
}

impl MetricKind {
    /// Every metric kind the pipeline knows about, in stable order.
    pub const ALL: [Self; 7] = [
        Self::Steps,
        Self::Weight,
        Self::HeartRate,
        Self::BloodPressure,
        Self::BloodGlucose,
        Self::OxygenSaturation,
        Self::Exercise,
    ];

    /// Stable string form, used in logs and error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Steps => "steps",
            Self::Weight => "weight",
            Self::HeartRate => "heart_rate",
            Self::BloodPressure => "blood_pressure",
            Self::BloodGlucose => "blood_glucose",
            Self::OxygenSaturation => "oxygen_saturation",
            Self::Exercise => "exercise",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One day's step total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepSample {
    /// Total steps counted for the day
    pub count: u64,
    /// Calendar day the total covers
    pub date: NaiveDate,
}

/// One body weight measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightSample {
    /// Body weight in kilograms
    pub kilograms: f64,
    /// When the measurement was taken (UTC)
    pub measured_at: DateTime<Utc>,
}

/// Heart rate statistics over one measurement window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartRateSample {
    /// Minimum heart rate in the window (counts/minute)
    pub min_bpm: u32,
    /// Maximum heart rate in the window (counts/minute)
    pub max_bpm: u32,
    /// Average heart rate in the window (counts/minute)
    pub avg_bpm: u32,
    /// When the window ended (UTC)
    pub measured_at: DateTime<Utc>,
}

/// One blood pressure reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BloodPressureSample {
    /// Systolic pressure in mmHg
    pub systolic_mmhg: u32,
    /// Diastolic pressure in mmHg
    pub diastolic_mmhg: u32,
    /// When the reading was taken (UTC)
    pub measured_at: DateTime<Utc>,
}

/// One blood glucose reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BloodGlucoseSample {
    /// Glucose concentration in mg/dL
    pub mg_per_dl: f64,
    /// When the reading was taken (UTC)
    pub measured_at: DateTime<Utc>,
}

/// One blood oxygen saturation reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OxygenSaturationSample {
    /// Saturation as a percentage, 0-100
    pub percent: f64,
    /// When the reading was taken (UTC)
    pub measured_at: DateTime<Utc>,
}

/// One exercise session (workout).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseSample {
    /// Human-readable activity name (e.g. "Walking", "Running")
    pub activity: String,
    /// Active energy burned in kilocalories
    pub burned_kcal: f64,
    /// Session length in seconds
    pub duration_seconds: u64,
    /// Distance covered in meters, when the activity tracks distance
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<f64>,
    /// Steps taken during the session, when available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_count: Option<u64>,
    /// When the session started (UTC)
    pub started_at: DateTime<Utc>,
    /// When the session ended (UTC)
    pub ended_at: DateTime<Utc>,
}

/// One fetched batch of samples for a single metric kind.
///
/// A batch only ever holds samples of its own kind; the variant carries the
/// typed vector, so mixing kinds is unrepresentable.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricSamples {
    /// Daily step totals
    Steps(Vec<StepSample>),
    /// Body weight measurements
    Weight(Vec<WeightSample>),
    /// Heart rate statistics
    HeartRate(Vec<HeartRateSample>),
    /// Blood pressure readings
    BloodPressure(Vec<BloodPressureSample>),
    /// Blood glucose readings
    BloodGlucose(Vec<BloodGlucoseSample>),
    /// Oxygen saturation readings
    OxygenSaturation(Vec<OxygenSaturationSample>),
    /// Exercise sessions
    Exercise(Vec<ExerciseSample>),
}

impl MetricSamples {
    /// Create an empty batch for the given kind.
    ///
    /// Used by the aggregator to substitute for a failed or timed-out fetch.
    #[must_use]
    pub const fn empty(kind: MetricKind) -> Self {
        match kind {
            MetricKind::Steps => Self::Steps(Vec::new()),
            MetricKind::Weight => Self::Weight(Vec::new()),
            MetricKind::HeartRate => Self::HeartRate(Vec::new()),
            MetricKind::BloodPressure => Self::BloodPressure(Vec::new()),
            MetricKind::BloodGlucose => Self::BloodGlucose(Vec::new()),
            MetricKind::OxygenSaturation => Self::OxygenSaturation(Vec::new()),
            MetricKind::Exercise => Self::Exercise(Vec::new()),
        }
    }

    /// The metric kind this batch belongs to.
    #[must_use]
    pub const fn kind(&self) -> MetricKind {
        match self {
            Self::Steps(_) => MetricKind::Steps,
            Self::Weight(_) => MetricKind::Weight,
            Self::HeartRate(_) => MetricKind::HeartRate,
            Self::BloodPressure(_) => MetricKind::BloodPressure,
            Self::BloodGlucose(_) => MetricKind::BloodGlucose,
            Self::OxygenSaturation(_) => MetricKind::OxygenSaturation,
            Self::Exercise(_) => MetricKind::Exercise,
        }
    }

    /// Number of samples in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Steps(v) => v.len(),
            Self::Weight(v) => v.len(),
            Self::HeartRate(v) => v.len(),
            Self::BloodPressure(v) => v.len(),
            Self::BloodGlucose(v) => v.len(),
            Self::OxygenSaturation(v) => v.len(),
            Self::Exercise(v) => v.len(),
        }
    }

    /// Whether the batch holds no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One composite record for one aggregation run.
///
/// A snapshot is complete only after every requested metric kind has either
/// contributed its samples or been recorded as empty. The aggregator owns the
/// in-progress snapshot exclusively; nothing else mutates it during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Subject (user) identifier this snapshot belongs to
    pub subject_id: String,
    /// Fixed provider tag identifying the originating data store
    pub provider: String,
    /// Wall-clock time the aggregation run started (UTC)
    pub recorded_at: DateTime<Utc>,
    /// Daily step totals
    pub steps: Vec<StepSample>,
    /// Body weight measurements
    pub weight: Vec<WeightSample>,
    /// Heart rate statistics
    pub heart_rate: Vec<HeartRateSample>,
    /// Blood pressure readings
    pub blood_pressure: Vec<BloodPressureSample>,
    /// Blood glucose readings
    pub blood_glucose: Vec<BloodGlucoseSample>,
    /// Oxygen saturation readings
    pub oxygen_saturation: Vec<OxygenSaturationSample>,
    /// Exercise sessions
    pub exercise: Vec<ExerciseSample>,
}

impl Snapshot {
    /// Create an empty snapshot for the given subject, stamped with the
    /// fixed provider tag and the current wall-clock time.
    #[must_use]
    pub fn new(subject_id: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            provider: PROVIDER_TAG.to_owned(),
            recorded_at: Utc::now(),
            steps: Vec::new(),
            weight: Vec::new(),
            heart_rate: Vec::new(),
            blood_pressure: Vec::new(),
            blood_glucose: Vec::new(),
            oxygen_saturation: Vec::new(),
            exercise: Vec::new(),
        }
    }

    /// Write one metric kind's batch into its slot.
    ///
    /// Each kind occupies a disjoint field, so absorbing batches in any order
    /// produces the same snapshot.
    pub fn absorb(&mut self, samples: MetricSamples) {
        match samples {
            MetricSamples::Steps(v) => self.steps = v,
            MetricSamples::Weight(v) => self.weight = v,
            MetricSamples::HeartRate(v) => self.heart_rate = v,
            MetricSamples::BloodPressure(v) => self.blood_pressure = v,
            MetricSamples::BloodGlucose(v) => self.blood_glucose = v,
            MetricSamples::OxygenSaturation(v) => self.oxygen_saturation = v,
            MetricSamples::Exercise(v) => self.exercise = v,
        }
    }

    /// Total number of samples across all metric kinds.
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.steps.len()
            + self.weight.len()
            + self.heart_rate.len()
            + self.blood_pressure.len()
            + self.blood_glucose.len()
            + self.oxygen_saturation.len()
            + self.exercise.len()
    }

    /// Number of samples recorded for one metric kind.
    #[must_use]
    pub fn samples_for(&self, kind: MetricKind) -> usize {
        match kind {
            MetricKind::Steps => self.steps.len(),
            MetricKind::Weight => self.weight.len(),
            MetricKind::HeartRate => self.heart_rate.len(),
            MetricKind::BloodPressure => self.blood_pressure.len(),
            MetricKind::BloodGlucose => self.blood_glucose.len(),
            MetricKind::OxygenSaturation => self.oxygen_saturation.len(),
            MetricKind::Exercise => self.exercise.len(),
        }
    }
}

/// Response envelope returned by the lifelog collector.
///
/// The collector wraps its outcome in a nested envelope; every field is
/// optional because partial envelopes occur in practice (e.g. proxy-level
/// errors carry only `status` and `error`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectorEnvelope {
    /// Server-side epoch timestamp (milliseconds)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    /// HTTP-like status echoed in the body
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<i64>,
    /// Error class, present on failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Human-readable message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Request path echoed back
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Nested result payload, present on processed requests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<CollectorResult>,
}

/// Nested result payload inside a collector envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectorResult {
    /// Application-level result code; zero means accepted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    /// Human-readable result message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Acknowledgement details when the snapshot was stored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<CollectorAck>,
}

/// Acknowledgement details for a stored snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectorAck {
    /// Whether the collector persisted the snapshot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<bool>,
    /// Human-readable acknowledgement message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Server-side creation timestamp, collector-formatted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Confirmed outcome of one accepted upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    /// HTTP status the collector answered with
    pub status: u16,
    /// Collector message, when one was provided
    pub message: Option<String>,
    /// Server-side creation timestamp for the stored snapshot
    pub created_at: Option<String>,
}
