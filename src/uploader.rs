// ABOUTME: Snapshot uploader performing exactly one JSON POST per invocation to the lifelog collector
// ABOUTME: Interprets the nested collector envelope and offers a caller-opted bounded retry wrapper
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Delivery of one complete snapshot to the remote collector.
//!
//! [`SnapshotUploader::upload`] serializes the snapshot to JSON, issues one
//! POST with the session credential header, and interprets the collector's
//! nested response envelope. It never retries on its own; callers that want
//! retries opt in through [`RetryPolicy`] and
//! [`SnapshotUploader::upload_with_retry`].

use crate::errors::UploadError;
use crate::models::{CollectorEnvelope, Snapshot, UploadReceipt};
use reqwest::header::{HeaderValue, CONTENT_TYPE, COOKIE};
use reqwest::{Client, ClientBuilder, StatusCode};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default connection timeout in seconds.
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Configuration for one uploader instance.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Collector endpoint the snapshot is POSTed to
    pub endpoint: Url,
    /// Session credential sent as `Cookie: SESSION=<token>`
    pub session_token: String,
    /// Total request timeout
    pub request_timeout: Duration,
    /// Connection establishment timeout
    pub connect_timeout: Duration,
}

impl UploadConfig {
    /// Configuration with default timeouts.
    #[must_use]
    pub fn new(endpoint: Url, session_token: impl Into<String>) -> Self {
        Self {
            endpoint,
            session_token: session_token.into(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

/// Caller-supplied bounded retry policy for uploads.
///
/// Only transient failures (transport errors, 5xx rejections) are retried;
/// client-side rejections and serialization failures are terminal on the
/// first attempt.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first (minimum 1)
    pub max_attempts: u32,
    /// Backoff before the second attempt
    pub initial_backoff: Duration,
    /// Backoff multiplier between consecutive attempts
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            multiplier: 2,
        }
    }
}

/// Delivers complete snapshots to the collector endpoint.
///
/// Owns one pooled HTTP client configured from [`UploadConfig`]; create one
/// uploader per endpoint and reuse it across runs.
pub struct SnapshotUploader {
    client: Client,
    config: UploadConfig,
}

impl SnapshotUploader {
    /// Create an uploader with a pooled client using the configured timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Transport`] when the HTTP client cannot be
    /// built (e.g. the TLS backend fails to initialize).
    pub fn new(config: UploadConfig) -> Result<Self, UploadError> {
        let client = ClientBuilder::new()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(Self { client, config })
    }

    /// Deliver one snapshot: exactly one POST, no automatic retry.
    ///
    /// # Errors
    ///
    /// - [`UploadError::Serialization`] when the snapshot cannot be encoded
    /// - [`UploadError::Transport`] when no HTTP response was produced
    /// - [`UploadError::Rejected`] for non-2xx statuses, and for 2xx
    ///   responses whose nested envelope code signals failure
    pub async fn upload(&self, snapshot: &Snapshot) -> Result<UploadReceipt, UploadError> {
        let body = serde_json::to_vec(snapshot)?;
        debug!(
            endpoint = %self.config.endpoint,
            subject_id = %snapshot.subject_id,
            samples = snapshot.sample_count(),
            bytes = body.len(),
            "uploading snapshot"
        );

        let response = self
            .client
            .post(self.config.endpoint.clone())
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .header(COOKIE, format!("SESSION={}", self.config.session_token))
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let envelope: Option<CollectorEnvelope> = serde_json::from_str(&text).ok();

        if !status.is_success() {
            let message = envelope
                .as_ref()
                .and_then(|env| env.message.clone().or_else(|| env.error.clone()))
                .unwrap_or_else(|| truncate_body(&text));
            warn!(status = status.as_u16(), %message, "collector rejected snapshot");
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        Self::interpret_accepted(status, envelope)
    }

    /// Deliver one snapshot under a caller-supplied retry policy.
    ///
    /// # Errors
    ///
    /// Returns the final attempt's error once the policy is exhausted, or
    /// immediately for non-transient failures.
    pub async fn upload_with_retry(
        &self,
        snapshot: &Snapshot,
        policy: &RetryPolicy,
    ) -> Result<UploadReceipt, UploadError> {
        let attempts = policy.max_attempts.max(1);
        let mut backoff = policy.initial_backoff;
        let mut attempt = 1;

        loop {
            match self.upload(snapshot).await {
                Ok(receipt) => return Ok(receipt),
                Err(err) if err.is_transient() && attempt < attempts => {
                    warn!(attempt, error = %err, backoff_ms = backoff.as_millis() as u64, "transient upload failure; retrying");
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.saturating_mul(policy.multiplier);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Interpret a 2xx response, honoring the nested envelope's own verdict.
    fn interpret_accepted(
        status: StatusCode,
        envelope: Option<CollectorEnvelope>,
    ) -> Result<UploadReceipt, UploadError> {
        let result = envelope.as_ref().and_then(|env| env.data.as_ref());
        if let Some(code) = result.and_then(|res| res.code) {
            if code != 0 {
                let message = result
                    .and_then(|res| res.message.clone())
                    .unwrap_or_else(|| format!("collector result code {code}"));
                warn!(code, %message, "collector envelope signalled failure inside 2xx response");
                return Err(UploadError::Rejected {
                    status: status.as_u16(),
                    message,
                });
            }
        }

        let ack = result.and_then(|res| res.data.as_ref());
        let receipt = UploadReceipt {
            status: status.as_u16(),
            message: result
                .and_then(|res| res.message.clone())
                .or_else(|| envelope.as_ref().and_then(|env| env.message.clone())),
            created_at: ack.and_then(|a| a.created_at.clone()),
        };
        info!(status = receipt.status, "snapshot accepted by collector");
        Ok(receipt)
    }
}

/// Keep rejected-body diagnostics bounded, cutting on a char boundary.
fn truncate_body(text: &str) -> String {
    const MAX: usize = 256;
    let trimmed = text.trim();
    if trimmed.len() <= MAX {
        return trimmed.to_owned();
    }
    let mut end = MAX;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &trimmed[..end])
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use super::*;
    use crate::models::{CollectorAck, CollectorResult};

    fn envelope_with_code(code: i64, message: &str) -> CollectorEnvelope {
        CollectorEnvelope {
            timestamp: None,
            status: Some(200),
            error: None,
            message: None,
            path: None,
            data: Some(CollectorResult {
                code: Some(code),
                message: Some(message.to_owned()),
                data: Some(CollectorAck {
                    result: Some(code == 0),
                    message: None,
                    created_at: Some("2024-11-08 09:00:00".to_owned()),
                }),
            }),
        }
    }

    #[test]
    fn nested_zero_code_is_accepted() {
        let receipt =
            SnapshotUploader::interpret_accepted(StatusCode::OK, Some(envelope_with_code(0, "ok")))
                .unwrap();
        assert_eq!(receipt.status, 200);
        assert_eq!(receipt.created_at.as_deref(), Some("2024-11-08 09:00:00"));
    }

    #[test]
    fn nested_nonzero_code_is_rejected() {
        let err = SnapshotUploader::interpret_accepted(
            StatusCode::OK,
            Some(envelope_with_code(42, "duplicate snapshot")),
        )
        .unwrap_err();
        match err {
            UploadError::Rejected { status, message } => {
                assert_eq!(status, 200);
                assert_eq!(message, "duplicate snapshot");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_envelope_is_accepted_as_plain_2xx() {
        let receipt = SnapshotUploader::interpret_accepted(StatusCode::OK, None).unwrap();
        assert_eq!(receipt.status, 200);
        assert!(receipt.message.is_none());
    }

    #[test]
    fn long_rejection_bodies_are_truncated() {
        let body = "x".repeat(1000);
        let message = truncate_body(&body);
        assert!(message.len() <= 260);
        assert!(message.ends_with("..."));
    }

    #[test]
    fn truncation_cuts_multibyte_bodies_on_char_boundaries() {
        // 100 euro signs are 300 bytes; byte 256 lands mid-character.
        let body = "\u{20ac}".repeat(100);
        let message = truncate_body(&body);
        assert!(message.ends_with("..."));
        assert!(message.len() <= 260);
        assert!(message.trim_end_matches('.').chars().all(|c| c == '\u{20ac}'));
    }
}
