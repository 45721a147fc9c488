// ABOUTME: Environment-driven configuration for the sync pipeline
// ABOUTME: Validates endpoint and credential up front and applies defaults for everything else
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Environment-based configuration.
//!
//! Everything is read from `LIFELOG_*` variables. Endpoint and session
//! token are mandatory; timeouts and the lookback window have defaults
//! matching the aggregator's.

use crate::aggregator::{AggregatorConfig, DEFAULT_LOOKBACK_DAYS, DEFAULT_METRIC_TIMEOUT};
use crate::uploader::UploadConfig;
use anyhow::{Context, Result};
use std::env;
use std::time::Duration;
use url::Url;

/// Complete pipeline configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Collector endpoint snapshots are POSTed to
    pub endpoint: Url,
    /// Session credential for the collector
    pub session_token: String,
    /// Default subject id for runs that do not name one explicitly
    pub subject_id: Option<String>,
    /// Upper bound on any single metric fetch
    pub metric_timeout: Duration,
    /// Historical window each fetch covers, in days
    pub lookback_days: i64,
    /// Total HTTP request timeout for uploads
    pub http_timeout: Duration,
    /// HTTP connection establishment timeout
    pub connect_timeout: Duration,
}

impl SyncConfig {
    /// Load configuration from `LIFELOG_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error when `LIFELOG_ENDPOINT` or `LIFELOG_SESSION_TOKEN`
    /// is missing, or when any variable fails to parse.
    pub fn from_env() -> Result<Self> {
        let endpoint = env::var("LIFELOG_ENDPOINT")
            .context("LIFELOG_ENDPOINT is required")?
            .parse::<Url>()
            .context("LIFELOG_ENDPOINT must be a valid URL")?;

        let session_token =
            env::var("LIFELOG_SESSION_TOKEN").context("LIFELOG_SESSION_TOKEN is required")?;

        let subject_id = env::var("LIFELOG_SUBJECT_ID").ok().filter(|s| !s.is_empty());

        let metric_timeout = parse_secs("LIFELOG_METRIC_TIMEOUT_SECS")?
            .map_or(DEFAULT_METRIC_TIMEOUT, Duration::from_secs);
        let lookback_days = match env::var("LIFELOG_LOOKBACK_DAYS") {
            Ok(raw) => raw
                .parse::<i64>()
                .context("LIFELOG_LOOKBACK_DAYS must be an integer")?,
            Err(_) => DEFAULT_LOOKBACK_DAYS,
        };
        let http_timeout =
            parse_secs("LIFELOG_HTTP_TIMEOUT_SECS")?.map_or(Duration::from_secs(30), Duration::from_secs);
        let connect_timeout = parse_secs("LIFELOG_CONNECT_TIMEOUT_SECS")?
            .map_or(Duration::from_secs(10), Duration::from_secs);

        Ok(Self {
            endpoint,
            session_token,
            subject_id,
            metric_timeout,
            lookback_days,
            http_timeout,
            connect_timeout,
        })
    }

    /// Aggregator configuration derived from this config (all metric kinds).
    #[must_use]
    pub fn aggregator_config(&self) -> AggregatorConfig {
        AggregatorConfig {
            per_metric_timeout: self.metric_timeout,
            lookback_days: self.lookback_days,
            ..AggregatorConfig::default()
        }
    }

    /// Uploader configuration derived from this config.
    #[must_use]
    pub fn upload_config(&self) -> UploadConfig {
        UploadConfig {
            endpoint: self.endpoint.clone(),
            session_token: self.session_token.clone(),
            request_timeout: self.http_timeout,
            connect_timeout: self.connect_timeout,
        }
    }
}

fn parse_secs(var: &str) -> Result<Option<u64>> {
    match env::var(var) {
        Ok(raw) => {
            let secs = raw
                .parse::<u64>()
                .with_context(|| format!("{var} must be a non-negative integer"))?;
            Ok(Some(secs))
        }
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn upload_config_carries_endpoint_and_token() {
        let config = SyncConfig {
            endpoint: "https://collector.example.com/m/lifelog/put".parse().unwrap(),
            session_token: "token-1".to_owned(),
            subject_id: None,
            metric_timeout: DEFAULT_METRIC_TIMEOUT,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            http_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        };
        let upload = config.upload_config();
        assert_eq!(upload.endpoint.as_str(), "https://collector.example.com/m/lifelog/put");
        assert_eq!(upload.session_token, "token-1");
    }

    #[test]
    fn aggregator_config_uses_all_kinds_by_default() {
        let config = SyncConfig {
            endpoint: "https://collector.example.com/put".parse().unwrap(),
            session_token: "token-1".to_owned(),
            subject_id: Some("subject-1".to_owned()),
            metric_timeout: Duration::from_secs(5),
            lookback_days: 30,
            http_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        };
        let agg = config.aggregator_config();
        assert_eq!(agg.kinds.len(), 7);
        assert_eq!(agg.per_metric_timeout, Duration::from_secs(5));
        assert_eq!(agg.lookback_days, 30);
    }
}
