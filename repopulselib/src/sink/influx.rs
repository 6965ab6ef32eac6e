//! InfluxDB v2 sink over the HTTP write API.

use std::time::Duration;

use reqwest::blocking::Client;

use crate::error::RepopulseError;
use crate::records::{ChurnRecord, LocRecord};
use crate::Result;

use super::line_protocol::{encode_churn, encode_loc};
use super::MetricsSink;

/// Connection settings for an InfluxDB v2 bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfluxConfig {
    pub url: String,
    pub token: String,
    pub org: String,
    pub bucket: String,
}

impl InfluxConfig {
    pub fn new(
        url: impl Into<String>,
        token: impl Into<String>,
        org: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            org: org.into(),
            bucket: bucket.into(),
        }
    }

    /// Reject settings that cannot possibly work.
    pub fn validate(&self) -> Result<()> {
        if self.token.trim().is_empty() {
            return Err(RepopulseError::Config("InfluxDB token not configured".into()));
        }
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(RepopulseError::Config(format!(
                "InfluxDB url must be http(s): '{}'",
                self.url
            )));
        }
        if self.org.trim().is_empty() || self.bucket.trim().is_empty() {
            return Err(RepopulseError::Config("InfluxDB org and bucket are required".into()));
        }
        Ok(())
    }

    /// Full write endpoint, nanosecond precision.
    pub fn write_url(&self) -> String {
        format!("{}/api/v2/write", self.url.trim_end_matches('/'))
    }
}

/// Writes records to InfluxDB as line protocol.
pub struct InfluxSink {
    client: Client,
    config: InfluxConfig,
}

impl InfluxSink {
    pub fn new(config: InfluxConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| RepopulseError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn write_lines(&self, lines: Vec<String>) -> Result<()> {
        if lines.is_empty() {
            return Ok(());
        }
        let count = lines.len();

        let response = self
            .client
            .post(self.config.write_url())
            .query(&[
                ("org", self.config.org.as_str()),
                ("bucket", self.config.bucket.as_str()),
                ("precision", "ns"),
            ])
            .header("Authorization", format!("Token {}", self.config.token))
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(lines.join("\n"))
            .send()
            .map_err(|e| RepopulseError::Persistence(format!("InfluxDB write failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(RepopulseError::Persistence(format!(
                "InfluxDB returned {}: {}",
                status, body
            )));
        }

        tracing::debug!(points = count, bucket = %self.config.bucket, "wrote points");
        Ok(())
    }
}

impl MetricsSink for InfluxSink {
    /// One POST carries every point of the batch.
    fn write(&self, loc: &[LocRecord], churn: &[ChurnRecord]) -> Result<()> {
        let lines = loc
            .iter()
            .map(encode_loc)
            .chain(churn.iter().map(encode_churn))
            .collect();
        self.write_lines(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::records::ChurnScope;
    use chrono::NaiveDate;

    #[test]
    fn test_config_validation() {
        let ok = InfluxConfig::new("http://localhost:8086", "secret", "org", "repo_metrics");
        assert!(ok.validate().is_ok());

        let no_token = InfluxConfig::new("http://localhost:8086", "", "org", "b");
        assert!(matches!(no_token.validate(), Err(RepopulseError::Config(_))));

        let bad_url = InfluxConfig::new("localhost:8086", "t", "org", "b");
        assert!(matches!(bad_url.validate(), Err(RepopulseError::Config(_))));

        assert!(InfluxSink::new(no_token).is_err());
    }

    #[test]
    fn test_write_url() {
        let config = InfluxConfig::new("http://localhost:8086/", "t", "o", "b");
        assert_eq!(config.write_url(), "http://localhost:8086/api/v2/write");
    }

    #[test]
    fn test_unreachable_server_is_persistence_error() {
        let sink = InfluxSink::new(InfluxConfig::new("http://127.0.0.1:9", "t", "o", "b")).unwrap();
        let record = ChurnRecord {
            repo_id: "r".to_string(),
            repo_name: "r".to_string(),
            branch: "main".to_string(),
            scope: ChurnScope::Day {
                date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            },
            added: 1,
            deleted: 1,
            modified: 1,
            total: 2,
        };
        let err = sink.write(&[], &[record]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Persistence);
        assert!(sink.write(&[], &[]).is_ok());
    }
}
