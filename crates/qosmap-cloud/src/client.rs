//! Measurement cloud HTTP client.
//!
//! The cloud holds the authoritative measurement feed; the server pulls
//! new records from it incrementally. Callers treat every failure as
//! non-fatal and keep serving from local data.

use chrono::{DateTime, Utc};
use qosmap_core::MeasurementRecord;
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Errors from the measurement cloud.
#[derive(Debug, thiserror::Error)]
pub enum CloudError {
    #[error("cloud request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("cloud returned HTTP {0}")]
    Status(StatusCode),
}

/// HTTP client for the measurement cloud API.
pub struct CloudClient {
    client: Client,
    base_url: String,
}

impl CloudClient {
    /// Create a client for the cloud at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("Failed to create HTTP client"),
            base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch measurements captured after `since` (all of them when `None`).
    pub async fn fetch_measurements(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<MeasurementRecord>, CloudError> {
        let mut request = self.client.get(format!("{}/api/measurements", self.base_url));
        if let Some(since) = since {
            request = request.query(&[("since", since.to_rfc3339())]);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CloudError::Status(status));
        }

        let records: Vec<MeasurementRecord> = response.json().await?;
        tracing::debug!("Fetched {} measurements from cloud", records.len());
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed_from_base_url() {
        let client = CloudClient::new("http://cloud.example/");
        assert_eq!(client.base_url(), "http://cloud.example");
    }
}
