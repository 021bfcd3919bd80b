use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde_json::Value;

use crate::domain::{HealthSnapshot, Subsystem};
use crate::error::{FailoverError, Result};
use crate::probe::HealthProbe;
use crate::probe::metrics::extract_metrics;

/// Polls a subsystem's JSON status endpoint over HTTP.
pub struct HttpHealthProbe {
    client: Client,
    subsystem: Subsystem,
    url: String,
    timeout: Duration,
}

impl HttpHealthProbe {
    pub fn new(subsystem: Subsystem, url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FailoverError::Probe(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            subsystem,
            url: url.into(),
            timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self) -> Result<Value> {
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FailoverError::Probe(format!("{} returned {}", self.url, status)));
        }

        Ok(response.json::<Value>().await?)
    }
}

#[async_trait]
impl HealthProbe for HttpHealthProbe {
    fn subsystem(&self) -> Subsystem {
        self.subsystem
    }

    async fn poll(&self) -> HealthSnapshot {
        let doc = match self.fetch().await {
            Ok(doc) => doc,
            Err(e) => {
                warn!("{} probe failed: {}", self.subsystem, e);
                return HealthSnapshot::unhealthy(self.subsystem);
            }
        };

        match extract_metrics(self.subsystem, &doc) {
            Some(metrics) => {
                debug!("{} probe ok: {:?}", self.subsystem, metrics);
                HealthSnapshot::healthy(self.subsystem, metrics)
            }
            None => {
                warn!("{} probe returned a malformed status document", self.subsystem);
                HealthSnapshot::unhealthy(self.subsystem)
            }
        }
    }
}

impl std::fmt::Debug for HttpHealthProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpHealthProbe")
            .field("subsystem", &self.subsystem)
            .field("url", &self.url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::HealthStatus;

    #[test]
    fn test_probe_creation() {
        let probe = HttpHealthProbe::new(Subsystem::Master, "http://localhost:8080/json", Duration::from_secs(5)).unwrap();
        assert_eq!(probe.subsystem(), Subsystem::Master);
        assert_eq!(probe.url(), "http://localhost:8080/json");
        assert_eq!(probe.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_debug_impl() {
        let probe = HttpHealthProbe::new(Subsystem::Worker, "http://localhost:8081/json", Duration::from_secs(1)).unwrap();
        let debug_str = format!("{:?}", probe);
        assert!(debug_str.contains("HttpHealthProbe"));
        assert!(debug_str.contains("8081"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_unhealthy() {
        // Port 9 (discard) is closed on test hosts
        let probe = HttpHealthProbe::new(Subsystem::Worker, "http://127.0.0.1:9/json", Duration::from_millis(500)).unwrap();
        let snap = probe.poll().await;
        assert_eq!(snap.subsystem, Subsystem::Worker);
        assert_eq!(snap.status, HealthStatus::Unhealthy);
        assert!(snap.metrics.is_none());
    }

    #[tokio::test]
    async fn test_invalid_url_is_unhealthy() {
        let probe = HttpHealthProbe::new(Subsystem::Master, "not a url", Duration::from_millis(500)).unwrap();
        assert_eq!(probe.poll().await.status, HealthStatus::Unhealthy);
    }
}
