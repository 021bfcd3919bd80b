use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;

use crate::config::Config;
use crate::controller::{ProcessingSession, SessionFactory};
use crate::error::{FailoverError, Result};

/// Opens sessions against a cluster master.
///
/// A `local...` master runs in-process and is always reachable; any other
/// master is checked through its HTTP status endpoint.
pub struct ClusterSessionFactory {
    client: Client,
    master_url: String,
    status_url: String,
}

impl ClusterSessionFactory {
    pub fn new(master_url: impl Into<String>, status_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FailoverError::SessionCreation(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            master_url: master_url.into(),
            status_url: status_url.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.controller.master_url,
            &config.probes.master_url,
            config.controller.session_timeout(),
        )
    }

    pub fn master_url(&self) -> &str {
        &self.master_url
    }

    pub fn is_local(&self) -> bool {
        self.master_url.starts_with("local")
    }
}

impl std::fmt::Debug for ClusterSessionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterSessionFactory")
            .field("master_url", &self.master_url)
            .field("status_url", &self.status_url)
            .finish()
    }
}

async fn check_master(client: &Client, url: &str) -> std::result::Result<(), String> {
    let response = client.get(url).send().await.map_err(|e| e.to_string())?;
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(format!("{} returned {}", url, status))
    }
}

#[async_trait]
impl SessionFactory for ClusterSessionFactory {
    type Session = ClusterSession;

    async fn open(&self) -> Result<ClusterSession> {
        if self.is_local() {
            info!("using in-process master {}", self.master_url);
            return Ok(ClusterSession::local());
        }

        check_master(&self.client, &self.status_url)
            .await
            .map_err(|e| FailoverError::SessionCreation(format!("master {} unreachable: {}", self.master_url, e)))?;

        info!("connected to master {}", self.master_url);
        Ok(ClusterSession {
            remote: Some((self.client.clone(), self.status_url.clone())),
            open: true,
        })
    }
}

/// A session on the cluster master.
#[derive(Debug)]
pub struct ClusterSession {
    remote: Option<(Client, String)>,
    open: bool,
}

impl ClusterSession {
    fn local() -> Self {
        Self { remote: None, open: true }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}

#[async_trait]
impl ProcessingSession for ClusterSession {
    async fn check_health(&self) -> Result<()> {
        if !self.open {
            return Err(FailoverError::HealthCheck("session closed".to_string()));
        }
        match &self.remote {
            None => Ok(()),
            Some((client, url)) => check_master(client, url).await.map_err(FailoverError::HealthCheck),
        }
    }

    async fn close(&mut self) -> Result<()> {
        if self.open {
            debug!("closing cluster session");
            self.open = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory(master: &str) -> ClusterSessionFactory {
        ClusterSessionFactory::new(master, "http://127.0.0.1:9/json", Duration::from_millis(500)).unwrap()
    }

    #[tokio::test]
    async fn test_local_master_always_opens() {
        let factory = factory("local[*]");
        assert!(factory.is_local());

        let mut session = factory.open().await.unwrap();
        assert!(session.check_health().await.is_ok());

        session.close().await.unwrap();
        assert!(!session.is_open());
        assert!(matches!(session.check_health().await, Err(FailoverError::HealthCheck(_))));

        // Closing twice is harmless
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_remote_master_fails_to_open() {
        let factory = factory("spark://127.0.0.1:7077");
        assert!(!factory.is_local());

        let result = factory.open().await;
        assert!(matches!(result, Err(FailoverError::SessionCreation(_))));
    }

    #[test]
    fn test_from_config() {
        let config = Config::default();
        let factory = ClusterSessionFactory::from_config(&config).unwrap();
        assert_eq!(factory.master_url(), "local[*]");
        assert!(format!("{:?}", factory).contains("localhost:8080"));
    }
}
