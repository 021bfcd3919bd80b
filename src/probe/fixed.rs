//! Fixed-answer probe for exercising aggregation without network access.
//!
//! Compiled for tests and behind the `test-util` feature.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use super::HealthProbe;
use crate::domain::{HealthSnapshot, Subsystem};

/// Probe returning a fixed status, optionally after a delay.
#[derive(Debug, Clone)]
pub struct StaticProbe {
    snapshot: HealthSnapshot,
    delay: Option<Duration>,
}

impl StaticProbe {
    pub fn new(snapshot: HealthSnapshot) -> Self {
        Self { snapshot, delay: None }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl HealthProbe for StaticProbe {
    fn subsystem(&self) -> Subsystem {
        self.snapshot.subsystem
    }

    async fn poll(&self) -> HealthSnapshot {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        HealthSnapshot {
            checked_at: Utc::now(),
            ..self.snapshot.clone()
        }
    }
}
