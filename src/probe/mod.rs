//! Health probes - poll external subsystems and normalize the result.
//!
//! A probe never fails: transport errors, timeouts, non-success codes and
//! malformed documents all come back as an `unhealthy` snapshot.

#[cfg(any(test, feature = "test-util"))]
pub mod fixed;
pub mod http;
pub mod metrics;

use async_trait::async_trait;

use crate::domain::{HealthSnapshot, Subsystem};

#[cfg(any(test, feature = "test-util"))]
pub use fixed::StaticProbe;
pub use http::HttpHealthProbe;
pub use metrics::extract_metrics;

#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Subsystem this probe reports on
    fn subsystem(&self) -> Subsystem;

    /// Poll once.
    async fn poll(&self) -> HealthSnapshot;
}
