//! Failover - a self-healing batch job runner and its health monitor.
//!
//! The execution controller runs a generate/process cycle forever, recreating
//! its processing session and backing off exponentially on failure. The
//! status aggregator independently probes the cluster and reads the
//! controller's cycle log to publish a unified health view.

pub mod aggregator;
pub mod classifier;
pub mod cluster;
pub mod config;
pub mod controller;
pub mod dashboard;
pub mod domain;
pub mod error;
pub mod journal;
pub mod probe;

pub use error::{FailoverError, Result};
