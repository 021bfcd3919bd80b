//! Domain types for Failover
//!
//! This module contains all core domain types:
//! - CycleOutcome: Result of one generate+process cycle
//! - HealthSnapshot: Normalized health of one subsystem
//! - AggregatedStatus: The unified view handed to the dashboard

pub mod health;
pub mod outcome;
pub mod status;

pub use health::{HealthSnapshot, HealthStatus, Subsystem};
pub use outcome::{CycleOutcome, ErrorInfo, ErrorKind};
pub use status::{AggregatedStatus, AppState};
