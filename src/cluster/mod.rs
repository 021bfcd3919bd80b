//! Concrete collaborators for the controller binary: a cluster-backed
//! session and the order batch workload.

pub mod orders;
pub mod session;

pub use orders::{CategorySummary, CustomerSummary, Order, OrderBatchWorkload, OrderReport, analyze, generate_orders};
pub use session::{ClusterSession, ClusterSessionFactory};
