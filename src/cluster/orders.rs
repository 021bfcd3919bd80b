//! Synthetic order batch workload.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::WorkloadConfig;
use crate::controller::Workload;
use crate::error::{FailoverError, Result};

pub const CATEGORIES: [&str; 4] = ["Electronics", "Clothing", "Books", "Home"];

/// Customers with more orders than this are reported
pub const FREQUENT_CUSTOMER_ORDERS: usize = 5;

const CUSTOMERS: u32 = 100;

/// Report file written to the output directory
pub const REPORT_FILE: &str = "order_report.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    pub customer_id: String,
    pub category: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: String,
    pub total_orders: usize,
    pub avg_amount: f64,
    pub max_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerSummary {
    pub customer_id: String,
    pub total_orders: usize,
    pub avg_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReport {
    pub generated_at: DateTime<Utc>,
    pub orders: usize,
    pub categories: Vec<CategorySummary>,
    pub frequent_customers: Vec<CustomerSummary>,
}

/// Generate `count` random orders
pub fn generate_orders(count: usize) -> Vec<Order> {
    let mut rng = rand::rng();
    (0..count)
        .map(|i| {
            let amount: f64 = rng.random_range(10.0..=500.0);
            Order {
                id: i as u64 + 1,
                customer_id: format!("CUST_{:03}", rng.random_range(1..=CUSTOMERS)),
                category: CATEGORIES[rng.random_range(0..CATEGORIES.len())].to_string(),
                amount: (amount * 100.0).round() / 100.0,
            }
        })
        .collect()
}

/// Per-category totals and frequent customers, both sorted by key
pub fn analyze(orders: &[Order]) -> OrderReport {
    let mut by_category: BTreeMap<&str, (usize, f64, f64)> = BTreeMap::new();
    let mut by_customer: BTreeMap<&str, (usize, f64)> = BTreeMap::new();

    for order in orders {
        let entry = by_category.entry(order.category.as_str()).or_insert((0, 0.0, f64::MIN));
        entry.0 += 1;
        entry.1 += order.amount;
        entry.2 = entry.2.max(order.amount);

        let entry = by_customer.entry(order.customer_id.as_str()).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += order.amount;
    }

    let categories = by_category
        .into_iter()
        .map(|(category, (n, sum, max))| CategorySummary {
            category: category.to_string(),
            total_orders: n,
            avg_amount: sum / n as f64,
            max_amount: max,
        })
        .collect();

    let frequent_customers = by_customer
        .into_iter()
        .filter(|(_, (n, _))| *n > FREQUENT_CUSTOMER_ORDERS)
        .map(|(customer, (n, sum))| CustomerSummary {
            customer_id: customer.to_string(),
            total_orders: n,
            avg_amount: sum / n as f64,
        })
        .collect();

    OrderReport {
        generated_at: Utc::now(),
        orders: orders.len(),
        categories,
        frequent_customers,
    }
}

/// Generates a batch of orders and aggregates it.
#[derive(Debug, Clone)]
pub struct OrderBatchWorkload {
    batch_size: usize,
    output_dir: Option<PathBuf>,
}

impl OrderBatchWorkload {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size,
            output_dir: None,
        }
    }

    pub fn from_config(config: &WorkloadConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            output_dir: config.output_dir.clone(),
        }
    }

    /// Write each report as JSON into `dir`
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    async fn write_report(&self, report: &OrderReport) -> Result<()> {
        let Some(dir) = &self.output_dir else {
            return Ok(());
        };
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(REPORT_FILE);
        let json = serde_json::to_vec_pretty(report)?;
        tokio::fs::write(&path, json).await?;
        info!("report written to {}", path.display());
        Ok(())
    }
}

#[async_trait]
impl Workload for OrderBatchWorkload {
    type Dataset = Vec<Order>;

    async fn generate(&self) -> Result<Vec<Order>> {
        let orders = generate_orders(self.batch_size);
        info!("generated {} orders", orders.len());
        Ok(orders)
    }

    async fn process(&self, orders: Vec<Order>) -> Result<()> {
        if orders.is_empty() {
            return Err(FailoverError::Workload("no orders to process".to_string()));
        }

        let report = analyze(&orders);
        info!(
            "processed {} orders: {} categories, {} frequent customers",
            report.orders,
            report.categories.len(),
            report.frequent_customers.len()
        );
        self.write_report(&report).await
    }
}
