//! Per-subsystem metric extraction from status documents.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::domain::Subsystem;

/// (metric name, document field) pairs read from a master status document
const MASTER_FIELDS: [(&str, &str); 3] = [
    ("workers", "workers"),
    ("active_apps", "activeapps"),
    ("completed_apps", "completedapps"),
];

/// (metric name, document field) pairs read from a worker status document
const WORKER_FIELDS: [(&str, &str); 4] = [
    ("cores", "cores"),
    ("cores_used", "coresused"),
    ("memory", "memory"),
    ("memory_used", "memoryused"),
];

/// Numeric value of a field: numbers as-is, arrays by length.
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Array(items) => Some(items.len() as f64),
        _ => None,
    }
}

fn pick(doc: &serde_json::Map<String, Value>, fields: &[(&str, &str)]) -> BTreeMap<String, f64> {
    fields
        .iter()
        .filter_map(|(name, field)| doc.get(*field).and_then(numeric).map(|v| (name.to_string(), v)))
        .collect()
}

/// Extract metrics for `subsystem` from a status document.
///
/// Returns `None` when the document is not a JSON object. Missing or
/// non-numeric fields are skipped.
pub fn extract_metrics(subsystem: Subsystem, doc: &Value) -> Option<BTreeMap<String, f64>> {
    let doc = doc.as_object()?;
    let metrics = match subsystem {
        Subsystem::Master => pick(doc, &MASTER_FIELDS),
        Subsystem::Worker => pick(doc, &WORKER_FIELDS),
        Subsystem::Application => doc
            .iter()
            .filter_map(|(k, v)| v.as_f64().map(|n| (k.clone(), n)))
            .collect(),
    };
    Some(metrics)
}
