use chrono::{DateTime, Utc};
use serde::Serialize;

/// The footprint of one stored record, enough for quota decisions without
/// loading its payload.
#[derive(Debug, Clone)]
pub struct RecordSummary {
    pub id: String,
    pub uploaded_at: DateTime<Utc>,
    pub size: u64,
}

/// Per-backend storage ceilings: a byte capacity and a record count limit.
#[derive(Debug, Clone, Copy)]
pub struct CapacityBudget {
    pub capacity_bytes: u64,
    pub max_records: usize,
}

/// Live usage snapshot, computed fresh on every call.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StorageInfo {
    pub used: u64,
    pub available: u64,
    pub total: u64,
    pub percentage: f64,
}

impl CapacityBudget {
    /// Sum of record sizes currently held.
    pub fn used(entries: &[RecordSummary]) -> u64 {
        entries.iter().map(|e| e.size).sum()
    }

    /// Total bytes after adding a candidate of `incoming` bytes.
    pub fn projected(entries: &[RecordSummary], incoming: u64) -> u64 {
        Self::used(entries) + incoming
    }

    /// Whether a candidate of `incoming` bytes fits without eviction.
    pub fn fits(&self, entries: &[RecordSummary], incoming: u64) -> bool {
        Self::projected(entries, incoming) <= self.capacity_bytes
    }

    pub fn info(&self, entries: &[RecordSummary]) -> StorageInfo {
        let used = Self::used(entries);
        StorageInfo {
            used,
            available: self.capacity_bytes.saturating_sub(used),
            total: self.capacity_bytes,
            percentage: used as f64 / self.capacity_bytes as f64 * 100.0,
        }
    }
}

/// Human-readable byte count for log lines and CLI output.
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    let exp = ((bytes as f64).ln() / 1024f64.ln()).floor() as usize;
    let exp = exp.min(UNITS.len() - 1);
    let value = bytes as f64 / 1024f64.powi(exp as i32);
    let rounded = format!("{:.1}", value);
    let trimmed = rounded.strip_suffix(".0").unwrap_or(&rounded);
    format!("{} {}", trimmed, UNITS[exp])
}
