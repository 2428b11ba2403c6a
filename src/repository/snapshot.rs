use crate::error::{BackupError, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub id: String,
    pub short_id: String,
    pub time: DateTime<Utc>,
    pub paths: Vec<String>,
    pub size: String,
    pub hostname: String,
}

#[derive(Debug, Deserialize)]
struct RawSnapshot {
    id: String,
    #[serde(default)]
    short_id: String,
    time: DateTime<Utc>,
    #[serde(default)]
    paths: Vec<String>,
    #[serde(default)]
    hostname: String,
    #[serde(default)]
    summary: Option<RawSummary>,
}

// Only present for snapshots written by restic 0.17 and later.
#[derive(Debug, Deserialize)]
struct RawSummary {
    #[serde(default)]
    total_bytes_processed: Option<u64>,
}

impl From<RawSnapshot> for Snapshot {
    fn from(raw: RawSnapshot) -> Self {
        let short_id = if raw.short_id.is_empty() {
            raw.id.chars().take(8).collect()
        } else {
            raw.short_id
        };
        let size = raw
            .summary
            .and_then(|s| s.total_bytes_processed)
            .map(format_size)
            .unwrap_or_else(|| "unknown".to_string());

        Snapshot {
            id: raw.id,
            short_id,
            time: raw.time,
            paths: raw.paths,
            size,
            hostname: raw.hostname,
        }
    }
}

/// Decodes listing output. Empty output and `null` both mean "no snapshots".
pub fn decode_snapshots(stdout: &str) -> Result<Vec<Snapshot>> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let raw: Option<Vec<RawSnapshot>> = serde_json::from_str(trimmed)
        .map_err(|e| BackupError::List(format!("failed to parse snapshots: {}", e)))?;

    Ok(raw.unwrap_or_default().into_iter().map(Snapshot::from).collect())
}

pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}
