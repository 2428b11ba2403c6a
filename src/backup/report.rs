use crate::config::DatabaseKind;
use std::time::Duration;
use tracing::{error, info, warn};

pub const CANCELLED: &str = "cancelled";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Database(DatabaseKind),
    Path,
}

#[derive(Debug, Clone)]
pub struct SourceResult {
    pub name: String,
    pub kind: SourceKind,
    pub success: bool,
    pub error: Option<String>,
    pub db_errors: Vec<(String, String)>,
    pub duration: Duration,
}

impl SourceResult {
    pub fn succeeded(name: String, kind: SourceKind, db_errors: Vec<(String, String)>, duration: Duration) -> Self {
        Self {
            name,
            kind,
            success: true,
            error: None,
            db_errors,
            duration,
        }
    }

    pub fn failed(name: String, kind: SourceKind, error: String, duration: Duration) -> Self {
        Self {
            name,
            kind,
            success: false,
            error: Some(error),
            db_errors: Vec::new(),
            duration,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BackupReport {
    pub results: Vec<SourceResult>,
    pub elapsed: Duration,
}

impl BackupReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &SourceResult> {
        self.results.iter().filter(|r| !r.success)
    }

    pub fn attempted(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.error.as_deref() != Some(CANCELLED))
            .count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.results.iter().all(|r| r.success)
    }

    pub fn log_summary(&self) {
        for result in self.failed() {
            error!(
                "Backup of {} failed: {}",
                result.name,
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
        for result in &self.results {
            for (db_name, err) in &result.db_errors {
                warn!("{}: database {} skipped: {}", result.name, db_name, err);
            }
        }
        info!(
            "Backup completed in {:?}: {}/{} sources successful",
            self.elapsed,
            self.succeeded(),
            self.attempted()
        );
        let skipped = self.results.len() - self.attempted();
        if skipped > 0 {
            warn!("{} source(s) skipped after shutdown request", skipped);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseKind;

    #[test]
    fn test_attempted_excludes_cancelled_sources() {
        let report = BackupReport {
            results: vec![
                SourceResult::succeeded("/etc".to_string(), SourceKind::Path, Vec::new(), Duration::from_secs(1)),
                SourceResult::failed(
                    "MySQL".to_string(),
                    SourceKind::Database(DatabaseKind::MySQL),
                    "Dump failed: exit 2".to_string(),
                    Duration::from_secs(1),
                ),
                SourceResult::failed("/home".to_string(), SourceKind::Path, CANCELLED.to_string(), Duration::ZERO),
            ],
            elapsed: Duration::from_secs(2),
        };

        assert_eq!(report.attempted(), 2);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed().count(), 2);
        assert!(!report.all_succeeded());
    }
}
