use super::driver::{DumpAdapter, DumpOutcome};
use crate::error::{BackupError, Result};
use crate::process::{run_checked, CommandRunner, CommandSpec};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub const DUMP_FILE_NAME: &str = "all_databases.sql";

pub struct MysqlAdapter {
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
}

impl MysqlAdapter {
    pub fn new(runner: Arc<dyn CommandRunner>, timeout: Duration) -> Self {
        Self { runner, timeout }
    }
}

#[async_trait]
impl DumpAdapter for MysqlAdapter {
    async fn populate(&self, workspace: &Path) -> Result<DumpOutcome> {
        let dump_file = workspace.join(DUMP_FILE_NAME);
        info!("Running mysqldump...");
        let spec = CommandSpec::new("mysqldump")
            .args(["--all-databases", "-r"])
            .arg(dump_file.to_string_lossy())
            .timeout(self.timeout);
        run_checked(self.runner.as_ref(), &spec, BackupError::Dump).await?;

        Ok(DumpOutcome {
            artifacts: vec![dump_file],
            db_errors: Vec::new(),
        })
    }

    fn engine_name(&self) -> &'static str {
        "MySQL"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::fake::{Reply, ScriptedRunner};
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_single_bulk_dump() {
        let runner = Arc::new(ScriptedRunner::new());
        let workspace = tempdir().unwrap();

        let outcome = MysqlAdapter::new(runner.clone(), Duration::from_secs(5))
            .populate(workspace.path())
            .await
            .unwrap();

        let calls = runner.calls_to("mysqldump");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0][0], "--all-databases");
        assert_eq!(outcome.artifacts, vec![workspace.path().join(DUMP_FILE_NAME)]);
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_dump_error() {
        let runner = Arc::new(ScriptedRunner::new().on("mysqldump", &[], Reply::fail(2, "Access denied for user")));
        let workspace = tempdir().unwrap();

        let err = MysqlAdapter::new(runner, Duration::from_secs(5))
            .populate(workspace.path())
            .await
            .unwrap_err();

        assert!(matches!(err, BackupError::Dump(msg) if msg.contains("Access denied")));
    }
}
