use super::driver::{DumpAdapter, DumpOutcome};
use crate::error::{BackupError, Result};
use crate::process::{run_checked, CommandRunner, CommandSpec};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_DATA_DIR: &str = "/var/lib/redis";
pub const SNAPSHOT_FILE_NAME: &str = "dump.rdb";

pub struct RedisAdapter {
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
}

impl RedisAdapter {
    pub fn new(runner: Arc<dyn CommandRunner>, timeout: Duration) -> Self {
        Self { runner, timeout }
    }

    async fn save(&self) -> Result<()> {
        info!("Running redis SAVE...");
        let spec = CommandSpec::new("redis-cli").arg("SAVE").timeout(self.timeout);
        let output = run_checked(self.runner.as_ref(), &spec, BackupError::Dump).await?;

        // redis-cli exits 0 even when the server rejects the command.
        let reply = output.stdout.trim();
        if reply.starts_with("ERR") || reply.starts_with("(error)") {
            return Err(BackupError::Dump(format!("redis SAVE failed: {}", reply)));
        }
        Ok(())
    }

    async fn data_dir(&self) -> Result<PathBuf> {
        let spec = CommandSpec::new("redis-cli")
            .args(["CONFIG", "GET", "dir"])
            .timeout(self.timeout);
        let output = run_checked(self.runner.as_ref(), &spec, BackupError::Dump).await?;
        parse_config_dir(&output.stdout)
    }
}

/// `CONFIG GET dir` answers with the key on the first line and the value on the second.
pub(crate) fn parse_config_dir(stdout: &str) -> Result<PathBuf> {
    let lines: Vec<&str> = stdout.split('\n').map(str::trim).collect();
    if lines.len() < 2 || lines[0] != "dir" {
        return Err(BackupError::Dump(format!(
            "unexpected redis-cli CONFIG GET dir output: {}",
            stdout
        )));
    }

    if lines[1].is_empty() {
        debug!("Redis reported no dir, using {}", DEFAULT_DATA_DIR);
        Ok(PathBuf::from(DEFAULT_DATA_DIR))
    } else {
        Ok(PathBuf::from(lines[1]))
    }
}

#[async_trait]
impl DumpAdapter for RedisAdapter {
    async fn populate(&self, workspace: &Path) -> Result<DumpOutcome> {
        self.save().await?;

        let snapshot = self.data_dir().await?.join(SNAPSHOT_FILE_NAME);
        if !tokio::fs::try_exists(&snapshot).await.unwrap_or(false) {
            return Err(BackupError::Dump(format!(
                "{} not found at {}",
                SNAPSHOT_FILE_NAME,
                snapshot.display()
            )));
        }

        let target = workspace.join(SNAPSHOT_FILE_NAME);
        tokio::fs::copy(&snapshot, &target).await.map_err(|e| {
            BackupError::Dump(format!("failed to copy Redis dump {}: {}", snapshot.display(), e))
        })?;

        Ok(DumpOutcome {
            artifacts: vec![target],
            db_errors: Vec::new(),
        })
    }

    fn engine_name(&self) -> &'static str {
        "Redis"
    }
}
