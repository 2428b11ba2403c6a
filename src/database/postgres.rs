use super::driver::{artifact_name, DumpAdapter, DumpOutcome};
use crate::config::SubDatabaseFailure;
use crate::error::{BackupError, Result};
use crate::process::{run_checked, CommandRunner, CommandSpec};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

const LIST_DATABASES_SQL: &str = "SELECT datname FROM pg_database WHERE datistemplate = false;";

pub struct PostgresAdapter {
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
    on_failure: SubDatabaseFailure,
}

impl PostgresAdapter {
    pub fn new(runner: Arc<dyn CommandRunner>, timeout: Duration, on_failure: SubDatabaseFailure) -> Self {
        Self {
            runner,
            timeout,
            on_failure,
        }
    }

    async fn list_databases(&self) -> Result<Vec<String>> {
        info!("Listing all PostgreSQL databases...");
        let spec = CommandSpec::new("psql")
            .args(["-t", "-A", "-c", LIST_DATABASES_SQL])
            .timeout(self.timeout);
        let output = run_checked(self.runner.as_ref(), &spec, BackupError::Dump).await?;

        Ok(output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn dump_one(&self, db_name: &str, workspace: &Path) -> Result<std::path::PathBuf> {
        let dump_file = workspace.join(artifact_name(db_name, "dump"));
        info!("Running pg_dump for database: {}", db_name);
        let spec = CommandSpec::new("pg_dump")
            .args(["-Fc", "-f"])
            .arg(dump_file.to_string_lossy())
            .arg(db_name)
            .timeout(self.timeout);
        run_checked(self.runner.as_ref(), &spec, BackupError::Dump).await?;
        Ok(dump_file)
    }
}

#[async_trait]
impl DumpAdapter for PostgresAdapter {
    async fn populate(&self, workspace: &Path) -> Result<DumpOutcome> {
        let databases = self.list_databases().await?;
        if databases.is_empty() {
            warn!("No PostgreSQL databases found to dump");
        }

        let mut outcome = DumpOutcome::default();
        for db_name in &databases {
            match self.dump_one(db_name, workspace).await {
                Ok(path) => outcome.artifacts.push(path),
                Err(e @ BackupError::Cancelled(_)) => return Err(e),
                Err(e) => match self.on_failure {
                    SubDatabaseFailure::AbortSource => {
                        return Err(BackupError::Dump(format!("pg_dump failed for {}: {}", db_name, e)));
                    }
                    SubDatabaseFailure::Isolate => {
                        error!("Failed to dump PostgreSQL database {}: {}", db_name, e);
                        outcome.db_errors.push((db_name.clone(), e.to_string()));
                    }
                },
            }
        }

        if outcome.artifacts.is_empty() && !outcome.db_errors.is_empty() {
            return Err(BackupError::Dump(format!(
                "all {} PostgreSQL databases failed to dump",
                outcome.db_errors.len()
            )));
        }

        Ok(outcome)
    }

    fn engine_name(&self) -> &'static str {
        "PostgreSQL"
    }
}
