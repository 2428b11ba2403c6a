use super::report::{BackupReport, SourceKind, SourceResult, CANCELLED};
use super::workspace::{Workspace, WORKSPACE_PREFIX};
use crate::config::{BackupConfig, DatabaseSource};
use crate::database::{create_adapter, DumpOptions, DumpOutcome};
use crate::error::{BackupError, Result};
use crate::process::CommandRunner;
use crate::repository::{ResticClient, Snapshot};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

pub fn validate(config: &BackupConfig) -> Result<()> {
    if config.repository.trim().is_empty() {
        return Err(BackupError::Config(
            "No repository configured. Please run 'yorokobi setup' first".to_string(),
        ));
    }
    if config.password.is_empty() {
        return Err(BackupError::Config(
            "No repository password configured. Please run 'yorokobi setup' first".to_string(),
        ));
    }
    Ok(())
}

/// Construction is the only fatal step. A backup run never fails as a whole:
/// each source's error is recorded in the [`BackupReport`] and the run moves on.
pub struct Orchestrator {
    config: BackupConfig,
    runner: Arc<dyn CommandRunner>,
    repository: ResticClient,
    staging_root: PathBuf,
    shutdown: Option<Arc<AtomicUsize>>,
    run_slot: Mutex<()>,
}

impl Orchestrator {
    pub async fn new(config: BackupConfig, runner: Arc<dyn CommandRunner>) -> Result<Self> {
        validate(&config)?;

        let repository = ResticClient::new(
            runner.clone(),
            &config.repository,
            &config.password,
            config.command_timeout(),
        );
        repository.ensure_initialized().await?;

        Ok(Self {
            staging_root: config.staging_root(),
            config,
            runner,
            repository,
            shutdown: None,
            run_slot: Mutex::new(()),
        })
    }

    pub fn with_shutdown(mut self, shutdown: Arc<AtomicUsize>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub async fn backup(&self) -> BackupReport {
        let _slot = self.run_slot.lock().await;
        self.run_backup().await
    }

    pub async fn try_backup(&self) -> Option<BackupReport> {
        let _slot = self.run_slot.try_lock().ok()?;
        Some(self.run_backup().await)
    }

    pub async fn list_snapshots(&self) -> Result<Vec<Snapshot>> {
        self.repository.list_snapshots().await
    }

    pub async fn restore(&self, snapshot_id: &str, target: &Path) -> Result<()> {
        if snapshot_id.trim().is_empty() {
            return Err(BackupError::Restore("no snapshot id given".to_string()));
        }

        info!("Starting restore...");
        let start = Instant::now();
        self.repository.restore(snapshot_id, target).await?;
        info!("Restore completed in {:?}", start.elapsed());
        Ok(())
    }

    fn cancelled(&self) -> bool {
        self.shutdown
            .as_ref()
            .map_or(false, |s| s.load(Ordering::Relaxed) > 0)
    }

    fn dump_options(&self) -> DumpOptions {
        DumpOptions {
            timeout: self.config.command_timeout(),
            sub_database_failure: self.config.sub_database_failure,
        }
    }

    async fn run_backup(&self) -> BackupReport {
        info!("Starting backup...");
        let start = Instant::now();
        let mut results = Vec::new();

        for source in &self.config.databases {
            let kind = SourceKind::Database(source.kind);
            if self.cancelled() {
                results.push(SourceResult::failed(source.kind.to_string(), kind, CANCELLED.to_string(), Default::default()));
                continue;
            }
            results.push(self.backup_database(source).await);
        }

        for path in &self.config.paths {
            if self.cancelled() {
                results.push(SourceResult::failed(path.clone(), SourceKind::Path, CANCELLED.to_string(), Default::default()));
                continue;
            }
            results.push(self.backup_path(path).await);
        }

        let report = BackupReport {
            results,
            elapsed: start.elapsed(),
        };
        report.log_summary();
        report
    }

    async fn backup_database(&self, source: &DatabaseSource) -> SourceResult {
        let start = Instant::now();
        let name = source.kind.to_string();
        info!("Starting backup of {} database...", name);

        match self.dump_and_submit(source).await {
            Ok(outcome) => {
                info!("Completed backup of {} database", name);
                SourceResult::succeeded(name, SourceKind::Database(source.kind), outcome.db_errors, start.elapsed())
            }
            Err(e) => {
                error!("Failed to backup database {}: {}", name, e);
                SourceResult::failed(name, SourceKind::Database(source.kind), e.to_string(), start.elapsed())
            }
        }
    }

    async fn dump_and_submit(&self, source: &DatabaseSource) -> Result<DumpOutcome> {
        // Dropping the workspace on any early return removes it.
        let workspace = Workspace::create(&self.staging_root, WORKSPACE_PREFIX, source.kind.tag())?;

        let adapter = create_adapter(source, self.runner.clone(), self.dump_options());
        info!("Creating dump for {} database...", adapter.engine_name());
        let outcome = adapter.populate(workspace.path()).await?;
        info!("Dumped {} artifact(s) into {}", outcome.artifacts.len(), workspace.path().display());

        info!("Running restic backup for database dump...");
        self.repository.submit(workspace.path()).await?;

        let path = workspace.path().to_path_buf();
        if let Err(e) = workspace.release() {
            warn!("Backup of {} succeeded but {} was not removed: {}", source.kind, path.display(), e);
        }
        Ok(outcome)
    }

    async fn backup_path(&self, path: &str) -> SourceResult {
        let start = Instant::now();
        info!("Starting backup of path: {}", path);

        match self.repository.submit(Path::new(path)).await {
            Ok(()) => {
                info!("Completed backup of path: {}", path);
                SourceResult::succeeded(path.to_string(), SourceKind::Path, Vec::new(), start.elapsed())
            }
            Err(e) => {
                error!("Failed to backup path {}: {}", path, e);
                SourceResult::failed(path.to_string(), SourceKind::Path, e.to_string(), start.elapsed())
            }
        }
    }
}
