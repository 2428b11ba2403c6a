use super::wizard;
use crate::backup::{run_scheduler, BackupReport, Orchestrator};
use crate::config::{self, parse_duration, AppConfig, BackupConfig};
use crate::error::{BackupError, Result};
use crate::process::{CommandRunner, SystemRunner};
use crate::system::{required_for, DependencyChecker};
use console::style;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use tracing::warn;

fn system_runner(config: &BackupConfig, shutdown: &Arc<AtomicUsize>) -> Arc<dyn CommandRunner> {
    Arc::new(SystemRunner::new(config.command_timeout()).with_shutdown(shutdown.clone()))
}

async fn connect(config: &BackupConfig, shutdown: &Arc<AtomicUsize>) -> Result<Orchestrator> {
    let runner = system_runner(config, shutdown);
    Ok(Orchestrator::new(config.clone(), runner)
        .await?
        .with_shutdown(shutdown.clone()))
}

async fn warn_missing_dependencies(config: &BackupConfig, runner: &dyn CommandRunner) {
    for dep in DependencyChecker::new(runner).missing(&required_for(config)).await {
        warn!("{} not found; sources that need it will fail. Run 'yorokobi setup' to install it", dep.binary);
    }
}

pub async fn run_setup(config: &mut AppConfig, config_path: &Path, shutdown: Arc<AtomicUsize>) -> Result<()> {
    let runner = system_runner(&config.backup, &shutdown);
    wizard::run_initial_setup(&mut config.backup, runner.as_ref()).await?;
    config::save_to(config, config_path)?;

    println!("\n{}", style("Initializing repository...").yellow());
    connect(&config.backup, &shutdown).await?;
    println!("{}", style("Setup complete!").green().bold());
    Ok(())
}

pub async fn run_backup(config: &AppConfig, shutdown: Arc<AtomicUsize>) -> Result<()> {
    let runner = system_runner(&config.backup, &shutdown);
    warn_missing_dependencies(&config.backup, runner.as_ref()).await;

    let orchestrator = connect(&config.backup, &shutdown).await?;
    println!("\n{}", style("Running backup of all sources...").yellow());
    let report = orchestrator.backup().await;
    print_report(&report);
    Ok(())
}

pub async fn run_daemon(config: &AppConfig, shutdown: Arc<AtomicUsize>) -> Result<()> {
    if parse_duration(&config.backup.schedule).is_none() {
        warn!("Invalid schedule '{}', defaulting to 24h", config.backup.schedule);
    }
    let period = config.backup.schedule_interval();

    let orchestrator = Arc::new(connect(&config.backup, &shutdown).await?);
    println!(
        "{}",
        style(format!("Backing up every {:?}. Press Ctrl+C to stop.", period)).cyan()
    );
    run_scheduler(orchestrator, period, shutdown).await;
    Ok(())
}

pub async fn list_snapshots(config: &AppConfig, shutdown: Arc<AtomicUsize>) -> Result<()> {
    let orchestrator = connect(&config.backup, &shutdown).await?;
    let mut snapshots = orchestrator.list_snapshots().await?;

    if snapshots.is_empty() {
        println!("{}", style("No snapshots in repository yet.").yellow());
        return Ok(());
    }

    snapshots.sort_by(|a, b| b.time.cmp(&a.time));
    println!("\n{}", style("=== Snapshots ===").cyan().bold());
    for snapshot in &snapshots {
        println!(
            "{}  {}  {:>10}  {}  {}",
            style(&snapshot.short_id).cyan(),
            snapshot.time.format("%Y-%m-%d %H:%M:%S"),
            snapshot.size,
            snapshot.hostname,
            snapshot.paths.join(", ")
        );
    }
    println!("\n{} snapshot(s)", snapshots.len());
    Ok(())
}

pub async fn run_restore(
    config: &AppConfig,
    snapshot_id: Option<String>,
    target: Option<PathBuf>,
    shutdown: Arc<AtomicUsize>,
) -> Result<()> {
    let orchestrator = connect(&config.backup, &shutdown).await?;

    let snapshot_id = match snapshot_id {
        Some(id) => id,
        None => {
            let snapshots = orchestrator.list_snapshots().await?;
            if snapshots.is_empty() {
                return Err(BackupError::Restore("no snapshots available to restore".to_string()));
            }
            wizard::select_snapshot(snapshots)?.id
        }
    };
    let target = match target {
        Some(target) => target,
        None => wizard::prompt_restore_target()?,
    };

    orchestrator.restore(&snapshot_id, &target).await?;
    println!(
        "{} Restored snapshot {} to {}",
        style("✓").green(),
        snapshot_id,
        target.display()
    );
    Ok(())
}

fn print_report(report: &BackupReport) {
    println!("\n{}", style("=== Backup Results ===").cyan().bold());
    for result in &report.results {
        if result.success {
            println!(
                "{} {} - {} ({:.1} sec)",
                style("✓").green(),
                result.name,
                style("Success").green(),
                result.duration.as_secs_f64()
            );
        } else {
            println!(
                "{} {} - {} ({})",
                style("✗").red(),
                result.name,
                style("Failed").red(),
                result.error.as_deref().unwrap_or("Unknown error")
            );
        }
        for (db_name, err) in &result.db_errors {
            println!("    {} {}: {}", style("⚠").yellow(), db_name, err);
        }
    }

    println!(
        "\nCompleted: {}/{} sources successful in {:.1} sec",
        style(report.succeeded()).green(),
        report.attempted(),
        report.elapsed.as_secs_f64()
    );
    let skipped = report.results.len() - report.attempted();
    if skipped > 0 {
        println!("{}", style(format!("{} source(s) skipped after Ctrl+C", skipped)).yellow());
    }
    if !report.all_succeeded() {
        println!("{}", style("Some sources failed; they will be retried on the next run.").yellow());
    }
}
