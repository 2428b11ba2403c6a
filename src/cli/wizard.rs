use crate::config::{parse_duration, BackupConfig, DatabaseSource};
use crate::database::detect_databases;
use crate::error::{BackupError, Result};
use crate::process::CommandRunner;
use crate::repository::Snapshot;
use crate::system::{required_for, DependencyChecker, RESTIC};
use console::style;
use dialoguer::{Confirm, Input, Password, Select};
use std::path::PathBuf;

pub const DEFAULT_PATHS: [&str; 5] = ["/etc", "/home", "/root", "/var/www", "/usr/local/bin"];

fn prompt_error(e: dialoguer::Error) -> BackupError {
    BackupError::Config(e.to_string())
}

fn confirm(prompt: &str, default: bool) -> Result<bool> {
    Confirm::new()
        .with_prompt(prompt)
        .default(default)
        .interact()
        .map_err(prompt_error)
}

pub fn configure_repository(config: &mut BackupConfig) -> Result<()> {
    println!("\n{}", style("=== Repository ===").cyan().bold());

    let mut input = Input::<String>::new()
        .with_prompt("Restic repository location (e.g. /path/to/backup, s3:bucket-name)");
    if !config.repository.is_empty() {
        input = input.default(config.repository.clone());
    }
    let repository = input.interact_text().map_err(prompt_error)?;
    if repository.trim().is_empty() {
        return Err(BackupError::Config("repository location is required".to_string()));
    }

    let password = Password::new()
        .with_prompt("Restic repository password")
        .with_confirmation("Confirm password", "Passwords do not match")
        .interact()
        .map_err(prompt_error)?;
    if password.is_empty() {
        return Err(BackupError::Config("repository password is required".to_string()));
    }

    config.repository = repository.trim().to_string();
    config.password = password;
    Ok(())
}

pub async fn select_databases(config: &mut BackupConfig, runner: &dyn CommandRunner) -> Result<()> {
    println!("\n{}", style("=== Databases ===").cyan().bold());
    println!("{}", style("Detecting databases...").yellow());

    let detected = detect_databases(runner).await;
    if detected.is_empty() {
        println!("{}", style("No supported databases detected.").yellow());
        config.databases.clear();
        return Ok(());
    }

    let mut selected: Vec<DatabaseSource> = Vec::new();
    for (i, source) in detected.into_iter().enumerate() {
        println!(
            "[{}] {} (version: {}) at {}",
            i + 1,
            source.kind,
            source.version,
            source.path
        );
        if confirm(&format!("Include {} in backups?", source.kind), true)? {
            selected.push(source);
        }
    }

    config.databases = selected;
    Ok(())
}

pub fn select_paths(config: &mut BackupConfig) -> Result<()> {
    println!("\n{}", style("=== Paths ===").cyan().bold());

    let mut paths = Vec::new();
    for path in DEFAULT_PATHS {
        if confirm(&format!("Include {} in backups?", path), true)? {
            paths.push(path.to_string());
        }
    }
    for path in &config.paths {
        if !DEFAULT_PATHS.contains(&path.as_str()) && confirm(&format!("Keep {} in backups?", path), true)? {
            paths.push(path.clone());
        }
    }

    while confirm("Would you like to add another path?", false)? {
        let path: String = Input::new()
            .with_prompt("Enter the path")
            .allow_empty(true)
            .interact_text()
            .map_err(prompt_error)?;
        let path = path.trim();
        if !path.is_empty() && !paths.iter().any(|p| p == path) {
            paths.push(path.to_string());
        }
    }

    config.paths = paths;
    Ok(())
}

pub fn configure_schedule(config: &mut BackupConfig) -> Result<()> {
    println!("\n{}", style("=== Backup Schedule ===").cyan().bold());

    let schedule: String = Input::new()
        .with_prompt("Interval between backups (e.g. 24h, 6h, 1h30m)")
        .default(config.schedule.clone())
        .validate_with(|input: &String| -> std::result::Result<(), String> {
            parse_duration(input)
                .map(|_| ())
                .ok_or_else(|| format!("'{}' is not a duration", input))
        })
        .interact_text()
        .map_err(prompt_error)?;

    config.schedule = schedule.trim().to_string();
    println!("{}", style(format!("Schedule: every {}", config.schedule)).green());
    Ok(())
}

pub async fn run_initial_setup(config: &mut BackupConfig, runner: &dyn CommandRunner) -> Result<()> {
    println!("\n{}", style("╔════════════════════════════════════════╗").cyan());
    println!("{}", style("║       Yorokobi Backup - Setup          ║").cyan());
    println!("{}", style("╚════════════════════════════════════════╝").cyan());

    let checker = DependencyChecker::new(runner);
    checker.check_and_install(&[RESTIC]).await?;

    println!("\nWelcome to the Backup Configuration Wizard!\n");
    configure_repository(config)?;
    select_databases(config, runner).await?;
    select_paths(config)?;
    configure_schedule(config)?;

    checker.check_and_install(&required_for(config)).await?;

    println!(
        "\n{} {} database(s), {} path(s), every {}",
        style("Configured:").green(),
        config.databases.len(),
        config.paths.len(),
        config.schedule
    );
    Ok(())
}

fn snapshot_label(snapshot: &Snapshot) -> String {
    format!(
        "{} ({}) {} [{}]",
        snapshot.time.format("%Y-%m-%d %H:%M:%S"),
        snapshot.size,
        snapshot.paths.first().map(String::as_str).unwrap_or("-"),
        snapshot.short_id
    )
}

pub fn select_snapshot(mut snapshots: Vec<Snapshot>) -> Result<Snapshot> {
    snapshots.sort_by(|a, b| b.time.cmp(&a.time));
    let labels: Vec<String> = snapshots.iter().map(snapshot_label).collect();

    let selection = Select::new()
        .with_prompt("Select snapshot to restore")
        .items(&labels)
        .default(0)
        .max_length(10)
        .interact_opt()
        .map_err(prompt_error)?
        .ok_or_else(|| BackupError::Restore("snapshot selection cancelled".to_string()))?;

    let snapshot = snapshots.swap_remove(selection);
    println!(
        "{} {}\n  Host:  {}\n  Paths: {}",
        style("Snapshot selected:").green(),
        snapshot.id,
        snapshot.hostname,
        snapshot.paths.join(", ")
    );
    Ok(snapshot)
}

pub fn prompt_restore_target() -> Result<PathBuf> {
    let target: String = Input::new()
        .with_prompt("Restore into directory")
        .default("./restore".to_string())
        .interact_text()
        .map_err(prompt_error)?;
    Ok(PathBuf::from(target.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_snapshot_label() {
        let snapshot = Snapshot {
            id: "4bba301e4a1b3c0a".to_string(),
            short_id: "4bba301e".to_string(),
            time: Utc.with_ymd_and_hms(2026, 10, 15, 2, 0, 3).unwrap(),
            paths: vec!["/etc".to_string(), "/home".to_string()],
            size: "15.0 MiB".to_string(),
            hostname: "db-01".to_string(),
        };

        assert_eq!(snapshot_label(&snapshot), "2026-10-15 02:00:03 (15.0 MiB) /etc [4bba301e]");
    }

    #[test]
    fn test_default_schedule_is_valid() {
        assert!(parse_duration(&BackupConfig::default().schedule).is_some());
    }
}
