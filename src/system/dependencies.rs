use crate::config::{BackupConfig, DatabaseKind};
use crate::error::{BackupError, Result};
use crate::process::{CommandRunner, CommandSpec};
use std::time::Duration;
use tracing::{info, warn};

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const INSTALL_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub binary: &'static str,
    pub brew_package: &'static str,
    pub apt_package: &'static str,
    pub yum_package: &'static str,
    pub install_notes: &'static str,
}

pub const RESTIC: Dependency = Dependency {
    binary: "restic",
    brew_package: "restic",
    apt_package: "restic",
    yum_package: "restic",
    install_notes: "Visit https://restic.net/ for manual installation instructions",
};

const POSTGRES_CLIENT_NOTES: &str = "PostgreSQL client tools are required for database backups";

pub const PSQL: Dependency = Dependency {
    binary: "psql",
    brew_package: "postgresql",
    apt_package: "postgresql-client",
    yum_package: "postgresql",
    install_notes: POSTGRES_CLIENT_NOTES,
};

pub const PG_DUMP: Dependency = Dependency {
    binary: "pg_dump",
    brew_package: "postgresql",
    apt_package: "postgresql-client",
    yum_package: "postgresql",
    install_notes: POSTGRES_CLIENT_NOTES,
};

pub const MYSQLDUMP: Dependency = Dependency {
    binary: "mysqldump",
    brew_package: "mysql-client",
    apt_package: "default-mysql-client",
    yum_package: "mysql",
    install_notes: "MySQL or MariaDB client tools are required for database backups",
};

pub const REDIS_CLI: Dependency = Dependency {
    binary: "redis-cli",
    brew_package: "redis",
    apt_package: "redis-tools",
    yum_package: "redis",
    install_notes: "redis-cli is required for Redis snapshots",
};

pub fn required_for(config: &BackupConfig) -> Vec<Dependency> {
    let mut deps = vec![RESTIC];
    for source in &config.databases {
        let needed: &[Dependency] = match source.kind {
            DatabaseKind::PostgreSQL => &[PSQL, PG_DUMP],
            DatabaseKind::MySQL => &[MYSQLDUMP],
            DatabaseKind::Redis => &[REDIS_CLI],
        };
        for dep in needed {
            if !deps.contains(dep) {
                deps.push(dep.clone());
            }
        }
    }
    deps
}

pub struct DependencyChecker<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> DependencyChecker<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }

    pub async fn is_installed(&self, dep: &Dependency) -> bool {
        let spec = CommandSpec::new(dep.binary).arg("--version").timeout(PROBE_TIMEOUT);
        matches!(self.runner.run(&spec).await, Ok(output) if output.success())
    }

    pub async fn missing(&self, deps: &[Dependency]) -> Vec<Dependency> {
        let mut missing = Vec::new();
        for dep in deps {
            if self.is_installed(dep).await {
                info!("{} is already installed", dep.binary);
            } else {
                missing.push(dep.clone());
            }
        }
        missing
    }

    pub async fn check_and_install(&self, deps: &[Dependency]) -> Result<()> {
        info!("Checking system dependencies...");
        for dep in self.missing(deps).await {
            self.install(&dep).await?;
        }
        Ok(())
    }

    async fn install(&self, dep: &Dependency) -> Result<()> {
        info!("Installing {}...", dep.binary);
        let attempts = [
            CommandSpec::new("brew").args(["install", dep.brew_package]),
            CommandSpec::new("apt-get").args(["install", "-y", dep.apt_package]),
            CommandSpec::new("yum").args(["install", "-y", dep.yum_package]),
        ];

        for spec in attempts {
            let spec = spec.timeout(INSTALL_TIMEOUT);
            match self.runner.run(&spec).await {
                Ok(output) if output.success() => {
                    info!("Successfully installed {}", dep.binary);
                    return Ok(());
                }
                Ok(output) => info!("{} failed: {}", spec.display(), output.combined()),
                Err(e) => info!("{} failed: {}", spec.display(), e),
            }
        }

        warn!("Manual installation instructions: {}", dep.install_notes);
        Err(BackupError::Dependency(format!(
            "failed to install {} with any package manager",
            dep.binary
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseSource;
    use crate::process::fake::{Reply, ScriptedRunner};

    #[test]
    fn test_required_for_config() {
        let config = BackupConfig {
            databases: vec![
                DatabaseSource::new(DatabaseKind::PostgreSQL),
                DatabaseSource::new(DatabaseKind::Redis),
                DatabaseSource::new(DatabaseKind::PostgreSQL),
            ],
            ..BackupConfig::default()
        };

        let binaries: Vec<&str> = required_for(&config).iter().map(|d| d.binary).collect();
        assert_eq!(binaries, vec!["restic", "psql", "pg_dump", "redis-cli"]);
    }

    #[tokio::test]
    async fn test_installed_dependencies_are_left_alone() {
        let runner = ScriptedRunner::new();

        DependencyChecker::new(&runner)
            .check_and_install(&[RESTIC, MYSQLDUMP])
            .await
            .unwrap();

        assert_eq!(runner.calls().len(), 2);
        assert!(runner.calls_to("brew").is_empty());
    }

    #[tokio::test]
    async fn test_falls_through_package_managers() {
        let runner = ScriptedRunner::new()
            .on("restic", &["--version"], Reply::Missing)
            .on("brew", &[], Reply::Missing)
            .on("apt-get", &[], Reply::fail(100, "E: Unable to locate package restic"));

        DependencyChecker::new(&runner)
            .check_and_install(&[RESTIC])
            .await
            .unwrap();

        assert_eq!(runner.calls_to("apt-get").len(), 1);
        assert_eq!(runner.calls_to("yum"), vec![vec!["install", "-y", "restic"]]);
    }

    #[tokio::test]
    async fn test_install_failure_names_binary() {
        let runner = ScriptedRunner::new()
            .on("pg_dump", &[], Reply::Missing)
            .on("brew", &[], Reply::Missing)
            .on("apt-get", &[], Reply::Missing)
            .on("yum", &[], Reply::Missing);

        let err = DependencyChecker::new(&runner)
            .check_and_install(&[PG_DUMP])
            .await
            .unwrap_err();

        assert!(matches!(err, BackupError::Dependency(msg) if msg.contains("pg_dump")));
    }
}
