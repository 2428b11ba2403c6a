use crate::config::{DatabaseKind, DatabaseSource};
use crate::process::{CommandRunner, CommandSpec};
use std::time::Duration;
use tracing::debug;

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn detect_databases(runner: &dyn CommandRunner) -> Vec<DatabaseSource> {
    let mut found = Vec::new();
    for kind in DatabaseKind::ALL {
        if let Some(source) = detect(runner, kind).await {
            found.push(source);
        }
    }
    found
}

async fn detect(runner: &dyn CommandRunner, kind: DatabaseKind) -> Option<DatabaseSource> {
    let client = match kind {
        DatabaseKind::PostgreSQL => "psql",
        DatabaseKind::MySQL => "mysql",
        DatabaseKind::Redis => "redis-cli",
    };
    let version = probe(runner, CommandSpec::new(client).arg("--version")).await?;
    debug!("Detected {}: {}", kind, version);

    let path = match kind {
        DatabaseKind::PostgreSQL => "/var/lib/postgresql".to_string(),
        DatabaseKind::MySQL => probe(runner, CommandSpec::new("mysql").args(["-N", "-B", "-e", "SELECT @@datadir;"]))
            .await
            .filter(|dir| !dir.is_empty())
            .unwrap_or_else(|| "/var/lib/mysql".to_string()),
        DatabaseKind::Redis => probe(runner, CommandSpec::new("redis-cli").args(["info", "server"]))
            .await
            .and_then(|info| {
                info.lines()
                    .find_map(|line| line.strip_prefix("dir:"))
                    .map(|dir| dir.trim().to_string())
            })
            .filter(|dir| !dir.is_empty())
            .unwrap_or_else(|| super::redis::DEFAULT_DATA_DIR.to_string()),
    };

    Some(DatabaseSource { kind, path, version })
}

async fn probe(runner: &dyn CommandRunner, spec: CommandSpec) -> Option<String> {
    let output = runner.run(&spec.timeout(PROBE_TIMEOUT)).await.ok()?;
    output.success().then(|| output.stdout.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::fake::{Reply, ScriptedRunner};

    #[tokio::test]
    async fn test_detects_installed_engines_only() {
        let runner = ScriptedRunner::new()
            .on("psql", &["--version"], Reply::ok("psql (PostgreSQL) 16.2\n"))
            .on("mysql", &[], Reply::Missing)
            .on("redis-cli", &["--version"], Reply::ok("redis-cli 7.2.4\n"))
            .on("redis-cli", &["info"], Reply::ok("# Server\r\nredis_version:7.2.4\r\ndir:/data/redis\r\n"));

        let found = detect_databases(&runner).await;

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].kind, DatabaseKind::PostgreSQL);
        assert_eq!(found[0].version, "psql (PostgreSQL) 16.2");
        assert_eq!(found[1].kind, DatabaseKind::Redis);
        assert_eq!(found[1].path, "/data/redis");
    }

    #[tokio::test]
    async fn test_mysql_datadir_fallback() {
        let runner = ScriptedRunner::new()
            .on("psql", &[], Reply::Missing)
            .on("redis-cli", &[], Reply::Missing)
            .on("mysql", &["--version"], Reply::ok("mysql  Ver 8.0.36\n"))
            .on("mysql", &["-N"], Reply::fail(1, "Access denied"));

        let found = detect_databases(&runner).await;

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, "/var/lib/mysql");
    }
}
