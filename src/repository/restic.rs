use super::snapshot::{decode_snapshots, Snapshot};
use crate::error::{BackupError, Result};
use crate::process::{run_checked, CommandRunner, CommandSpec};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const RESTIC: &str = "restic";

pub struct ResticClient {
    runner: Arc<dyn CommandRunner>,
    repository: String,
    password: String,
    timeout: Duration,
}

impl ResticClient {
    pub fn new(runner: Arc<dyn CommandRunner>, repository: &str, password: &str, timeout: Duration) -> Self {
        Self {
            runner,
            repository: repository.to_string(),
            password: password.to_string(),
            timeout,
        }
    }

    fn command<I, S>(&self, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandSpec::new(RESTIC)
            .args(args)
            .env("RESTIC_REPOSITORY", self.repository.as_str())
            .env("RESTIC_PASSWORD", self.password.as_str())
            .timeout(self.timeout)
    }

    pub async fn ensure_initialized(&self) -> Result<()> {
        info!("Checking restic repository...");
        let probe = self.command(["snapshots"]);
        match self.runner.run(&probe).await {
            Ok(output) if output.success() => {
                info!("Repository exists and is accessible");
                debug!("{}", output.stdout.trim_end());
                return Ok(());
            }
            Ok(output) => debug!("Repository probe failed: {}", output.combined()),
            Err(e @ BackupError::Cancelled(_)) => return Err(BackupError::RepositoryInit(e.to_string())),
            Err(e) => debug!("Repository probe failed: {}", e),
        }

        info!("Repository not initialized, attempting to initialize...");
        let init = self.command(["init"]);
        run_checked(self.runner.as_ref(), &init, BackupError::RepositoryInit)
            .await
            .map_err(|e| match e {
                BackupError::RepositoryInit(_) => e,
                other => BackupError::RepositoryInit(other.to_string()),
            })?;
        info!("Repository initialized successfully");
        Ok(())
    }

    pub async fn submit(&self, path: &Path) -> Result<()> {
        info!("Running restic backup for {}", path.display());
        let spec = self.command(["backup".to_string(), path.to_string_lossy().into_owned()]);
        run_checked(self.runner.as_ref(), &spec, BackupError::Submit).await?;
        Ok(())
    }

    pub async fn list_snapshots(&self) -> Result<Vec<Snapshot>> {
        let spec = self.command(["snapshots", "--json"]);
        let output = run_checked(self.runner.as_ref(), &spec, BackupError::List).await?;
        decode_snapshots(&output.stdout)
    }

    pub async fn restore(&self, snapshot_id: &str, target: &Path) -> Result<()> {
        info!("Restoring snapshot {} to {}...", snapshot_id, target.display());
        let spec = self.command([
            "restore".to_string(),
            snapshot_id.to_string(),
            "--target".to_string(),
            target.to_string_lossy().into_owned(),
        ]);
        run_checked(self.runner.as_ref(), &spec, BackupError::Restore).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::fake::{Reply, ScriptedRunner};
    use std::path::PathBuf;

    fn client(runner: Arc<ScriptedRunner>) -> ResticClient {
        ResticClient::new(runner, "/srv/restic", "hunter2", Duration::from_secs(30))
    }

    #[tokio::test]
    async fn test_existing_repository_skips_init() {
        let runner = Arc::new(ScriptedRunner::new());

        client(runner.clone()).ensure_initialized().await.unwrap();

        assert_eq!(runner.calls_to(RESTIC), vec![vec!["snapshots".to_string()]]);
    }

    #[tokio::test]
    async fn test_failed_probe_triggers_init() {
        let runner = Arc::new(ScriptedRunner::new().on(
            RESTIC,
            &["snapshots"],
            Reply::fail(10, "Fatal: repository does not exist"),
        ));

        client(runner.clone()).ensure_initialized().await.unwrap();

        let calls = runner.calls_to(RESTIC);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1], vec!["init".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_init_is_fatal() {
        let runner = Arc::new(
            ScriptedRunner::new()
                .on(RESTIC, &["snapshots"], Reply::fail(10, "Fatal: repository does not exist"))
                .on(RESTIC, &["init"], Reply::fail(1, "Fatal: create repository failed: permission denied")),
        );

        let err = client(runner).ensure_initialized().await.unwrap_err();

        assert!(err.is_fatal());
        assert!(err.to_string().contains("permission denied"));
    }

    #[tokio::test]
    async fn test_missing_binary_is_init_error() {
        let runner = Arc::new(ScriptedRunner::new().on(RESTIC, &[], Reply::Missing));

        let err = client(runner).ensure_initialized().await.unwrap_err();
        assert!(matches!(err, BackupError::RepositoryInit(_)));
    }

    #[tokio::test]
    async fn test_credentials_only_in_environment() {
        let runner = Arc::new(ScriptedRunner::new());

        client(runner.clone()).submit(Path::new("/etc")).await.unwrap();

        let call = &runner.calls()[0];
        assert_eq!(call.args, vec!["backup", "/etc"]);
        assert!(call.env.contains(&("RESTIC_REPOSITORY".to_string(), "/srv/restic".to_string())));
        assert!(call.env.contains(&("RESTIC_PASSWORD".to_string(), "hunter2".to_string())));
        assert!(!call.display().contains("hunter2"));
    }

    #[tokio::test]
    async fn test_submit_failure_carries_output() {
        let runner = Arc::new(ScriptedRunner::new().on(RESTIC, &["backup"], Reply::fail(3, "unable to read /root/secret")));

        let err = client(runner).submit(Path::new("/root")).await.unwrap_err();
        assert!(matches!(err, BackupError::Submit(msg) if msg.contains("unable to read")));
    }

    #[tokio::test]
    async fn test_list_empty_repository() {
        let runner = Arc::new(ScriptedRunner::new().on(RESTIC, &["snapshots", "--json"], Reply::ok("[]\n")));

        let snapshots = client(runner).list_snapshots().await.unwrap();
        assert!(snapshots.is_empty());
    }

    #[tokio::test]
    async fn test_list_then_restore_passes_id_through() {
        let listing = r#"[{"id":"0f1e2d3c4b5a69788796a5b4c3d2e1f00f1e2d3c4b5a69788796a5b4c3d2e1f0","short_id":"0f1e2d3c","time":"2026-10-16T01:00:00Z","paths":["/etc"],"hostname":"web-01"}]"#;
        let runner = Arc::new(ScriptedRunner::new().on(RESTIC, &["snapshots", "--json"], Reply::ok(listing)));
        let client = client(runner.clone());
        let target = PathBuf::from("/tmp/restore-target");

        let snapshots = client.list_snapshots().await.unwrap();
        client.restore(&snapshots[0].id, &target).await.unwrap();

        let restore = runner.calls_to(RESTIC).pop().unwrap();
        assert_eq!(
            restore,
            vec![
                "restore",
                "0f1e2d3c4b5a69788796a5b4c3d2e1f00f1e2d3c4b5a69788796a5b4c3d2e1f0",
                "--target",
                "/tmp/restore-target"
            ]
        );
    }

    #[tokio::test]
    async fn test_list_failure() {
        let runner = Arc::new(ScriptedRunner::new().on(RESTIC, &["snapshots"], Reply::fail(1, "Fatal: wrong password")));

        let err = client(runner).list_snapshots().await.unwrap_err();
        assert!(matches!(err, BackupError::List(_)));
    }

    #[tokio::test]
    async fn test_restore_failure() {
        let runner = Arc::new(ScriptedRunner::new().on(RESTIC, &["restore"], Reply::fail(1, "Fatal: no matching ID found")));

        let err = client(runner)
            .restore("deadbeef", Path::new("/tmp/out"))
            .await
            .unwrap_err();
        assert!(matches!(err, BackupError::Restore(msg) if msg.contains("no matching ID")));
    }
}
