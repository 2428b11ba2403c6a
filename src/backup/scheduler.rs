use super::orchestrator::Orchestrator;
use crate::process::wait_for_shutdown;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::select;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

pub async fn run_scheduler(orchestrator: Arc<Orchestrator>, period: Duration, shutdown: Arc<AtomicUsize>) {
    info!("Starting backup scheduler");
    info!("Scheduler interval: {:?}", period);

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut runs: Vec<JoinHandle<()>> = Vec::new();

    loop {
        select! {
            _ = ticker.tick() => {
                runs.retain(|handle| !handle.is_finished());
                let orchestrator = orchestrator.clone();
                runs.push(tokio::spawn(async move {
                    if orchestrator.try_backup().await.is_none() {
                        warn!("Previous backup still running, skipping this trigger");
                    }
                }));
            }
            _ = wait_for_shutdown(&shutdown) => {
                info!("Scheduler shutdown requested");
                break;
            }
        }
    }

    for handle in runs {
        let _ = handle.await;
    }
    info!("Scheduler stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackupConfig;
    use crate::process::fake::{Reply, ScriptedRunner};
    use crate::process::CommandOutput;
    use std::sync::atomic::Ordering;
    use tempfile::tempdir;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_runs_never_overlap() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (active_in, peak_in) = (active.clone(), peak.clone());

        let runner = Arc::new(ScriptedRunner::new().on(
            "restic",
            &["backup"],
            Reply::with(move |_| {
                let now = active_in.fetch_add(1, Ordering::SeqCst) + 1;
                peak_in.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(120));
                active_in.fetch_sub(1, Ordering::SeqCst);
                Ok(CommandOutput {
                    status: Some(0),
                    ..Default::default()
                })
            }),
        ));
        let staging = tempdir().unwrap();
        let config = BackupConfig {
            repository: "/srv/restic".to_string(),
            password: "hunter2".to_string(),
            paths: vec!["/etc".to_string()],
            staging_dir: Some(staging.path().to_path_buf()),
            ..BackupConfig::default()
        };
        let orchestrator = Arc::new(Orchestrator::new(config, runner.clone()).await.unwrap());
        let shutdown = Arc::new(AtomicUsize::new(0));

        let trigger = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            trigger.store(1, Ordering::SeqCst);
        });
        run_scheduler(orchestrator, Duration::from_millis(50), shutdown).await;

        let submissions = runner
            .calls_to("restic")
            .into_iter()
            .filter(|args| args[0] == "backup")
            .count();
        assert!(submissions >= 1);
        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(active.load(Ordering::SeqCst), 0);
    }
}
