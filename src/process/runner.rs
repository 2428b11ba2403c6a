use super::{wait_for_shutdown, CommandOutput, CommandRunner, CommandSpec};
use crate::error::{BackupError, Result};
use async_trait::async_trait;
use std::io;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::select;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

const TERM_GRACE: Duration = Duration::from_secs(2);

enum Ending {
    Exited(io::Result<ExitStatus>),
    TimedOut,
    Cancelled,
}

/// On unix each child leads its own process group. Timeouts and shutdown
/// terminate the whole group, and anything the child left behind in the
/// group is killed once it exits.
pub struct SystemRunner {
    default_timeout: Duration,
    shutdown: Option<Arc<AtomicUsize>>,
}

impl SystemRunner {
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            default_timeout,
            shutdown: None,
        }
    }

    pub fn with_shutdown(mut self, shutdown: Arc<AtomicUsize>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown
            .as_ref()
            .map_or(false, |s| s.load(Ordering::Relaxed) > 0)
    }

    async fn wait_for_shutdown(&self) {
        match &self.shutdown {
            Some(shutdown) => wait_for_shutdown(shutdown).await,
            None => std::future::pending::<()>().await,
        }
    }
}

fn collect<R>(pipe: Option<R>) -> JoinHandle<io::Result<Vec<u8>>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf).await?;
        }
        Ok(buf)
    })
}

async fn collected(handle: JoinHandle<io::Result<Vec<u8>>>) -> io::Result<String> {
    let bytes = handle
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))??;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(unix)]
fn signal_group(pgid: Option<u32>, signal: nix::sys::signal::Signal) {
    use nix::errno::Errno;
    use nix::sys::signal::killpg;
    use nix::unistd::Pid;

    let Some(pgid) = pgid else { return };
    match killpg(Pid::from_raw(pgid as i32), signal) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => warn!("Failed to send {} to process group {}: {}", signal, pgid, e),
    }
}

async fn terminate(child: &mut Child, pgid: Option<u32>) {
    #[cfg(unix)]
    {
        use nix::sys::signal::Signal;

        signal_group(pgid, Signal::SIGTERM);
        let exited = timeout(TERM_GRACE, child.wait()).await.is_ok();
        signal_group(pgid, Signal::SIGKILL);
        if exited {
            return;
        }
    }
    #[cfg(not(unix))]
    let _ = pgid;

    if let Err(e) = child.kill().await {
        debug!("Kill after timeout failed: {}", e);
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        if self.shutdown_requested() {
            return Err(BackupError::Cancelled(spec.display()));
        }

        let limit = spec.timeout.unwrap_or(self.default_timeout);
        debug!("Running '{}' (timeout {:?})", spec.display(), limit);

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn()?;
        let pgid = child.id();
        let stdout = collect(child.stdout.take());
        let stderr = collect(child.stderr.take());

        let ending = select! {
            waited = timeout(limit, child.wait()) => match waited {
                Ok(status) => Ending::Exited(status),
                Err(_) => Ending::TimedOut,
            },
            _ = self.wait_for_shutdown() => Ending::Cancelled,
        };

        match ending {
            Ending::Exited(status) => {
                let status = status?;
                // Leftover group members would hold the pipes open.
                #[cfg(unix)]
                signal_group(pgid, nix::sys::signal::Signal::SIGKILL);
                Ok(CommandOutput {
                    status: status.code(),
                    stdout: collected(stdout).await?,
                    stderr: collected(stderr).await?,
                })
            }
            Ending::TimedOut => {
                terminate(&mut child, pgid).await;
                Err(BackupError::Timeout {
                    command: spec.display(),
                    after: limit,
                })
            }
            Ending::Cancelled => {
                terminate(&mut child, pgid).await;
                Err(BackupError::Cancelled(spec.display()))
            }
        }
    }
}
