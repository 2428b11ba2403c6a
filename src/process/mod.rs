mod runner;

#[cfg(test)]
pub mod fake;

pub use runner::SystemRunner;

use crate::error::{BackupError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug, Clone, PartialEq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Command line for logs and error messages. Environment values are never included.
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandOutput {
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    pub fn combined(&self) -> String {
        let stdout = self.stdout.trim_end();
        let stderr = self.stderr.trim_end();
        match (stdout.is_empty(), stderr.is_empty()) {
            (true, _) => stderr.to_string(),
            (false, true) => stdout.to_string(),
            (false, false) => format!("{}\n{}", stdout, stderr),
        }
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs the command to completion. A non-zero exit is *not* an error here;
    /// only spawn failures, timeouts and cancellation are.
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput>;
}

pub async fn wait_for_shutdown(shutdown: &AtomicUsize) {
    while shutdown.load(Ordering::Relaxed) == 0 {
        sleep(Duration::from_millis(100)).await;
    }
}

/// Runs `spec` and turns both spawn failures and non-zero exits into the
/// caller's error kind. Timeouts and cancellation pass through unchanged.
pub async fn run_checked(
    runner: &dyn CommandRunner,
    spec: &CommandSpec,
    kind: fn(String) -> BackupError,
) -> Result<CommandOutput> {
    let output = match runner.run(spec).await {
        Ok(output) => output,
        Err(BackupError::Io(e)) => {
            return Err(kind(format!("failed to start '{}': {}", spec.display(), e)));
        }
        Err(e) => return Err(e),
    };

    if !output.success() {
        let status = output
            .status
            .map(|code| code.to_string())
            .unwrap_or_else(|| "signal".to_string());
        return Err(kind(format!(
            "'{}' exited with status {}\nOutput: {}",
            spec.display(),
            status,
            output.combined()
        )));
    }

    Ok(output)
}
