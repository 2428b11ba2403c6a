use super::{CommandOutput, CommandRunner, CommandSpec};
use crate::error::{BackupError, Result};
use async_trait::async_trait;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub type Responder = Arc<dyn Fn(&CommandSpec) -> Result<CommandOutput> + Send + Sync>;

#[derive(Clone)]
pub enum Reply {
    Output { status: i32, stdout: String, stderr: String },
    Timeout,
    Missing,
    With(Responder),
}

impl Reply {
    pub fn ok(stdout: &str) -> Self {
        Reply::Output {
            status: 0,
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    pub fn fail(status: i32, stderr: &str) -> Self {
        Reply::Output {
            status,
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }

    pub fn with<F>(f: F) -> Self
    where
        F: Fn(&CommandSpec) -> Result<CommandOutput> + Send + Sync + 'static,
    {
        Reply::With(Arc::new(f))
    }
}

struct Rule {
    program: String,
    args_prefix: Vec<String>,
    reply: Reply,
}

pub struct ScriptedRunner {
    rules: Vec<Rule>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// First matching rule wins, so register specific prefixes before general ones.
    pub fn on(mut self, program: &str, args_prefix: &[&str], reply: Reply) -> Self {
        self.rules.push(Rule {
            program: program.to_string(),
            args_prefix: args_prefix.iter().map(|a| a.to_string()).collect(),
            reply,
        });
        self
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, program: &str) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter(|c| c.program == program)
            .map(|c| c.args)
            .collect()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.calls.lock().unwrap().push(spec.clone());

        let rule = self
            .rules
            .iter()
            .find(|r| r.program == spec.program && spec.args.starts_with(&r.args_prefix));

        match rule.map(|r| &r.reply) {
            None => Ok(CommandOutput {
                status: Some(0),
                ..CommandOutput::default()
            }),
            Some(Reply::Output { status, stdout, stderr }) => Ok(CommandOutput {
                status: Some(*status),
                stdout: stdout.clone(),
                stderr: stderr.clone(),
            }),
            Some(Reply::Timeout) => Err(BackupError::Timeout {
                command: spec.display(),
                after: spec.timeout.unwrap_or(Duration::from_secs(1)),
            }),
            Some(Reply::Missing) => Err(BackupError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{}: not found", spec.program),
            ))),
            Some(Reply::With(f)) => f(spec),
        }
    }
}
