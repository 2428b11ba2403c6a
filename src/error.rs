use std::fmt;
use std::io;
use std::time::Duration;

#[derive(Debug)]
pub enum BackupError {
    Config(String),
    RepositoryInit(String),
    Workspace(String),
    Dump(String),
    Submit(String),
    Timeout { command: String, after: Duration },
    Cancelled(String),
    List(String),
    Restore(String),
    Dependency(String),
    Io(io::Error),
    Serialization(String),
}

impl BackupError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, BackupError::Config(_) | BackupError::RepositoryInit(_))
    }
}

impl fmt::Display for BackupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackupError::Config(msg) => write!(f, "Configuration error: {}", msg),
            BackupError::RepositoryInit(msg) => write!(f, "Repository initialization error: {}", msg),
            BackupError::Workspace(msg) => write!(f, "Workspace error: {}", msg),
            BackupError::Dump(msg) => write!(f, "Dump error: {}", msg),
            BackupError::Submit(msg) => write!(f, "Submit error: {}", msg),
            BackupError::Timeout { command, after } => {
                write!(f, "Timeout: '{}' did not finish within {:?}", command, after)
            }
            BackupError::Cancelled(command) => write!(f, "Cancelled: '{}' was interrupted", command),
            BackupError::List(msg) => write!(f, "List error: {}", msg),
            BackupError::Restore(msg) => write!(f, "Restore error: {}", msg),
            BackupError::Dependency(msg) => write!(f, "Dependency error: {}", msg),
            BackupError::Io(err) => write!(f, "IO error: {}", err),
            BackupError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for BackupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BackupError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for BackupError {
    fn from(err: io::Error) -> Self {
        BackupError::Io(err)
    }
}

impl From<toml::de::Error> for BackupError {
    fn from(err: toml::de::Error) -> Self {
        BackupError::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for BackupError {
    fn from(err: toml::ser::Error) -> Self {
        BackupError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for BackupError {
    fn from(err: serde_json::Error) -> Self {
        BackupError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BackupError>;
