use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SCHEDULE: Duration = Duration::from_secs(24 * 3600);
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 3600;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
    #[serde(alias = "postgres")]
    PostgreSQL,
    #[serde(alias = "mariadb")]
    MySQL,
    Redis,
}

impl DatabaseKind {
    pub const ALL: [DatabaseKind; 3] = [DatabaseKind::PostgreSQL, DatabaseKind::MySQL, DatabaseKind::Redis];

    pub fn tag(&self) -> &'static str {
        match self {
            DatabaseKind::PostgreSQL => "postgresql",
            DatabaseKind::MySQL => "mysql",
            DatabaseKind::Redis => "redis",
        }
    }
}

impl std::fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseKind::PostgreSQL => write!(f, "PostgreSQL"),
            DatabaseKind::MySQL => write!(f, "MySQL"),
            DatabaseKind::Redis => write!(f, "Redis"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseSource {
    #[serde(rename = "type")]
    pub kind: DatabaseKind,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub version: String,
}

impl DatabaseSource {
    pub fn new(kind: DatabaseKind) -> Self {
        Self {
            kind,
            path: String::new(),
            version: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubDatabaseFailure {
    #[default]
    AbortSource,
    Isolate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    #[serde(default)]
    pub repository: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_schedule")]
    pub schedule: String,
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub databases: Vec<DatabaseSource>,
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
    #[serde(default)]
    pub sub_database_failure: SubDatabaseFailure,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staging_dir: Option<PathBuf>,
}

fn default_schedule() -> String {
    "24h".to_string()
}

fn default_command_timeout() -> u64 {
    DEFAULT_COMMAND_TIMEOUT_SECS
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            repository: String::new(),
            password: String::new(),
            schedule: default_schedule(),
            paths: Vec::new(),
            databases: Vec::new(),
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            sub_database_failure: SubDatabaseFailure::default(),
            staging_dir: None,
        }
    }
}

impl BackupConfig {
    pub fn command_timeout(&self) -> Duration {
        if self.command_timeout_secs == 0 {
            Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS)
        } else {
            Duration::from_secs(self.command_timeout_secs)
        }
    }

    pub fn staging_root(&self) -> PathBuf {
        self.staging_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub fn schedule_interval(&self) -> Duration {
        parse_duration(&self.schedule).unwrap_or(DEFAULT_SCHEDULE)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: crate::log::DEFAULT_LEVEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub backup: BackupConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Parses durations such as `24h`, `1h30m`, `45s` or `500ms`.
/// Zero-length and malformed inputs yield `None`.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let mut total = Duration::ZERO;
    let mut rest = input;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits == 0 {
            return None;
        }
        let value: u64 = rest[..digits].parse().ok()?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let part = match &rest[..unit_len] {
            "h" => Duration::from_secs(value.checked_mul(3600)?),
            "m" => Duration::from_secs(value.checked_mul(60)?),
            "s" => Duration::from_secs(value),
            "ms" => Duration::from_millis(value),
            _ => return None,
        };
        total = total.checked_add(part)?;
        rest = &rest[unit_len..];
    }

    if total.is_zero() {
        None
    } else {
        Some(total)
    }
}
