mod commands;
mod wizard;

use crate::config::AppConfig;
use crate::error::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

/// yorokobi: periodic restic backups of databases and filesystem paths
#[derive(Parser, Debug)]
#[command(name = "yorokobi", version, about = "Back up databases and paths into a restic repository.", long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Config file (defaults to ~/.yorokobi/config.toml)
    #[arg(short = 'c', long = "config", global = true, value_name = "path")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Configure repository, databases, paths and schedule, then initialize the repository
    Setup,

    /// Run a one-time backup of every configured source
    Backup,

    /// Back up now and then on the configured schedule until interrupted
    #[command(alias = "daemon")]
    Start,

    /// List snapshots in the repository
    Snapshots,

    /// Restore a snapshot; prompts for anything not given
    Restore {
        /// Snapshot id as shown by `yorokobi snapshots`
        snapshot_id: Option<String>,
        /// Directory to restore into
        #[arg(short = 't', long = "target", value_name = "path")]
        target: Option<PathBuf>,
    },
}

pub async fn run(
    command: Commands,
    mut config: AppConfig,
    config_path: PathBuf,
    shutdown: Arc<AtomicUsize>,
) -> Result<()> {
    match command {
        Commands::Setup => commands::run_setup(&mut config, &config_path, shutdown).await,
        Commands::Backup => commands::run_backup(&config, shutdown).await,
        Commands::Start => commands::run_daemon(&config, shutdown).await,
        Commands::Snapshots => commands::list_snapshots(&config, shutdown).await,
        Commands::Restore { snapshot_id, target } => {
            commands::run_restore(&config, snapshot_id, target, shutdown).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daemon_alias() {
        let cli = Cli::try_parse_from(["yorokobi", "daemon"]).unwrap();
        assert!(matches!(cli.command, Commands::Start));
    }

    #[test]
    fn test_restore_arguments() {
        let cli = Cli::try_parse_from(["yorokobi", "restore", "4bba301e", "--target", "/srv/restore", "-c", "/etc/yorokobi.toml"])
            .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("/etc/yorokobi.toml")));
        match cli.command {
            Commands::Restore { snapshot_id, target } => {
                assert_eq!(snapshot_id.as_deref(), Some("4bba301e"));
                assert_eq!(target, Some(PathBuf::from("/srv/restore")));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_interactive_restore() {
        let cli = Cli::try_parse_from(["yorokobi", "restore"]).unwrap();
        assert!(matches!(cli.command, Commands::Restore { snapshot_id: None, target: None }));
    }
}
