mod backup;
mod cli;
mod config;
mod database;
mod error;
mod log;
mod process;
mod repository;
mod system;

use clap::Parser;
use cli::Cli;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(config::config_path);
    let app_config = match config::load_from(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    log::init(&app_config.logging.level);

    info!("Yorokobi backup agent starting...");
    if config_path.exists() {
        info!("Loaded configuration from {:?}", config_path);
    } else {
        info!("No config file at {:?}, using defaults", config_path);
    }

    let ctrl_c_count = Arc::new(AtomicUsize::new(0));
    let ctrl_c_count_clone = ctrl_c_count.clone();

    ctrlc::set_handler(move || {
        let count = ctrl_c_count_clone.fetch_add(1, Ordering::SeqCst);

        if count == 0 {
            println!("\n\nShutdown signal received. Press Ctrl+C again to force exit...");
        } else {
            println!("\nForce exiting...");
            std::process::exit(130);
        }
    })
    .expect("Error setting Ctrl-C handler");

    match cli::run(cli.command, app_config, config_path, ctrl_c_count).await {
        Ok(_) => {
            info!("Exited normally");
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            if e.is_fatal() {
                eprintln!("Run 'yorokobi setup' to configure the repository.");
            }
            std::process::exit(1);
        }
    }
}
