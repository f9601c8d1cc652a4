//! GeoBus CLI - Command-line interface
//!
//! This binary runs the geolocation fusion daemon and provides
//! configuration inspection.

mod commands;
mod error;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use commands::config::ConfigArgs;
use commands::watch::WatchArgs;

#[derive(Parser)]
#[command(name = "geobus")]
#[command(about = "Multi-source geolocation fusion daemon", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the fusion daemon and log winner updates (default)
    Watch {
        /// Subject key to track
        #[arg(long)]
        key: Option<String>,

        /// Geolocation file to poll
        #[arg(long)]
        file: Option<PathBuf>,

        /// Polling period in seconds
        #[arg(long)]
        poll_period: Option<u64>,

        /// Directory to write the daemon log file into
        #[arg(long)]
        log_dir: Option<PathBuf>,
    },

    /// Show the resolved configuration
    Config {
        /// Print only the configuration file path
        #[arg(long)]
        path: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    // No subcommand runs the daemon with file/default settings.
    let result = match cli.command {
        Some(Commands::Watch {
            key,
            file,
            poll_period,
            log_dir,
        }) => commands::watch::run(WatchArgs {
            key,
            file,
            poll_period,
            log_dir,
        }),
        Some(Commands::Config { path }) => commands::config::run(ConfigArgs { path }),
        None => commands::watch::run(WatchArgs::default()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
