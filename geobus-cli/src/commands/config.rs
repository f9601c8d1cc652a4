//! Config command - inspect the resolved configuration.
//!
//! Prints the settings the daemon would run with after merging the
//! configuration file over the built-in defaults.

use geobus::config::{config_file_path, AppConfig};

use crate::error::CliError;

/// Arguments for the config command.
#[derive(Default)]
pub struct ConfigArgs {
    /// Print only the configuration file path.
    pub path: bool,
}

/// Run the config command.
pub fn run(args: ConfigArgs) -> Result<(), CliError> {
    let file_path = config_file_path();

    if args.path {
        println!("{}", file_path.display());
        return Ok(());
    }

    let config = AppConfig::load()?;

    println!("Configuration Settings");
    println!("======================");
    println!();
    println!("[tracking]");
    println!("  key = {}", config.key);
    println!("  buffer_size = {}", config.buffer_size);
    println!();
    println!("[geolocation]");
    println!("  file = {}", config.geolocation_path.display());
    println!("  poll_period = {}", config.poll_period.as_secs());
    println!("  ttl = {}", config.ttl.as_secs());
    println!();
    println!("[log]");
    match config.log_dir {
        Some(ref dir) => println!("  directory = {}", dir.display()),
        None => println!("  directory = (not set)"),
    }
    println!();

    if file_path.exists() {
        println!("Config file: {}", file_path.display());
    } else {
        println!("Config file: {} (not found, using defaults)", file_path.display());
    }

    Ok(())
}
