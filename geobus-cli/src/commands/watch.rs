//! Watch command - run the geolocation fusion daemon.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tracing::info;

use geobus::bus::GeoBus;
use geobus::config::AppConfig;
use geobus::log::TracingLogger;
use geobus::logging::init_logging;
use geobus::orchestrator::Orchestrator;
use geobus::provider::FileProvider;

use crate::error::CliError;

/// Arguments for the watch command.
#[derive(Default)]
pub struct WatchArgs {
    pub key: Option<String>,
    pub file: Option<PathBuf>,
    pub poll_period: Option<u64>,
    pub log_dir: Option<PathBuf>,
}

/// Run the watch command.
pub fn run(args: WatchArgs) -> Result<(), CliError> {
    // Resolve settings: CLI > config file > defaults
    let mut config = AppConfig::load()?;
    if let Some(key) = args.key {
        config.key = key;
    }
    if let Some(file) = args.file {
        config.geolocation_path = file;
    }
    if let Some(secs) = args.poll_period {
        config.poll_period = Duration::from_secs(secs);
    }
    if let Some(dir) = args.log_dir {
        config.log_dir = Some(dir);
    }

    let _logging = init_logging(config.log_dir.as_deref()).map_err(CliError::Logging)?;

    // Print banner
    println!("GeoBus Fusion Daemon v{}", geobus::VERSION);
    println!("========================");
    println!();
    println!("Key:         {}", config.key);
    println!("Source file: {}", config.geolocation_path.display());
    println!("Poll period: {}s", config.poll_period.as_secs());
    println!("Fix TTL:     {}s", config.ttl.as_secs());
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    // Set up signal handler for graceful shutdown
    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();

    ctrlc::set_handler(move || {
        println!();
        println!("Received shutdown signal, stopping...");
        signal_token.cancel();
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    let runtime = Runtime::new().map_err(CliError::Runtime)?;
    runtime.block_on(watch_loop(config, shutdown));

    println!();
    println!("Tracking stopped.");
    Ok(())
}

/// Wire the pipeline together and relay published winners until the
/// shutdown token fires.
async fn watch_loop(config: AppConfig, shutdown: CancellationToken) {
    let bus = Arc::new(GeoBus::new(Arc::new(TracingLogger::new())));
    let provider = Arc::new(FileProvider::with_config(config.provider_config()));
    let orchestrator = Orchestrator::new(Arc::clone(&bus), vec![provider]);

    let (mut updates, subscription) = bus.subscribe(&config.key, config.buffer_size);
    let tracker = orchestrator.track(shutdown.clone(), &config.key);

    info!(key = %config.key, "tracking started");

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                info!(key = %config.key, "shutting down tracking");
                break;
            }
            Some(fix) = updates.recv() => {
                info!(
                    lat = fix.lat,
                    lon = fix.lon,
                    accuracy_m = fix.accuracy_meters,
                    confidence = fix.confidence,
                    source = %fix.source,
                    "location updated"
                );
            }
        }
    }

    // Teardown order: subscriber first, then the tracker.
    subscription.unsubscribe();
    let _ = tracker.await;
}
