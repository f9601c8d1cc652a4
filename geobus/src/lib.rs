//! GeoBus - Geolocation fusion bus
//!
//! This library ingests position observations from multiple independent,
//! asynchronous sources and produces a single best-estimate location stream
//! per subject key. Sources disagree, arrive at different rates, and go
//! stale; the bus fuses them into one trustworthy signal without blocking
//! producers or consumers on one another.
//!
//! # High-Level API
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use geobus::bus::GeoBus;
//! use geobus::log::TracingLogger;
//! use geobus::orchestrator::Orchestrator;
//! use geobus::provider::FileProvider;
//! use tokio_util::sync::CancellationToken;
//!
//! let bus = Arc::new(GeoBus::new(Arc::new(TracingLogger::new())));
//! let orchestrator = Orchestrator::new(
//!     Arc::clone(&bus),
//!     vec![Arc::new(FileProvider::new())],
//! );
//!
//! let (mut updates, subscription) = bus.subscribe("desktop", 32);
//! let shutdown = CancellationToken::new();
//! let tracker = orchestrator.track(shutdown.clone(), "desktop");
//!
//! while let Some(fix) = updates.recv().await {
//!     println!("{fix}");
//! }
//!
//! subscription.unsubscribe();
//! shutdown.cancel();
//! tracker.await?;
//! ```

pub mod bus;
pub mod config;
pub mod fix;
pub mod log;
pub mod logging;
pub mod orchestrator;
pub mod provider;

/// Version of the GeoBus library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
