//! Per-key fusion engine driving all bound providers.
//!
//! For every tracked key the orchestrator runs one collection task per
//! provider plus a single evaluation task that owns the key's tracking
//! state: the latest fix per provider and the last published winner. The
//! evaluator re-evaluates after every arrival and at the earliest upcoming
//! TTL expiry, so a winner whose validity lapses with no replacement is
//! retired without any new input.
//!
//! Winner changes are published on the [`GeoBus`]; a winner equal by value
//! to the last published one is suppressed. When no slot holds a valid
//! fix, nothing is published and the absence of updates is the signal.

mod fusion;

pub use fusion::{next_expiry, select_winner};

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::bus::GeoBus;
use crate::fix::Fix;
use crate::log::Logger;
use crate::provider::Provider;
use crate::{log_debug, log_warn};

/// Per-key fusion engine over a fixed provider set.
///
/// Constructed once per application from the bus it publishes to.
/// Registration order of the providers is the final fusion tie-break, and
/// provider names must be unique within the set.
pub struct Orchestrator {
    bus: Arc<GeoBus>,
    providers: Vec<Arc<dyn Provider>>,
    logger: Arc<dyn Logger>,
}

impl Orchestrator {
    /// Binds a fixed provider set to `bus`.
    pub fn new(bus: Arc<GeoBus>, providers: Vec<Arc<dyn Provider>>) -> Self {
        let logger = bus.logger_handle();

        let mut seen = HashSet::new();
        for provider in &providers {
            if !seen.insert(provider.name().to_string()) {
                log_warn!(
                    logger,
                    "duplicate provider name {:?} in orchestrator set",
                    provider.name()
                );
            }
        }

        Self {
            bus,
            providers,
            logger,
        }
    }

    /// Names of the bound providers, in registration order.
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Starts tracking `key` until `shutdown` fires.
    ///
    /// Spawns one collection task per provider and one evaluation task
    /// owning the key's tracking state; returns the evaluator's handle.
    /// Fused winners are published on the bus under `key`. Cancellation
    /// tears down every task and discards the tracking state.
    pub fn track(&self, shutdown: CancellationToken, key: &str) -> JoinHandle<()> {
        log_debug!(
            self.logger,
            "tracking {} with {} providers",
            key,
            self.providers.len()
        );

        let (arrival_tx, arrival_rx) = mpsc::channel(self.providers.len().max(1));

        for (slot, provider) in self.providers.iter().enumerate() {
            let stream = provider.lookup_stream(shutdown.clone(), key);
            tokio::spawn(pump(slot, stream, arrival_tx.clone()));
        }
        drop(arrival_tx);

        let evaluator = Evaluator {
            key: key.to_string(),
            bus: Arc::clone(&self.bus),
            logger: Arc::clone(&self.logger),
            slots: vec![None; self.providers.len()],
            last_published: None,
        };
        tokio::spawn(evaluator.run(shutdown, arrival_rx))
    }
}

/// One fix arriving from a provider's collection task.
struct Arrival {
    slot: usize,
    fix: Fix,
}

/// Forwards one provider stream into the evaluator, preserving emission
/// order. Ends when the stream closes or the evaluator goes away.
async fn pump(slot: usize, mut stream: mpsc::Receiver<Fix>, tx: mpsc::Sender<Arrival>) {
    while let Some(fix) = stream.recv().await {
        if tx.send(Arrival { slot, fix }).await.is_err() {
            break;
        }
    }
}

/// Owns one key's tracking state. No locking: only this task touches it.
struct Evaluator {
    key: String,
    bus: Arc<GeoBus>,
    logger: Arc<dyn Logger>,
    slots: Vec<Option<Fix>>,
    last_published: Option<Fix>,
}

impl Evaluator {
    async fn run(mut self, shutdown: CancellationToken, mut arrivals: mpsc::Receiver<Arrival>) {
        log_debug!(self.logger, "evaluator for {} starting", self.key);

        let mut arrivals_open = true;
        loop {
            let deadline = next_expiry(&self.slots, Instant::now());

            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,

                arrival = arrivals.recv(), if arrivals_open => {
                    match arrival {
                        Some(Arrival { slot, fix }) => {
                            if let Err(err) = fix.validate() {
                                log_warn!(
                                    self.logger,
                                    "{} discarding invalid fix from {}: {}",
                                    self.key,
                                    fix.source,
                                    err
                                );
                                continue;
                            }
                            log_debug!(
                                self.logger,
                                "{} slot {} updated by {}",
                                self.key,
                                slot,
                                fix.source
                            );
                            self.slots[slot] = Some(fix);
                            self.evaluate(Instant::now());
                        }
                        None => {
                            // Every collection task has ended; expiry
                            // transitions can still retire or switch the
                            // winner until shutdown.
                            arrivals_open = false;
                        }
                    }
                }

                _ = sleep_until_expiry(deadline) => {
                    self.evaluate(Instant::now());
                }
            }
        }

        log_debug!(self.logger, "evaluator for {} stopped", self.key);
    }

    /// Re-runs winner selection and publishes the result if it differs by
    /// value from the last published one.
    fn evaluate(&mut self, now: Instant) {
        if let Some(winner) = select_winner(&self.slots, now) {
            if self.last_published.as_ref() != Some(winner) {
                let fix = winner.clone();
                log_debug!(self.logger, "new winner for {}: {}", self.key, fix);
                self.bus.publish(&self.key, fix.clone());
                self.last_published = Some(fix);
            }
        }
        // No valid candidate: stay silent. The last published value is kept
        // so a bit-identical revival is still suppressed.
    }
}

/// Sleeps until the given expiry, or forever when there is none.
async fn sleep_until_expiry(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at.into()).await,
        None => std::future::pending().await,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use crate::log::NoOpLogger;

    /// One scripted emission: wait `delay`, then emit a fix built at
    /// emission time with the given shape.
    #[derive(Clone)]
    struct Step {
        delay: Duration,
        lat: f64,
        confidence: f64,
        ttl: Duration,
    }

    /// Provider that plays back a fixed script, then stays open until
    /// cancelled like a real source would.
    struct ScriptedProvider {
        name: String,
        script: Vec<Step>,
    }

    impl ScriptedProvider {
        fn new(name: &str, script: Vec<Step>) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                script,
            })
        }
    }

    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            &self.name
        }

        fn lookup_stream(&self, shutdown: CancellationToken, key: &str) -> mpsc::Receiver<Fix> {
            let (tx, rx) = mpsc::channel(4);
            let script = self.script.clone();
            let source = self.name.clone();
            let key = key.to_string();

            tokio::spawn(async move {
                for step in script {
                    tokio::select! {
                        _ = shutdown.cancelled() => return,
                        _ = tokio::time::sleep(step.delay) => {}
                    }
                    let fix = Fix {
                        key: key.clone(),
                        lat: step.lat,
                        lon: 13.405,
                        accuracy_meters: 10.0,
                        confidence: step.confidence,
                        source: source.clone(),
                        at: Instant::now(),
                        ttl: step.ttl,
                    };
                    if tx.send(fix).await.is_err() {
                        return;
                    }
                }
                shutdown.cancelled().await;
            });
            rx
        }
    }

    const LONG_TTL: Duration = Duration::from_secs(60);
    const RECV_TIMEOUT: Duration = Duration::from_millis(2000);
    const SILENCE_WINDOW: Duration = Duration::from_millis(150);

    fn step(delay_ms: u64, lat: f64, confidence: f64, ttl: Duration) -> Step {
        Step {
            delay: Duration::from_millis(delay_ms),
            lat,
            confidence,
            ttl,
        }
    }

    fn test_bus() -> Arc<GeoBus> {
        Arc::new(GeoBus::new(Arc::new(NoOpLogger::new())))
    }

    async fn expect_publish(rx: &mut mpsc::Receiver<Fix>) -> Fix {
        match tokio::time::timeout(RECV_TIMEOUT, rx.recv()).await {
            Ok(Some(fix)) => fix,
            Ok(None) => panic!("subscription closed unexpectedly"),
            Err(_) => panic!("timed out waiting for a published winner"),
        }
    }

    async fn expect_silence(rx: &mut mpsc::Receiver<Fix>) {
        if let Ok(received) = tokio::time::timeout(SILENCE_WINDOW, rx.recv()).await {
            panic!("expected silence, got {received:?}");
        }
    }

    #[tokio::test]
    async fn single_provider_fix_reaches_subscriber() {
        let bus = test_bus();
        let provider = ScriptedProvider::new("gps", vec![step(5, 52.52, 1.0, LONG_TTL)]);
        let orchestrator = Orchestrator::new(Arc::clone(&bus), vec![provider]);

        let (mut rx, _sub) = bus.subscribe("desktop", 8);
        let shutdown = CancellationToken::new();
        let handle = orchestrator.track(shutdown.clone(), "desktop");

        let fix = expect_publish(&mut rx).await;
        assert_eq!(fix.lat, 52.52);
        assert_eq!(fix.source, "gps");
        assert_eq!(fix.key, "desktop");

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn higher_confidence_arrival_takes_over() {
        let bus = test_bus();
        let low = ScriptedProvider::new("low", vec![step(5, 1.0, 0.6, LONG_TTL)]);
        let high = ScriptedProvider::new("high", vec![step(40, 2.0, 0.9, LONG_TTL)]);
        let orchestrator = Orchestrator::new(Arc::clone(&bus), vec![low, high]);

        let (mut rx, _sub) = bus.subscribe("desktop", 8);
        let shutdown = CancellationToken::new();
        let handle = orchestrator.track(shutdown.clone(), "desktop");

        let first = expect_publish(&mut rx).await;
        assert_eq!(first.source, "low");

        let second = expect_publish(&mut rx).await;
        assert_eq!(second.source, "high");

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn losing_arrival_is_not_published() {
        let bus = test_bus();
        let high = ScriptedProvider::new("high", vec![step(5, 2.0, 0.9, LONG_TTL)]);
        let low = ScriptedProvider::new("low", vec![step(40, 1.0, 0.6, LONG_TTL)]);
        let orchestrator = Orchestrator::new(Arc::clone(&bus), vec![high, low]);

        let (mut rx, _sub) = bus.subscribe("desktop", 8);
        let shutdown = CancellationToken::new();
        let handle = orchestrator.track(shutdown.clone(), "desktop");

        let first = expect_publish(&mut rx).await;
        assert_eq!(first.source, "high");

        // The lower-confidence arrival loses; the winner is unchanged and
        // nothing new is published.
        expect_silence(&mut rx).await;

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn invalid_fix_is_discarded_not_fused() {
        let bus = test_bus();
        // Confidence 2.0 fails validation at ingest; the follow-up is fine.
        let provider = ScriptedProvider::new(
            "busted",
            vec![step(5, 1.0, 2.0, LONG_TTL), step(30, 2.0, 1.0, LONG_TTL)],
        );
        let orchestrator = Orchestrator::new(Arc::clone(&bus), vec![provider]);

        let (mut rx, _sub) = bus.subscribe("desktop", 8);
        let shutdown = CancellationToken::new();
        let handle = orchestrator.track(shutdown.clone(), "desktop");

        let fix = expect_publish(&mut rx).await;
        assert_eq!(fix.lat, 2.0);

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn winner_switches_back_when_leader_expires() {
        let bus = test_bus();
        let steady = ScriptedProvider::new("steady", vec![step(5, 1.0, 0.6, LONG_TTL)]);
        let burst = ScriptedProvider::new(
            "burst",
            vec![step(40, 2.0, 0.9, Duration::from_millis(200))],
        );
        let orchestrator = Orchestrator::new(Arc::clone(&bus), vec![steady, burst]);

        let (mut rx, _sub) = bus.subscribe("desktop", 8);
        let shutdown = CancellationToken::new();
        let handle = orchestrator.track(shutdown.clone(), "desktop");

        let first = expect_publish(&mut rx).await;
        assert_eq!(first.source, "steady");

        let second = expect_publish(&mut rx).await;
        assert_eq!(second.source, "burst");

        // No new input: the burst fix expires and the steady one, still
        // valid, is re-published with its original value.
        let third = expect_publish(&mut rx).await;
        assert_eq!(third.source, "steady");
        assert_eq!(third.lat, first.lat);
        assert_eq!(third.at, first.at);

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn expiry_with_no_replacement_goes_silent() {
        let bus = test_bus();
        let provider = ScriptedProvider::new(
            "flaky",
            vec![
                step(5, 1.0, 1.0, Duration::from_millis(100)),
                step(400, 1.0, 1.0, Duration::from_millis(100)),
            ],
        );
        let orchestrator = Orchestrator::new(Arc::clone(&bus), vec![provider]);

        let (mut rx, _sub) = bus.subscribe("desktop", 8);
        let shutdown = CancellationToken::new();
        let handle = orchestrator.track(shutdown.clone(), "desktop");

        let first = expect_publish(&mut rx).await;

        // TTL lapses with nothing to replace it: no publish at all.
        expect_silence(&mut rx).await;

        // A fresh arrival ends the silence, even with the same coordinates.
        let revived = expect_publish(&mut rx).await;
        assert_eq!(revived.lat, first.lat);
        assert!(revived.at > first.at);

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn cancellation_stops_all_tracking_tasks() {
        let bus = test_bus();
        let provider = ScriptedProvider::new("gps", vec![step(5, 52.52, 1.0, LONG_TTL)]);
        let orchestrator = Orchestrator::new(Arc::clone(&bus), vec![provider]);

        let (mut rx, _sub) = bus.subscribe("desktop", 8);
        let shutdown = CancellationToken::new();
        let handle = orchestrator.track(shutdown.clone(), "desktop");

        let _ = expect_publish(&mut rx).await;
        shutdown.cancel();

        match tokio::time::timeout(RECV_TIMEOUT, handle).await {
            Ok(joined) => joined.unwrap(),
            Err(_) => panic!("evaluator did not stop after cancellation"),
        }
    }

    #[tokio::test]
    async fn empty_provider_set_idles_until_cancelled() {
        let bus = test_bus();
        let orchestrator = Orchestrator::new(Arc::clone(&bus), Vec::new());

        let (mut rx, _sub) = bus.subscribe("desktop", 8);
        let shutdown = CancellationToken::new();
        let handle = orchestrator.track(shutdown.clone(), "desktop");

        expect_silence(&mut rx).await;

        shutdown.cancel();
        match tokio::time::timeout(RECV_TIMEOUT, handle).await {
            Ok(joined) => joined.unwrap(),
            Err(_) => panic!("evaluator did not stop after cancellation"),
        }
    }

    #[tokio::test]
    async fn provider_names_follow_registration_order() {
        let bus = test_bus();
        let a = ScriptedProvider::new("alpha", Vec::new());
        let b = ScriptedProvider::new("beta", Vec::new());
        let orchestrator = Orchestrator::new(bus, vec![a, b]);

        assert_eq!(orchestrator.provider_names(), vec!["alpha", "beta"]);
    }
}
