//! Pub/sub distribution layer for fused geolocation updates.
//!
//! A [`GeoBus`] fans published fixes out to every subscriber of a subject
//! key, decoupling the fusion cadence from each consumer's read cadence.
//! Delivery never blocks: a subscriber whose buffer is full loses that one
//! update (logged with subscriber and key identity) while everyone else
//! still receives it.
//!
//! The subscriber registry is the only structure in the crate touched by
//! more than one actor. It sits behind a single mutex with short critical
//! sections; the actual channel sends happen on a snapshot taken under the
//! lock, never while holding it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::fix::Fix;
use crate::log::Logger;
use crate::{log_debug, log_warn};

/// One registered subscriber channel for a key.
#[derive(Clone)]
struct Subscriber {
    id: u64,
    sender: mpsc::Sender<Fix>,
}

/// Registry shared between the bus and its subscription guards.
struct Registry {
    logger: Arc<dyn Logger>,
    topics: Mutex<HashMap<String, Vec<Subscriber>>>,
}

impl Registry {
    fn remove(&self, key: &str, id: u64) {
        let mut topics = self.topics.lock();
        if let Some(subscribers) = topics.get_mut(key) {
            subscribers.retain(|s| s.id != id);
            if subscribers.is_empty() {
                topics.remove(key);
            }
        }
    }

    fn remove_many(&self, key: &str, ids: &[u64]) {
        let mut topics = self.topics.lock();
        if let Some(subscribers) = topics.get_mut(key) {
            subscribers.retain(|s| !ids.contains(&s.id));
            if subscribers.is_empty() {
                topics.remove(key);
            }
        }
    }
}

/// Pub/sub hub keyed by subject.
///
/// Constructed once by the application and shared (behind an [`Arc`]) with
/// the orchestrator and any consumers.
pub struct GeoBus {
    registry: Arc<Registry>,
    next_id: AtomicU64,
}

impl GeoBus {
    /// Creates an empty bus bound to a diagnostic sink.
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self {
            registry: Arc::new(Registry {
                logger,
                topics: Mutex::new(HashMap::new()),
            }),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a buffered channel for `key`.
    ///
    /// Returns the receiving end and a [`Subscription`] guard that removes
    /// the channel from the registry when unsubscribed or dropped. Each
    /// subscriber receives its own fan-out copy of every publish. A
    /// `buffer_size` of zero is clamped to one.
    pub fn subscribe(&self, key: &str, buffer_size: usize) -> (mpsc::Receiver<Fix>, Subscription) {
        let (tx, rx) = mpsc::channel(buffer_size.max(1));
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        {
            let mut topics = self.registry.topics.lock();
            topics
                .entry(key.to_string())
                .or_default()
                .push(Subscriber { id, sender: tx });
        }

        log_debug!(
            self.registry.logger,
            "subscriber {} registered on {}",
            id,
            key
        );

        let subscription = Subscription {
            registry: Arc::clone(&self.registry),
            key: key.to_string(),
            id,
            active: AtomicBool::new(true),
        };
        (rx, subscription)
    }

    /// Delivers `fix` to every current subscriber of `key`.
    ///
    /// Non-blocking: a full subscriber buffer drops the fix for that one
    /// subscriber and logs the drop. Subscribers whose receiver has gone
    /// away are pruned.
    pub fn publish(&self, key: &str, fix: Fix) {
        let targets: Vec<Subscriber> = {
            let topics = self.registry.topics.lock();
            match topics.get(key) {
                Some(subscribers) => subscribers.clone(),
                None => return,
            }
        };

        let mut closed: Vec<u64> = Vec::new();
        for subscriber in &targets {
            match subscriber.sender.try_send(fix.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    log_warn!(
                        self.registry.logger,
                        "subscriber {} on {} saturated, dropping update",
                        subscriber.id,
                        key
                    );
                }
                Err(TrySendError::Closed(_)) => {
                    closed.push(subscriber.id);
                }
            }
        }

        if !closed.is_empty() {
            self.registry.remove_many(key, &closed);
        }
    }

    /// Shared handle to the bus's diagnostic sink.
    ///
    /// The orchestrator logs through the same sink the bus was built with.
    pub(crate) fn logger_handle(&self) -> Arc<dyn Logger> {
        Arc::clone(&self.registry.logger)
    }

    /// Number of current subscribers for `key`.
    pub fn subscriber_count(&self, key: &str) -> usize {
        self.registry
            .topics
            .lock()
            .get(key)
            .map_or(0, |subscribers| subscribers.len())
    }

    /// Number of keys with at least one subscriber.
    pub fn topic_count(&self) -> usize {
        self.registry.topics.lock().len()
    }
}

/// Guard for one bus subscription.
///
/// Unsubscribing removes the channel from the registry and closes it; the
/// receiver then drains whatever was already buffered and sees the end of
/// the stream. Safe to call any number of times and safe to race with an
/// in-flight publish. Dropping the guard unsubscribes as well.
pub struct Subscription {
    registry: Arc<Registry>,
    key: String,
    id: u64,
    active: AtomicBool,
}

impl Subscription {
    /// Removes this subscriber from the registry. Idempotent.
    pub fn unsubscribe(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            self.registry.remove(&self.key, self.id);
            log_debug!(
                self.registry.logger,
                "subscriber {} on {} unsubscribed",
                self.id,
                self.key
            );
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

// =============================================================================
// Tests
// =============================================================================
