//! Winner selection over per-provider slots.
//!
//! Pure policy, no I/O: given the latest fix per provider (indexed by
//! registration order) and the current instant, pick the best valid fix
//! and the next moment the decision could change on its own.

use std::time::Instant;

use crate::fix::Fix;

/// Selects the best valid fix among the slots as of `now`.
///
/// Expired fixes never win. Among valid ones the ranking is highest
/// confidence, then most recent timestamp, then lowest slot index
/// (provider registration order), so the outcome is deterministic.
pub fn select_winner(slots: &[Option<Fix>], now: Instant) -> Option<&Fix> {
    let mut winner: Option<&Fix> = None;
    for candidate in slots.iter().flatten() {
        if !candidate.is_valid_at(now) {
            continue;
        }
        match winner {
            None => winner = Some(candidate),
            Some(current) => {
                // Strict comparisons keep the earlier slot on full ties.
                if candidate.confidence > current.confidence
                    || (candidate.confidence == current.confidence && candidate.at > current.at)
                {
                    winner = Some(candidate);
                }
            }
        }
    }
    winner
}

/// Earliest upcoming expiry among the valid slots as of `now`.
///
/// Returns `None` when no slot holds a valid fix; the returned instant is
/// always strictly in the future.
pub fn next_expiry(slots: &[Option<Fix>], now: Instant) -> Option<Instant> {
    slots
        .iter()
        .flatten()
        .filter(|fix| fix.is_valid_at(now))
        .map(Fix::expires_at)
        .min()
}

// =============================================================================
// Tests
// =============================================================================
