//! Behavioral correlation (UEBA)
//!
//! Tracks per-entity state across events to detect patterns like brute
//! force that no single log line reveals. Pure counting/windowing state
//! machine; holds no knowledge of reputation, inference output, or any
//! network service.

use std::collections::HashMap;

use crate::extract;
use crate::models::{Action, Event, Verdict};

/// Default sliding window in seconds
pub const DEFAULT_WINDOW_SECONDS: i64 = 60;
/// Default number of matching sub-events that constitutes a burst
pub const DEFAULT_THRESHOLD: usize = 5;

/// Sliding window of matching sub-event timestamps for one entity
#[derive(Debug, Clone, Default)]
struct EntityWindow {
    timestamps: Vec<i64>,
}

impl EntityWindow {
    /// Prune entries outside the window relative to `timestamp`, then
    /// append it. Pruning is lazy, on access only. The boundary is
    /// inclusive: a sub-event exactly `window_seconds` old still counts.
    fn add_and_prune(&mut self, timestamp: i64, window_seconds: i64) {
        let cutoff = timestamp - window_seconds;
        self.timestamps.retain(|&t| t >= cutoff);
        self.timestamps.push(timestamp);
    }

    fn count(&self) -> usize {
        self.timestamps.len()
    }

    fn clear(&mut self) {
        self.timestamps.clear();
    }
}

/// Detects threshold crossings of failed-authentication bursts per entity.
///
/// The entity window is cleared entirely when it crosses the threshold, so
/// a continuing burst must accumulate a full fresh burst before alerting
/// again. This mirrors the reference detection semantics and avoids one
/// alert per event once over threshold.
pub struct BehaviorCorrelator {
    windows: HashMap<String, EntityWindow>,
    window_seconds: i64,
    threshold: usize,
}

impl BehaviorCorrelator {
    pub fn new() -> Self {
        Self::with_config(DEFAULT_WINDOW_SECONDS, DEFAULT_THRESHOLD)
    }

    /// Operators tune sensitivity per environment, so both knobs are
    /// injected rather than hardcoded.
    pub fn with_config(window_seconds: i64, threshold: usize) -> Self {
        BehaviorCorrelator {
            windows: HashMap::new(),
            window_seconds,
            threshold: threshold.max(1),
        }
    }

    /// Feed one event through the correlator. Non-matching events are
    /// no-ops. Returns a decisive verdict when the entity crosses the
    /// configured threshold within the window.
    pub fn observe(&mut self, event: &Event) -> Option<Verdict> {
        if !Self::is_failed_auth(&event.content) {
            return None;
        }

        let entity = extract::first_ip(&event.content)?;

        let window = self.windows.entry(entity.clone()).or_default();

        // Retrograde timestamps beyond the window mean the entity state
        // can no longer be trusted; reset it and let the rule fallback
        // score this event.
        if event.timestamp < 0
            || window
                .timestamps
                .last()
                .map(|&last| event.timestamp < last - self.window_seconds)
                .unwrap_or(false)
        {
            log::error!(
                "correlator state reset for {}: timestamp {} violates window ordering",
                entity,
                event.timestamp
            );
            window.clear();
            return None;
        }

        window.add_and_prune(event.timestamp, self.window_seconds);

        if window.count() >= self.threshold {
            // Clear so the next crossing requires a fresh burst instead of
            // alerting on every subsequent failure.
            window.clear();
            let rationale = format!(
                "Behavioral: brute force detected ({}+ auth failures in {}s from {})",
                self.threshold, self.window_seconds, entity
            );
            return Some(
                Verdict::new(95, &rationale, Action::BlockIp)
                    .with_classification("Credential Access", "T1110 Brute Force"),
            );
        }

        None
    }

    /// Whether the content belongs to the tracked sub-event class.
    pub fn is_failed_auth(content: &str) -> bool {
        let lower = content.to_lowercase();
        lower.contains("failed password") || lower.contains("authentication failure")
    }

    /// Current window population for an entity (testing and introspection)
    pub fn pending_count(&self, entity: &str) -> usize {
        self.windows.get(entity).map(|w| w.count()).unwrap_or(0)
    }

    /// Drop all tracked state
    pub fn clear_all(&mut self) {
        self.windows.clear();
    }
}

impl Default for BehaviorCorrelator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventKind;

    fn failed_auth(ip: &str, timestamp: i64) -> Event {
        Event::new(
            "auth.log",
            &format!("Failed password for root from {} port 22", ip),
            timestamp,
            EventKind::GenericLog,
        )
        .unwrap()
    }

    #[test]
    fn test_burst_emits_exactly_one_verdict() {
        let mut correlator = BehaviorCorrelator::with_config(60, 5);

        for i in 0..4 {
            assert!(correlator.observe(&failed_auth("10.0.0.5", 1700000000 + i)).is_none());
        }

        let verdict = correlator.observe(&failed_auth("10.0.0.5", 1700000004));
        let verdict = verdict.expect("5th failure within window should alert");
        assert_eq!(verdict.risk_score, 95);
        assert_eq!(verdict.action, Action::BlockIp);
        assert_eq!(verdict.tactic, "Credential Access");

        // State was cleared; the burst must rebuild from zero
        assert_eq!(correlator.pending_count("10.0.0.5"), 0);
        assert!(correlator.observe(&failed_auth("10.0.0.5", 1700000005)).is_none());
    }

    #[test]
    fn test_fresh_burst_after_reset_alerts_again() {
        let mut correlator = BehaviorCorrelator::with_config(60, 5);

        for i in 0..5 {
            correlator.observe(&failed_auth("10.0.0.5", 1700000000 + i));
        }
        for i in 0..4 {
            assert!(correlator.observe(&failed_auth("10.0.0.5", 1700000010 + i)).is_none());
        }
        assert!(correlator.observe(&failed_auth("10.0.0.5", 1700000014)).is_some());
    }

    #[test]
    fn test_below_threshold_never_alerts() {
        let mut correlator = BehaviorCorrelator::with_config(60, 5);

        for i in 0..4 {
            assert!(correlator.observe(&failed_auth("10.0.0.5", 1700000000 + i)).is_none());
        }
        assert_eq!(correlator.pending_count("10.0.0.5"), 4);
    }

    #[test]
    fn test_window_aging_prunes_old_events() {
        let mut correlator = BehaviorCorrelator::with_config(60, 5);

        for i in 0..4 {
            correlator.observe(&failed_auth("10.0.0.5", 1700000000 + i));
        }

        // 90 seconds later the earlier failures have aged out
        assert!(correlator.observe(&failed_auth("10.0.0.5", 1700000090)).is_none());
        assert_eq!(correlator.pending_count("10.0.0.5"), 1);
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let mut correlator = BehaviorCorrelator::with_config(60, 5);

        correlator.observe(&failed_auth("10.0.0.5", 1700000000));
        for ts in [1700000030, 1700000040, 1700000050] {
            assert!(correlator.observe(&failed_auth("10.0.0.5", ts)).is_none());
        }

        // The first failure is exactly 60s old here and must still count
        let verdict = correlator.observe(&failed_auth("10.0.0.5", 1700000060));
        assert!(verdict.is_some(), "failure aged exactly window_seconds is in the window");
    }

    #[test]
    fn test_entities_tracked_independently() {
        let mut correlator = BehaviorCorrelator::with_config(60, 3);

        correlator.observe(&failed_auth("10.0.0.5", 1700000000));
        correlator.observe(&failed_auth("10.0.0.5", 1700000001));
        correlator.observe(&failed_auth("172.16.0.9", 1700000002));

        assert_eq!(correlator.pending_count("10.0.0.5"), 2);
        assert_eq!(correlator.pending_count("172.16.0.9"), 1);
    }

    #[test]
    fn test_non_matching_content_is_noop() {
        let mut correlator = BehaviorCorrelator::new();
        let event = Event::new(
            "web.log",
            "Accepted publickey for alice from 10.0.0.5",
            1700000000,
            EventKind::GenericLog,
        )
        .unwrap();

        assert!(correlator.observe(&event).is_none());
        assert_eq!(correlator.pending_count("10.0.0.5"), 0);
    }

    #[test]
    fn test_no_ip_is_noop() {
        let mut correlator = BehaviorCorrelator::new();
        let event = Event::new(
            "auth.log",
            "authentication failure for user admin",
            1700000000,
            EventKind::GenericLog,
        )
        .unwrap();

        assert!(correlator.observe(&event).is_none());
    }

    #[test]
    fn test_corrupt_timestamp_resets_entity() {
        let mut correlator = BehaviorCorrelator::with_config(60, 5);

        for i in 0..3 {
            correlator.observe(&failed_auth("10.0.0.5", 1700000000 + i));
        }
        assert_eq!(correlator.pending_count("10.0.0.5"), 3);

        // A timestamp far behind the last one violates stream ordering
        assert!(correlator.observe(&failed_auth("10.0.0.5", 1699999000)).is_none());
        assert_eq!(correlator.pending_count("10.0.0.5"), 0);

        // Entity recovers with a fresh stream
        assert!(correlator.observe(&failed_auth("10.0.0.5", 1700000100)).is_none());
        assert_eq!(correlator.pending_count("10.0.0.5"), 1);
    }

    #[test]
    fn test_negative_timestamp_rejected() {
        let mut correlator = BehaviorCorrelator::with_config(60, 2);
        assert!(correlator.observe(&failed_auth("10.0.0.5", -5)).is_none());
        assert_eq!(correlator.pending_count("10.0.0.5"), 0);
    }
}
