//! Automated containment
//!
//! Converts a high-confidence alert into at most one containment action
//! per entity. The trigger owns the per-entity response records; the
//! enforcement mechanism is delegated to pluggable responders. Responder
//! failures are isolated: one failing never blocks the other, and nothing
//! here crashes the pipeline.

pub mod firewall;
pub mod remote;

pub use firewall::FirewallResponder;
pub use remote::RemoteResponder;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::extract;
use crate::models::Alert;

/// Default risk score at or above which containment fires
pub const DEFAULT_BLOCK_THRESHOLD: u8 = 90;

#[derive(Error, Debug)]
pub enum ResponseError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("responder rejected action: {0}")]
    Rejected(String),
}

/// Per-responder result of one containment attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponderOutcome {
    Applied,
    DryRun,
    Failed(String),
}

/// Runtime responder selection: one enforcement strategy per entry,
/// chosen at startup from configuration.
pub enum Responder {
    Firewall(FirewallResponder),
    Remote(RemoteResponder),
}

impl Responder {
    pub fn name(&self) -> &'static str {
        match self {
            Responder::Firewall(_) => "firewall",
            Responder::Remote(_) => "remote",
        }
    }

    /// Apply (or simulate) containment for one entity. Errors are folded
    /// into the outcome so the caller can continue with other responders.
    pub async fn apply(&mut self, entity: &str, reason: &str) -> ResponderOutcome {
        let result = match self {
            Responder::Firewall(responder) => responder.apply(entity, reason).await,
            Responder::Remote(responder) => responder.apply(entity, reason).await,
        };
        match result {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("{} responder failed for {}: {}", self.name(), entity, e);
                ResponderOutcome::Failed(e.to_string())
            }
        }
    }
}

/// Tracks that containment was issued for an entity. Never removed
/// automatically; operator-driven unblock is out of scope, so a restart
/// re-arms containment for all entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub entity: String,
    pub reason: String,
    pub risk_score: u8,
    pub timestamp: i64,
    pub outcomes: Vec<(String, ResponderOutcome)>,
}

/// Converts qualifying alerts into at-most-once containment per entity.
pub struct ResponseTrigger {
    records: HashMap<String, ResponseRecord>,
    responders: Vec<Responder>,
    block_threshold: u8,
}

impl ResponseTrigger {
    pub fn new(responders: Vec<Responder>, block_threshold: u8) -> Self {
        ResponseTrigger {
            records: HashMap::new(),
            responders,
            block_threshold,
        }
    }

    /// Inspect an alert and, when it is at or above the block threshold
    /// and names a previously-unseen entity, run every responder in
    /// sequence. Returns the record created, or None when nothing fired.
    pub async fn handle_alert(&mut self, alert: &Alert) -> Option<&ResponseRecord> {
        if alert.verdict.risk_score < self.block_threshold {
            return None;
        }

        // Same extraction as the correlator, so both subsystems act on the
        // same entity for the same traffic
        let entity = alert
            .entity
            .clone()
            .or_else(|| extract::first_ip(&alert.event.content))?;

        if self.records.contains_key(&entity) {
            log::debug!("containment already issued for {}, skipping", entity);
            return None;
        }

        let reason = alert.verdict.rationale.clone();
        let mut outcomes = Vec::with_capacity(self.responders.len());
        for responder in &mut self.responders {
            let outcome = responder.apply(&entity, &reason).await;
            log::info!(
                "responder {} for {}: {:?}",
                responder.name(),
                entity,
                outcome
            );
            outcomes.push((responder.name().to_string(), outcome));
        }

        let record = ResponseRecord {
            entity: entity.clone(),
            reason,
            risk_score: alert.verdict.risk_score,
            timestamp: alert.event.timestamp,
            outcomes,
        };
        self.records.insert(entity.clone(), record);
        self.records.get(&entity)
    }

    pub fn has_responded(&self, entity: &str) -> bool {
        self.records.contains_key(entity)
    }

    pub fn record(&self, entity: &str) -> Option<&ResponseRecord> {
        self.records.get(entity)
    }

    pub fn response_count(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Action, Event, EventKind, GeoMetadata, Verdict};

    fn alert_for(entity: &str, risk_score: u8) -> Alert {
        let event = Event::new(
            "auth.log",
            &format!("Failed password for root from {} port 22", entity),
            1700000000,
            EventKind::GenericLog,
        )
        .unwrap();
        Alert {
            event,
            verdict: Verdict::new(risk_score, "Brute force detected", Action::BlockIp),
            entity: Some(entity.to_string()),
            location: GeoMetadata::unknown(),
        }
    }

    fn dry_run_trigger() -> ResponseTrigger {
        ResponseTrigger::new(
            vec![Responder::Firewall(FirewallResponder::new(true))],
            DEFAULT_BLOCK_THRESHOLD,
        )
    }

    #[tokio::test]
    async fn test_dry_run_records_and_marks_responded() {
        let mut trigger = dry_run_trigger();

        let record = trigger.handle_alert(&alert_for("1.2.3.4", 95)).await;
        let record = record.expect("threshold crossed, responder should fire");
        assert_eq!(record.entity, "1.2.3.4");
        assert_eq!(record.outcomes, vec![("firewall".to_string(), ResponderOutcome::DryRun)]);
        assert!(trigger.has_responded("1.2.3.4"));
    }

    #[tokio::test]
    async fn test_idempotent_per_entity() {
        let mut trigger = dry_run_trigger();

        assert!(trigger.handle_alert(&alert_for("1.2.3.4", 95)).await.is_some());
        // Same entity, different reason: no second invocation
        let mut second = alert_for("1.2.3.4", 99);
        second.verdict.rationale = "Deception trap triggered".to_string();
        assert!(trigger.handle_alert(&second).await.is_none());
        assert_eq!(trigger.response_count(), 1);

        let Responder::Firewall(fw) = &trigger.responders[0] else {
            panic!("expected firewall responder");
        };
        assert_eq!(fw.blocked_count(), 1, "exactly one responder invocation");
    }

    #[tokio::test]
    async fn test_below_threshold_never_fires() {
        let mut trigger = dry_run_trigger();
        assert!(trigger.handle_alert(&alert_for("1.2.3.4", 89)).await.is_none());
        assert!(!trigger.has_responded("1.2.3.4"));
    }

    #[tokio::test]
    async fn test_distinct_entities_each_contained() {
        let mut trigger = dry_run_trigger();
        assert!(trigger.handle_alert(&alert_for("1.2.3.4", 95)).await.is_some());
        assert!(trigger.handle_alert(&alert_for("5.6.7.8", 95)).await.is_some());
        assert_eq!(trigger.response_count(), 2);
    }

    #[tokio::test]
    async fn test_entity_extracted_from_content_when_absent() {
        let mut trigger = dry_run_trigger();
        let mut alert = alert_for("9.9.9.9", 95);
        alert.entity = None;
        let record = trigger.handle_alert(&alert).await.unwrap();
        assert_eq!(record.entity, "9.9.9.9");
    }

    #[tokio::test]
    async fn test_no_entity_no_action() {
        let mut trigger = dry_run_trigger();
        let event =
            Event::new("app.log", "honeypot decoy touched", 1700000000, EventKind::GenericLog)
                .unwrap();
        let alert = Alert {
            event,
            verdict: Verdict::new(100, "Deception trap triggered", Action::IsolateHost),
            entity: None,
            location: GeoMetadata::unknown(),
        };
        assert!(trigger.handle_alert(&alert).await.is_none());
    }

    #[tokio::test]
    async fn test_multiple_responders_all_run() {
        let mut trigger = ResponseTrigger::new(
            vec![
                Responder::Firewall(FirewallResponder::new(true)),
                Responder::Remote(RemoteResponder::dry_run("https://orchestrator.invalid")),
            ],
            90,
        );

        let record = trigger.handle_alert(&alert_for("1.2.3.4", 95)).await.unwrap();
        assert_eq!(record.outcomes.len(), 2);
        assert!(record
            .outcomes
            .iter()
            .all(|(_, outcome)| *outcome == ResponderOutcome::DryRun));
    }
}
