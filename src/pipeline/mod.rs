//! Escalation pipeline
//!
//! Maps one event to exactly one alert through an ordered stage sequence
//! with short-circuiting: reputation gate, lexical pre-filter, per-URL
//! email reputation, deep analysis, behavioral correlation, deterministic
//! rule fallback. The first stage to produce a decisive verdict wins;
//! every external call is time-bounded and its failure is non-decisive.

pub mod prefilter;
pub mod rules;

use std::time::Duration;

use crate::correlation::BehaviorCorrelator;
use crate::enrichment::GeoEnricher;
use crate::extract;
use crate::gates::deep_analysis::{build_prompt, parse_verdict_response};
use crate::gates::{IndicatorSource, InferenceClient};
use crate::models::{Action, Alert, Event, EventKind, GeoMetadata, Verdict};

/// Default deadline for a reputation lookup
pub const DEFAULT_REPUTATION_TIMEOUT: Duration = Duration::from_secs(5);
/// Default deadline for an inference call
pub const DEFAULT_INFERENCE_TIMEOUT: Duration = Duration::from_secs(30);

/// The escalation pipeline. Owns the behavioral correlator's state and the
/// optional gate clients; `analyze` takes `&mut self`, which serializes all
/// per-entity state mutation in the single-worker drain model.
pub struct Analyzer<R: IndicatorSource, I: InferenceClient> {
    reputation: Option<R>,
    reputation_timeout: Duration,
    inference: Option<I>,
    inference_timeout: Duration,
    correlator: BehaviorCorrelator,
    enricher: Option<GeoEnricher>,
}

impl<R: IndicatorSource, I: InferenceClient> Analyzer<R, I> {
    pub fn new(correlator: BehaviorCorrelator) -> Self {
        Analyzer {
            reputation: None,
            reputation_timeout: DEFAULT_REPUTATION_TIMEOUT,
            inference: None,
            inference_timeout: DEFAULT_INFERENCE_TIMEOUT,
            correlator,
            enricher: None,
        }
    }

    pub fn with_reputation(mut self, gate: R, timeout: Duration) -> Self {
        self.reputation = Some(gate);
        self.reputation_timeout = timeout;
        self
    }

    pub fn with_inference(mut self, backend: I, timeout: Duration) -> Self {
        self.inference = Some(backend);
        self.inference_timeout = timeout;
        self
    }

    pub fn with_enrichment(mut self, enricher: GeoEnricher) -> Self {
        self.enricher = Some(enricher);
        self
    }

    /// Score one event. Always returns an alert; no stage failure escapes.
    pub async fn analyze(&mut self, event: Event) -> Alert {
        let entity = extract::first_ip(&event.content);
        let verdict = self.score(&event).await;

        // Best-effort enrichment, skipped entirely when no identifier
        let location = match (&self.enricher, extract::first_ip_addr(&event.content)) {
            (Some(enricher), Some(ip)) => enricher.locate(&ip),
            _ => GeoMetadata::unknown(),
        };

        Alert {
            event,
            verdict,
            entity,
            location,
        }
    }

    async fn score(&mut self, event: &Event) -> Verdict {
        // Stage 1: reputation gate, only with an extractable identifier
        if let Some(verdict) = self.check_primary_indicator(event).await {
            return verdict;
        }

        // Stage 2: lexical pre-filter; routine telemetry stops here and
        // never reaches an expensive gate
        if !prefilter::is_suspicious(&event.content) {
            return Verdict::routine();
        }

        // Stage 3: email bodies get per-URL reputation checks before the
        // deep-analysis call
        if event.kind == EventKind::Email {
            if let Some(verdict) = self.check_email_urls(event).await {
                return verdict;
            }
        }

        // Stage 4: deep analysis
        if let Some(verdict) = self.deep_analysis(event).await {
            return verdict;
        }

        // Stage 5: behavioral correlation
        if let Some(verdict) = self.correlator.observe(event) {
            return verdict;
        }

        // Stage 6: deterministic rule fallback, always decisive
        rules::fallback_verdict(&event.content)
    }

    /// Decisive only when the gate reports malicious; every failure mode
    /// (timeout, transport, provider error) is swallowed as "unknown".
    async fn check_reputation(&self, indicator: &str) -> Option<crate::gates::ReputationReport> {
        let gate = self.reputation.as_ref()?;
        match tokio::time::timeout(self.reputation_timeout, gate.check_indicator(indicator)).await
        {
            Ok(Ok(report)) => Some(report),
            Ok(Err(e)) => {
                log::warn!("reputation gate failed for {}: {}", indicator, e);
                None
            }
            Err(_) => {
                log::warn!(
                    "reputation gate timed out for {} after {:?}",
                    indicator,
                    self.reputation_timeout
                );
                None
            }
        }
    }

    async fn check_primary_indicator(&self, event: &Event) -> Option<Verdict> {
        self.reputation.as_ref()?;

        let public_ip =
            extract::first_ip(&event.content).filter(|ip| extract::is_public_ip(ip));
        let indicator_is_url = public_ip.is_none();
        let indicator =
            public_ip.or_else(|| extract::urls(&event.content).into_iter().next())?;

        let report = self.check_reputation(&indicator).await?;
        if !report.malicious {
            return None;
        }

        // A malicious URL inside an email is a phishing lure; everything
        // else is treated as C2 infrastructure contact
        if event.kind == EventKind::Email {
            let verdict = Verdict::new(100, &report.summary, Action::QuarantineEmail);
            return Some(if indicator_is_url {
                verdict.with_classification("Initial Access", "T1566 Phishing")
            } else {
                verdict.with_classification(
                    "Command and Control",
                    "T1071 Application Layer Protocol",
                )
            });
        }

        Some(
            Verdict::new(100, &report.summary, Action::BlockIp).with_classification(
                "Command and Control",
                "T1071 Application Layer Protocol",
            ),
        )
    }

    async fn check_email_urls(&self, event: &Event) -> Option<Verdict> {
        self.reputation.as_ref()?;

        for url in extract::urls(event.body_text()) {
            if let Some(report) = self.check_reputation(&url).await {
                if report.malicious {
                    let rationale =
                        format!("Malicious URL in email body ({}): {}", url, report.summary);
                    return Some(
                        Verdict::new(100, &rationale, Action::QuarantineEmail)
                            .with_classification("Initial Access", "T1566 Phishing"),
                    );
                }
            }
        }
        None
    }

    async fn deep_analysis(&self, event: &Event) -> Option<Verdict> {
        let backend = self.inference.as_ref()?;
        let prompt = build_prompt(&event.content);

        let raw = match tokio::time::timeout(self.inference_timeout, backend.infer(&prompt)).await
        {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                log::warn!("deep analysis backend failed: {}", e);
                return None;
            }
            Err(_) => {
                log::warn!(
                    "deep analysis timed out after {:?}",
                    self.inference_timeout
                );
                return None;
            }
        };

        match parse_verdict_response(&raw) {
            Ok(verdict) => Some(verdict),
            Err(e) => {
                log::warn!("deep analysis response rejected: {}", e);
                None
            }
        }
    }
}
