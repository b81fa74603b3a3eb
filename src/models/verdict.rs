use serde::{Deserialize, Serialize};

use super::Event;

/// Sentinel used whenever a kill-chain label is not known.
pub const UNCLASSIFIED: &str = "Unknown";

/// Closed vocabulary of recommended or automatic responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Monitor,
    BlockIp,
    QuarantineEmail,
    IsolateHost,
    ManualReview,
}

impl Action {
    /// Map a free-form label (as returned by an inference backend) onto the
    /// closed vocabulary. Unrecognized labels fold to manual review rather
    /// than failing the verdict.
    pub fn from_label(label: &str) -> Action {
        let normalized = label.trim().to_lowercase();
        match normalized.as_str() {
            "monitor" | "ignore" | "none" => Action::Monitor,
            "block_ip" | "block ip" | "block" => Action::BlockIp,
            "quarantine_email" | "quarantine email" | "quarantine" => Action::QuarantineEmail,
            "isolate_host" | "isolate host" | "isolate" => Action::IsolateHost,
            "manual_review" | "manual review" | "investigate" | "identify user" => {
                Action::ManualReview
            }
            _ => Action::ManualReview,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Action::Monitor => "Monitor",
            Action::BlockIp => "Block IP",
            Action::QuarantineEmail => "Quarantine Email",
            Action::IsolateHost => "Isolate Host",
            Action::ManualReview => "Manual Review",
        };
        write!(f, "{}", label)
    }
}

/// A single scoring stage's risk assessment for one event. The pipeline
/// picks exactly one verdict per event by stage priority; verdicts from
/// different stages are never merged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    /// Calibrated risk, 0-100
    pub risk_score: u8,
    /// Short human-readable rationale
    pub rationale: String,
    pub action: Action,
    /// Kill-chain tactic, `"Unknown"` when unclassified
    pub tactic: String,
    /// Kill-chain technique, `"Unknown"` when unclassified
    pub technique: String,
}

impl Verdict {
    pub fn new(risk_score: u8, rationale: &str, action: Action) -> Self {
        Verdict {
            risk_score: risk_score.min(100),
            rationale: rationale.to_string(),
            action,
            tactic: UNCLASSIFIED.to_string(),
            technique: UNCLASSIFIED.to_string(),
        }
    }

    pub fn with_classification(mut self, tactic: &str, technique: &str) -> Self {
        self.tactic = tactic.to_string();
        self.technique = technique.to_string();
        self
    }

    /// Routine telemetry verdict produced when the lexical pre-filter
    /// finds nothing suspicious.
    pub fn routine() -> Self {
        Verdict::new(0, "Routine telemetry", Action::Monitor)
    }
}

/// Geographic enrichment attached to an alert. Best-effort; the unknown
/// sentinel is used whenever the lookup fails or is disabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoMetadata {
    pub country: String,
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
    pub region_code: String,
}

impl GeoMetadata {
    pub fn unknown() -> Self {
        GeoMetadata {
            country: "Unknown".to_string(),
            city: "Unknown".to_string(),
            latitude: 0.0,
            longitude: 0.0,
            region_code: String::new(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.country == "Unknown" && self.city == "Unknown"
    }
}

impl Default for GeoMetadata {
    fn default() -> Self {
        Self::unknown()
    }
}

/// An event paired with its final verdict and enrichment. Immutable once
/// constructed; persistence and reporting never mutate it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub event: Event,
    pub verdict: Verdict,
    /// Entity identifier the verdict applies to, when extractable
    pub entity: Option<String>,
    #[serde(default)]
    pub location: GeoMetadata,
}
