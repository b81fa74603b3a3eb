pub mod config;
pub mod correlation;
pub mod enrichment;
pub mod extract;
pub mod gates;
pub mod models;
pub mod output;
pub mod persistence;
pub mod pipeline;
pub mod response;

// Re-export commonly used types
pub use config::Config;
pub use correlation::BehaviorCorrelator;
pub use enrichment::GeoEnricher;
pub use gates::{InferenceBackend, ReputationReport, VirusTotalGate};
pub use models::{Action, Alert, Event, EventKind, GeoMetadata, Verdict};
pub use output::{OutputFormat, OutputHandler};
pub use persistence::{AlertStore, SqliteAlertStore};
pub use pipeline::Analyzer;
pub use response::{Responder, ResponseRecord, ResponseTrigger};
