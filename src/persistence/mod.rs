//! Alert persistence
//!
//! Scored alerts are handed off here after the pipeline decides; a save
//! failure is logged and never blocks the next event. Entity and response
//! state deliberately stay in memory (restart resets burst detection and
//! re-arms containment; documented behavior), so only alerts hit disk.

pub mod sqlite_store;

pub use sqlite_store::SqliteAlertStore;

use thiserror::Error;

use crate::models::Alert;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data in database: {0}")]
    InvalidData(String),
}

/// Storage backend for scored alerts
pub trait AlertStore: Send + Sync {
    /// Persist one alert, returning its row id
    fn save_alert(&self, alert: &Alert) -> Result<i64, PersistenceError>;

    /// Most recent alerts, newest first
    fn recent_alerts(&self, limit: usize) -> Result<Vec<Alert>, PersistenceError>;

    /// Remove alerts older than the given timestamp, returning the count
    fn prune_before(&self, timestamp: i64) -> Result<usize, PersistenceError>;

    /// Drop everything (testing)
    fn clear_all(&self) -> Result<(), PersistenceError>;
}
