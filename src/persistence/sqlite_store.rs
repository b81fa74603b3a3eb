//! SQLite implementation of the AlertStore trait

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection};

use super::{AlertStore, PersistenceError};
use crate::models::{Action, Alert, Event, EventKind, GeoMetadata, Verdict};

/// SQLite-backed alert storage
pub struct SqliteAlertStore {
    conn: Mutex<Connection>,
}

impl SqliteAlertStore {
    /// Open (or create) the alert database at the specified path
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, PersistenceError> {
        let conn = Connection::open(db_path)?;
        let store = SqliteAlertStore {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// In-memory database (testing)
    pub fn in_memory() -> Result<Self, PersistenceError> {
        let conn = Connection::open_in_memory()?;
        let store = SqliteAlertStore {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<(), PersistenceError> {
        let conn = self.lock_conn()?;
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(())
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>, PersistenceError> {
        self.conn
            .lock()
            .map_err(|_| PersistenceError::InvalidData("connection mutex poisoned".to_string()))
    }

    /// Serde snake_case representation, shared with the wire format
    fn enum_to_str<T: serde::Serialize>(value: &T) -> Result<String, PersistenceError> {
        serde_json::to_value(value)
            .ok()
            .and_then(|v| v.as_str().map(String::from))
            .ok_or_else(|| PersistenceError::InvalidData("unserializable enum".to_string()))
    }

    fn enum_from_str<T: serde::de::DeserializeOwned>(s: &str) -> Result<T, PersistenceError> {
        serde_json::from_value(serde_json::Value::String(s.to_string()))
            .map_err(|_| PersistenceError::InvalidData(format!("unknown enum value: {}", s)))
    }
}

impl AlertStore for SqliteAlertStore {
    fn save_alert(&self, alert: &Alert) -> Result<i64, PersistenceError> {
        let kind = Self::enum_to_str(&alert.event.kind)?;
        let action = Self::enum_to_str(&alert.verdict.action)?;

        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO alerts (timestamp, source, kind, raw_content, risk_score, rationale,
                                 action, tactic, technique, entity, country, city, latitude,
                                 longitude, region_code)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                alert.event.timestamp,
                alert.event.source,
                kind,
                alert.event.content,
                alert.verdict.risk_score,
                alert.verdict.rationale,
                action,
                alert.verdict.tactic,
                alert.verdict.technique,
                alert.entity,
                alert.location.country,
                alert.location.city,
                alert.location.latitude,
                alert.location.longitude,
                alert.location.region_code,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn recent_alerts(&self, limit: usize) -> Result<Vec<Alert>, PersistenceError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT timestamp, source, kind, raw_content, risk_score, rationale, action,
                    tactic, technique, entity, country, city, latitude, longitude, region_code
             FROM alerts ORDER BY timestamp DESC, id DESC LIMIT ?",
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, u8>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
                row.get::<_, String>(8)?,
                row.get::<_, Option<String>>(9)?,
                row.get::<_, Option<String>>(10)?,
                row.get::<_, Option<String>>(11)?,
                row.get::<_, Option<f64>>(12)?,
                row.get::<_, Option<f64>>(13)?,
                row.get::<_, Option<String>>(14)?,
            ))
        })?;

        let mut alerts = Vec::new();
        for row in rows {
            let (
                timestamp,
                source,
                kind,
                raw_content,
                risk_score,
                rationale,
                action,
                tactic,
                technique,
                entity,
                country,
                city,
                latitude,
                longitude,
                region_code,
            ) = row?;

            let kind: EventKind = Self::enum_from_str(&kind)?;
            let action: Action = Self::enum_from_str(&action)?;

            // Structured payloads are not persisted; the raw content is
            // the durable record of the observation
            let event = Event {
                source,
                content: raw_content,
                timestamp,
                kind,
                payload: None,
            };
            let mut verdict = Verdict::new(risk_score, &rationale, action);
            verdict.tactic = tactic;
            verdict.technique = technique;

            alerts.push(Alert {
                event,
                verdict,
                entity,
                location: GeoMetadata {
                    country: country.unwrap_or_else(|| "Unknown".to_string()),
                    city: city.unwrap_or_else(|| "Unknown".to_string()),
                    latitude: latitude.unwrap_or(0.0),
                    longitude: longitude.unwrap_or(0.0),
                    region_code: region_code.unwrap_or_default(),
                },
            });
        }
        Ok(alerts)
    }

    fn prune_before(&self, timestamp: i64) -> Result<usize, PersistenceError> {
        let conn = self.lock_conn()?;
        let deleted = conn.execute("DELETE FROM alerts WHERE timestamp < ?", params![timestamp])?;
        Ok(deleted)
    }

    fn clear_all(&self) -> Result<(), PersistenceError> {
        let conn = self.lock_conn()?;
        conn.execute("DELETE FROM alerts", [])?;
        Ok(())
    }
}
