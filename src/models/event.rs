use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Category of an ingested observation. Governs which specialized
/// sub-pipeline runs (e.g. URL extraction for email bodies).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    GenericLog,
    Email,
    NetworkSummary,
    WebhookPayload,
}

impl Default for EventKind {
    fn default() -> Self {
        EventKind::GenericLog
    }
}

/// A single normalized observation handed to the engine by an ingestion
/// adapter. Immutable once enqueued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Opaque origin identifier (file path, queue topic, mailbox URI, ...)
    pub source: String,
    /// Raw text of the observation
    pub content: String,
    /// Event time as epoch seconds
    pub timestamp: i64,
    #[serde(default)]
    pub kind: EventKind,
    /// Pre-parsed fields when `kind` requires them (email sender/body,
    /// webhook payload keys)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<HashMap<String, String>>,
}

impl Event {
    /// Build an event, rejecting blank content. Adapters must drop or
    /// coalesce empty observations before enqueue.
    pub fn new(source: &str, content: &str, timestamp: i64, kind: EventKind) -> Option<Self> {
        if content.trim().is_empty() {
            return None;
        }
        Some(Event {
            source: source.to_string(),
            content: content.to_string(),
            timestamp,
            kind,
            payload: None,
        })
    }

    /// Build an email event carrying the pre-parsed sender/subject/body.
    pub fn email(
        source: &str,
        subject: &str,
        from: &str,
        body: &str,
        timestamp: i64,
    ) -> Option<Self> {
        let content = format!(
            "EMAIL PARSED: Subject: {} | From: {} | Body: {}",
            subject, from, body
        );
        let mut event = Event::new(source, &content, timestamp, EventKind::Email)?;
        let mut payload = HashMap::new();
        payload.insert("subject".to_string(), subject.to_string());
        payload.insert("from".to_string(), from.to_string());
        payload.insert("body".to_string(), body.to_string());
        event.payload = Some(payload);
        Some(event)
    }

    /// The email body when present, falling back to the raw content for
    /// non-email events.
    pub fn body_text(&self) -> &str {
        self.payload
            .as_ref()
            .and_then(|p| p.get("body"))
            .map(String::as_str)
            .unwrap_or(&self.content)
    }
}
