//! Deep analysis gate
//!
//! Pluggable inference backend (cloud Gemini or local Ollama) behind a
//! single `infer(text) -> text` capability, selected at startup. The core
//! owns the prompt template, fence stripping and response parsing; a parse
//! failure is a recoverable, logged, non-fatal event.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use super::{GateError, InferenceClient};
use crate::models::{Action, Verdict};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Fixed instruction template asking for a strictly-structured response.
pub fn build_prompt(content: &str) -> String {
    format!(
        "You are an expert Security Operations Center (SOC) analyst.\n\
         Analyze the following observation for security threats.\n\n\
         Observation: \"{}\"\n\n\
         Respond with a single valid JSON object with these keys:\n\
         - risk_score (integer 0-100)\n\
         - summary (short explanation of the event)\n\
         - action (one of: Monitor, Block IP, Quarantine Email, Isolate Host, Manual Review)\n\
         - tactic (kill-chain tactic name, or \"Unknown\")\n\
         - technique (kill-chain technique label, or \"Unknown\")\n\n\
         Do not include markdown formatting or extra text. Just the JSON.",
        content
    )
}

/// Raw shape of a backend response. Every field is optional so a partial
/// answer still yields a usable verdict.
#[derive(Debug, Deserialize)]
struct RawVerdict {
    risk_score: Option<i64>,
    summary: Option<String>,
    action: Option<String>,
    tactic: Option<String>,
    technique: Option<String>,
}

/// Strip markdown code fences some models wrap around the JSON body.
fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    trimmed.trim_end_matches("```").trim()
}

/// Parse a backend response into a fully-populated verdict. Missing fields
/// default (`tactic`/`technique` to "Unknown", `action` to monitor) rather
/// than failing the whole verdict.
pub fn parse_verdict_response(raw: &str) -> Result<Verdict, GateError> {
    let body = strip_fences(raw);
    let parsed: RawVerdict = serde_json::from_str(body)
        .map_err(|e| GateError::Malformed(format!("unparseable verdict: {}", e)))?;

    let risk_score = parsed.risk_score.unwrap_or(50).clamp(0, 100) as u8;
    let rationale = parsed
        .summary
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "Deep analysis verdict".to_string());
    let action = match parsed.action {
        Some(label) => Action::from_label(&label),
        None => Action::Monitor,
    };

    let mut verdict = Verdict::new(risk_score, &rationale, action);
    if let Some(tactic) = parsed.tactic.filter(|t| !t.trim().is_empty()) {
        verdict.tactic = tactic;
    }
    if let Some(technique) = parsed.technique.filter(|t| !t.trim().is_empty()) {
        verdict.technique = technique;
    }
    Ok(verdict)
}

/// Google Gemini backend (cloud)
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str, timeout: Duration) -> Self {
        GeminiClient {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

impl InferenceClient for GeminiClient {
    async fn infer(&self, prompt: &str) -> Result<String, GateError> {
        let url = format!(
            "{}/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let payload = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self.client.post(&url).json(&payload).send().await?;
        if !response.status().is_success() {
            return Err(GateError::Status(response.status()));
        }

        let body: serde_json::Value = response.json().await?;
        body.pointer("/candidates/0/content/parts/0/text")
            .and_then(|v| v.as_str())
            .map(String::from)
            .ok_or_else(|| GateError::Malformed("no candidate text in response".to_string()))
    }
}

/// Ollama backend (local)
pub struct OllamaClient {
    client: Client,
    endpoint: String,
    model: String,
}

impl OllamaClient {
    pub fn new(endpoint: &str, model: &str, timeout: Duration) -> Self {
        OllamaClient {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }
}

impl InferenceClient for OllamaClient {
    async fn infer(&self, prompt: &str) -> Result<String, GateError> {
        let payload = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "format": "json",
        });

        let response = self
            .client
            .post(format!("{}/api/generate", self.endpoint))
            .json(&payload)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(GateError::Status(response.status()));
        }

        let body: serde_json::Value = response.json().await?;
        body.get("response")
            .and_then(|v| v.as_str())
            .map(String::from)
            .ok_or_else(|| GateError::Malformed("no response field".to_string()))
    }
}

/// Runtime backend selection: a strategy value chosen once at startup.
pub enum InferenceBackend {
    Gemini(GeminiClient),
    Ollama(OllamaClient),
}

impl InferenceBackend {
    pub fn name(&self) -> &'static str {
        match self {
            InferenceBackend::Gemini(_) => "gemini",
            InferenceBackend::Ollama(_) => "ollama",
        }
    }
}

impl InferenceClient for InferenceBackend {
    async fn infer(&self, prompt: &str) -> Result<String, GateError> {
        match self {
            InferenceBackend::Gemini(client) => client.infer(prompt).await,
            InferenceBackend::Ollama(client) => client.infer(prompt).await,
        }
    }
}
