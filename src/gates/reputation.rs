//! IP/URL reputation gate
//!
//! Thin client over a VirusTotal-style intelligence API. Responses are
//! cached per indicator to conserve API quota; private and loopback
//! addresses are never queried.

use std::collections::HashMap;
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::Mutex;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{GateError, IndicatorSource};
use crate::extract;

/// Default number of engine votes that makes an indicator decisively bad
pub const DEFAULT_VOTE_THRESHOLD: u32 = 3;

/// Outcome of a reputation lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReputationReport {
    /// Decisive verdict: votes reached the configured threshold
    pub malicious: bool,
    /// Number of engines flagging the indicator as malicious
    pub votes: u32,
    pub summary: String,
}

impl ReputationReport {
    pub fn clean(indicator: &str) -> Self {
        ReputationReport {
            malicious: false,
            votes: 0,
            summary: format!("{} clean/unknown on reputation service", indicator),
        }
    }
}

/// Client for the VirusTotal v3 API
pub struct VirusTotalGate {
    client: Client,
    api_key: String,
    base_url: String,
    vote_threshold: u32,
    cache: Mutex<HashMap<String, ReputationReport>>,
}

impl VirusTotalGate {
    pub fn new(api_key: &str, vote_threshold: u32, timeout: Duration) -> Self {
        VirusTotalGate {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            api_key: api_key.to_string(),
            base_url: "https://www.virustotal.com/api/v3".to_string(),
            vote_threshold,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Point the gate at a different endpoint (testing against a local stub)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn cached(&self, indicator: &str) -> Option<ReputationReport> {
        self.cache
            .lock()
            .ok()
            .and_then(|cache| cache.get(indicator).cloned())
    }

    fn store(&self, indicator: &str, report: &ReputationReport) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(indicator.to_string(), report.clone());
        }
    }

    /// Endpoint path for an indicator: IPs hit the ip_addresses collection,
    /// anything else is reduced to its host and checked as a domain.
    fn endpoint_for(&self, indicator: &str) -> String {
        if IpAddr::from_str(indicator).is_ok() {
            return format!("{}/ip_addresses/{}", self.base_url, indicator);
        }
        let host = indicator
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .split(['/', ':'])
            .next()
            .unwrap_or(indicator);
        if IpAddr::from_str(host).is_ok() {
            format!("{}/ip_addresses/{}", self.base_url, host)
        } else {
            format!("{}/domains/{}", self.base_url, host)
        }
    }
}

impl IndicatorSource for VirusTotalGate {
    async fn check_indicator(&self, indicator: &str) -> Result<ReputationReport, GateError> {
        // Private/loopback addresses are not worth API quota
        if IpAddr::from_str(indicator).is_ok() && !extract::is_public_ip(indicator) {
            return Ok(ReputationReport::clean(indicator));
        }

        if let Some(report) = self.cached(indicator) {
            return Ok(report);
        }

        log::debug!("querying reputation service for {}", indicator);

        let response = self
            .client
            .get(self.endpoint_for(indicator))
            .header("accept", "application/json")
            .header("x-apikey", &self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GateError::Status(response.status()));
        }

        let body: serde_json::Value = response.json().await?;
        let stats = body
            .pointer("/data/attributes/last_analysis_stats")
            .ok_or_else(|| GateError::Malformed("missing last_analysis_stats".to_string()))?;

        let malicious_votes = stats
            .get("malicious")
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as u32;

        let report = if malicious_votes >= self.vote_threshold {
            ReputationReport {
                malicious: true,
                votes: malicious_votes,
                summary: format!(
                    "Known malicious indicator: flagged by {} security engines",
                    malicious_votes
                ),
            }
        } else {
            ReputationReport {
                malicious: false,
                votes: malicious_votes,
                summary: format!("{} clean/unknown on reputation service", indicator),
            }
        };

        self.store(indicator, &report);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> VirusTotalGate {
        VirusTotalGate::new("test-key", 3, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_private_ip_short_circuits_without_network() {
        let report = gate().check_indicator("192.168.1.10").await.unwrap();
        assert!(!report.malicious);
        assert_eq!(report.votes, 0);
    }

    #[tokio::test]
    async fn test_loopback_short_circuits() {
        let report = gate().check_indicator("127.0.0.1").await.unwrap();
        assert!(!report.malicious);
    }

    #[test]
    fn test_endpoint_for_ip() {
        let gate = gate();
        assert_eq!(
            gate.endpoint_for("185.224.128.84"),
            "https://www.virustotal.com/api/v3/ip_addresses/185.224.128.84"
        );
    }

    #[test]
    fn test_endpoint_for_url_uses_host() {
        let gate = gate();
        assert_eq!(
            gate.endpoint_for("http://evil.example.com/login.php"),
            "https://www.virustotal.com/api/v3/domains/evil.example.com"
        );
    }

    #[test]
    fn test_endpoint_for_ip_url() {
        let gate = gate();
        assert_eq!(
            gate.endpoint_for("http://185.224.128.84/login.php"),
            "https://www.virustotal.com/api/v3/ip_addresses/185.224.128.84"
        );
    }

    #[test]
    fn test_cache_round_trip() {
        let gate = gate();
        let report = ReputationReport {
            malicious: true,
            votes: 5,
            summary: "bad".to_string(),
        };
        gate.store("185.224.128.84", &report);
        let cached = gate.cached("185.224.128.84").unwrap();
        assert!(cached.malicious);
        assert_eq!(cached.votes, 5);
    }
}
