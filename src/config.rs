use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the engine daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Deep analysis backend selection
    pub analyzer: AnalyzerConfig,
    /// Reputation gate settings
    pub reputation: ReputationConfig,
    /// Behavioral correlation thresholds
    pub correlator: CorrelatorConfig,
    /// Automated containment settings
    pub response: ResponseConfig,
    /// Geographic enrichment settings
    pub enrichment: EnrichmentConfig,
    /// Alert storage settings
    pub persistence: PersistenceConfig,
    /// Alert output settings
    pub output: OutputConfig,
}

/// Deep analysis backend configuration. Credentials come from the
/// environment (`GOOGLE_API_KEY`), never from this file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Enable the deep analysis stage
    pub use_llm: bool,
    /// Backend: "gemini" (cloud) or "ollama" (local)
    pub provider: String,
    /// Model identifier for the selected backend
    pub model: String,
    /// Endpoint for the local backend
    pub endpoint: Option<String>,
    /// Per-call deadline in seconds
    pub timeout_seconds: u64,
}

/// Reputation gate configuration. The API key comes from the environment
/// (`VIRUSTOTAL_API_KEY`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReputationConfig {
    pub enabled: bool,
    /// Engine votes required for a decisive malicious verdict
    pub vote_threshold: u32,
    /// Per-call deadline in seconds
    pub timeout_seconds: u64,
}

/// Behavioral correlation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelatorConfig {
    /// Sliding window in seconds
    pub window_seconds: i64,
    /// Matching sub-events within the window that constitute a burst
    pub threshold: usize,
}

/// Automated containment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseConfig {
    /// Record actions without applying them
    pub dry_run: bool,
    /// Risk score at or above which containment fires (0-100)
    pub block_threshold: u8,
    /// Also request a network-wide block from a remote orchestrator
    pub remote_enabled: bool,
    /// Orchestrator base URL
    pub remote_url: Option<String>,
}

/// Geographic enrichment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    pub enabled: bool,
    /// Path to the GeoLite2-City.mmdb database file
    pub mmdb_path: Option<PathBuf>,
}

/// Alert storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    pub enabled: bool,
    pub db_path: PathBuf,
}

/// Alert output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output format: "json", "jsonl", or "console"
    pub format: String,
    /// Output file path (if format is not "console")
    pub file_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            analyzer: AnalyzerConfig {
                use_llm: false,
                provider: "ollama".to_string(),
                model: "llama3".to_string(),
                endpoint: Some("http://127.0.0.1:11434".to_string()),
                timeout_seconds: 30,
            },
            reputation: ReputationConfig {
                enabled: false,
                vote_threshold: 3,
                timeout_seconds: 5,
            },
            correlator: CorrelatorConfig {
                window_seconds: 60,
                threshold: 5,
            },
            response: ResponseConfig {
                dry_run: true,
                block_threshold: 90,
                remote_enabled: false,
                remote_url: None,
            },
            enrichment: EnrichmentConfig {
                enabled: false,
                mmdb_path: Some(PathBuf::from("GeoLite2-City.mmdb")),
            },
            persistence: PersistenceConfig {
                enabled: true,
                db_path: PathBuf::from("sentra.db"),
            },
            output: OutputConfig {
                format: "console".to_string(),
                file_path: None,
            },
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn to_file(&self, path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_knobs() {
        let config = Config::default();
        assert_eq!(config.correlator.window_seconds, 60);
        assert_eq!(config.correlator.threshold, 5);
        assert_eq!(config.response.block_threshold, 90);
        assert!(config.response.dry_run);
        assert_eq!(config.reputation.vote_threshold, 3);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.correlator.threshold, config.correlator.threshold);
        assert_eq!(parsed.output.format, config.output.format);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = Config::default();
        config.to_file(&path).unwrap();
        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.response.block_threshold, 90);
    }
}
