use std::path::PathBuf;

use structopt::StructOpt;

use sentra::config::Config;
use sentra::correlation::BehaviorCorrelator;
use sentra::gates::{InferenceBackend, VirusTotalGate};
use sentra::models::{Event, EventKind};
use sentra::pipeline::Analyzer;

#[derive(StructOpt, Debug)]
#[structopt(name = "sentra_cli", about = "Threat classification engine management CLI")]
enum Command {
    /// Generate a default configuration file
    Config {
        /// Output path for the configuration file
        #[structopt(short, long, default_value = "config.toml")]
        output: PathBuf,
    },
    /// Score a single log line offline (rules and correlation only)
    Analyze {
        /// The log line to score
        line: String,
        /// Event timestamp (unix seconds); defaults to now
        #[structopt(short, long)]
        timestamp: Option<i64>,
    },
    /// Validate a configuration file
    Check {
        /// Path to the configuration file
        #[structopt(short, long, default_value = "config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Warn)
        .init();

    match Command::from_args() {
        Command::Config { output } => {
            if output.exists() {
                return Err(format!("{:?} already exists, refusing to overwrite", output).into());
            }
            Config::default().to_file(&output)?;
            println!("Wrote default configuration to {:?}", output);
        }
        Command::Analyze { line, timestamp } => {
            let timestamp = timestamp.unwrap_or_else(|| chrono::Utc::now().timestamp());
            let event = Event::new("cli", &line, timestamp, EventKind::GenericLog)
                .ok_or("cannot score an empty line")?;

            // Offline scoring: no gates attached, so only the pre-filter,
            // correlator and rule fallback run
            let mut analyzer: Analyzer<VirusTotalGate, InferenceBackend> =
                Analyzer::new(BehaviorCorrelator::new());
            let alert = analyzer.analyze(event).await;
            println!("{}", serde_json::to_string_pretty(&alert)?);
        }
        Command::Check { config } => {
            if !config.exists() {
                return Err(format!("config file {:?} not found", config).into());
            }
            let loaded = Config::from_file(&config)?;
            println!("Configuration OK:");
            println!("  deep analysis: {} ({})", loaded.analyzer.use_llm, loaded.analyzer.provider);
            println!("  reputation gate: {}", loaded.reputation.enabled);
            println!(
                "  correlator: {} failures / {}s window",
                loaded.correlator.threshold, loaded.correlator.window_seconds
            );
            println!(
                "  response: threshold {} ({})",
                loaded.response.block_threshold,
                if loaded.response.dry_run { "dry run" } else { "live" }
            );
        }
    }

    Ok(())
}
