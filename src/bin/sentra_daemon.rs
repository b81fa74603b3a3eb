use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};

use sentra::config::Config;
use sentra::correlation::BehaviorCorrelator;
use sentra::enrichment::GeoEnricher;
use sentra::gates::{GeminiClient, InferenceBackend, OllamaClient, VirusTotalGate};
use sentra::models::{Event, EventKind};
use sentra::output::{OutputFormat, OutputHandler};
use sentra::persistence::{AlertStore, SqliteAlertStore};
use sentra::pipeline::Analyzer;
use sentra::response::{FirewallResponder, RemoteResponder, Responder, ResponseTrigger};

/// Main daemon entry point for the threat classification engine
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("Starting sentra daemon...");

    // Load configuration
    let config_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = if config_path.exists() {
        Config::from_file(&config_path)?
    } else {
        log::warn!("Config file not found, using defaults");
        Config::default()
    };

    // Setup graceful shutdown signal handling
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal, gracefully stopping...");
        let _ = shutdown_tx.send(true);
    })?;

    // Initialize output handler
    let output_format = OutputFormat::from_str(&config.output.format);
    let mut output_handler = OutputHandler::new(output_format, config.output.file_path.clone())?;

    // Initialize alert storage
    let store: Option<SqliteAlertStore> = if config.persistence.enabled {
        match SqliteAlertStore::new(&config.persistence.db_path) {
            Ok(store) => {
                log::info!("Alert database ready: {:?}", config.persistence.db_path);
                Some(store)
            }
            Err(e) => {
                log::error!("Failed to open alert database, persistence disabled: {}", e);
                None
            }
        }
    } else {
        None
    };

    // Assemble the escalation pipeline, degrading any stage whose
    // credentials or resources are missing rather than failing the engine
    let correlator = BehaviorCorrelator::with_config(
        config.correlator.window_seconds,
        config.correlator.threshold,
    );
    let mut analyzer: Analyzer<VirusTotalGate, InferenceBackend> = Analyzer::new(correlator);

    if config.reputation.enabled {
        match env::var("VIRUSTOTAL_API_KEY") {
            Ok(api_key) => {
                let timeout = Duration::from_secs(config.reputation.timeout_seconds);
                let gate = VirusTotalGate::new(&api_key, config.reputation.vote_threshold, timeout);
                analyzer = analyzer.with_reputation(gate, timeout);
                log::info!("Reputation gate enabled (vote threshold {})", config.reputation.vote_threshold);
            }
            Err(_) => {
                log::warn!("VIRUSTOTAL_API_KEY not set, reputation gate disabled");
            }
        }
    }

    if config.analyzer.use_llm {
        let timeout = Duration::from_secs(config.analyzer.timeout_seconds);
        let backend = match config.analyzer.provider.as_str() {
            "gemini" => match env::var("GOOGLE_API_KEY") {
                Ok(api_key) => Some(InferenceBackend::Gemini(GeminiClient::new(
                    &api_key,
                    &config.analyzer.model,
                    timeout,
                ))),
                Err(_) => {
                    log::warn!("GOOGLE_API_KEY not set, deep analysis disabled; continuing with rules only");
                    None
                }
            },
            "ollama" => {
                let endpoint = config
                    .analyzer
                    .endpoint
                    .clone()
                    .unwrap_or_else(|| "http://127.0.0.1:11434".to_string());
                Some(InferenceBackend::Ollama(OllamaClient::new(
                    &endpoint,
                    &config.analyzer.model,
                    timeout,
                )))
            }
            other => {
                log::warn!("Unknown inference provider '{}', deep analysis disabled", other);
                None
            }
        };
        if let Some(backend) = backend {
            log::info!("Deep analysis enabled ({} / {})", backend.name(), config.analyzer.model);
            analyzer = analyzer.with_inference(backend, timeout);
        }
    }

    if config.enrichment.enabled {
        match config
            .enrichment
            .mmdb_path
            .as_ref()
            .ok_or("enrichment enabled but mmdb_path not set")
            .and_then(|p| GeoEnricher::open(p).map_err(|_| "cannot open GeoLite2 database"))
        {
            Ok(enricher) => {
                analyzer = analyzer.with_enrichment(enricher);
                log::info!("Geographic enrichment enabled");
            }
            Err(e) => log::warn!("{}; enrichment disabled", e),
        }
    }

    // Initialize automated containment
    let mut responders = vec![Responder::Firewall(FirewallResponder::new(
        config.response.dry_run,
    ))];
    if config.response.remote_enabled {
        if let Some(ref url) = config.response.remote_url {
            responders.push(Responder::Remote(RemoteResponder::new(
                url,
                config.response.dry_run,
            )));
        } else {
            log::warn!("remote response enabled but remote_url not set");
        }
    }
    let mut trigger = ResponseTrigger::new(responders, config.response.block_threshold);
    log::info!(
        "Response trigger armed (threshold {}, mode: {})",
        config.response.block_threshold,
        if config.response.dry_run { "DRY RUN" } else { "LIVE" }
    );

    // Event channel: ingestion adapters enqueue, the single drain worker
    // below consumes. The stdin feeder is the reference adapter.
    let (tx, mut rx) = mpsc::channel::<Event>(1024);
    tokio::spawn(read_stdin_events(tx));

    log::info!("Engine is now scoring events. Press Ctrl+C to stop.");

    // Drain loop: stops accepting new events on shutdown, but the event
    // in flight always finishes so no partial alert is ever persisted
    loop {
        let event = tokio::select! {
            _ = shutdown_rx.changed() => break,
            maybe_event = rx.recv() => match maybe_event {
                Some(event) => event,
                None => break, // all adapters gone
            },
        };

        let alert = analyzer.analyze(event).await;

        if let Err(e) = output_handler.write_alert(&alert) {
            log::error!("Failed to write alert: {}", e);
        }

        if alert.verdict.risk_score > 50 {
            log::warn!(
                "ALERT - RISK {}: {} (action: {})",
                alert.verdict.risk_score,
                alert.verdict.rationale,
                alert.verdict.action
            );
            if let Some(ref store) = store {
                if let Err(e) = store.save_alert(&alert) {
                    log::error!("Failed to persist alert: {}", e);
                }
            }
        }

        trigger.handle_alert(&alert).await;
    }

    output_handler.flush()?;
    log::info!("sentra daemon stopped");
    Ok(())
}

/// Reference ingestion adapter: reads events from stdin, one per line.
/// Lines that parse as an Event JSON object are taken as-is; anything
/// else is wrapped as a generic log observation. Blank lines are dropped
/// before enqueue.
async fn read_stdin_events(tx: mpsc::Sender<Event>) {
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let event = match serde_json::from_str::<Event>(&line) {
            Ok(event) if !event.content.trim().is_empty() => Some(event),
            Ok(_) => None,
            Err(_) => Event::new("stdin", &line, chrono::Utc::now().timestamp(), EventKind::GenericLog),
        };

        if let Some(event) = event {
            if tx.send(event).await.is_err() {
                break;
            }
        }
    }
}
