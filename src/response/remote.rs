//! Remote orchestration responder
//!
//! Requests a network-wide block from an external orchestration endpoint
//! (SOAR, managed firewall, EDR console) over HTTP. Shares the dry-run
//! contract with the local responder.

use std::time::Duration;

use reqwest::Client;

use super::{ResponderOutcome, ResponseError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct RemoteResponder {
    client: Client,
    url: String,
    dry_run: bool,
}

impl RemoteResponder {
    pub fn new(url: &str, dry_run: bool) -> Self {
        RemoteResponder {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            url: url.trim_end_matches('/').to_string(),
            dry_run,
        }
    }

    pub fn dry_run(url: &str) -> Self {
        Self::new(url, true)
    }

    pub async fn apply(
        &mut self,
        entity: &str,
        reason: &str,
    ) -> Result<ResponderOutcome, ResponseError> {
        if self.dry_run {
            log::info!(
                "[dry-run] would request network-wide block for {} at {}",
                entity,
                self.url
            );
            return Ok(ResponderOutcome::DryRun);
        }

        let payload = serde_json::json!({
            "command": "firewall-drop",
            "entity": entity,
            "reason": reason,
        });

        let response = self
            .client
            .post(format!("{}/active-response", self.url))
            .json(&payload)
            .send()
            .await?;

        if response.status().is_success() {
            log::info!("orchestrator accepted block for {}", entity);
            Ok(ResponderOutcome::Applied)
        } else {
            Err(ResponseError::Rejected(format!(
                "orchestrator returned {}",
                response.status()
            )))
        }
    }
}
