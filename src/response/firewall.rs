//! Local packet-filter responder
//!
//! Drops traffic from an entity with an iptables rule. In dry-run mode
//! the command is recorded and logged but never executed; the entity is
//! still remembered so idempotency stays testable in non-destructive
//! environments.

use std::collections::HashSet;

use tokio::process::Command;

use super::{ResponderOutcome, ResponseError};

pub struct FirewallResponder {
    dry_run: bool,
    blocked: HashSet<String>,
}

impl FirewallResponder {
    pub fn new(dry_run: bool) -> Self {
        FirewallResponder {
            dry_run,
            blocked: HashSet::new(),
        }
    }

    fn command_for(entity: &str, reason: &str) -> Vec<String> {
        vec![
            "iptables".to_string(),
            "-A".to_string(),
            "INPUT".to_string(),
            "-s".to_string(),
            entity.to_string(),
            "-j".to_string(),
            "DROP".to_string(),
            "-m".to_string(),
            "comment".to_string(),
            "--comment".to_string(),
            format!("sentra: {}", reason),
        ]
    }

    pub async fn apply(
        &mut self,
        entity: &str,
        reason: &str,
    ) -> Result<ResponderOutcome, ResponseError> {
        let cmd = Self::command_for(entity, reason);

        if self.dry_run {
            log::info!("[dry-run] would execute: {}", cmd.join(" "));
            self.blocked.insert(entity.to_string());
            return Ok(ResponderOutcome::DryRun);
        }

        let status = Command::new(&cmd[0]).args(&cmd[1..]).status().await?;
        if status.success() {
            log::info!("blocked {} at the local packet filter", entity);
            self.blocked.insert(entity.to_string());
            Ok(ResponderOutcome::Applied)
        } else {
            Err(ResponseError::Rejected(format!(
                "iptables exited with {}",
                status
            )))
        }
    }

    pub fn has_blocked(&self, entity: &str) -> bool {
        self.blocked.contains(entity)
    }

    pub fn blocked_count(&self) -> usize {
        self.blocked.len()
    }
}
