//! Deterministic rule fallback
//!
//! Always decisive: guarantees every suspicious event that no earlier
//! stage could score still receives a verdict. Checks run in priority
//! order; bursts of auth failures belong to the behavioral correlator,
//! so a single failure only rates low severity here.

use crate::models::{Action, Verdict};

pub fn fallback_verdict(content: &str) -> Verdict {
    let lower = content.to_lowercase();

    if lower.contains("honeypot") || lower.contains("tripwire") {
        return Verdict::new(
            100,
            "Deception trap triggered (critical action required)",
            Action::IsolateHost,
        )
        .with_classification("Discovery", "T1046 Network Service Discovery");
    }

    if lower.contains("failed password") || lower.contains("authentication failure") {
        return Verdict::new(20, "Single failed login (monitoring)", Action::Monitor)
            .with_classification("Credential Access", "T1110 Brute Force");
    }

    if lower.contains("root") || lower.contains("admin") {
        return Verdict::new(80, "Privileged access attempt", Action::ManualReview)
            .with_classification("Privilege Escalation", "T1078 Valid Accounts");
    }

    Verdict::new(50, "Suspicious Activity Detected", Action::Monitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deception_trap_highest_priority() {
        let verdict = fallback_verdict("honeypot touched by root from 10.0.0.5");
        assert_eq!(verdict.risk_score, 100);
        assert_eq!(verdict.action, Action::IsolateHost);
        assert_eq!(verdict.tactic, "Discovery");
    }

    #[test]
    fn test_single_auth_failure_is_low_severity() {
        // Bursts are the correlator's job; one failure only monitors
        let verdict = fallback_verdict("Failed password for root from 10.0.0.5 port 22");
        assert_eq!(verdict.risk_score, 20);
        assert_eq!(verdict.action, Action::Monitor);
    }

    #[test]
    fn test_privileged_access() {
        let verdict = fallback_verdict("sudo: pam_unix: session opened for root by attacker");
        assert_eq!(verdict.risk_score, 80);
        assert_eq!(verdict.tactic, "Privilege Escalation");
    }

    #[test]
    fn test_generic_suspicious() {
        let verdict = fallback_verdict("kernel: segfault at 0x0 in sshd");
        assert_eq!(verdict.risk_score, 50);
        assert_eq!(verdict.rationale, "Suspicious Activity Detected");
        assert_eq!(verdict.tactic, "Unknown");
    }
}
