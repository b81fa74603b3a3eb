//! Lexical pre-filter
//!
//! A cost gate, not a security gate: routine telemetry is classified
//! risk 0 here so the expensive deep-analysis stage never sees it.

/// Fixed keyword set denoting suspicion: authentication failures,
/// privilege terms, malware terms, deception-trap terms.
pub const SUSPICIOUS_KEYWORDS: &[&str] = &[
    "failed",
    "error",
    "denied",
    "segfault",
    "panic",
    "root",
    "admin",
    "unauthorized",
    "refused",
    "attack",
    "malware",
    "virus",
    "trojan",
    "tripwire",
    "honeypot",
];

/// Case-insensitive substring match against the suspicion keyword set.
pub fn is_suspicious(content: &str) -> bool {
    let lower = content.to_lowercase();
    SUSPICIOUS_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routine_telemetry_passes() {
        assert!(!is_suspicious("GET /health HTTP/1.1 200 OK"));
        assert!(!is_suspicious("session opened for user alice"));
    }

    #[test]
    fn test_auth_failure_flagged() {
        assert!(is_suspicious("Failed password for root from 10.0.0.5"));
    }

    #[test]
    fn test_case_insensitive() {
        assert!(is_suspicious("UNAUTHORIZED access attempt"));
        assert!(is_suspicious("Trojan.Win32 detected"));
    }

    #[test]
    fn test_deception_terms_flagged() {
        assert!(is_suspicious("honeypot interaction recorded"));
        assert!(is_suspicious("TRIPWIRE: decoy touched"));
    }
}
