//! Shared network-identifier extraction
//!
//! The behavioral correlator and the response trigger must key on the same
//! entity for the same traffic, so both use these helpers rather than
//! carrying their own patterns.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

fn ipv4_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})\b").unwrap()
    })
}

fn ipv6_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Candidate spans only; std parsing rejects false positives
        Regex::new(r"\b([0-9a-fA-F]{1,4}(?::[0-9a-fA-F]{0,4}){2,7})\b").unwrap()
    })
}

fn url_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"https?://[^\s"'<>\)\]]+"#).unwrap())
}

/// First IP literal (v4 or v6) found in the text, validated through
/// `std::net` so malformed octets never become an entity key.
pub fn first_ip(text: &str) -> Option<String> {
    for cap in ipv4_pattern().find_iter(text) {
        if Ipv4Addr::from_str(cap.as_str()).is_ok() {
            return Some(cap.as_str().to_string());
        }
    }
    for cap in ipv6_pattern().find_iter(text) {
        if cap.as_str().contains(':') && Ipv6Addr::from_str(cap.as_str()).is_ok() {
            return Some(cap.as_str().to_string());
        }
    }
    None
}

/// Parsed form of [`first_ip`] for callers that need an `IpAddr`.
pub fn first_ip_addr(text: &str) -> Option<IpAddr> {
    first_ip(text).and_then(|s| IpAddr::from_str(&s).ok())
}

/// All http/https URLs in the text, trailing punctuation trimmed.
pub fn urls(text: &str) -> Vec<String> {
    url_pattern()
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ';']).to_string())
        .collect()
}

/// Private, loopback and link-local addresses are never worth a reputation
/// lookup and would only burn API quota.
pub fn is_public_ip(ip: &str) -> bool {
    match IpAddr::from_str(ip) {
        Ok(IpAddr::V4(v4)) => {
            !(v4.is_private() || v4.is_loopback() || v4.is_link_local() || v4.is_unspecified())
        }
        Ok(IpAddr::V6(v6)) => !(v6.is_loopback() || v6.is_unspecified()),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_ipv4() {
        let line = "Failed password for root from 10.0.0.5 port 22";
        assert_eq!(first_ip(line), Some("10.0.0.5".to_string()));
    }

    #[test]
    fn test_malformed_octets_rejected() {
        assert_eq!(first_ip("connection from 999.300.1.1 refused"), None);
    }

    #[test]
    fn test_first_ip_prefers_earliest_valid() {
        let line = "peer 8.8.8.8 forwarded for 1.2.3.4";
        assert_eq!(first_ip(line), Some("8.8.8.8".to_string()));
    }

    #[test]
    fn test_ipv6_literal() {
        let line = "session opened from 2001:db8::1 port 22";
        assert_eq!(first_ip(line), Some("2001:db8::1".to_string()));
    }

    #[test]
    fn test_no_ip() {
        assert_eq!(first_ip("GET /health HTTP/1.1 200 OK"), None);
    }

    #[test]
    fn test_urls_extracted_and_trimmed() {
        let body = "update at http://185.224.128.84/login.php, or https://example.com/a.";
        let found = urls(body);
        assert_eq!(
            found,
            vec![
                "http://185.224.128.84/login.php".to_string(),
                "https://example.com/a".to_string()
            ]
        );
    }

    #[test]
    fn test_public_ip_filter() {
        assert!(is_public_ip("185.224.128.84"));
        assert!(!is_public_ip("127.0.0.1"));
        assert!(!is_public_ip("192.168.1.10"));
        assert!(!is_public_ip("10.0.0.5"));
        assert!(!is_public_ip("not-an-ip"));
    }
}
