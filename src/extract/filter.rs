//! The quality/rejection filter: one rule set, two call sites.
//!
//! Applied inside step handling (so junk never pollutes confidence
//! selection) and again as the final gate before a result reaches the
//! caller. Both call sites use this exact function; the rule sets live
//! on [`Config`] and there is deliberately no second implementation.

use crate::core::config::Config;
use crate::core::models::{RejectReason, RejectedCandidate};
use crate::utils::domain::{domain_matches, email_domain, email_local_part};
use std::collections::HashSet;

/// Result of passing candidates through the quality filter.
#[derive(Debug, Clone, Default)]
pub struct FilterVerdict {
    pub accepted: Vec<String>,
    pub rejected: Vec<RejectedCandidate>,
}

/// Splits candidates into accepted addresses and rejections with reasons.
///
/// Candidates are trimmed and lowercased; duplicates collapse to one
/// accepted entry. Idempotent: filtering the accepted list again changes
/// nothing.
pub fn filter_emails(config: &Config, candidates: &[String]) -> FilterVerdict {
    let mut verdict = FilterVerdict::default();
    let mut seen = HashSet::new();

    for raw in candidates {
        let email = raw.trim().to_lowercase();
        if email.is_empty() || !seen.insert(email.clone()) {
            continue;
        }

        match rejection_reason(config, &email) {
            Some(reason) => {
                tracing::debug!(target: "filter", "Rejected '{}': {}", email, reason);
                verdict.rejected.push(RejectedCandidate { email, reason });
            }
            None => verdict.accepted.push(email),
        }
    }

    verdict
}

fn rejection_reason(config: &Config, email: &str) -> Option<RejectReason> {
    let (Some(local), Some(domain)) = (email_local_part(email), email_domain(email)) else {
        return Some(RejectReason::InvalidFormat);
    };

    // Masked forms like "a***@gmail.com" before the format check; they are
    // the platform's way of hiding the real address, not a typo.
    if local.contains('*') || local.contains('•') {
        return Some(RejectReason::Obfuscated);
    }

    let full_match = config
        .email_regex
        .find(email)
        .is_some_and(|m| m.start() == 0 && m.end() == email.len());
    if !full_match {
        return Some(RejectReason::InvalidFormat);
    }

    if config.role_local_parts.contains(&local) {
        return Some(RejectReason::RoleAddress);
    }
    if config.blocked_domains.iter().any(|d| domain_matches(&domain, d)) {
        return Some(RejectReason::BlockedDomain);
    }
    if config
        .platform_domains
        .iter()
        .any(|d| domain_matches(&domain, d))
    {
        return Some(RejectReason::PlatformDomain);
    }
    if config
        .placeholder_domains
        .iter()
        .any(|d| domain_matches(&domain, d))
    {
        return Some(RejectReason::PlaceholderDomain);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        let mut config = Config::default();
        config.blocked_domains.insert("spamtrap.example".to_string());
        config
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_blocklist_correctness() {
        let verdict = filter_emails(
            &config(),
            &strings(&[
                "support@spotify.com",
                "test@example.com",
                "a***@gmail.com",
                "booking@realagency.com",
            ]),
        );

        assert_eq!(verdict.accepted, vec!["booking@realagency.com"]);
        assert_eq!(verdict.rejected.len(), 3);
        let reason_for = |email: &str| {
            verdict
                .rejected
                .iter()
                .find(|r| r.email == email)
                .map(|r| r.reason)
        };
        assert_eq!(
            reason_for("support@spotify.com"),
            Some(RejectReason::RoleAddress)
        );
        assert_eq!(
            reason_for("test@example.com"),
            Some(RejectReason::PlaceholderDomain)
        );
        assert_eq!(reason_for("a***@gmail.com"), Some(RejectReason::Obfuscated));
    }

    #[test]
    fn test_platform_domain_rejected() {
        let verdict = filter_emails(&config(), &strings(&["artist@youtube.com"]));
        assert_eq!(verdict.rejected[0].reason, RejectReason::PlatformDomain);
    }

    #[test]
    fn test_platform_subdomain_rejected() {
        let verdict = filter_emails(&config(), &strings(&["artist@music.youtube.com"]));
        assert_eq!(verdict.rejected[0].reason, RejectReason::PlatformDomain);
    }

    #[test]
    fn test_explicit_blocklist() {
        let verdict = filter_emails(&config(), &strings(&["hi@spamtrap.example"]));
        assert_eq!(verdict.rejected[0].reason, RejectReason::BlockedDomain);
    }

    #[test]
    fn test_role_addresses_rejected_but_booking_kept() {
        let verdict = filter_emails(
            &config(),
            &strings(&[
                "noreply@agency.com",
                "webmaster@agency.com",
                "dmca@agency.com",
                "booking@agency.com",
                "contact@agency.com",
                "info@agency.com",
            ]),
        );
        assert_eq!(
            verdict.accepted,
            vec!["booking@agency.com", "contact@agency.com", "info@agency.com"]
        );
        assert!(verdict
            .rejected
            .iter()
            .all(|r| r.reason == RejectReason::RoleAddress));
    }

    #[test]
    fn test_invalid_format_rejected() {
        let verdict = filter_emails(&config(), &strings(&["not-an-email", "x@y", "@domain.com"]));
        assert!(verdict.accepted.is_empty());
        assert!(verdict
            .rejected
            .iter()
            .all(|r| r.reason == RejectReason::InvalidFormat));
    }

    #[test]
    fn test_idempotence() {
        let input = strings(&[
            "booking@realagency.com",
            "support@spotify.com",
            "Mgmt@Label.net",
        ]);
        let first = filter_emails(&config(), &input);
        let second = filter_emails(&config(), &first.accepted);
        assert_eq!(second.accepted, first.accepted);
        assert!(second.rejected.is_empty());
    }

    #[test]
    fn test_duplicates_collapse() {
        let verdict = filter_emails(
            &config(),
            &strings(&["booking@agency.com", "BOOKING@agency.com "]),
        );
        assert_eq!(verdict.accepted, vec!["booking@agency.com"]);
    }
}
