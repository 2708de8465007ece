//! Deterministic email extraction from raw text and HTML.

use crate::core::config::Config;
use std::collections::HashSet;

/// Scans text/HTML content for email addresses.
///
/// `mailto:` link attributes are scanned explicitly before the general
/// pattern pass, so addresses hidden only in markup are still found.
/// Results are lowercased and de-duplicated, preserving first-seen order
/// (mailto hits first).
pub(crate) fn scan_text(config: &Config, content: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut seen = HashSet::new();

    let mut push = |raw: &str| {
        let email = raw.trim().trim_end_matches('.').to_lowercase();
        if config.email_regex.is_match(&email) && seen.insert(email.clone()) {
            found.push(email);
        }
    };

    for caps in config.mailto_regex.captures_iter(content) {
        if let Some(address) = caps.get(1) {
            push(address.as_str());
        }
    }

    for m in config.email_regex.find_iter(content) {
        push(m.as_str());
    }

    tracing::trace!(
        target: "extract",
        "Pattern scan found {} unique address(es) in {} bytes",
        found.len(),
        content.len()
    );
    found
}

/// Extracts the first outbound `href` whose host is not a known platform
/// domain. Used on link-aggregator pages to pick up the artist's own
/// website as an auxiliary field.
pub(crate) fn first_external_link(config: &Config, content: &str) -> Option<String> {
    use crate::utils::domain::{domain_matches, host_of};
    use std::sync::OnceLock;

    static HREF_REGEX: OnceLock<regex::Regex> = OnceLock::new();
    let href_regex = HREF_REGEX.get_or_init(|| {
        regex::Regex::new(r#"(?i)href\s*=\s*["'](https?://[^"']+)["']"#)
            .expect("href regex is valid")
    });

    for caps in href_regex.captures_iter(content) {
        let raw = caps.get(1)?.as_str();
        let Ok(url) = url::Url::parse(raw) else {
            continue;
        };
        let Some(host) = host_of(&url) else { continue };
        let is_platform = config
            .platform_domains
            .iter()
            .any(|d| domain_matches(&host, d));
        if !is_platform {
            return Some(raw.to_string());
        }
    }
    None
}
