//! Utility functions for handling domain names and URLs.

use crate::core::error::{AppError, Result};
use url::Url;

/// Parses the input website string into a valid `Url` object.
///
/// Adds `https://` scheme if missing. Used once at entity ingestion so
/// step handlers never deal with raw link strings.
/// Returns `Err(AppError::UrlParse)` or `Err(AppError::InsufficientInput)` on failure.
pub(crate) fn normalize_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::InsufficientInput(
            "link value is empty".to_string(),
        ));
    }

    let with_scheme = if !trimmed.contains("://") {
        format!("https://{}", trimmed)
    } else {
        trimmed.to_string()
    };

    match Url::parse(&with_scheme) {
        Ok(url) => {
            if url.host_str().is_none() || url.host_str() == Some("") {
                tracing::warn!("URL normalization produced URL without host: {}", url);
                Err(AppError::UrlParse(url::ParseError::EmptyHost))
            } else {
                Ok(url)
            }
        }
        Err(e) => {
            tracing::warn!(
                "Failed to parse '{}' (original: '{}'): {}",
                with_scheme,
                trimmed,
                e
            );
            Err(AppError::UrlParse(e))
        }
    }
}

/// Extracts the lowercase host of a URL with any `www.` prefix removed.
pub(crate) fn host_of(url: &Url) -> Option<String> {
    url.host_str()
        .map(|h| h.strip_prefix("www.").unwrap_or(h).to_lowercase())
}

/// Returns the domain part of an email address, lowercased.
pub(crate) fn email_domain(email: &str) -> Option<String> {
    email.rsplit_once('@').map(|(_, d)| d.trim().to_lowercase())
}

/// Returns the local part of an email address, lowercased.
pub(crate) fn email_local_part(email: &str) -> Option<String> {
    email.rsplit_once('@').map(|(l, _)| l.trim().to_lowercase())
}

/// True when `host` equals `domain` or is a subdomain of it.
pub(crate) fn domain_matches(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{}", domain))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_url_valid() {
        assert_eq!(
            normalize_url("example.com").unwrap().as_str(),
            "https://example.com/"
        );
        assert_eq!(
            normalize_url("http://example.com").unwrap().as_str(),
            "http://example.com/"
        );
        assert_eq!(
            normalize_url(" https://linktr.ee/artist ").unwrap().as_str(),
            "https://linktr.ee/artist"
        );
    }

    #[test]
    fn test_normalize_url_invalid() {
        assert!(normalize_url("").is_err());
        assert!(normalize_url("   ").is_err());
        assert!(normalize_url("http://").is_err());
    }

    #[test]
    fn test_host_of_strips_www() {
        let url = normalize_url("https://www.Example.com/path").unwrap();
        assert_eq!(host_of(&url).unwrap(), "example.com");
    }

    #[test]
    fn test_email_parts() {
        assert_eq!(email_domain("Booking@Agency.COM").unwrap(), "agency.com");
        assert_eq!(email_local_part("Booking@Agency.COM").unwrap(), "booking");
        assert!(email_domain("not-an-email").is_none());
    }

    #[test]
    fn test_domain_matches() {
        assert!(domain_matches("youtube.com", "youtube.com"));
        assert!(domain_matches("music.youtube.com", "youtube.com"));
        assert!(!domain_matches("notyoutube.com", "youtube.com"));
    }
}
