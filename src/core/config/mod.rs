//! Runtime configuration for the discovery engine.
//!
//! A [`Config`] is constructed once at startup through [`ConfigBuilder`]
//! (optionally merging a TOML file) and injected into the engine; step
//! handlers never read ambient process state.

mod builder;
mod loading;
mod validation;

pub use builder::ConfigBuilder;
pub use loading::ConfigFile;

use crate::core::error::Result;
use rand::Rng;
use regex::Regex;
use std::collections::HashSet;
use std::time::Duration;

/// Tunable per-method confidence weights.
///
/// These are empirically asserted starting points, not measured
/// precision/recall. Callers validating against a labeled sample should
/// override them through the builder or a config file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceWeights {
    /// Declared business-contact field of a specialized content source.
    pub structured: f32,
    /// Pattern scan over text delivered by a structured metadata API
    /// (channel descriptions, entity biographies as served).
    pub metadata_scan: f32,
    /// Pattern scan over a fetched platform-native profile page.
    pub primary_scan: f32,
    /// Pattern scan over a secondary source (aggregator pages, websites).
    pub secondary_scan: f32,
    /// Generative extraction from literal fetched content.
    pub generative: f32,
    /// Web-search-augmented generative fallback.
    pub web_research: f32,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            structured: 0.88,
            metadata_scan: 0.85,
            primary_scan: 0.82,
            secondary_scan: 0.75,
            generative: 0.68,
            web_research: 0.62,
        }
    }
}

/// Effective engine configuration.
#[derive(Debug, Clone)]
pub struct Config {
    // Network
    pub user_agent: String,
    pub accept_language: String,
    pub request_timeout: Duration,

    // Fetch tiers
    pub min_content_length: usize,
    pub render_poll_interval: Duration,
    pub render_poll_ceiling: Duration,

    // Pipeline pacing
    /// Min/max seconds slept between executed steps of one entity.
    pub inter_step_delay: (f32, f32),
    /// Min/max seconds slept between entities in a batch.
    pub inter_entity_delay: (f32, f32),
    /// Wall-clock ceiling for one entity's full pipeline run.
    pub entity_deadline: Duration,

    // Steps
    pub enable_web_research: bool,
    pub weights: ConfidenceWeights,

    // Quality filter rule sets (shared by step handling and the final gate)
    pub platform_domains: HashSet<String>,
    pub placeholder_domains: HashSet<String>,
    pub role_local_parts: HashSet<String>,
    pub blocked_domains: HashSet<String>,

    pub email_regex: Regex,
    pub mailto_regex: Regex,

    pub loaded_config_path: Option<String>,
}

const DEFAULT_PLATFORM_DOMAINS: &[&str] = &[
    "youtube.com",
    "youtu.be",
    "vimeo.com",
    "instagram.com",
    "facebook.com",
    "tiktok.com",
    "twitter.com",
    "x.com",
    "soundcloud.com",
    "spotify.com",
    "bandcamp.com",
    "linktr.ee",
];

const DEFAULT_PLACEHOLDER_DOMAINS: &[&str] = &[
    "example.com",
    "example.org",
    "example.net",
    "test.com",
    "email.com",
    "domain.com",
    "yourdomain.com",
    "mail.com",
];

const DEFAULT_ROLE_LOCAL_PARTS: &[&str] = &[
    "support",
    "help",
    "noreply",
    "no-reply",
    "no_reply",
    "donotreply",
    "do-not-reply",
    "admin",
    "administrator",
    "abuse",
    "postmaster",
    "hostmaster",
    "webmaster",
    "legal",
    "privacy",
    "dmca",
    "copyright",
    "security",
    "spam",
];

impl Default for Config {
    fn default() -> Self {
        Self {
            user_agent: concat!(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 ",
                "(KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36"
            )
            .to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            request_timeout: Duration::from_secs(9),
            min_content_length: 300,
            render_poll_interval: Duration::from_secs(2),
            render_poll_ceiling: Duration::from_secs(50),
            inter_step_delay: (1.0, 2.5),
            inter_entity_delay: (2.0, 5.0),
            entity_deadline: Duration::from_secs(180),
            enable_web_research: false,
            weights: ConfidenceWeights::default(),
            platform_domains: DEFAULT_PLATFORM_DOMAINS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            placeholder_domains: DEFAULT_PLACEHOLDER_DOMAINS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            role_local_parts: DEFAULT_ROLE_LOCAL_PARTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            blocked_domains: HashSet::new(),
            email_regex: Regex::new(r"[A-Za-z0-9][A-Za-z0-9._%+\-]*@[A-Za-z0-9][A-Za-z0-9.\-]*\.[A-Za-z]{2,}")
                .expect("default email regex is valid"),
            mailto_regex: Regex::new(r#"(?i)mailto:([^"'<>\s?&]+)"#)
                .expect("default mailto regex is valid"),
            loaded_config_path: None,
        }
    }
}

impl Config {
    /// Validates the configuration without going through the builder.
    /// Useful when a caller assembled a `Config` directly.
    pub fn validated(mut self) -> Result<Self> {
        validation::validate_config(&mut self)?;
        Ok(self)
    }
}

fn random_duration(range: (f32, f32)) -> Duration {
    let (min, max) = range;
    let secs = if max > min {
        rand::thread_rng().gen_range(min..=max)
    } else {
        min
    };
    Duration::from_secs_f32(secs.max(0.0))
}

/// Jittered sleep duration between executed steps.
pub(crate) fn inter_step_sleep(config: &Config) -> Duration {
    random_duration(config.inter_step_delay)
}

/// Jittered sleep duration between entities in a batch.
pub(crate) fn inter_entity_sleep(config: &Config) -> Duration {
    random_duration(config.inter_entity_delay)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validated().is_ok());
    }

    #[test]
    fn test_jitter_within_range() {
        let config = Config::default();
        for _ in 0..50 {
            let d = inter_step_sleep(&config).as_secs_f32();
            assert!(d >= config.inter_step_delay.0 && d <= config.inter_step_delay.1);
        }
    }

    #[test]
    fn test_email_regex_matches_plain_address() {
        let config = Config::default();
        assert!(config.email_regex.is_match("booking@artist.com"));
        // Masked local parts never scan out of raw content.
        let found = config.email_regex.find("reach me at a***@gmail.com");
        assert!(found.is_none() || !found.unwrap().as_str().contains("***"));
    }
}
