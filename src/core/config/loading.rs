//! Handles loading configuration from files and applying it to the Config struct.

use super::Config;
use crate::core::error::{AppError, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// On-disk configuration schema (all fields optional, TOML).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub network: NetworkSection,
    pub fetch: FetchSection,
    pub pipeline: PipelineSection,
    pub filter: FilterSection,
    pub weights: WeightsSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NetworkSection {
    pub user_agent: Option<String>,
    pub accept_language: Option<String>,
    pub request_timeout: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FetchSection {
    pub min_content_length: Option<usize>,
    pub render_poll_interval_ms: Option<u64>,
    pub render_poll_ceiling_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    pub inter_step_min_sleep: Option<f32>,
    pub inter_step_max_sleep: Option<f32>,
    pub inter_entity_min_sleep: Option<f32>,
    pub inter_entity_max_sleep: Option<f32>,
    pub entity_deadline_secs: Option<u64>,
    pub enable_web_research: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FilterSection {
    pub extra_platform_domains: Option<Vec<String>>,
    pub extra_placeholder_domains: Option<Vec<String>>,
    pub extra_role_local_parts: Option<Vec<String>>,
    pub blocked_domains: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WeightsSection {
    pub structured: Option<f32>,
    pub metadata_scan: Option<f32>,
    pub primary_scan: Option<f32>,
    pub secondary_scan: Option<f32>,
    pub generative: Option<f32>,
    pub web_research: Option<f32>,
}

/// Loads configuration settings from a TOML file.
/// Internal to the builder logic.
pub(crate) fn load_config_file(file_path: &str) -> Result<ConfigFile> {
    let path = Path::new(file_path);
    if !path.exists() || !path.is_file() {
        return Err(AppError::Config(format!(
            "configuration file not found: {}",
            file_path
        )));
    }
    tracing::debug!("Reading config file: {}", file_path);
    let content = std::fs::read_to_string(path).map_err(|e| {
        AppError::Config(format!("failed to read configuration file '{}': {}", file_path, e))
    })?;

    let parsed: ConfigFile = toml::from_str(&content).map_err(|e| {
        AppError::Config(format!("failed to parse TOML from '{}': {}", file_path, e))
    })?;

    tracing::debug!("Successfully parsed configuration file: {}", file_path);
    Ok(parsed)
}

/// Applies settings from a parsed `ConfigFile` onto a mutable `Config`.
/// Internal helper for the builder; later applications override earlier ones.
pub(crate) fn apply_file_config(config: &mut Config, file: &ConfigFile) {
    // Network
    if let Some(ref ua) = file.network.user_agent {
        config.user_agent = ua.clone();
    }
    if let Some(ref lang) = file.network.accept_language {
        config.accept_language = lang.clone();
    }
    if let Some(secs) = file.network.request_timeout {
        config.request_timeout = Duration::from_secs(secs);
    }

    // Fetch tiers
    if let Some(len) = file.fetch.min_content_length {
        config.min_content_length = len;
    }
    if let Some(ms) = file.fetch.render_poll_interval_ms {
        config.render_poll_interval = Duration::from_millis(ms);
    }
    if let Some(secs) = file.fetch.render_poll_ceiling_secs {
        config.render_poll_ceiling = Duration::from_secs(secs);
    }

    // Pipeline pacing
    if let Some(min) = file.pipeline.inter_step_min_sleep {
        config.inter_step_delay.0 = min;
    }
    if let Some(max) = file.pipeline.inter_step_max_sleep {
        config.inter_step_delay.1 = max;
    }
    if let Some(min) = file.pipeline.inter_entity_min_sleep {
        config.inter_entity_delay.0 = min;
    }
    if let Some(max) = file.pipeline.inter_entity_max_sleep {
        config.inter_entity_delay.1 = max;
    }
    if let Some(secs) = file.pipeline.entity_deadline_secs {
        config.entity_deadline = Duration::from_secs(secs);
    }
    if let Some(enable) = file.pipeline.enable_web_research {
        config.enable_web_research = enable;
    }

    // Filter rule sets extend the built-in defaults.
    if let Some(ref domains) = file.filter.extra_platform_domains {
        config
            .platform_domains
            .extend(domains.iter().map(|d| d.trim().to_lowercase()));
    }
    if let Some(ref domains) = file.filter.extra_placeholder_domains {
        config
            .placeholder_domains
            .extend(domains.iter().map(|d| d.trim().to_lowercase()));
    }
    if let Some(ref parts) = file.filter.extra_role_local_parts {
        config
            .role_local_parts
            .extend(parts.iter().map(|p| p.trim().to_lowercase()));
    }
    if let Some(ref domains) = file.filter.blocked_domains {
        config
            .blocked_domains
            .extend(domains.iter().map(|d| d.trim().to_lowercase()));
    }

    // Confidence weights
    if let Some(w) = file.weights.structured {
        config.weights.structured = w;
    }
    if let Some(w) = file.weights.metadata_scan {
        config.weights.metadata_scan = w;
    }
    if let Some(w) = file.weights.primary_scan {
        config.weights.primary_scan = w;
    }
    if let Some(w) = file.weights.secondary_scan {
        config.weights.secondary_scan = w;
    }
    if let Some(w) = file.weights.generative {
        config.weights.generative = w;
    }
    if let Some(w) = file.weights.web_research {
        config.weights.web_research = w;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_file_config_merges_sections() {
        let mut config = Config::default();
        let file: ConfigFile = toml::from_str(
            r#"
            [network]
            request_timeout = 12

            [pipeline]
            enable_web_research = true
            entity_deadline_secs = 60

            [filter]
            blocked_domains = ["Spamtrap.example"]

            [weights]
            structured = 0.9
            "#,
        )
        .unwrap();

        apply_file_config(&mut config, &file);
        assert_eq!(config.request_timeout, Duration::from_secs(12));
        assert!(config.enable_web_research);
        assert_eq!(config.entity_deadline, Duration::from_secs(60));
        assert!(config.blocked_domains.contains("spamtrap.example"));
        assert_eq!(config.weights.structured, 0.9);
        // Untouched values keep their defaults.
        assert_eq!(config.min_content_length, 300);
    }
}
