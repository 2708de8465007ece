//! Provides the `ConfigBuilder` for fluent configuration construction.

use super::loading::{apply_file_config, load_config_file, ConfigFile};
use super::validation::validate_config;
use super::Config;
use crate::core::error::{AppError, Result};
use std::path::Path;
use std::time::Duration;

/// Builder pattern for creating [`Config`] instances fluently.
///
/// This is the primary way callers should create a `Config`: defaults,
/// then an optional TOML file, then explicit overrides, then validation.
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
    config_file_path: Option<String>,
    overrides: ConfigFile,
}

impl ConfigBuilder {
    /// Creates a new builder with default configuration values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Specify an optional configuration file path to load.
    pub fn config_file(mut self, path: impl Into<String>) -> Self {
        self.config_file_path = Some(path.into());
        self
    }

    pub fn user_agent(mut self, value: impl Into<String>) -> Self {
        self.overrides.network.user_agent = Some(value.into());
        self
    }
    pub fn accept_language(mut self, value: impl Into<String>) -> Self {
        self.overrides.network.accept_language = Some(value.into());
        self
    }
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.overrides.network.request_timeout = Some(duration.as_secs());
        self
    }
    pub fn min_content_length(mut self, value: usize) -> Self {
        self.overrides.fetch.min_content_length = Some(value);
        self
    }
    pub fn render_poll_interval(mut self, duration: Duration) -> Self {
        self.overrides.fetch.render_poll_interval_ms = Some(duration.as_millis() as u64);
        self
    }
    pub fn render_poll_ceiling(mut self, duration: Duration) -> Self {
        self.overrides.fetch.render_poll_ceiling_secs = Some(duration.as_secs());
        self
    }
    pub fn inter_step_delay(mut self, min: f32, max: f32) -> Self {
        self.overrides.pipeline.inter_step_min_sleep = Some(min);
        self.overrides.pipeline.inter_step_max_sleep = Some(max);
        self
    }
    pub fn inter_entity_delay(mut self, min: f32, max: f32) -> Self {
        self.overrides.pipeline.inter_entity_min_sleep = Some(min);
        self.overrides.pipeline.inter_entity_max_sleep = Some(max);
        self
    }
    pub fn entity_deadline(mut self, duration: Duration) -> Self {
        self.overrides.pipeline.entity_deadline_secs = Some(duration.as_secs());
        self
    }
    pub fn enable_web_research(mut self, enable: bool) -> Self {
        self.overrides.pipeline.enable_web_research = Some(enable);
        self
    }
    pub fn blocked_domains(mut self, domains: Vec<String>) -> Self {
        self.overrides.filter.blocked_domains = Some(domains);
        self
    }
    pub fn extra_platform_domains(mut self, domains: Vec<String>) -> Self {
        self.overrides.filter.extra_platform_domains = Some(domains);
        self
    }
    pub fn extra_role_local_parts(mut self, parts: Vec<String>) -> Self {
        self.overrides.filter.extra_role_local_parts = Some(parts);
        self
    }
    pub fn structured_weight(mut self, value: f32) -> Self {
        self.overrides.weights.structured = Some(value);
        self
    }
    pub fn web_research_weight(mut self, value: f32) -> Self {
        self.overrides.weights.web_research = Some(value);
        self
    }

    /// Builds the final [`Config`], applying defaults, file settings,
    /// overrides, and validation.
    pub fn build(mut self) -> Result<Config> {
        let mut loaded_path: Option<String> = None;

        if let Some(ref path) = self.config_file_path {
            match load_config_file(path) {
                Ok(file_config) => {
                    apply_file_config(&mut self.config, &file_config);
                    loaded_path = Some(path.clone());
                    tracing::info!("Loaded base configuration from specified file: {}", path);
                }
                Err(e) => {
                    tracing::error!("Failed to load specified config file '{}': {}", path, e);
                    return Err(AppError::Config(format!(
                        "failed to load specified configuration file '{}': {}",
                        path, e
                    )));
                }
            }
        } else {
            for path_str in ["./contact-scout.toml", "./config.toml"] {
                if Path::new(path_str).exists() {
                    match load_config_file(path_str) {
                        Ok(file_config) => {
                            apply_file_config(&mut self.config, &file_config);
                            loaded_path = Some(path_str.to_string());
                            tracing::info!(
                                "Loaded base configuration from default location: {}",
                                path_str
                            );
                            break;
                        }
                        Err(e) => {
                            tracing::warn!(
                                "Failed to load or parse default config '{}': {}",
                                path_str,
                                e
                            );
                        }
                    }
                }
            }
            if loaded_path.is_none() {
                tracing::debug!("No configuration file found. Using defaults and overrides.");
            }
        }

        apply_file_config(&mut self.config, &self.overrides);
        self.config.loaded_config_path = loaded_path;
        validate_config(&mut self.config)?;

        tracing::debug!("Final configuration built successfully.");
        Ok(self.config)
    }
}
