//! Contains validation logic for the final Config struct.

use super::Config;
use crate::core::error::{AppError, Result};

/// Validates the configuration after loading and overrides.
/// Clamps values where a sane correction exists and errors otherwise.
/// Internal helper for the builder's `build` method.
pub(crate) fn validate_config(config: &mut Config) -> Result<()> {
    if config.inter_step_delay.0 < 0.0 || config.inter_entity_delay.0 < 0.0 {
        return Err(AppError::Config(
            "sleep durations cannot be negative".to_string(),
        ));
    }
    if config.inter_step_delay.0 > config.inter_step_delay.1 {
        tracing::warn!(
            "Inter-step min sleep ({:.2}s) > max ({:.2}s). Setting max = min.",
            config.inter_step_delay.0,
            config.inter_step_delay.1
        );
        config.inter_step_delay.1 = config.inter_step_delay.0;
    }
    if config.inter_entity_delay.0 > config.inter_entity_delay.1 {
        tracing::warn!(
            "Inter-entity min sleep ({:.2}s) > max ({:.2}s). Setting max = min.",
            config.inter_entity_delay.0,
            config.inter_entity_delay.1
        );
        config.inter_entity_delay.1 = config.inter_entity_delay.0;
    }
    if config.request_timeout.is_zero() {
        return Err(AppError::Config(
            "request timeout must be non-zero".to_string(),
        ));
    }
    if config.entity_deadline.is_zero() {
        return Err(AppError::Config(
            "entity deadline must be non-zero".to_string(),
        ));
    }
    if config.render_poll_interval.is_zero() {
        return Err(AppError::Config(
            "render poll interval must be non-zero".to_string(),
        ));
    }
    if config.render_poll_ceiling < config.render_poll_interval {
        tracing::warn!(
            "Render poll ceiling ({:?}) < interval ({:?}). Setting ceiling = interval.",
            config.render_poll_ceiling,
            config.render_poll_interval
        );
        config.render_poll_ceiling = config.render_poll_interval;
    }

    let weights = [
        ("structured", &mut config.weights.structured),
        ("metadata_scan", &mut config.weights.metadata_scan),
        ("primary_scan", &mut config.weights.primary_scan),
        ("secondary_scan", &mut config.weights.secondary_scan),
        ("generative", &mut config.weights.generative),
        ("web_research", &mut config.weights.web_research),
    ];
    for (name, weight) in weights {
        if !(0.0..=1.0).contains(weight) {
            tracing::warn!(
                "Confidence weight '{}' ({}) outside [0, 1]. Clamping.",
                name,
                weight
            );
            *weight = weight.clamp(0.0, 1.0);
        }
    }

    if config.min_content_length == 0 {
        tracing::warn!("min_content_length of 0 disables short-content fallback detection.");
    }

    Ok(())
}
