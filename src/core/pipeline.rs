//! The waterfall controller.
//!
//! Walks the ordered step table for one entity: gates each step on its
//! precondition, runs it under the entity deadline, filters its
//! candidates, and terminates the cascade the moment a step yields a
//! filter-accepted address. Lower-priority steps are never consulted
//! once a validated contact exists.

use std::sync::Arc;
use std::time::Instant;

use tokio::time::timeout;

use crate::capabilities::Capabilities;
use crate::core::config::{self, Config};
use crate::core::error::{AppError, Result};
use crate::core::models::{
    validate_entity, AcceptedCandidate, DiscoveryStep, EnrichmentResult, Entity, ProgressCallback,
    ProgressEvent, StepStatus,
};
use crate::extract::filter_emails;
use crate::steps::{run_step, weight_for, RunContext, StepContext, STEP_TABLE};

/// Orchestrates contact discovery for single entities.
///
/// Construction validates that the configuration is satisfiable with the
/// injected capabilities; a run itself never fails, it produces an
/// [`EnrichmentResult`] describing whatever happened.
pub struct WaterfallEngine {
    config: Arc<Config>,
    caps: Capabilities,
    progress: Option<ProgressCallback>,
}

impl WaterfallEngine {
    pub fn new(config: Config, caps: Capabilities) -> Result<Self> {
        if config.enable_web_research && caps.generative.is_none() {
            return Err(AppError::Config(
                "web research is enabled but no generative capability was provided".to_string(),
            ));
        }
        Ok(Self {
            config: Arc::new(config),
            caps,
            progress: None,
        })
    }

    /// Registers a callback invoked on every step status transition.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs the full waterfall for one entity.
    pub async fn run_pipeline(&self, entity: &Entity) -> EnrichmentResult {
        let started = Instant::now();
        let deadline = started + self.config.entity_deadline;
        let task_label = if entity.name.is_empty() {
            entity.id.clone()
        } else {
            entity.name.clone()
        };

        tracing::info!(target: "pipeline", "[{}] Starting discovery waterfall", task_label);

        let validated = validate_entity(entity);
        let mut run = RunContext::default();
        let mut steps: Vec<DiscoveryStep> = STEP_TABLE
            .iter()
            .map(|spec| DiscoveryStep::pending(spec.id, spec.label))
            .collect();

        let mut accepted: Vec<AcceptedCandidate> = Vec::new();
        let mut rejected = Vec::new();
        let mut best: Option<AcceptedCandidate> = None;
        let mut terminated = false;

        for (index, spec) in STEP_TABLE.iter().enumerate() {
            let step = &mut steps[index];

            if terminated {
                step.status = StepStatus::Skipped;
                step.diagnostics.detail =
                    Some("earlier step already produced a validated contact".to_string());
                self.emit(&entity.id, step);
                continue;
            }

            if let Some(reason) =
                spec.precondition
                    .unmet_reason(&validated, &run, &self.caps, &self.config)
            {
                tracing::debug!(target: "pipeline", "[{}] {} skipped: {}", task_label, spec.id, reason);
                step.status = StepStatus::Skipped;
                step.diagnostics.detail = Some(reason);
                self.emit(&entity.id, step);
                continue;
            }

            step.status = StepStatus::Running;
            self.emit(&entity.id, step);
            tracing::info!(target: "pipeline", "[{}] Running step: {}", task_label, spec.label);

            let remaining = deadline.saturating_duration_since(Instant::now());
            let step_started = Instant::now();

            if remaining.is_zero() {
                step.status = StepStatus::Failed;
                step.diagnostics.detail = Some("entity deadline exceeded".to_string());
                self.emit(&entity.id, step);
                continue;
            }

            let ctx = StepContext {
                config: &self.config,
                caps: &self.caps,
                entity: &validated,
                run: &run,
                task_label: &task_label,
            };

            match timeout(remaining, run_step(spec.id, &ctx)).await {
                Err(_) => {
                    step.status = StepStatus::Failed;
                    step.diagnostics.detail =
                        Some("step aborted at the entity deadline".to_string());
                    tracing::warn!(target: "pipeline", "[{}] {} hit the entity deadline", task_label, spec.id);
                }
                Ok(Err(e)) => {
                    step.status = StepStatus::Failed;
                    step.diagnostics.detail = Some(e.to_string());
                    tracing::warn!(target: "pipeline", "[{}] {} failed: {}", task_label, spec.id, e);
                }
                Ok(Ok(outcome)) => {
                    step.diagnostics = outcome.diagnostics;
                    step.rejected.extend(outcome.rejected.iter().cloned());
                    rejected.extend(outcome.rejected);

                    let raw: Vec<String> =
                        outcome.candidates.iter().map(|c| c.email.clone()).collect();
                    let verdict = filter_emails(&self.config, &raw);
                    step.rejected.extend(verdict.rejected.iter().cloned());
                    rejected.extend(verdict.rejected);

                    for email in verdict.accepted {
                        // Recover how this address was obtained to weight it.
                        let method = outcome
                            .candidates
                            .iter()
                            .find(|c| c.email.trim().to_lowercase() == email)
                            .map(|c| c.method)
                            .unwrap_or(crate::extract::ExtractionMethod::PatternScan);
                        let candidate = AcceptedCandidate {
                            email: email.clone(),
                            source: spec.id,
                            confidence: weight_for(
                                &self.config.weights,
                                spec.source_class,
                                method,
                            ),
                        };
                        step.accepted.push(email);
                        if step
                            .confidence
                            .map_or(true, |c| candidate.confidence > c)
                        {
                            step.best_email = Some(candidate.email.clone());
                            step.confidence = Some(candidate.confidence);
                        }
                        // Strictly greater: on a tie the earlier step wins.
                        if best
                            .as_ref()
                            .map_or(true, |b| candidate.confidence > b.confidence)
                        {
                            best = Some(candidate.clone());
                        }
                        accepted.push(candidate);
                    }

                    run.aux.merge_from(&outcome.aux);

                    if !step.accepted.is_empty() {
                        step.status = StepStatus::Success;
                        terminated = true;
                        tracing::info!(
                            target: "pipeline",
                            "[{}] {} found {} via {}",
                            task_label,
                            spec.id,
                            step.best_email.as_deref().unwrap_or("?"),
                            spec.label
                        );
                    } else if outcome.resolved_without_email {
                        // Discovery-only success: useful data, no contact,
                        // the cascade keeps going.
                        step.status = StepStatus::Success;
                    } else {
                        step.status = StepStatus::Failed;
                        if step.diagnostics.detail.is_none() {
                            step.diagnostics.detail =
                                Some("no usable candidates".to_string());
                        }
                    }
                }
            }

            step.duration_ms = step_started.elapsed().as_millis() as u64;
            self.emit(&entity.id, step);

            if !terminated && index + 1 < STEP_TABLE.len() {
                tokio::time::sleep(config::inter_step_sleep(&self.config)).await;
            }
        }

        // Final gate: the shared rule set once more over everything the
        // steps accepted. The filter is idempotent, so this only bites if
        // a step handler mishandled its candidates.
        let surviving = filter_emails(
            &self.config,
            &accepted.iter().map(|c| c.email.clone()).collect::<Vec<_>>(),
        );
        accepted.retain(|c| surviving.accepted.contains(&c.email));
        rejected.extend(surviving.rejected);
        if let Some(ref b) = best {
            if !accepted.iter().any(|c| c.email == b.email) {
                best = accepted
                    .iter()
                    .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
                    .cloned();
            }
        }

        let contactable = best.is_some();
        tracing::info!(
            target: "pipeline",
            "[{}] Waterfall finished: contactable={} best={:?}",
            task_label,
            contactable,
            best.as_ref().map(|b| b.email.as_str())
        );

        EnrichmentResult {
            entity_id: entity.id.clone(),
            best_email: best.as_ref().map(|b| b.email.clone()),
            best_confidence: best.as_ref().map(|b| b.confidence),
            best_source: best.as_ref().map(|b| b.source),
            accepted,
            rejected,
            steps,
            contactable,
            duration_ms: started.elapsed().as_millis() as u64,
            auxiliary: run.aux,
        }
    }

    fn emit(&self, entity_id: &str, step: &DiscoveryStep) {
        if let Some(ref callback) = self.progress {
            callback(&ProgressEvent {
                entity_id: entity_id.to_string(),
                step: step.id,
                status: step.status,
            });
        }
    }
}
