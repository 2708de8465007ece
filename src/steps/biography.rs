//! Biography scan: the entity's own free-text bio, no fetch involved.

use super::{RawCandidate, StepContext, StepOutcome};
use crate::core::error::Result;
use crate::core::models::StepDiagnostics;
use crate::extract::{scan_text, ExtractionMethod};

pub(super) fn run(ctx: &StepContext<'_>) -> Result<StepOutcome> {
    // Precondition guarantees a non-empty biography.
    let bio = ctx.entity.biography().unwrap_or_default();

    let candidates = scan_text(ctx.config, bio)
        .into_iter()
        .map(|email| RawCandidate {
            email,
            method: ExtractionMethod::PatternScan,
        })
        .collect::<Vec<_>>();

    tracing::debug!(
        target: "steps",
        "[{}] Biography scan: {} candidate(s) in {} chars",
        ctx.task_label,
        candidates.len(),
        bio.len()
    );

    Ok(StepOutcome {
        candidates,
        diagnostics: StepDiagnostics {
            content_length: Some(bio.len()),
            ..StepDiagnostics::default()
        },
        ..StepOutcome::default()
    })
}
