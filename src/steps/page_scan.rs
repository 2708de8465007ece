//! Fetch-and-scan steps: photo profile, link aggregator, artist website.
//!
//! All three share one shape (tiered fetch, deterministic scan,
//! generative last resort) and differ only in which URL they target,
//! the platform hint handed to the fetch tier, and what auxiliary data
//! they pick up along the way.

use super::{RawCandidate, StepContext, StepOutcome};
use crate::core::error::{AppError, Result};
use crate::core::models::{AuxiliaryInfo, PlatformKind, StepDiagnostics};
use crate::extract::{first_external_link, generative_scan, scan_text, ExtractionMethod};
use crate::fetch::TieredFetcher;
use crate::utils::domain::normalize_url;
use url::Url;

pub(super) async fn run_photo_profile(ctx: &StepContext<'_>) -> Result<StepOutcome> {
    let url = ctx
        .entity
        .link(PlatformKind::PhotoSharing)
        .ok_or_else(|| AppError::InsufficientInput("photo profile link missing".to_string()))?
        .clone();
    scan_remote_page(ctx, &url, Some(PlatformKind::PhotoSharing), false).await
}

pub(super) async fn run_link_aggregator(ctx: &StepContext<'_>) -> Result<StepOutcome> {
    let url = ctx
        .entity
        .link(PlatformKind::LinkAggregator)
        .ok_or_else(|| AppError::InsufficientInput("link aggregator link missing".to_string()))?
        .clone();
    scan_remote_page(ctx, &url, Some(PlatformKind::LinkAggregator), true).await
}

pub(super) async fn run_website(ctx: &StepContext<'_>) -> Result<StepOutcome> {
    // The entity's own website link wins; otherwise use a website an
    // earlier step resolved (aggregator out-link, research reply).
    let url = match ctx.entity.link(PlatformKind::Website) {
        Some(url) => url.clone(),
        None => {
            let raw = ctx.run.aux.website.as_deref().ok_or_else(|| {
                AppError::InsufficientInput("no website known for entity".to_string())
            })?;
            normalize_url(raw)?
        }
    };
    scan_remote_page(ctx, &url, None, false).await
}

/// Common body of the fetch-backed scan steps.
async fn scan_remote_page(
    ctx: &StepContext<'_>,
    url: &Url,
    hint: Option<PlatformKind>,
    collect_external_link: bool,
) -> Result<StepOutcome> {
    let tiered = TieredFetcher::new(ctx.config, &ctx.caps.fetcher, ctx.caps.renderer.as_ref());
    let fetched = tiered.fetch(url, hint).await?;

    let mut diagnostics = StepDiagnostics {
        url: Some(url.to_string()),
        fetch_tier: Some(fetched.tier),
        content_length: Some(fetched.content.len()),
        was_blocked: fetched.was_blocked,
        detail: fetched.diagnostic.clone(),
    };

    let mut aux = AuxiliaryInfo::default();
    if collect_external_link {
        aux.website = first_external_link(ctx.config, &fetched.content);
        if let Some(ref website) = aux.website {
            tracing::debug!(
                target: "steps",
                "[{}] Aggregator out-link captured as website: {}",
                ctx.task_label,
                website
            );
        }
    }

    let scanned = scan_text(ctx.config, &fetched.content);
    if !scanned.is_empty() {
        return Ok(StepOutcome {
            candidates: scanned
                .into_iter()
                .map(|email| RawCandidate {
                    email,
                    method: ExtractionMethod::PatternScan,
                })
                .collect(),
            aux,
            diagnostics,
            ..StepOutcome::default()
        });
    }

    // Deterministic scan found nothing; let the generative tier read the
    // literal content, if we have one.
    let mut candidates = Vec::new();
    let mut rejected = Vec::new();
    if let Some(ref generative) = ctx.caps.generative {
        let scan = generative_scan(generative, &fetched.content, ctx.task_label).await;
        candidates = scan
            .candidates
            .into_iter()
            .map(|email| RawCandidate {
                email,
                method: ExtractionMethod::Generative,
            })
            .collect();
        rejected = scan.rejected;
    }

    if candidates.is_empty() && diagnostics.detail.is_none() {
        diagnostics.detail = Some("no email candidates found in page content".to_string());
    }

    let resolved_without_email = candidates.is_empty() && !aux.is_empty();
    Ok(StepOutcome {
        candidates,
        rejected,
        aux,
        diagnostics,
        resolved_without_email,
    })
}
