//! Two-tier content retrieval.
//!
//! Tier 1 is a direct fetch through the [`PageFetcher`] capability. When
//! its result is absent, too small, or carries a known blocked signature,
//! Tier 2 falls back to the managed rendering service: start a
//! platform-specialized headless-browser job, poll at a fixed interval,
//! and give up at a hard wall-clock ceiling. A ceiling breach is a tier
//! failure and is never retried within the same step.

mod direct;

pub use direct::HttpPageFetcher;

use crate::capabilities::{PageFetcher, RenderJobKind, RenderJobStatus, RenderService};
use crate::core::config::Config;
use crate::core::error::{AppError, Result};
use crate::core::models::{FetchTierUsed, PlatformKind};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout};
use url::Url;

/// Outcome of a tiered fetch, with diagnostics for the step trail.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub content: String,
    pub tier: FetchTierUsed,
    /// Whether Tier 1 was judged blocked (regardless of Tier-2 success).
    pub was_blocked: bool,
    pub diagnostic: Option<String>,
}

/// Maps a platform family to the specialized rendering job type.
fn job_kind_for(hint: Option<PlatformKind>) -> RenderJobKind {
    match hint {
        Some(PlatformKind::VideoHost) => RenderJobKind::VideoProfile,
        Some(PlatformKind::PhotoSharing) => RenderJobKind::PhotoProfile,
        Some(PlatformKind::LinkAggregator) => RenderJobKind::LinkCrawl,
        Some(PlatformKind::Website) | None => RenderJobKind::GenericPage,
    }
}

const GENERIC_BLOCK_MARKERS: &[&str] = &[
    "sign in to continue",
    "please enable javascript",
    "verify you are human",
    "are you a robot",
    "access denied",
    "just a moment...",
    "attention required",
    "before you continue",
];

const PHOTO_BLOCK_MARKERS: &[&str] = &[
    "log in to see photos",
    "log in to continue",
    "see this content in the app",
];

const VIDEO_BLOCK_MARKERS: &[&str] = &["confirm you're not a bot", "consent form"];

/// Returns the matched blocked-content signature, if any.
fn blocked_signature(content: &str, hint: Option<PlatformKind>) -> Option<&'static str> {
    let lower = content.to_lowercase();
    let extra: &[&str] = match hint {
        Some(PlatformKind::PhotoSharing) => PHOTO_BLOCK_MARKERS,
        Some(PlatformKind::VideoHost) => VIDEO_BLOCK_MARKERS,
        _ => &[],
    };
    GENERIC_BLOCK_MARKERS
        .iter()
        .chain(extra.iter())
        .find(|marker| lower.contains(*marker))
        .copied()
}

pub(crate) struct TieredFetcher<'a> {
    config: &'a Config,
    fetcher: &'a Arc<dyn PageFetcher>,
    renderer: Option<&'a Arc<dyn RenderService>>,
}

impl<'a> TieredFetcher<'a> {
    pub(crate) fn new(
        config: &'a Config,
        fetcher: &'a Arc<dyn PageFetcher>,
        renderer: Option<&'a Arc<dyn RenderService>>,
    ) -> Self {
        Self {
            config,
            fetcher,
            renderer,
        }
    }

    /// Fetches `url`, escalating to the rendering fallback when the direct
    /// result is unusable. Definitive HTTP misses (404/410) fail without
    /// escalation; rendering a dead page cannot resurrect it.
    pub(crate) async fn fetch(
        &self,
        url: &Url,
        hint: Option<PlatformKind>,
    ) -> Result<FetchOutcome> {
        let direct = timeout(self.config.request_timeout, self.fetcher.fetch(url))
            .await
            .map_err(|_| {
                AppError::Transport(format!(
                    "direct fetch of {} timed out after {:?}",
                    url, self.config.request_timeout
                ))
            })
            .and_then(|r| r);

        let (reason, direct_error, signature_hit) = match direct {
            Ok(page) if page.status == 404 || page.status == 410 => {
                return Err(AppError::Transport(format!("HTTP {} for {}", page.status, url)));
            }
            Ok(page) if page.status >= 400 => (
                format!("HTTP {}", page.status),
                AppError::Transport(format!("HTTP {} for {}", page.status, url)),
                false,
            ),
            Ok(page) => {
                if let Some(marker) = blocked_signature(&page.body, hint) {
                    tracing::debug!(
                        target: "fetch",
                        "Blocked signature '{}' in direct content of {}",
                        marker,
                        url
                    );
                    (
                        format!("blocked signature: {}", marker),
                        AppError::BlockedContent(format!("'{}' detected at {}", marker, url)),
                        true,
                    )
                } else if page.body.trim().len() < self.config.min_content_length {
                    (
                        format!(
                            "content below minimum length ({} < {})",
                            page.body.trim().len(),
                            self.config.min_content_length
                        ),
                        AppError::BlockedContent(format!(
                            "content of {} too small to be a real page",
                            url
                        )),
                        false,
                    )
                } else {
                    return Ok(FetchOutcome {
                        content: page.body,
                        tier: FetchTierUsed::Direct,
                        was_blocked: false,
                        diagnostic: None,
                    });
                }
            }
            Err(e) => (e.to_string(), e, false),
        };

        let Some(renderer) = self.renderer else {
            tracing::debug!(
                target: "fetch",
                "No rendering fallback configured; {} stays failed ({})",
                url,
                reason
            );
            return Err(direct_error);
        };

        let kind = job_kind_for(hint);
        tracing::info!(
            target: "fetch",
            "Tier-1 fetch of {} unusable ({}); starting {:?} render job",
            url,
            reason,
            kind
        );

        let content = self.render(renderer, url, kind).await?;
        Ok(FetchOutcome {
            content,
            tier: FetchTierUsed::Rendered,
            was_blocked: signature_hit,
            diagnostic: Some(reason),
        })
    }

    /// Runs one managed rendering job to completion or failure.
    async fn render(
        &self,
        renderer: &Arc<dyn RenderService>,
        url: &Url,
        kind: RenderJobKind,
    ) -> Result<String> {
        let job = renderer.start_job(url, kind).await?;
        let started = Instant::now();

        loop {
            sleep(self.config.render_poll_interval).await;

            match renderer.job_status(&job).await? {
                RenderJobStatus::Completed(content) => {
                    tracing::debug!(
                        target: "fetch",
                        "Render job {} for {} completed in {:.1?} ({} bytes)",
                        job.0,
                        url,
                        started.elapsed(),
                        content.len()
                    );
                    return Ok(content);
                }
                RenderJobStatus::Failed(message) => {
                    return Err(AppError::RenderJob(format!(
                        "job {} for {}: {}",
                        job.0, url, message
                    )));
                }
                RenderJobStatus::Pending => {
                    if started.elapsed() >= self.config.render_poll_ceiling {
                        tracing::warn!(
                            target: "fetch",
                            "Render job {} for {} hit the {:?} polling ceiling",
                            job.0,
                            url,
                            self.config.render_poll_ceiling
                        );
                        return Err(AppError::RenderTimeout(self.config.render_poll_ceiling));
                    }
                }
            }
        }
    }
}
