//! Video channel step: the head of the waterfall.
//!
//! Resolution order inside the step mirrors trust: the platform's
//! declared business-email field, then a pattern scan of the
//! API-delivered description, then a scan of the rendered channel page,
//! then a generative read of that page as a last resort.

use super::{RawCandidate, StepContext, StepOutcome};
use crate::capabilities::{ChannelDetails, ChannelSummary, GenerativeTier};
use crate::core::error::{AppError, Result};
use crate::core::models::{PlatformKind, StepDiagnostics};
use crate::extract::{decode_strict, generative_scan, scan_text, ExtractionMethod};
use crate::fetch::TieredFetcher;
use crate::utils::domain::normalize_url;
use serde::Deserialize;
use url::Url;

/// Expected reply of the channel-disambiguation call.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ChoiceReply {
    channel_id: Option<String>,
}

const CHANNEL_CHOICE_INSTRUCTIONS: &str = "\
You are given a JSON artist profile and a JSON list of video channel \
search results. Pick the channel that belongs to this artist. Respond \
with ONLY a JSON object of the form {\"channel_id\": \"...\"} using an \
id copied from the list, or {\"channel_id\": null} if none of the \
results is clearly the artist's channel. No prose, no code fences.";

pub(super) async fn run(ctx: &StepContext<'_>) -> Result<StepOutcome> {
    let link = ctx.entity.link(PlatformKind::VideoHost);

    // A channel id straight out of the URL avoids a search round-trip.
    let url_channel_id = link.and_then(channel_id_from_url);

    let mut details: Option<ChannelDetails> = None;
    let mut searched = false;
    if let Some(ref video) = ctx.caps.video {
        let id = match url_channel_id {
            Some(id) => Some(id),
            None => {
                searched = true;
                resolve_by_search(ctx).await?
            }
        };
        if let Some(id) = id {
            match video.channel_details(&id).await {
                Ok(d) => details = Some(d),
                Err(e) => {
                    tracing::warn!(
                        target: "steps",
                        "[{}] Channel details lookup for {} failed: {}",
                        ctx.task_label,
                        id,
                        e
                    );
                }
            }
        }
    }

    let mut outcome = StepOutcome::default();

    if let Some(ref details) = details {
        if let Some(ref email) = details.business_email {
            if !email.trim().is_empty() {
                outcome.candidates.push(RawCandidate {
                    email: email.trim().to_string(),
                    method: ExtractionMethod::Structured,
                });
            }
        }
        for email in scan_text(ctx.config, &details.description) {
            outcome.candidates.push(RawCandidate {
                email,
                method: ExtractionMethod::MetadataScan,
            });
        }
        outcome.diagnostics.detail = Some(format!("channel resolved: {}", details.id));
    }

    if !outcome.candidates.is_empty() {
        return Ok(outcome);
    }

    // Nothing in the API metadata; read the channel page itself.
    let page_url = match (link, details.as_ref().and_then(|d| d.canonical_url.as_deref())) {
        (Some(url), _) => Some(url.clone()),
        (None, Some(canonical)) => normalize_url(canonical).ok(),
        (None, None) => None,
    };

    if let Some(page_url) = page_url {
        let fetched = fetch_channel_page(ctx, &page_url, &mut outcome.diagnostics).await;
        if let Some(content) = fetched {
            for email in scan_text(ctx.config, &content) {
                outcome.candidates.push(RawCandidate {
                    email,
                    method: ExtractionMethod::PatternScan,
                });
            }
            if outcome.candidates.is_empty() {
                if let Some(ref generative) = ctx.caps.generative {
                    let scan = generative_scan(generative, &content, ctx.task_label).await;
                    outcome.candidates.extend(scan.candidates.into_iter().map(|email| {
                        RawCandidate {
                            email,
                            method: ExtractionMethod::Generative,
                        }
                    }));
                    outcome.rejected.extend(scan.rejected);
                }
            }
        }
    }

    // A channel located by search is useful discovery even with no
    // email: later diagnostics and operators get a confirmed identity.
    outcome.resolved_without_email =
        outcome.candidates.is_empty() && searched && details.is_some();

    if details.is_none() && outcome.candidates.is_empty() && outcome.diagnostics.url.is_none() {
        return Err(AppError::InsufficientInput(
            "no channel could be resolved for entity".to_string(),
        ));
    }

    Ok(outcome)
}

/// Searches the platform for the entity's channel and disambiguates
/// among several hits. `Ok(None)` means the search came back empty or
/// the disambiguator declined every hit.
async fn resolve_by_search(ctx: &StepContext<'_>) -> Result<Option<String>> {
    let video = ctx
        .caps
        .video
        .as_ref()
        .ok_or_else(|| AppError::InsufficientInput("no video metadata capability".to_string()))?;

    let hits = video.search_channels(&ctx.entity.entity.name).await?;
    match hits.len() {
        0 => {
            tracing::debug!(
                target: "steps",
                "[{}] Channel search for '{}' returned nothing",
                ctx.task_label,
                ctx.entity.entity.name
            );
            Ok(None)
        }
        1 => Ok(Some(hits[0].id.clone())),
        _ => Ok(disambiguate(ctx, &hits).await),
    }
}

/// Picks one channel out of several search hits. Prefers the generative
/// disambiguator; falls back to an exact title match, then the top hit.
async fn disambiguate(ctx: &StepContext<'_>, hits: &[ChannelSummary]) -> Option<String> {
    if let Some(ref generative) = ctx.caps.generative {
        // Follower/listener counts are plausibility signals for the
        // comparison, never proof of identity.
        let profile = serde_json::json!({
            "name": ctx.entity.entity.name,
            "country": ctx.entity.entity.country,
            "genres": ctx.entity.entity.genres,
            "follower_count": ctx.entity.entity.follower_count,
            "monthly_listeners": ctx.entity.entity.monthly_listeners,
            "known_links": ctx.entity.links.values().map(|u| u.as_str()).collect::<Vec<_>>(),
            "results": hits,
        });
        match generative
            .complete(GenerativeTier::Fast, CHANNEL_CHOICE_INSTRUCTIONS, &profile.to_string())
            .await
            .and_then(|raw| decode_strict::<ChoiceReply>(&raw))
        {
            Ok(ChoiceReply { channel_id: Some(id) }) => {
                // Only ids copied from the hit list are trusted.
                if hits.iter().any(|h| h.id == id) {
                    return Some(id);
                }
                tracing::warn!(
                    target: "steps",
                    "[{}] Disambiguator invented channel id '{}', ignoring",
                    ctx.task_label,
                    id
                );
            }
            Ok(ChoiceReply { channel_id: None }) => return None,
            Err(e) => {
                tracing::warn!(
                    target: "steps",
                    "[{}] Channel disambiguation failed, using heuristics: {}",
                    ctx.task_label,
                    e
                );
            }
        }
    }

    let wanted = ctx.entity.entity.name.to_lowercase();
    hits.iter()
        .find(|h| h.title.to_lowercase() == wanted)
        .or_else(|| hits.first())
        .map(|h| h.id.clone())
}

/// Fetches the channel page, recording the attempt in the diagnostics
/// either way. Fetch failures degrade the step rather than abort it,
/// since the API metadata may already have resolved the channel.
async fn fetch_channel_page(
    ctx: &StepContext<'_>,
    url: &Url,
    diagnostics: &mut StepDiagnostics,
) -> Option<String> {
    let tiered = TieredFetcher::new(ctx.config, &ctx.caps.fetcher, ctx.caps.renderer.as_ref());
    diagnostics.url = Some(url.to_string());
    match tiered.fetch(url, Some(PlatformKind::VideoHost)).await {
        Ok(fetched) => {
            diagnostics.fetch_tier = Some(fetched.tier);
            diagnostics.content_length = Some(fetched.content.len());
            diagnostics.was_blocked = fetched.was_blocked;
            Some(fetched.content)
        }
        Err(e) => {
            diagnostics.detail = Some(format!("channel page fetch failed: {}", e));
            None
        }
    }
}

/// Extracts a platform channel id from a profile URL, for paths of the
/// `/channel/<id>` form. Handle-style paths need a search instead.
fn channel_id_from_url(url: &Url) -> Option<String> {
    let mut segments = url.path_segments()?;
    match segments.next() {
        Some("channel") => segments.next().filter(|s| !s.is_empty()).map(str::to_string),
        _ => None,
    }
}
