//! Deep-dive web research, the final tier of the waterfall.
//!
//! Runs only when explicitly enabled. The Research tier is allowed to
//! browse beyond content this engine supplies, so its provenance rule is
//! strict: an email is accepted only when it appears verbatim in the
//! `source_excerpt` the reply itself carries. No excerpt, no email.

use super::{RawCandidate, StepContext, StepOutcome};
use crate::core::error::{AppError, Result};
use crate::core::models::{RejectReason, RejectedCandidate};
use crate::capabilities::GenerativeTier;
use crate::extract::{appears_verbatim, decode_strict, ExtractionMethod, ResearchReply};

const RESEARCH_INSTRUCTIONS: &str = "\
You are given a JSON profile of a musical artist. Research the artist \
online and find a business or booking contact email address, plus any of: \
official website, management company, booking agent. Reply with exactly \
this JSON and nothing else: {\"email\": string or null, \"website\": \
string or null, \"management\": string or null, \"booking_agent\": string \
or null, \"source_excerpt\": string or null, \"source_description\": \
string or null}. If you report an email, source_excerpt MUST be a \
verbatim quote from the page where you found it, containing the email \
exactly as written. Never guess or construct an address.";

pub(super) async fn run(ctx: &StepContext<'_>) -> Result<StepOutcome> {
    let generative = ctx
        .caps
        .generative
        .as_ref()
        .ok_or_else(|| AppError::InsufficientInput("no generative capability".to_string()))?;

    let profile = serde_json::json!({
        "name": ctx.entity.entity.name,
        "country": ctx.entity.entity.country,
        "genres": ctx.entity.entity.genres,
        "biography": ctx.entity.entity.biography,
        "known_links": ctx.entity.links.values().map(|u| u.as_str()).collect::<Vec<_>>(),
    });

    let raw = generative
        .complete(GenerativeTier::Research, RESEARCH_INSTRUCTIONS, &profile.to_string())
        .await?;
    let reply: ResearchReply = decode_strict(&raw)?;

    let mut outcome = StepOutcome::default();
    outcome.aux.website = reply.website.filter(|s| !s.trim().is_empty());
    outcome.aux.management = reply.management.filter(|s| !s.trim().is_empty());
    outcome.aux.booking_agent = reply.booking_agent.filter(|s| !s.trim().is_empty());
    outcome.diagnostics.detail = reply.source_description;

    if let Some(email) = reply.email.filter(|e| !e.trim().is_empty()) {
        let email = email.trim().to_string();
        let excerpt = reply.source_excerpt.as_deref().unwrap_or("");
        if appears_verbatim(excerpt, &email) {
            outcome.candidates.push(RawCandidate {
                email,
                method: ExtractionMethod::WebResearch,
            });
        } else {
            tracing::warn!(
                target: "steps",
                "[{}] Research reply email '{}' not backed by its excerpt, rejecting",
                ctx.task_label,
                email
            );
            outcome.rejected.push(RejectedCandidate {
                email,
                reason: RejectReason::NotInSource,
            });
        }
    }

    outcome.resolved_without_email = outcome.candidates.is_empty() && !outcome.aux.is_empty();
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_research_reply_decodes_full_shape() {
        let raw = r#"{
            "email": "mgmt@artistband.com",
            "website": "https://artistband.com",
            "management": "Big Deal Mgmt",
            "booking_agent": null,
            "source_excerpt": "For inquiries contact mgmt@artistband.com",
            "source_description": "official website contact page"
        }"#;
        let reply: ResearchReply = decode_strict(raw).unwrap();
        assert_eq!(reply.email.as_deref(), Some("mgmt@artistband.com"));
        assert!(appears_verbatim(
            reply.source_excerpt.as_deref().unwrap(),
            reply.email.as_deref().unwrap()
        ));
    }

    #[test]
    fn test_unbacked_email_fails_the_excerpt_check() {
        let raw = r#"{"email": "contact@artistband.com", "source_excerpt": "reach the band via their site"}"#;
        let reply: ResearchReply = decode_strict(raw).unwrap();
        assert!(!appears_verbatim(
            reply.source_excerpt.as_deref().unwrap(),
            reply.email.as_deref().unwrap()
        ));
    }
}
