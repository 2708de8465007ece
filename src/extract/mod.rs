//! Candidate extraction: deterministic scanning, generative assists, and
//! the anti-hallucination contract.

mod filter;
mod patterns;

pub use filter::{filter_emails, FilterVerdict};
pub(crate) use patterns::{first_external_link, scan_text};

use crate::capabilities::{GenerativeService, GenerativeTier};
use crate::core::models::{RejectReason, RejectedCandidate};
use crate::core::error::{AppError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How a candidate was obtained. Drives confidence weighting: trust
/// decreases with indirection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Declared business-contact field of a content source.
    Structured,
    /// Pattern scan over API-delivered metadata text.
    MetadataScan,
    /// Pattern scan over fetched page content.
    PatternScan,
    /// Generative extraction from literal fetched content.
    Generative,
    /// Web-search-augmented generative deep dive.
    WebResearch,
}

/// Expected reply of the Fast-tier extraction call.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct FastExtractionReply {
    pub email: Option<String>,
    #[serde(default)]
    pub source_description: Option<String>,
}

/// Expected reply of the Research-tier deep-dive call.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ResearchReply {
    pub email: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub management: Option<String>,
    #[serde(default)]
    pub booking_agent: Option<String>,
    /// Verbatim excerpt of the page the model claims the email came from.
    /// Mandatory provenance for any email surfaced by this tier.
    #[serde(default)]
    pub source_excerpt: Option<String>,
    #[serde(default)]
    pub source_description: Option<String>,
}

/// Strict schema-validated decoding of a generative reply.
///
/// Any mismatch (trailing prose, unknown fields, malformed JSON) is an
/// [`AppError::ExtractionParse`]. There is deliberately no "find the first
/// `{...}` block" salvage path; a reply that is not exactly the requested
/// JSON is worth nothing.
pub(crate) fn decode_strict<T: DeserializeOwned>(raw: &str) -> Result<T> {
    serde_json::from_str(raw.trim())
        .map_err(|e| AppError::ExtractionParse(format!("{} (reply: {:.120})", e, raw.trim())))
}

/// Case-insensitive literal substring check, the anti-hallucination
/// contract in one place.
pub(crate) fn appears_verbatim(content: &str, needle: &str) -> bool {
    !needle.trim().is_empty() && content.to_lowercase().contains(&needle.trim().to_lowercase())
}

/// Output of one generative extraction attempt.
#[derive(Debug, Default)]
pub(crate) struct GenerativeScan {
    pub candidates: Vec<String>,
    pub rejected: Vec<RejectedCandidate>,
}

const FAST_EXTRACTION_INSTRUCTIONS: &str = "\
You are given the literal text content of a web page about a musical artist. \
Find a business or booking contact email address for the artist. \
Reply with exactly this JSON and nothing else: \
{\"email\": string or null, \"source_description\": string or null}. \
Only return an email address that appears verbatim in the supplied content. \
If no email appears in the content, return null. Never guess or construct one.";

/// Last-resort extraction over literal fetched content.
///
/// Failures are absorbed: a transport error or a reply that fails strict
/// decoding is zero candidates, never a step-level error (there may still
/// be nothing to find). A reply email that is not a literal substring of
/// `content` is recorded as a rejection, not silently dropped: the trail
/// must show what the model tried to claim.
pub(crate) async fn generative_scan(
    generative: &Arc<dyn GenerativeService>,
    content: &str,
    task_label: &str,
) -> GenerativeScan {
    let mut scan = GenerativeScan::default();

    let raw = match generative
        .complete(GenerativeTier::Fast, FAST_EXTRACTION_INSTRUCTIONS, content)
        .await
    {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(target: "extract", "[{}] Generative call failed: {}", task_label, e);
            return scan;
        }
    };

    let reply: FastExtractionReply = match decode_strict(&raw) {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!(target: "extract", "[{}] {}", task_label, e);
            return scan;
        }
    };

    if let Some(email) = reply.email {
        if appears_verbatim(content, &email) {
            tracing::debug!(
                target: "extract",
                "[{}] Generative candidate '{}' verified in source ({})",
                task_label,
                email,
                reply.source_description.as_deref().unwrap_or("no description")
            );
            scan.candidates.push(email.trim().to_lowercase());
        } else {
            tracing::warn!(
                target: "extract",
                "[{}] Generative candidate '{}' NOT present in supplied content; discarding",
                task_label,
                email
            );
            scan.rejected.push(RejectedCandidate {
                email: email.trim().to_lowercase(),
                reason: RejectReason::NotInSource,
            });
        }
    }

    scan
}
