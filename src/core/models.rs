//! Data structures for entities, discovery steps, and enrichment results.

use crate::utils::domain::{host_of, normalize_url};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use url::Url;

/// The known platform families an entity link can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformKind {
    VideoHost,
    PhotoSharing,
    Website,
    LinkAggregator,
}

/// A raw link or handle attached to the input entity.
///
/// `label` is whatever platform name the upstream record carried
/// ("youtube", "insta", "site", ...). Classification happens exactly once,
/// at ingestion; step handlers only ever see normalized [`PlatformKind`]s.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformLink {
    #[serde(default)]
    pub label: Option<String>,
    pub value: String,
}

/// Read-only input record: the artist profile being enriched.
///
/// Follower/listener counts are plausibility signals for channel
/// disambiguation only, never proof of identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub links: Vec<PlatformLink>,
    #[serde(default)]
    pub biography: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub follower_count: Option<u64>,
    #[serde(default)]
    pub monthly_listeners: Option<u64>,
}

/// Entity after the single ingestion-time normalization pass.
#[derive(Debug, Clone)]
pub struct ValidatedEntity {
    pub entity: Entity,
    /// At most one normalized URL per platform family; first link wins.
    pub links: BTreeMap<PlatformKind, Url>,
}

impl ValidatedEntity {
    pub fn link(&self, kind: PlatformKind) -> Option<&Url> {
        self.links.get(&kind)
    }

    pub fn biography(&self) -> Option<&str> {
        self.entity
            .biography
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
    }
}

fn classify_label(label: &str) -> Option<PlatformKind> {
    match label.trim().to_lowercase().as_str() {
        "youtube" | "yt" | "video" | "channel" => Some(PlatformKind::VideoHost),
        "instagram" | "insta" | "ig" | "photo" => Some(PlatformKind::PhotoSharing),
        "website" | "site" | "web" | "homepage" | "official" => Some(PlatformKind::Website),
        "linktree" | "links" | "aggregator" | "biolink" => Some(PlatformKind::LinkAggregator),
        _ => None,
    }
}

fn classify_host(host: &str) -> PlatformKind {
    const VIDEO_HOSTS: &[&str] = &["youtube.com", "youtu.be", "vimeo.com"];
    const PHOTO_HOSTS: &[&str] = &["instagram.com", "flickr.com"];
    const AGGREGATOR_HOSTS: &[&str] = &[
        "linktr.ee",
        "lnk.bio",
        "beacons.ai",
        "linkin.bio",
        "carrd.co",
        "solo.to",
    ];

    let matches = |list: &[&str]| {
        list.iter()
            .any(|d| host == *d || host.ends_with(&format!(".{}", d)))
    };

    if matches(VIDEO_HOSTS) {
        PlatformKind::VideoHost
    } else if matches(PHOTO_HOSTS) {
        PlatformKind::PhotoSharing
    } else if matches(AGGREGATOR_HOSTS) {
        PlatformKind::LinkAggregator
    } else {
        PlatformKind::Website
    }
}

/// Normalizes the raw input record into a [`ValidatedEntity`].
///
/// Link classification prefers the record's own label and falls back to
/// host sniffing. Unparseable link values are dropped with a warning;
/// they never fail the run (an entity with no usable links simply has
/// every fetch-backed step skipped).
pub fn validate_entity(entity: &Entity) -> ValidatedEntity {
    let mut links: BTreeMap<PlatformKind, Url> = BTreeMap::new();

    for link in &entity.links {
        let url = match normalize_url(&link.value) {
            Ok(u) => u,
            Err(e) => {
                tracing::warn!(
                    target: "ingest",
                    "[{}] Dropping unusable link '{}': {}",
                    entity.id,
                    link.value,
                    e
                );
                continue;
            }
        };

        let kind = link
            .label
            .as_deref()
            .and_then(classify_label)
            .or_else(|| host_of(&url).map(|h| classify_host(&h)));

        if let Some(kind) = kind {
            links.entry(kind).or_insert(url);
        }
    }

    ValidatedEntity {
        entity: entity.clone(),
        links,
    }
}

/// Identifier of one discovery method in the waterfall, in wire-stable form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    VideoChannel,
    Biography,
    PhotoProfile,
    LinkAggregator,
    Website,
    WebResearch,
}

impl StepId {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepId::VideoChannel => "video_channel",
            StepId::Biography => "biography",
            StepId::PhotoProfile => "photo_profile",
            StepId::LinkAggregator => "link_aggregator",
            StepId::Website => "website",
            StepId::WebResearch => "web_research",
        }
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Success,
    Failed,
    Skipped,
}

/// Which tier a fetch was ultimately served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchTierUsed {
    Direct,
    Rendered,
}

/// Per-step diagnostics kept for the auditable trail.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepDiagnostics {
    pub url: Option<String>,
    pub fetch_tier: Option<FetchTierUsed>,
    pub content_length: Option<usize>,
    pub was_blocked: bool,
    /// Error text, skip reason, or other human-readable detail.
    pub detail: Option<String>,
}

/// Why a syntactically plausible candidate was thrown out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    InvalidFormat,
    PlatformDomain,
    PlaceholderDomain,
    RoleAddress,
    Obfuscated,
    BlockedDomain,
    /// Generative output that could not be traced verbatim to the content
    /// it was extracted from.
    NotInSource,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RejectReason::InvalidFormat => "invalid email format",
            RejectReason::PlatformDomain => "address on a platform-owned domain",
            RejectReason::PlaceholderDomain => "placeholder or test domain",
            RejectReason::RoleAddress => "generic role address",
            RejectReason::Obfuscated => "visually obfuscated/masked address",
            RejectReason::BlockedDomain => "domain on the explicit blocklist",
            RejectReason::NotInSource => "not found verbatim in source content",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedCandidate {
    pub email: String,
    pub reason: RejectReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptedCandidate {
    pub email: String,
    pub source: StepId,
    pub confidence: f32,
}

/// One discovery method's mutable record within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryStep {
    pub id: StepId,
    pub label: String,
    pub status: StepStatus,
    pub accepted: Vec<String>,
    pub rejected: Vec<RejectedCandidate>,
    pub best_email: Option<String>,
    pub confidence: Option<f32>,
    pub duration_ms: u64,
    pub diagnostics: StepDiagnostics,
}

impl DiscoveryStep {
    pub(crate) fn pending(id: StepId, label: &str) -> Self {
        Self {
            id,
            label: label.to_string(),
            status: StepStatus::Pending,
            accepted: Vec::new(),
            rejected: Vec::new(),
            best_email: None,
            confidence: None,
            duration_ms: 0,
            diagnostics: StepDiagnostics::default(),
        }
    }
}

/// Optional fields picked up opportunistically along the way.
///
/// Merge semantics are first non-empty value wins, in step priority order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuxiliaryInfo {
    pub website: Option<String>,
    pub management: Option<String>,
    pub booking_agent: Option<String>,
}

impl AuxiliaryInfo {
    pub fn is_empty(&self) -> bool {
        self.website.is_none() && self.management.is_none() && self.booking_agent.is_none()
    }

    /// First-wins merge: fields already set are never overridden.
    pub(crate) fn merge_from(&mut self, other: &AuxiliaryInfo) {
        if self.website.is_none() {
            self.website.clone_from(&other.website);
        }
        if self.management.is_none() {
            self.management.clone_from(&other.management);
        }
        if self.booking_agent.is_none() {
            self.booking_agent.clone_from(&other.booking_agent);
        }
    }
}

/// Final per-entity output of the waterfall. Constructed fresh per run and
/// handed back to the caller; persistence is the caller's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentResult {
    pub entity_id: String,
    pub best_email: Option<String>,
    pub best_confidence: Option<f32>,
    pub best_source: Option<StepId>,
    pub accepted: Vec<AcceptedCandidate>,
    pub rejected: Vec<RejectedCandidate>,
    pub steps: Vec<DiscoveryStep>,
    pub contactable: bool,
    pub duration_ms: u64,
    pub auxiliary: AuxiliaryInfo,
}

/// Emitted after every step status transition for live reporting.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub entity_id: String,
    pub step: StepId,
    pub status: StepStatus,
}

/// Callback invoked on every [`ProgressEvent`].
pub type ProgressCallback = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    fn entity_with_links(links: Vec<PlatformLink>) -> Entity {
        Entity {
            id: "ent-1".to_string(),
            name: "Test Artist".to_string(),
            links,
            ..Entity::default()
        }
    }

    #[test]
    fn test_link_classification_by_host() {
        let validated = validate_entity(&entity_with_links(vec![
            PlatformLink {
                label: None,
                value: "https://www.youtube.com/channel/UCabc".into(),
            },
            PlatformLink {
                label: None,
                value: "https://linktr.ee/artist".into(),
            },
            PlatformLink {
                label: None,
                value: "https://artist.example".into(),
            },
        ]));

        assert!(validated.link(PlatformKind::VideoHost).is_some());
        assert!(validated.link(PlatformKind::LinkAggregator).is_some());
        assert_eq!(
            validated.link(PlatformKind::Website).unwrap().as_str(),
            "https://artist.example/"
        );
    }

    #[test]
    fn test_link_classification_label_overrides_host() {
        // A labeled link wins even when the host would sniff differently.
        let validated = validate_entity(&entity_with_links(vec![PlatformLink {
            label: Some("insta".into()),
            value: "https://example.com/artistpics".into(),
        }]));
        assert!(validated.link(PlatformKind::PhotoSharing).is_some());
        assert!(validated.link(PlatformKind::Website).is_none());
    }

    #[test]
    fn test_first_link_per_kind_wins() {
        let validated = validate_entity(&entity_with_links(vec![
            PlatformLink {
                label: None,
                value: "https://first.example".into(),
            },
            PlatformLink {
                label: None,
                value: "https://second.example".into(),
            },
        ]));
        assert_eq!(
            validated.link(PlatformKind::Website).unwrap().as_str(),
            "https://first.example/"
        );
    }

    #[test]
    fn test_unparseable_links_dropped() {
        let validated = validate_entity(&entity_with_links(vec![PlatformLink {
            label: None,
            value: "   ".into(),
        }]));
        assert!(validated.links.is_empty());
    }

    #[test]
    fn test_aux_merge_first_wins() {
        let mut aux = AuxiliaryInfo {
            website: Some("https://x.example".into()),
            ..AuxiliaryInfo::default()
        };
        aux.merge_from(&AuxiliaryInfo {
            website: Some("https://y.example".into()),
            management: Some("Mgmt Co".into()),
            booking_agent: None,
        });
        assert_eq!(aux.website.as_deref(), Some("https://x.example"));
        assert_eq!(aux.management.as_deref(), Some("Mgmt Co"));
    }
}
