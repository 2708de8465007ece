//! The discovery methods, driven by a declarative ordered step table.
//!
//! Adding a new method means appending a [`StepSpec`] row and one handler
//! arm in [`run_step`]; the controller knows nothing about individual
//! methods.

mod biography;
mod page_scan;
mod video_channel;
mod web_research;

use crate::capabilities::Capabilities;
use crate::core::config::{Config, ConfidenceWeights};
use crate::core::error::Result;
use crate::core::models::{
    AuxiliaryInfo, PlatformKind, RejectedCandidate, StepDiagnostics, StepId, ValidatedEntity,
};
use crate::extract::ExtractionMethod;

/// Which class of source a step's pattern scan reads. Determines the
/// confidence weight of `PatternScan` candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceClass {
    /// Platform-native profile content (video channel, photo profile, bio).
    Primary,
    /// Aggregator pages and arbitrary artist websites.
    Secondary,
}

/// Gate that must hold for a step to run at all. Unmet preconditions mark
/// the step skipped with a reason; they are not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// A video-host link, or a video metadata capability to search with.
    VideoSource,
    /// A non-empty biography on the entity record.
    HasBiography,
    /// A normalized link of the given platform family.
    HasLink(PlatformKind),
    /// A website link, or an auxiliary website resolved by an earlier step.
    WebsiteKnown,
    /// Web research enabled in config (capability checked at engine build).
    ResearchEnabled,
}

impl Precondition {
    /// Returns the skip reason when the precondition is unmet.
    pub(crate) fn unmet_reason(
        &self,
        entity: &ValidatedEntity,
        run: &RunContext,
        caps: &Capabilities,
        config: &Config,
    ) -> Option<String> {
        match self {
            Precondition::VideoSource => {
                if entity.link(PlatformKind::VideoHost).is_some() || caps.video.is_some() {
                    None
                } else {
                    Some("no video-host link and no video metadata capability".to_string())
                }
            }
            Precondition::HasBiography => {
                if entity.biography().is_some() {
                    None
                } else {
                    Some("entity has no biography text".to_string())
                }
            }
            Precondition::HasLink(kind) => {
                if entity.link(*kind).is_some() {
                    None
                } else {
                    Some(format!("entity has no {:?} link", kind))
                }
            }
            Precondition::WebsiteKnown => {
                if entity.link(PlatformKind::Website).is_some() || run.aux.website.is_some() {
                    None
                } else {
                    Some("no website link known or resolved by earlier steps".to_string())
                }
            }
            Precondition::ResearchEnabled => {
                if config.enable_web_research && caps.generative.is_some() {
                    None
                } else {
                    Some("web research disabled or generative capability absent".to_string())
                }
            }
        }
    }
}

/// One row of the waterfall: identity, gate, and scan weighting.
#[derive(Debug, Clone, Copy)]
pub struct StepSpec {
    pub id: StepId,
    pub label: &'static str,
    pub precondition: Precondition,
    pub source_class: SourceClass,
}

/// The waterfall, in fixed priority order.
pub const STEP_TABLE: &[StepSpec] = &[
    StepSpec {
        id: StepId::VideoChannel,
        label: "Video channel metadata",
        precondition: Precondition::VideoSource,
        source_class: SourceClass::Primary,
    },
    StepSpec {
        id: StepId::Biography,
        label: "Profile biography scan",
        precondition: Precondition::HasBiography,
        source_class: SourceClass::Primary,
    },
    StepSpec {
        id: StepId::PhotoProfile,
        label: "Photo profile page",
        precondition: Precondition::HasLink(PlatformKind::PhotoSharing),
        source_class: SourceClass::Primary,
    },
    StepSpec {
        id: StepId::LinkAggregator,
        label: "Link aggregator crawl",
        precondition: Precondition::HasLink(PlatformKind::LinkAggregator),
        source_class: SourceClass::Secondary,
    },
    StepSpec {
        id: StepId::Website,
        label: "Artist website scan",
        precondition: Precondition::WebsiteKnown,
        source_class: SourceClass::Secondary,
    },
    StepSpec {
        id: StepId::WebResearch,
        label: "Generative web research",
        precondition: Precondition::ResearchEnabled,
        source_class: SourceClass::Secondary,
    },
];

/// A candidate email before quality filtering, tagged with how it was
/// obtained so each candidate can carry its own confidence.
#[derive(Debug, Clone)]
pub struct RawCandidate {
    pub email: String,
    pub method: ExtractionMethod,
}

/// Everything a step handler reports back to the controller.
#[derive(Debug, Default)]
pub struct StepOutcome {
    pub candidates: Vec<RawCandidate>,
    /// Rejections produced inside the handler (anti-hallucination).
    pub rejected: Vec<RejectedCandidate>,
    pub aux: AuxiliaryInfo,
    pub diagnostics: StepDiagnostics,
    /// True when the step resolved useful data (a canonical URL, an
    /// auxiliary field) without finding any email. Such steps are marked
    /// `Success` with zero emails and never trigger early termination.
    pub resolved_without_email: bool,
}

/// Mutable run-scoped state later steps may depend on.
#[derive(Debug, Default)]
pub struct RunContext {
    pub aux: AuxiliaryInfo,
}

/// Read-only view handed to step handlers.
pub struct StepContext<'a> {
    pub config: &'a Config,
    pub caps: &'a Capabilities,
    pub entity: &'a ValidatedEntity,
    pub run: &'a RunContext,
    pub task_label: &'a str,
}

/// Resolves the confidence weight for a candidate of the given method,
/// in the context of a step's source class.
pub(crate) fn weight_for(
    weights: &ConfidenceWeights,
    source_class: SourceClass,
    method: ExtractionMethod,
) -> f32 {
    match method {
        ExtractionMethod::Structured => weights.structured,
        ExtractionMethod::MetadataScan => weights.metadata_scan,
        ExtractionMethod::PatternScan => match source_class {
            SourceClass::Primary => weights.primary_scan,
            SourceClass::Secondary => weights.secondary_scan,
        },
        ExtractionMethod::Generative => weights.generative,
        ExtractionMethod::WebResearch => weights.web_research,
    }
}

/// Dispatches one step to its handler.
pub(crate) async fn run_step(id: StepId, ctx: &StepContext<'_>) -> Result<StepOutcome> {
    match id {
        StepId::VideoChannel => video_channel::run(ctx).await,
        StepId::Biography => biography::run(ctx),
        StepId::PhotoProfile => page_scan::run_photo_profile(ctx).await,
        StepId::LinkAggregator => page_scan::run_link_aggregator(ctx).await,
        StepId::Website => page_scan::run_website(ctx).await,
        StepId::WebResearch => web_research::run(ctx).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_table_order_is_the_waterfall() {
        let ids: Vec<StepId> = STEP_TABLE.iter().map(|s| s.id).collect();
        assert_eq!(
            ids,
            vec![
                StepId::VideoChannel,
                StepId::Biography,
                StepId::PhotoProfile,
                StepId::LinkAggregator,
                StepId::Website,
                StepId::WebResearch,
            ]
        );
    }

    #[test]
    fn test_weights_decrease_with_indirection() {
        let weights = ConfidenceWeights::default();
        let structured = weight_for(&weights, SourceClass::Primary, ExtractionMethod::Structured);
        let metadata = weight_for(&weights, SourceClass::Primary, ExtractionMethod::MetadataScan);
        let primary = weight_for(&weights, SourceClass::Primary, ExtractionMethod::PatternScan);
        let secondary = weight_for(&weights, SourceClass::Secondary, ExtractionMethod::PatternScan);
        let generative = weight_for(&weights, SourceClass::Primary, ExtractionMethod::Generative);
        let research = weight_for(&weights, SourceClass::Secondary, ExtractionMethod::WebResearch);

        assert!(structured > metadata);
        assert!(metadata > primary);
        assert!(primary > secondary);
        assert!(secondary > generative);
        assert!(generative > research);
    }
}
