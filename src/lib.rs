//! Contact discovery for musical-artist entities.
//!
//! Given an artist record (name, links, biography), the engine walks a
//! fixed-priority waterfall of discovery methods until one of them
//! yields a validated business-contact email: the video platform's
//! declared contact field, metadata and page scans of known profiles,
//! the artist's own website, and optionally a generative web-research
//! pass. Every candidate goes through a shared quality filter; anything
//! a generative tier produces must additionally be traceable verbatim
//! to the content it claims to come from.
//!
//! ```no_run
//! use std::sync::Arc;
//! use contact_scout::{
//!     Capabilities, ConfigBuilder, Entity, HttpPageFetcher, WaterfallEngine,
//! };
//!
//! # async fn example() -> contact_scout::Result<()> {
//! let config = ConfigBuilder::new().build()?;
//! let fetcher = Arc::new(HttpPageFetcher::new(&config)?);
//! let engine = WaterfallEngine::new(config, Capabilities::new(fetcher))?;
//!
//! let entity = Entity {
//!     id: "artist-1".into(),
//!     name: "Some Artist".into(),
//!     ..Entity::default()
//! };
//! let result = engine.run_pipeline(&entity).await;
//! println!("contactable: {}", result.contactable);
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod capabilities;
pub mod core;
pub mod extract;
pub mod fetch;
mod steps;
mod utils;

pub use crate::batch::{run_batch, BatchSummary, EntityCompleteCallback};
pub use crate::capabilities::{
    Capabilities, ChannelDetails, ChannelSummary, FetchedPage, GenerativeService, GenerativeTier,
    PageFetcher, RenderJobId, RenderJobKind, RenderJobStatus, RenderService, VideoMetadataService,
};
pub use crate::core::config::{Config, ConfigBuilder, ConfidenceWeights};
pub use crate::core::error::{AppError, Result};
pub use crate::core::models::{
    AcceptedCandidate, AuxiliaryInfo, DiscoveryStep, EnrichmentResult, Entity, PlatformKind,
    PlatformLink, ProgressCallback, ProgressEvent, RejectReason, RejectedCandidate, StepId,
    StepStatus,
};
pub use crate::core::pipeline::WaterfallEngine;
pub use crate::fetch::HttpPageFetcher;
pub use crate::steps::{Precondition, SourceClass, StepSpec, STEP_TABLE};
