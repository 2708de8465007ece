//! Capability contracts implemented by external collaborators.
//!
//! The engine is a library: content retrieval, managed rendering, video
//! platform metadata, and generative extraction are all injected behind
//! these traits. Only [`PageFetcher`] is mandatory (a reqwest-backed
//! default lives in [`crate::fetch::HttpPageFetcher`]); everything else is
//! optional and the waterfall skips steps whose capabilities are absent.

use crate::core::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;

/// Raw result of a Tier-1 (direct) page retrieval.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: u16,
    pub body: String,
}

/// Direct content retrieval for a URL.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage>;
}

/// Job types the managed rendering service can run. Platform-specialized
/// kinds exist for known profile layouts; `LinkCrawl` follows the visible
/// outbound links of an aggregator page; `GenericPage` renders anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderJobKind {
    VideoProfile,
    PhotoProfile,
    LinkCrawl,
    GenericPage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderJobId(pub String);

#[derive(Debug, Clone)]
pub enum RenderJobStatus {
    Pending,
    Completed(String),
    Failed(String),
}

/// Asynchronous headless-browser rendering: start a job, poll its status.
/// The engine owns the polling cadence and the wall-clock ceiling.
#[async_trait]
pub trait RenderService: Send + Sync {
    async fn start_job(&self, url: &Url, kind: RenderJobKind) -> Result<RenderJobId>;
    async fn job_status(&self, id: &RenderJobId) -> Result<RenderJobStatus>;
}

/// A channel search hit, before disambiguation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSummary {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Full channel metadata as served by the video platform's API.
///
/// `business_email` is the platform's declared business-contact field,
/// the highest-trust source this engine knows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelDetails {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub business_email: Option<String>,
    #[serde(default)]
    pub subscriber_count: Option<u64>,
    #[serde(default)]
    pub video_count: Option<u64>,
    #[serde(default)]
    pub country: Option<String>,
    /// Canonical public URL of the channel page, when the API provides one.
    #[serde(default)]
    pub canonical_url: Option<String>,
}

/// Video platform metadata: channel search and detail lookup.
#[async_trait]
pub trait VideoMetadataService: Send + Sync {
    async fn search_channels(&self, query: &str) -> Result<Vec<ChannelSummary>>;
    async fn channel_details(&self, channel_id: &str) -> Result<ChannelDetails>;
}

/// Trust tiers of the generative capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerativeTier {
    /// Cheap/fast model for extraction and classification over literal
    /// content supplied in the request.
    Fast,
    /// Capable model with simulated web browsing and citation support,
    /// for deep-dive multi-hop discovery.
    Research,
}

/// Generative extraction. Implementations return the model's raw reply
/// text; the engine owns prompt construction and strict schema decoding,
/// so a sloppy reply can never leak unvalidated data into a result.
#[async_trait]
pub trait GenerativeService: Send + Sync {
    async fn complete(
        &self,
        tier: GenerativeTier,
        instructions: &str,
        content: &str,
    ) -> Result<String>;
}

/// The full set of collaborator capabilities injected into the engine.
#[derive(Clone)]
pub struct Capabilities {
    pub fetcher: Arc<dyn PageFetcher>,
    pub renderer: Option<Arc<dyn RenderService>>,
    pub video: Option<Arc<dyn VideoMetadataService>>,
    pub generative: Option<Arc<dyn GenerativeService>>,
}

impl Capabilities {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            fetcher,
            renderer: None,
            video: None,
            generative: None,
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn RenderService>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn with_video(mut self, video: Arc<dyn VideoMetadataService>) -> Self {
        self.video = Some(video);
        self
    }

    pub fn with_generative(mut self, generative: Arc<dyn GenerativeService>) -> Self {
        self.generative = Some(generative);
        self
    }
}
