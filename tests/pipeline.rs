//! End-to-end waterfall runs against mock capabilities.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use contact_scout::{
    run_batch, AppError, Capabilities, ChannelDetails, ChannelSummary, Config, ConfigBuilder,
    Entity, FetchedPage, GenerativeService, GenerativeTier, PageFetcher, PlatformLink, RejectReason,
    Result, StepId, StepStatus, VideoMetadataService, WaterfallEngine,
};

fn test_config() -> Config {
    ConfigBuilder::new()
        .request_timeout(Duration::from_secs(2))
        .min_content_length(10)
        .inter_step_delay(0.0, 0.0)
        .inter_entity_delay(0.0, 0.0)
        .entity_deadline(Duration::from_secs(60))
        .build()
        .unwrap()
}

fn entity(id: &str, name: &str, links: Vec<(&str, &str)>, biography: Option<&str>) -> Entity {
    Entity {
        id: id.to_string(),
        name: name.to_string(),
        links: links
            .into_iter()
            .map(|(label, value)| PlatformLink {
                label: Some(label.to_string()),
                value: value.to_string(),
            })
            .collect(),
        biography: biography.map(str::to_string),
        ..Entity::default()
    }
}

/// Serves canned pages by exact URL, 404s everything else, and counts calls.
struct MapFetcher {
    pages: HashMap<String, (u16, String)>,
    calls: AtomicUsize,
}

impl MapFetcher {
    fn new(pages: Vec<(&str, u16, &str)>) -> Arc<Self> {
        Arc::new(Self {
            pages: pages
                .into_iter()
                .map(|(url, status, body)| (url.to_string(), (status, body.to_string())))
                .collect(),
            calls: AtomicUsize::new(0),
        })
    }

    fn empty() -> Arc<Self> {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl PageFetcher for MapFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.pages.get(url.as_str()) {
            Some((status, body)) => Ok(FetchedPage {
                status: *status,
                body: body.clone(),
            }),
            None => Ok(FetchedPage {
                status: 404,
                body: String::new(),
            }),
        }
    }
}

/// Never completes a fetch, so the entity deadline always fires first.
struct HangingFetcher;

#[async_trait]
impl PageFetcher for HangingFetcher {
    async fn fetch(&self, _url: &Url) -> Result<FetchedPage> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(FetchedPage {
            status: 200,
            body: String::new(),
        })
    }
}

struct MockVideo {
    hits: Vec<ChannelSummary>,
    details: ChannelDetails,
}

#[async_trait]
impl VideoMetadataService for MockVideo {
    async fn search_channels(&self, _query: &str) -> Result<Vec<ChannelSummary>> {
        Ok(self.hits.clone())
    }

    async fn channel_details(&self, channel_id: &str) -> Result<ChannelDetails> {
        if channel_id == self.details.id {
            Ok(self.details.clone())
        } else {
            Err(AppError::Transport(format!("unknown channel {}", channel_id)))
        }
    }
}

struct MockGenerative {
    fast_reply: String,
    research_reply: String,
}

#[async_trait]
impl GenerativeService for MockGenerative {
    async fn complete(&self, tier: GenerativeTier, _instructions: &str, _content: &str) -> Result<String> {
        Ok(match tier {
            GenerativeTier::Fast => self.fast_reply.clone(),
            GenerativeTier::Research => self.research_reply.clone(),
        })
    }
}

fn step<'a>(result: &'a contact_scout::EnrichmentResult, id: StepId) -> &'a contact_scout::DiscoveryStep {
    result.steps.iter().find(|s| s.id == id).unwrap()
}

#[tokio::test]
async fn test_channel_description_email_resolves_and_terminates() {
    let video = MockVideo {
        hits: Vec::new(),
        details: ChannelDetails {
            id: "UCabc123".to_string(),
            title: "Artist".to_string(),
            description: "For business inquiries contact: booking@artistband.com".to_string(),
            ..ChannelDetails::default()
        },
    };
    let caps = Capabilities::new(MapFetcher::empty()).with_video(Arc::new(video));
    let engine = WaterfallEngine::new(test_config(), caps).unwrap();

    let artist = entity(
        "a1",
        "Artist",
        vec![("youtube", "https://www.youtube.com/channel/UCabc123")],
        Some("An artist biography long enough to scan."),
    );
    let result = engine.run_pipeline(&artist).await;

    assert!(result.contactable);
    assert_eq!(result.best_email.as_deref(), Some("booking@artistband.com"));
    assert_eq!(result.best_source, Some(StepId::VideoChannel));
    let confidence = result.best_confidence.unwrap();
    assert!((confidence - 0.85).abs() < 1e-6, "got {}", confidence);

    assert_eq!(step(&result, StepId::VideoChannel).status, StepStatus::Success);
    for id in [
        StepId::Biography,
        StepId::PhotoProfile,
        StepId::LinkAggregator,
        StepId::Website,
        StepId::WebResearch,
    ] {
        assert_eq!(step(&result, id).status, StepStatus::Skipped, "{:?}", id);
    }
}

#[tokio::test]
async fn test_declared_business_email_outranks_description_scan() {
    let video = MockVideo {
        hits: Vec::new(),
        details: ChannelDetails {
            id: "UCabc123".to_string(),
            title: "Artist".to_string(),
            description: "press: press@artistband.com".to_string(),
            business_email: Some("mgmt@artistband.com".to_string()),
            ..ChannelDetails::default()
        },
    };
    let caps = Capabilities::new(MapFetcher::empty()).with_video(Arc::new(video));
    let engine = WaterfallEngine::new(test_config(), caps).unwrap();

    let artist = entity(
        "a2",
        "Artist",
        vec![("youtube", "https://www.youtube.com/channel/UCabc123")],
        None,
    );
    let result = engine.run_pipeline(&artist).await;

    assert_eq!(result.best_email.as_deref(), Some("mgmt@artistband.com"));
    assert!((result.best_confidence.unwrap() - 0.88).abs() < 1e-6);
    assert_eq!(result.accepted.len(), 2);
}

#[tokio::test]
async fn test_exhausted_waterfall_reports_every_step() {
    let page = "x".repeat(400);
    let fetcher = MapFetcher::new(vec![("https://instagram.com/artist", 200, page.as_str())]);
    let engine = WaterfallEngine::new(test_config(), Capabilities::new(fetcher)).unwrap();

    let artist = entity(
        "b1",
        "Obscure Artist",
        vec![
            ("instagram", "https://instagram.com/artist"),
            ("website", "https://deadsite.example/"),
        ],
        None,
    );
    let result = engine.run_pipeline(&artist).await;

    assert!(!result.contactable);
    assert!(result.best_email.is_none());
    assert_eq!(step(&result, StepId::VideoChannel).status, StepStatus::Skipped);
    assert_eq!(step(&result, StepId::Biography).status, StepStatus::Skipped);
    assert_eq!(step(&result, StepId::PhotoProfile).status, StepStatus::Failed);
    assert_eq!(step(&result, StepId::LinkAggregator).status, StepStatus::Skipped);

    let website = step(&result, StepId::Website);
    assert_eq!(website.status, StepStatus::Failed);
    assert!(website.diagnostics.detail.as_deref().unwrap().contains("404"));

    assert_eq!(step(&result, StepId::WebResearch).status, StepStatus::Skipped);
}

#[tokio::test]
async fn test_deadline_expiry_fails_the_step_and_keeps_walking() {
    let config = Config {
        entity_deadline: Duration::from_millis(300),
        request_timeout: Duration::from_secs(30),
        inter_step_delay: (0.0, 0.0),
        inter_entity_delay: (0.0, 0.0),
        ..Config::default()
    };
    let engine =
        WaterfallEngine::new(config, Capabilities::new(Arc::new(HangingFetcher))).unwrap();

    let artist = entity(
        "d1",
        "Slow Artist",
        vec![
            ("instagram", "https://instagram.com/slowartist"),
            ("website", "https://slowartist.example/"),
        ],
        None,
    );
    let result = engine.run_pipeline(&artist).await;

    assert!(!result.contactable);

    // The hung step is cut off at the deadline, not left dangling.
    let photo = step(&result, StepId::PhotoProfile);
    assert_eq!(photo.status, StepStatus::Failed);
    assert!(photo.diagnostics.detail.as_deref().unwrap().contains("deadline"));

    // The walk continues: the website step still gets a terminal status.
    let website = step(&result, StepId::Website);
    assert_eq!(website.status, StepStatus::Failed);
    assert!(website.diagnostics.detail.as_deref().unwrap().contains("deadline"));

    for s in &result.steps {
        assert!(
            !matches!(s.status, StepStatus::Pending | StepStatus::Running),
            "step {:?} has no terminal status",
            s.id
        );
    }
}

#[tokio::test]
async fn test_early_termination_never_touches_lower_steps() {
    let fetcher = MapFetcher::empty();
    let engine =
        WaterfallEngine::new(test_config(), Capabilities::new(fetcher.clone())).unwrap();

    let artist = entity(
        "c1",
        "Artist",
        vec![
            ("instagram", "https://instagram.com/artist"),
            ("website", "https://artistband.com/"),
        ],
        Some("Booking: mgmt@artistband.com"),
    );
    let result = engine.run_pipeline(&artist).await;

    assert!(result.contactable);
    assert_eq!(result.best_source, Some(StepId::Biography));
    assert!((result.best_confidence.unwrap() - 0.82).abs() < 1e-6);
    assert_eq!(step(&result, StepId::PhotoProfile).status, StepStatus::Skipped);
    assert_eq!(step(&result, StepId::Website).status, StepStatus::Skipped);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0, "no page was fetched");
}

#[tokio::test]
async fn test_hallucinated_generative_email_is_rejected() {
    let page = format!("{} no contact details anywhere here", "y".repeat(400));
    let fetcher = MapFetcher::new(vec![("https://instagram.com/artist", 200, page.as_str())]);
    let generative = MockGenerative {
        fast_reply: r#"{"email": "made.up@artistband.com", "source_description": "profile"}"#
            .to_string(),
        research_reply: "null".to_string(),
    };
    let caps = Capabilities::new(fetcher).with_generative(Arc::new(generative));
    let engine = WaterfallEngine::new(test_config(), caps).unwrap();

    let artist = entity("d1", "Artist", vec![("instagram", "https://instagram.com/artist")], None);
    let result = engine.run_pipeline(&artist).await;

    assert!(!result.contactable);
    assert!(result
        .rejected
        .iter()
        .any(|r| r.email == "made.up@artistband.com" && r.reason == RejectReason::NotInSource));
    assert_eq!(step(&result, StepId::PhotoProfile).status, StepStatus::Failed);
}

#[tokio::test]
async fn test_aggregator_website_feeds_the_website_step() {
    let aggregator_page = format!(
        r#"{}<a href="https://artistband.com">official site</a>"#,
        "z".repeat(400)
    );
    let website_page = format!(
        "{} For bookings write to contact@artistband.com",
        "w".repeat(400)
    );
    let fetcher = MapFetcher::new(vec![
        ("https://linktr.ee/artist", 200, aggregator_page.as_str()),
        ("https://artistband.com/", 200, website_page.as_str()),
    ]);
    let engine = WaterfallEngine::new(test_config(), Capabilities::new(fetcher)).unwrap();

    let artist = entity("e1", "Artist", vec![("linktree", "https://linktr.ee/artist")], None);
    let result = engine.run_pipeline(&artist).await;

    // The aggregator resolved a website but no email: discovery-only
    // success, and the cascade kept going.
    let aggregator = step(&result, StepId::LinkAggregator);
    assert_eq!(aggregator.status, StepStatus::Success);
    assert!(aggregator.accepted.is_empty());

    assert!(result.contactable);
    assert_eq!(result.best_email.as_deref(), Some("contact@artistband.com"));
    assert_eq!(result.best_source, Some(StepId::Website));
    assert!((result.best_confidence.unwrap() - 0.75).abs() < 1e-6);
    assert_eq!(result.auxiliary.website.as_deref(), Some("https://artistband.com"));
}

#[tokio::test]
async fn test_search_resolved_channel_without_email_is_discovery_only() {
    let video = MockVideo {
        hits: vec![ChannelSummary {
            id: "UCfound".to_string(),
            title: "Lone Artist".to_string(),
            description: String::new(),
        }],
        details: ChannelDetails {
            id: "UCfound".to_string(),
            title: "Lone Artist".to_string(),
            ..ChannelDetails::default()
        },
    };
    let caps = Capabilities::new(MapFetcher::empty()).with_video(Arc::new(video));
    let engine = WaterfallEngine::new(test_config(), caps).unwrap();

    // No links at all: the channel is located purely by search.
    let artist = entity("i1", "Lone Artist", Vec::new(), None);
    let result = engine.run_pipeline(&artist).await;

    let channel = step(&result, StepId::VideoChannel);
    assert_eq!(channel.status, StepStatus::Success);
    assert!(channel.accepted.is_empty());
    assert!(!result.contactable, "a channel identity alone is not a contact");
}

#[tokio::test]
async fn test_web_research_runs_last_with_excerpt_provenance() {
    let generative = MockGenerative {
        fast_reply: "null".to_string(),
        research_reply: r#"{
            "email": "mgmt@artistband.com",
            "website": "https://artistband.com",
            "management": "Big Deal Mgmt",
            "booking_agent": null,
            "source_excerpt": "bookings and press: mgmt@artistband.com",
            "source_description": "management roster page"
        }"#
        .to_string(),
    };
    let config = ConfigBuilder::new()
        .inter_step_delay(0.0, 0.0)
        .enable_web_research(true)
        .build()
        .unwrap();
    let caps = Capabilities::new(MapFetcher::empty()).with_generative(Arc::new(generative));
    let engine = WaterfallEngine::new(config, caps).unwrap();

    let artist = entity("f1", "Unknown Artist", Vec::new(), None);
    let result = engine.run_pipeline(&artist).await;

    assert!(result.contactable);
    assert_eq!(result.best_source, Some(StepId::WebResearch));
    assert!((result.best_confidence.unwrap() - 0.62).abs() < 1e-6);
    assert_eq!(result.auxiliary.management.as_deref(), Some("Big Deal Mgmt"));
    assert_eq!(result.auxiliary.website.as_deref(), Some("https://artistband.com"));
}

#[tokio::test]
async fn test_research_enabled_without_generative_fails_construction() {
    let config = ConfigBuilder::new()
        .enable_web_research(true)
        .build()
        .unwrap();
    let err = WaterfallEngine::new(config, Capabilities::new(MapFetcher::empty()));
    assert!(matches!(err, Err(AppError::Config(_))));
}

#[tokio::test]
async fn test_batch_hit_rate_counts_contactable_entities_only() {
    let engine = WaterfallEngine::new(test_config(), Capabilities::new(MapFetcher::empty())).unwrap();
    let entities = vec![
        entity("g1", "Hit", Vec::new(), Some("write to mgmt@artistband.com")),
        entity("g2", "Miss", Vec::new(), None),
    ];

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let summary = run_batch(
        &engine,
        &entities,
        Some(Arc::new(move |r: &contact_scout::EnrichmentResult| {
            sink.lock().unwrap().push(r.entity_id.clone());
        })),
    )
    .await;

    assert_eq!(summary.total, 2);
    assert_eq!(summary.found, 1);
    assert!((summary.hit_rate - 0.5).abs() < 1e-9);
    assert_eq!(seen.lock().unwrap().as_slice(), ["g1", "g2"]);
}

#[tokio::test]
async fn test_progress_events_cover_every_step() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let engine = WaterfallEngine::new(test_config(), Capabilities::new(MapFetcher::empty()))
        .unwrap()
        .with_progress(Arc::new(move |e: &contact_scout::ProgressEvent| {
            sink.lock().unwrap().push((e.step, e.status));
        }));

    let artist = entity("h1", "Artist", Vec::new(), Some("mail mgmt@artistband.com"));
    let result = engine.run_pipeline(&artist).await;
    assert!(result.contactable);

    let events = events.lock().unwrap();
    // Biography transitions Running then Success; every other step
    // reports exactly one Skipped.
    assert!(events.contains(&(StepId::Biography, StepStatus::Running)));
    assert!(events.contains(&(StepId::Biography, StepStatus::Success)));
    let skips = events.iter().filter(|(_, s)| *s == StepStatus::Skipped).count();
    assert_eq!(skips, 5);
}
