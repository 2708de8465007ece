//! Sequential batch execution with inter-entity pacing.

use std::sync::Arc;

use crate::core::config;
use crate::core::models::{EnrichmentResult, Entity};
use crate::core::pipeline::WaterfallEngine;

/// Callback invoked with each finished entity result, before the batch
/// moves on. Useful for incremental persistence.
pub type EntityCompleteCallback = Arc<dyn Fn(&EnrichmentResult) + Send + Sync>;

/// Aggregate outcome of one batch run.
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub results: Vec<EnrichmentResult>,
    /// Number of entities processed.
    pub total: usize,
    /// Entities that ended contactable. Discovery-only successes do not
    /// count: a run that resolved a channel but no address found nothing.
    pub found: usize,
    /// `found / total`, or zero for an empty batch.
    pub hit_rate: f64,
}

/// Runs the waterfall for each entity in order, sleeping a jittered
/// interval between entities. Entities never run concurrently; the
/// pacing exists to stay under the radar of the sources being scanned.
pub async fn run_batch(
    engine: &WaterfallEngine,
    entities: &[Entity],
    on_complete: Option<EntityCompleteCallback>,
) -> BatchSummary {
    let total = entities.len();
    let mut results = Vec::with_capacity(total);

    tracing::info!(target: "batch", "Starting batch of {} entities", total);

    for (index, entity) in entities.iter().enumerate() {
        let result = engine.run_pipeline(entity).await;
        if let Some(ref callback) = on_complete {
            callback(&result);
        }
        results.push(result);

        if index + 1 < total {
            tokio::time::sleep(config::inter_entity_sleep(engine.config())).await;
        }
    }

    let found = results.iter().filter(|r| r.contactable).count();
    let hit_rate = if total == 0 {
        0.0
    } else {
        found as f64 / total as f64
    };

    tracing::info!(
        target: "batch",
        "Batch finished: {}/{} contactable ({:.0}%)",
        found,
        total,
        hit_rate * 100.0
    );

    BatchSummary {
        results,
        total,
        found,
        hit_rate,
    }
}
