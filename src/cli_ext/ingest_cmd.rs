//! `fbal ingest`: classify collected videos and append them to the store.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, instrument};

use super::common::{Palette, progress_bar, read_json};
use crate::cli::{AppContext, IngestArgs};
use crate::core::classify::PrecomputedClassifier;
use crate::core::ingest::{IngestBatch, IngestError, Ingestor};
use crate::core::store::AnalysisStore;
use crate::core::video::{SubscriptionRecord, VideoRecord};
use crate::infra::config::Config;

#[instrument(skip_all, fields(videos = %args.videos.display()))]
pub fn run(args: IngestArgs, cfg: &Config, ctx: &AppContext) -> Result<()> {
    let start = Instant::now();
    let videos: Vec<VideoRecord> = read_json(&args.videos)?;
    let stances = std::fs::read_to_string(&args.stances)
        .with_context(|| format!("Failed to read {}", args.stances.display()))?;
    let classifier = PrecomputedClassifier::from_json_str(&stances)
        .with_context(|| format!("Failed to parse {}", args.stances.display()))?;
    let subscriptions: Vec<SubscriptionRecord> = match &args.subscriptions {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };
    info!(videos = videos.len(), stances = classifier.len(), "inputs loaded");

    let mut options = cfg.ingest;
    if let Some(workers) = args.workers {
        options.workers = workers as usize;
    }

    let store = cfg.open_store()?;
    let progress = progress_bar(ctx, videos.len());
    let ingestor = Ingestor::new(Arc::new(classifier))
        .with_weights(cfg.weights)
        .with_options(options)
        .with_progress(progress.clone());

    let outcome = ingestor.ingest(&videos, &subscriptions, Utc::now());
    progress.finish_and_clear();

    let batch = match outcome {
        Ok(batch) => batch,
        Err(IngestError::FailureBudgetExceeded { failed, attempted, batch, .. }) => {
            // Keep what did classify; the failed subset can be retried later
            store.store_classified_videos(&batch.classified)?;
            store.store_batch_status(&batch.status())?;
            anyhow::bail!(
                "{failed} of {attempted} videos failed to classify; kept the {} that succeeded",
                batch.classified.len()
            );
        }
        Err(e) => return Err(e).context("Ingestion failed"),
    };

    store.store_classified_videos(&batch.classified)?;
    store.store_batch_status(&batch.status())?;

    if !ctx.quiet {
        print_summary(&batch, &Palette::new(ctx));
        println!(
            "Stored in {} ({:.2}s)",
            store.root().display(),
            start.elapsed().as_secs_f32()
        );
    }
    Ok(())
}

fn print_summary(batch: &IngestBatch, p: &Palette) {
    println!(
        "{} {} classified, {} skipped, {} failed",
        p.bold("Ingest:"),
        p.good(batch.classified.len().to_string()),
        p.warn(batch.skipped.len().to_string()),
        p.bad(batch.failed.len().to_string()),
    );
    for s in &batch.skipped {
        println!("  {} {}: {}", p.warn("skipped"), s.video_id, s.reason);
    }
    for f in &batch.failed {
        println!("  {} {}: {}", p.bad("failed"), f.video_id, f.reason);
    }
    if batch.partial() {
        println!("  {} {} videos not attempted", p.warn("cancelled:"), batch.cancelled);
    }
}
