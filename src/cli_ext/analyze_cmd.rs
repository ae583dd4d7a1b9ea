//! `fbal analyze`: score the stored feed and store the picks.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{instrument, warn};

use super::common::{Palette, read_json};
use crate::cli::{AnalyzeArgs, AppContext};
use crate::core::analysis::{AnalysisInput, AnalysisResult, Assembler};
use crate::core::leaning::leaning_label;
use crate::core::select::Selector;
use crate::core::stance::{RawStance, StanceBucket, StanceDistribution};
use crate::core::store::{AnalysisStore, StoredRecommendation};
use crate::core::video::{ClassifiedVideo, VideoRecord};
use crate::core::weight::WeightTable;
use crate::infra::config::Config;

/// One entry of a candidates file: the video plus its classifier output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateRecord {
    #[serde(flatten)]
    pub video: VideoRecord,
    pub stance: RawStance,
}

impl CandidateRecord {
    /// Validate the stance; malformed candidates yield `None`.
    pub fn classify(self, weights: &WeightTable, now: DateTime<Utc>) -> Option<ClassifiedVideo> {
        let stance = match StanceDistribution::new(self.stance) {
            Ok(s) => s,
            Err(reason) => {
                warn!(video_id = %self.video.video_id, %reason, "ignoring malformed candidate");
                return None;
            }
        };
        Some(ClassifiedVideo {
            significance_weight: weights.weight(self.video.source_phase),
            video_id: self.video.video_id,
            title: self.video.title,
            channel_id: self.video.channel_id,
            stance,
            source_phase: self.video.source_phase,
            from_subscribed_channel: false,
            classified_at: now,
        })
    }
}

#[instrument(skip_all)]
pub fn run(args: AnalyzeArgs, cfg: &Config, ctx: &AppContext) -> Result<()> {
    let store = cfg.open_store()?;
    let now = Utc::now();

    let videos = store.load_active_classified_videos()?;
    let candidates: Vec<ClassifiedVideo> = match &args.candidates {
        Some(path) => read_json::<Vec<CandidateRecord>>(path)?
            .into_iter()
            .filter_map(|c| c.classify(&cfg.weights, now))
            .collect(),
        None => Vec::new(),
    };
    let batch = store.load_batch_status()?;
    let limit = args.limit.unwrap_or(cfg.recommend.limit);

    let assembler = Assembler::new(Selector::new(cfg.recommend.confidence_floor));
    let analysis =
        assembler.assemble(AnalysisInput::new(&videos, &candidates, limit, now).with_batch(batch));

    store.store_analysis_result(&analysis.result)?;
    let stored = store.store_recommendations(&analysis.recommendations)?;
    // The ingest status is reported once, by the first analysis after it
    store.clear_batch_status()?;

    if args.output.json {
        let out = json!({ "result": analysis.result, "recommendations": stored });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if !ctx.quiet {
        print_report(&analysis.result, &stored, &Palette::new(ctx));
    }
    Ok(())
}

fn print_report(result: &AnalysisResult, recs: &[StoredRecommendation], p: &Palette) {
    if result.video_count == 0 {
        println!("{}", p.warn("No classified videos yet; run `fbal ingest` first."));
        return;
    }

    println!(
        "{} {}   {} {} ({})",
        p.bold("Diversity"),
        p.score(result.entropy_score),
        p.bold("Leaning"),
        result.bias_score,
        leaning_label(result.bias_score)
    );
    let shares: Vec<String> = StanceBucket::ALL
        .iter()
        .map(|b| format!("{} {}%", b, result.breakdown.percentage(*b)))
        .collect();
    println!("  {}", shares.join("  "));

    let cmp = &result.source_comparison;
    println!(
        "  watch history {} over {} videos, home feed {} over {} videos",
        p.score(cmp.watch_history.entropy_score),
        cmp.watch_history.count,
        p.score(cmp.home_feed.entropy_score),
        cmp.home_feed.count
    );
    println!(
        "  {}",
        p.dim(format!(
            "{} videos, {} political",
            result.video_count, result.political_video_count
        ))
    );
    if result.batch.partial || result.batch.skipped > 0 || result.batch.failed > 0 {
        println!(
            "  {}",
            p.warn(format!(
                "last ingest: {} skipped, {} failed{}",
                result.batch.skipped,
                result.batch.failed,
                if result.batch.partial { ", partial" } else { "" }
            ))
        );
    }

    if recs.is_empty() {
        println!("{}", p.good("No counter-recommendations needed."));
        return;
    }
    println!("{}", p.bold("Recommendations"));
    for r in recs {
        let rec = &r.recommendation;
        println!(
            "  #{:<4} [{}] {} ({})",
            r.id, rec.opposing_viewpoint, rec.video.title, rec.video.video_id
        );
        println!("        {}", p.dim(&rec.reason));
    }
}
