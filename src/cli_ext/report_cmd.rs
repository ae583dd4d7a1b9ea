//! Read-side commands: `stats`, `history` and `watched`.

use anyhow::{Context, Result};
use tabled::{Table, Tabled};
use tracing::instrument;

use super::common::Palette;
use crate::cli::{AppContext, HistoryArgs, StatsArgs, WatchedArgs};
use crate::core::analysis::AnalysisResult;
use crate::core::leaning::leaning_label;
use crate::core::stance::StanceBucket;
use crate::core::stats::StatsSnapshot;
use crate::core::store::AnalysisStore;
use crate::infra::config::Config;

#[derive(Tabled)]
struct MetricRow {
    metric: String,
    value: String,
}

#[derive(Tabled)]
struct BucketRow {
    stance: String,
    share: String,
    #[tabled(rename = "weighted mass")]
    mass: String,
}

#[derive(Tabled)]
struct HistoryRow {
    generated: String,
    videos: usize,
    entropy: u8,
    leaning: u8,
    #[tabled(rename = "watch history")]
    watch_history: u8,
    #[tabled(rename = "home feed")]
    home_feed: u8,
    status: String,
}

pub fn stats(args: StatsArgs, cfg: &Config, ctx: &AppContext) -> Result<()> {
    let store = cfg.open_store()?;
    let snap = StatsSnapshot::load(&store).context("Failed to read store")?;

    if args.output.json {
        println!("{}", serde_json::to_string_pretty(&snap)?);
        return Ok(());
    }
    if ctx.quiet {
        return Ok(());
    }

    let p = Palette::new(ctx);
    let mut rows = vec![
        MetricRow { metric: "analyses".into(), value: snap.analyses.to_string() },
        MetricRow { metric: "active videos".into(), value: snap.active_videos.to_string() },
        MetricRow { metric: "recommendations".into(), value: snap.recommendations.to_string() },
        MetricRow {
            metric: "watched".into(),
            value: format!("{} ({:.0}%)", snap.watched, snap.watch_rate() * 100.0),
        },
    ];

    let Some(latest) = &snap.latest else {
        println!("{}", Table::new(rows));
        println!("{}", p.warn("No analysis stored yet; run `fbal analyze`."));
        return Ok(());
    };

    rows.push(MetricRow { metric: "entropy".into(), value: p.score(latest.entropy_score) });
    rows.push(MetricRow {
        metric: "leaning".into(),
        value: format!("{} ({})", latest.bias_score, leaning_label(latest.bias_score)),
    });
    if let Some(change) = snap.entropy_change {
        let text = format!("{change:+}");
        let value = if change >= 0 { p.good(text) } else { p.bad(text) };
        rows.push(MetricRow { metric: "entropy change".into(), value });
    }
    println!("{}", Table::new(rows));

    let buckets: Vec<BucketRow> = StanceBucket::ALL
        .iter()
        .map(|b| BucketRow {
            stance: b.to_string(),
            share: format!("{}%", latest.breakdown.percentage(*b)),
            mass: format!("{:.1}", latest.breakdown.count(*b)),
        })
        .collect();
    println!("{}", Table::new(buckets));
    Ok(())
}

#[instrument(skip_all)]
pub fn history(args: HistoryArgs, cfg: &Config, ctx: &AppContext) -> Result<()> {
    let store = cfg.open_store()?;
    let mut results = store.load_analysis_history().context("Failed to read history")?;
    if let Some(n) = args.last {
        let skip = results.len().saturating_sub(n);
        results.drain(..skip);
    }

    if args.output.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }
    if ctx.quiet {
        return Ok(());
    }
    if results.is_empty() {
        println!("{}", Palette::new(ctx).warn("No analyses stored yet."));
        return Ok(());
    }

    let rows: Vec<HistoryRow> = results.iter().map(history_row).collect();
    println!("{}", Table::new(rows));
    Ok(())
}

fn history_row(r: &AnalysisResult) -> HistoryRow {
    let status = if r.batch.partial {
        "partial".to_string()
    } else if r.batch.skipped + r.batch.failed > 0 {
        format!("{} skipped, {} failed", r.batch.skipped, r.batch.failed)
    } else {
        "complete".to_string()
    };
    HistoryRow {
        generated: r.generated_at.format("%Y-%m-%d %H:%M").to_string(),
        videos: r.video_count,
        entropy: r.entropy_score,
        leaning: r.bias_score,
        watch_history: r.source_comparison.watch_history.entropy_score,
        home_feed: r.source_comparison.home_feed.entropy_score,
        status,
    }
}

pub fn watched(args: WatchedArgs, cfg: &Config, ctx: &AppContext) -> Result<()> {
    let store = cfg.open_store()?;
    let updated = store
        .mark_recommendation_watched(args.id)
        .with_context(|| format!("Failed to mark recommendation #{}", args.id))?;

    if !ctx.quiet {
        let p = Palette::new(ctx);
        println!(
            "{} #{} {} ({})",
            p.good("Watched"),
            updated.id,
            updated.recommendation.video.title,
            updated.recommendation.video.video_id
        );
    }
    Ok(())
}
