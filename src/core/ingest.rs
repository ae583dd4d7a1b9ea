//! Ingestion: classify collected videos on a bounded worker pool.
//!
//! Each video gets its own classifier call with a timeout and independent
//! retries. Malformed answers are skipped, failed calls are reported, and a
//! cancelled batch keeps whatever finished before the cancel.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use indicatif::ProgressBar;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::core::analysis::BatchStatus;
use crate::core::classify::{ClassificationFailure, ClassificationRequest, StanceClassifier};
use crate::core::stance::{MalformedDistribution, RawStance, StanceDistribution};
use crate::core::video::{ClassifiedVideo, SourcePhase, SubscriptionRecord, VideoRecord};
use crate::core::weight::WeightTable;

/// Upper bound on classification workers
pub const MAX_WORKERS: usize = 8;

/// Worker pool, retry and timeout settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestOptions {
    /// Concurrent classifier calls (1..=8)
    pub workers: usize,
    /// Attempts per video, including the first
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubles after each retry
    pub retry_backoff_ms: u64,
    /// Per-call timeout; 0 disables it
    pub timeout_ms: u64,
    /// Fraction of attempted videos allowed to fail before the batch errors
    pub max_failure_ratio: f64,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            workers: 4,
            max_attempts: 3,
            retry_backoff_ms: 200,
            timeout_ms: 10_000,
            max_failure_ratio: 0.5,
        }
    }
}

impl IngestOptions {
    fn effective_workers(&self) -> usize {
        self.workers.clamp(1, MAX_WORKERS)
    }

    fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u64 << retry.min(16);
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(factor))
    }
}

/// Shared cancellation flag. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A video whose classifier answer was rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedVideo {
    pub video_id: String,
    pub reason: MalformedDistribution,
}

/// A video the classifier could not handle.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedVideo {
    pub video_id: String,
    pub source_phase: SourcePhase,
    pub reason: ClassificationFailure,
}

/// Outcome of one ingestion call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestBatch {
    pub classified: Vec<ClassifiedVideo>,
    pub skipped: Vec<SkippedVideo>,
    pub failed: Vec<FailedVideo>,
    /// Videos never tried, or abandoned between retries, because the batch
    /// was cancelled
    pub cancelled: usize,
}

impl IngestBatch {
    pub fn partial(&self) -> bool {
        self.cancelled > 0
    }

    pub fn status(&self) -> BatchStatus {
        BatchStatus { partial: self.partial(), skipped: self.skipped.len(), failed: self.failed.len() }
    }

    /// Ids worth retrying in a follow-up batch
    pub fn failed_ids(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.video_id.as_str()).collect()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("{failed} of {attempted} classifications failed, above the allowed ratio {max_ratio}")]
    FailureBudgetExceeded {
        failed: usize,
        attempted: usize,
        max_ratio: f64,
        /// Everything that did complete
        batch: Box<IngestBatch>,
    },

    #[error("could not start classification workers: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

enum Outcome {
    Classified(ClassifiedVideo),
    Skipped(SkippedVideo),
    Failed(FailedVideo),
    Cancelled,
}

/// Classifies video batches against one classifier.
pub struct Ingestor {
    classifier: Arc<dyn StanceClassifier>,
    weights: WeightTable,
    options: IngestOptions,
    cancel: CancelToken,
    progress: ProgressBar,
}

impl Ingestor {
    pub fn new(classifier: Arc<dyn StanceClassifier>) -> Self {
        Self {
            classifier,
            weights: WeightTable::default(),
            options: IngestOptions::default(),
            cancel: CancelToken::new(),
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_weights(mut self, weights: WeightTable) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_options(mut self, options: IngestOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Ticked once per video, whatever the outcome.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Handle for cancelling a running batch from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Classify `videos`, stamping each result with `now`. Duplicate
    /// `(video_id, source_phase)` pairs are classified once.
    #[instrument(skip_all, fields(videos = videos.len(), classifier = self.classifier.name()))]
    pub fn ingest(
        &self,
        videos: &[VideoRecord],
        subscriptions: &[SubscriptionRecord],
        now: DateTime<Utc>,
    ) -> Result<IngestBatch, IngestError> {
        let start = Instant::now();
        let subscribed: HashSet<&str> = subscriptions.iter().map(|s| s.channel_id.as_str()).collect();

        let mut seen = HashSet::new();
        let unique: Vec<&VideoRecord> = videos
            .iter()
            .filter(|v| seen.insert((v.video_id.as_str(), v.source_phase)))
            .collect();
        if unique.len() < videos.len() {
            debug!(duplicates = videos.len() - unique.len(), "dropped duplicate video records");
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.effective_workers())
            .thread_name(|i| format!("classify-{i}"))
            .build()?;

        let outcomes: Vec<Outcome> = pool.install(|| {
            unique
                .par_iter()
                .map(|video| {
                    let is_subscribed = video
                        .channel_id
                        .as_deref()
                        .is_some_and(|c| subscribed.contains(c));
                    let out = self.classify_one(video, is_subscribed, now);
                    self.progress.inc(1);
                    out
                })
                .collect()
        });

        let mut batch = IngestBatch::default();
        for outcome in outcomes {
            match outcome {
                Outcome::Classified(v) => batch.classified.push(v),
                Outcome::Skipped(s) => batch.skipped.push(s),
                Outcome::Failed(f) => batch.failed.push(f),
                Outcome::Cancelled => batch.cancelled += 1,
            }
        }

        info!(
            classified = batch.classified.len(),
            skipped = batch.skipped.len(),
            failed = batch.failed.len(),
            cancelled = batch.cancelled,
            duration = %format!("{:.2}s", start.elapsed().as_secs_f32()),
            "ingestion finished"
        );

        let attempted = unique.len() - batch.cancelled;
        let failed = batch.failed.len();
        if attempted > 0 && failed as f64 / attempted as f64 > self.options.max_failure_ratio {
            warn!(failed, attempted, "classification failure budget exceeded");
            return Err(IngestError::FailureBudgetExceeded {
                failed,
                attempted,
                max_ratio: self.options.max_failure_ratio,
                batch: Box::new(batch),
            });
        }

        Ok(batch)
    }

    fn classify_one(&self, video: &VideoRecord, subscribed: bool, now: DateTime<Utc>) -> Outcome {
        if self.cancel.is_cancelled() {
            return Outcome::Cancelled;
        }

        let request = ClassificationRequest { video: video.clone(), subscribed };
        let attempts = self.options.max_attempts.max(1);
        let mut last = ClassificationFailure::Adapter("not attempted".to_string());

        for attempt in 1..=attempts {
            if attempt > 1 {
                if self.cancel.is_cancelled() {
                    debug!(video_id = %video.video_id, attempt, "cancelled between retries");
                    return Outcome::Cancelled;
                }
                std::thread::sleep(self.options.backoff(attempt - 2));
            }

            match self.call(&request) {
                Ok(raw) => return self.validate(video, raw, subscribed, now),
                Err(e) => {
                    debug!(video_id = %video.video_id, attempt, error = %e, "classification attempt failed");
                    last = e;
                }
            }
        }

        warn!(video_id = %video.video_id, error = %last, "giving up on video");
        Outcome::Failed(FailedVideo {
            video_id: video.video_id.clone(),
            source_phase: video.source_phase,
            reason: last,
        })
    }

    /// One classifier call, abandoned after the timeout. An abandoned call
    /// keeps running on its own thread and its answer is dropped.
    fn call(&self, request: &ClassificationRequest) -> Result<RawStance, ClassificationFailure> {
        if self.options.timeout_ms == 0 {
            return self.classifier.classify(request);
        }

        let (tx, rx) = mpsc::channel();
        let classifier = Arc::clone(&self.classifier);
        let req = request.clone();
        std::thread::Builder::new()
            .name("classify-call".to_string())
            .spawn(move || {
                let _ = tx.send(classifier.classify(&req));
            })
            .map_err(|e| ClassificationFailure::Adapter(format!("spawn classifier call: {e}")))?;

        match rx.recv_timeout(Duration::from_millis(self.options.timeout_ms)) {
            Ok(answer) => answer,
            Err(RecvTimeoutError::Timeout) => {
                Err(ClassificationFailure::Timeout { timeout_ms: self.options.timeout_ms })
            }
            // Sender dropped without answering: the call panicked
            Err(RecvTimeoutError::Disconnected) => Err(ClassificationFailure::Panicked),
        }
    }

    fn validate(&self, video: &VideoRecord, raw: RawStance, subscribed: bool, now: DateTime<Utc>) -> Outcome {
        match StanceDistribution::new(raw) {
            Ok(stance) => Outcome::Classified(ClassifiedVideo {
                video_id: video.video_id.clone(),
                title: video.title.clone(),
                channel_id: video.channel_id.clone(),
                stance,
                source_phase: video.source_phase,
                significance_weight: self.weights.weight(video.source_phase),
                from_subscribed_channel: subscribed,
                classified_at: now,
            }),
            Err(reason) => {
                warn!(video_id = %video.video_id, %reason, "skipping malformed stance distribution");
                Outcome::Skipped(SkippedVideo { video_id: video.video_id.clone(), reason })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classify::PrecomputedClassifier;
    use chrono::TimeZone;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap()
    }

    fn record(id: &str, phase: SourcePhase) -> VideoRecord {
        VideoRecord {
            video_id: id.to_string(),
            title: format!("title {id}"),
            channel_id: Some(format!("chan-{id}")),
            channel_name: None,
            description: None,
            source_phase: phase,
        }
    }

    fn fast() -> IngestOptions {
        IngestOptions { retry_backoff_ms: 1, timeout_ms: 0, ..IngestOptions::default() }
    }

    fn precomputed(entries: &[(&str, RawStance)]) -> Arc<PrecomputedClassifier> {
        let map: HashMap<String, RawStance> = entries.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        Arc::new(PrecomputedClassifier::new(map))
    }

    #[test]
    fn classifies_weights_and_flags_subscriptions() {
        let classifier = precomputed(&[
            ("a", RawStance::new(0.7, 0.1, 0.1, 0.1)),
            ("b", RawStance::new(0.1, 0.7, 0.1, 0.1)),
        ]);
        let subs = vec![SubscriptionRecord { channel_id: "chan-b".to_string(), channel_name: None }];

        let batch = Ingestor::new(classifier)
            .with_options(fast())
            .ingest(&[record("a", SourcePhase::WatchHistory), record("b", SourcePhase::Search)], &subs, now())
            .unwrap();

        assert_eq!(batch.classified.len(), 2);
        assert_eq!(batch.classified[0].significance_weight, 100);
        assert_eq!(batch.classified[1].significance_weight, 75);
        assert!(!batch.classified[0].from_subscribed_channel);
        assert!(batch.classified[1].from_subscribed_channel);
        assert_eq!(batch.classified[1].classified_at, now());
        assert_eq!(batch.status(), BatchStatus::default());
    }

    #[test]
    fn malformed_distribution_is_skipped_and_reported() {
        let classifier = precomputed(&[
            ("good", RawStance::new(0.25, 0.25, 0.25, 0.25)),
            ("bad", RawStance::new(0.5, 0.5, 0.5, 0.0)),
        ]);

        let batch = Ingestor::new(classifier)
            .with_options(fast())
            .ingest(&[record("good", SourcePhase::HomeFeed), record("bad", SourcePhase::HomeFeed)], &[], now())
            .unwrap();

        assert_eq!(batch.classified.len(), 1);
        assert_eq!(batch.skipped.len(), 1);
        assert_eq!(batch.skipped[0].video_id, "bad");
        assert!(matches!(batch.skipped[0].reason, MalformedDistribution::SumOutOfTolerance { .. }));
        assert_eq!(batch.status().skipped, 1);
    }

    /// Fails the first `failures` calls per video, then answers.
    struct Flaky {
        failures: usize,
        calls: Mutex<HashMap<String, usize>>,
    }

    impl StanceClassifier for Flaky {
        fn classify(&self, request: &ClassificationRequest) -> Result<RawStance, ClassificationFailure> {
            let mut calls = self.calls.lock().unwrap();
            let n = calls.entry(request.video.video_id.clone()).or_insert(0);
            *n += 1;
            if *n <= self.failures {
                Err(ClassificationFailure::Adapter("rate limited".to_string()))
            } else {
                Ok(RawStance::new(0.0, 0.0, 1.0, 0.0))
            }
        }
    }

    #[test]
    fn retries_until_an_answer_arrives() {
        let flaky = Arc::new(Flaky { failures: 2, calls: Mutex::new(HashMap::new()) });
        let batch = Ingestor::new(flaky.clone())
            .with_options(IngestOptions { max_attempts: 3, ..fast() })
            .ingest(&[record("x", SourcePhase::HomeFeed)], &[], now())
            .unwrap();

        assert_eq!(batch.classified.len(), 1);
        assert_eq!(flaky.calls.lock().unwrap()["x"], 3);
    }

    #[test]
    fn exhausted_retries_are_reported_as_failures() {
        let classifier = precomputed(&[("a", RawStance::new(1.0, 0.0, 0.0, 0.0))]);
        let videos = [
            record("a", SourcePhase::HomeFeed),
            record("b", SourcePhase::HomeFeed),
            record("c", SourcePhase::HomeFeed),
        ];

        let err = Ingestor::new(classifier.clone())
            .with_options(fast())
            .ingest(&videos, &[], now())
            .unwrap_err();
        match err {
            IngestError::FailureBudgetExceeded { failed, attempted, batch, .. } => {
                assert_eq!((failed, attempted), (2, 3));
                assert_eq!(batch.classified.len(), 1);
                assert_eq!(batch.failed_ids(), vec!["b", "c"]);
            }
            other => panic!("unexpected error: {other}"),
        }

        // A looser budget lets the same batch through with partial results
        let batch = Ingestor::new(classifier)
            .with_options(IngestOptions { max_failure_ratio: 0.9, ..fast() })
            .ingest(&videos, &[], now())
            .unwrap();
        assert_eq!(batch.status().failed, 2);
        assert!(!batch.partial());
    }

    struct Slow;

    impl StanceClassifier for Slow {
        fn classify(&self, _request: &ClassificationRequest) -> Result<RawStance, ClassificationFailure> {
            std::thread::sleep(Duration::from_millis(300));
            Ok(RawStance::new(1.0, 0.0, 0.0, 0.0))
        }
    }

    #[test]
    fn slow_calls_time_out() {
        let batch = Ingestor::new(Arc::new(Slow))
            .with_options(IngestOptions { timeout_ms: 20, max_attempts: 1, max_failure_ratio: 1.0, ..fast() })
            .ingest(&[record("s", SourcePhase::HomeFeed)], &[], now())
            .unwrap();

        assert_eq!(batch.failed.len(), 1);
        assert_eq!(batch.failed[0].reason, ClassificationFailure::Timeout { timeout_ms: 20 });
    }

    /// Cancels the shared token after answering `after` calls.
    struct CancelAfter {
        after: usize,
        calls: AtomicUsize,
        token: CancelToken,
    }

    impl StanceClassifier for CancelAfter {
        fn classify(&self, _request: &ClassificationRequest) -> Result<RawStance, ClassificationFailure> {
            if self.calls.fetch_add(1, Ordering::SeqCst) + 1 >= self.after {
                self.token.cancel();
            }
            Ok(RawStance::new(0.0, 1.0, 0.0, 0.0))
        }
    }

    #[test]
    fn cancellation_keeps_completed_work_and_marks_partial() {
        let token = CancelToken::new();
        let classifier = Arc::new(CancelAfter { after: 2, calls: AtomicUsize::new(0), token: token.clone() });
        let videos: Vec<_> = (0..20).map(|i| record(&format!("v{i}"), SourcePhase::HomeFeed)).collect();

        let batch = Ingestor::new(classifier)
            .with_options(IngestOptions { workers: 1, ..fast() })
            .with_cancel_token(token)
            .ingest(&videos, &[], now())
            .unwrap();

        assert_eq!(batch.classified.len(), 2);
        assert_eq!(batch.cancelled, 18);
        assert!(batch.partial());
        assert!(batch.status().partial);
    }

    /// Cancels the token, then fails the call it was handling.
    struct CancelThenFail {
        token: CancelToken,
        calls: AtomicUsize,
    }

    impl StanceClassifier for CancelThenFail {
        fn classify(&self, _request: &ClassificationRequest) -> Result<RawStance, ClassificationFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.token.cancel();
            Err(ClassificationFailure::Adapter("connection reset".to_string()))
        }
    }

    #[test]
    fn cancel_between_retries_counts_as_cancelled_not_failed() {
        let token = CancelToken::new();
        let classifier = Arc::new(CancelThenFail { token: token.clone(), calls: AtomicUsize::new(0) });

        let batch = Ingestor::new(classifier.clone())
            .with_options(IngestOptions { workers: 1, max_attempts: 3, ..fast() })
            .with_cancel_token(token)
            .ingest(&[record("r", SourcePhase::HomeFeed)], &[], now())
            .unwrap();

        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
        assert!(batch.failed.is_empty());
        assert_eq!(batch.cancelled, 1);
        assert!(batch.partial());
    }

    #[test]
    fn duplicate_records_are_classified_once() {
        let classifier = precomputed(&[("a", RawStance::new(0.1, 0.1, 0.1, 0.7))]);
        let batch = Ingestor::new(classifier)
            .with_options(fast())
            .ingest(
                &[
                    record("a", SourcePhase::HomeFeed),
                    record("a", SourcePhase::HomeFeed),
                    record("a", SourcePhase::WatchHistory),
                ],
                &[],
                now(),
            )
            .unwrap();
        assert_eq!(batch.classified.len(), 2);
    }

    #[test]
    fn worker_count_is_bounded() {
        assert_eq!(IngestOptions { workers: 0, ..fast() }.effective_workers(), 1);
        assert_eq!(IngestOptions { workers: 64, ..fast() }.effective_workers(), MAX_WORKERS);
    }
}
