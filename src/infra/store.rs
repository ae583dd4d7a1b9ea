//! Directory-backed [`AnalysisStore`].
//!
//! Layout under the store directory:
//! - `classified.jsonl` append-only classification log
//! - `analyses.jsonl` append-only analysis history
//! - `recommendations.json` current recommendation set, rewritten atomically
//! - `last_batch.json` status of the most recent ingestion
//! - `store.lock` advisory lock, exclusive for writers and shared for readers

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use fd_lock::RwLock;
use indexmap::IndexMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::core::analysis::{AnalysisResult, BatchStatus};
use crate::core::select::Recommendation;
use crate::core::store::{AnalysisStore, StoreError, StoredRecommendation};
use crate::core::video::{ClassifiedVideo, SourcePhase};

const CLASSIFIED_FILE: &str = "classified.jsonl";
const ANALYSES_FILE: &str = "analyses.jsonl";
const RECOMMENDATIONS_FILE: &str = "recommendations.json";
const BATCH_FILE: &str = "last_batch.json";
const LOCK_FILE: &str = "store.lock";

#[derive(Debug, Clone)]
pub struct JsonStore {
    root: PathBuf,
}

impl JsonStore {
    /// Open (and create if missing) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StoreError::io(&root, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn lock_file(&self) -> Result<(RwLock<File>, PathBuf), StoreError> {
        let lock_path = self.path(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&lock_path)
            .map_err(|e| StoreError::io(&lock_path, e))?;
        Ok((RwLock::new(file), lock_path))
    }

    /// Run `f` while holding the exclusive store lock.
    fn locked<T>(&self, f: impl FnOnce() -> Result<T, StoreError>) -> Result<T, StoreError> {
        let (mut lock, lock_path) = self.lock_file()?;
        let _guard = lock.write().map_err(|e| StoreError::io(&lock_path, e))?;
        f()
    }

    /// Run `f` while holding the shared store lock, so no append is half done.
    fn shared<T>(&self, f: impl FnOnce() -> Result<T, StoreError>) -> Result<T, StoreError> {
        let (lock, lock_path) = self.lock_file()?;
        let _guard = lock.read().map_err(|e| StoreError::io(&lock_path, e))?;
        f()
    }

    fn append_lines<T: Serialize>(&self, name: &str, items: &[T]) -> Result<(), StoreError> {
        if items.is_empty() {
            return Ok(());
        }
        let mut buf = String::new();
        for item in items {
            buf.push_str(&serde_json::to_string(item)?);
            buf.push('\n');
        }

        let path = self.path(name);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| StoreError::io(&path, e))?;
        file.write_all(buf.as_bytes()).map_err(|e| StoreError::io(&path, e))?;
        file.sync_all().map_err(|e| StoreError::io(&path, e))?;
        debug!(file = name, records = items.len(), "appended records");
        Ok(())
    }

    fn read_lines<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>, StoreError> {
        let path = self.path(name);
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&path, e)),
        };

        let mut out = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| StoreError::io(&path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            let item = serde_json::from_str(&line).map_err(|source| StoreError::Corrupt {
                path: path.clone(),
                line: idx + 1,
                source,
            })?;
            out.push(item);
        }
        Ok(out)
    }

    fn read_recommendations(&self) -> Result<Vec<StoredRecommendation>, StoreError> {
        let path = self.path(RECOMMENDATIONS_FILE);
        match fs::read_to_string(&path) {
            Ok(s) if s.trim().is_empty() => Ok(Vec::new()),
            Ok(s) => serde_json::from_str(&s)
                .map_err(|source| StoreError::Corrupt { path, line: 1, source }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }

    /// Remember how complete the latest ingestion was, for the next analysis.
    pub fn store_batch_status(&self, status: &BatchStatus) -> Result<(), StoreError> {
        let path = self.path(BATCH_FILE);
        let data = serde_json::to_vec(status)?;
        self.locked(|| write_atomic(&path, &data).map_err(|e| StoreError::io(&path, e)))
    }

    /// Status of the latest ingestion; complete when none was recorded.
    pub fn load_batch_status(&self) -> Result<BatchStatus, StoreError> {
        let path = self.path(BATCH_FILE);
        self.shared(|| match fs::read_to_string(&path) {
            Ok(s) => serde_json::from_str(&s)
                .map_err(|source| StoreError::Corrupt { path: path.clone(), line: 1, source }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BatchStatus::default()),
            Err(e) => Err(StoreError::io(&path, e)),
        })
    }

    /// Forget the latest ingestion status once an analysis has reported it.
    pub fn clear_batch_status(&self) -> Result<(), StoreError> {
        let path = self.path(BATCH_FILE);
        self.locked(|| match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(&path, e)),
        })
    }

    fn write_recommendations(&self, recs: &[StoredRecommendation]) -> Result<(), StoreError> {
        let path = self.path(RECOMMENDATIONS_FILE);
        let data = serde_json::to_vec_pretty(recs)?;
        write_atomic(&path, &data).map_err(|e| StoreError::io(&path, e))
    }
}

/// Replace `path` with `data` via a temp file in the same directory.
fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

impl AnalysisStore for JsonStore {
    fn load_active_classified_videos(&self) -> Result<Vec<ClassifiedVideo>, StoreError> {
        let log: Vec<ClassifiedVideo> = self.shared(|| self.read_lines(CLASSIFIED_FILE))?;
        let total = log.len();

        // Later entries replace earlier ones but keep the first-seen slot
        let mut active: IndexMap<(String, SourcePhase), ClassifiedVideo> = IndexMap::new();
        for video in log {
            active.insert((video.video_id.clone(), video.source_phase), video);
        }
        debug!(total, active = active.len(), "loaded classification log");
        Ok(active.into_values().collect())
    }

    #[instrument(skip_all, fields(videos = videos.len()))]
    fn store_classified_videos(&self, videos: &[ClassifiedVideo]) -> Result<(), StoreError> {
        self.locked(|| self.append_lines(CLASSIFIED_FILE, videos))
    }

    fn store_analysis_result(&self, result: &AnalysisResult) -> Result<(), StoreError> {
        self.locked(|| self.append_lines(ANALYSES_FILE, std::slice::from_ref(result)))
    }

    #[instrument(skip_all, fields(recommendations = recommendations.len()))]
    fn store_recommendations(
        &self,
        recommendations: &[Recommendation],
    ) -> Result<Vec<StoredRecommendation>, StoreError> {
        self.locked(|| {
            let mut all = self.read_recommendations()?;
            let mut next = all.iter().map(|r| r.id).max().unwrap_or(0) + 1;

            let fresh: Vec<StoredRecommendation> = recommendations
                .iter()
                .map(|rec| {
                    let stored = StoredRecommendation { id: next, recommendation: rec.clone() };
                    next += 1;
                    stored
                })
                .collect();

            all.extend(fresh.iter().cloned());
            self.write_recommendations(&all)?;
            Ok(fresh)
        })
    }

    fn mark_recommendation_watched(&self, id: u64) -> Result<StoredRecommendation, StoreError> {
        self.locked(|| {
            let mut all = self.read_recommendations()?;
            let target = all
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or(StoreError::UnknownRecommendation(id))?;
            target.recommendation.mark_watched();
            let updated = target.clone();
            self.write_recommendations(&all)?;
            Ok(updated)
        })
    }

    fn load_analysis_history(&self) -> Result<Vec<AnalysisResult>, StoreError> {
        self.shared(|| self.read_lines(ANALYSES_FILE))
    }

    fn load_recommendations(&self) -> Result<Vec<StoredRecommendation>, StoreError> {
        self.shared(|| self.read_recommendations())
    }
}
