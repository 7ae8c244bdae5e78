//! Per-scene prefetch records and the eager background sequence.
//!
//! Each scene index owns one record holding a shared, memoized future. The
//! work behind it is spawned as soon as the record is created, so every
//! caller observes the same attempt and no asset is fetched twice by it.
//! Only `ensure_scene` ever replaces a failed attempt with a fresh one.

use crate::error::{Result, ScenePrefetchError};
use crate::prefetcher::Prefetcher;
use curtain_core::ScenePlan;
use futures_util::future::{self, join_all, BoxFuture, FutureExt, Shared};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Shared outcome of one scene prefetch attempt
pub type SceneFuture = Shared<BoxFuture<'static, Result<()>>>;

/// Observable state of a scene's prefetch record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefetchStatus {
    /// No prefetch was requested yet
    NotStarted,
    /// An attempt is running
    InFlight,
    /// The latest attempt succeeded
    Succeeded,
    /// The latest attempt failed
    Failed(String),
}

/// Result of the eager background sequence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceReport {
    /// Scenes prefetched successfully, in order
    pub completed: Vec<usize>,
    /// Scene whose failure abandoned the sequence
    pub aborted_at: Option<usize>,
    /// Reason of that failure
    pub failure: Option<String>,
}

impl SequenceReport {
    /// Whether every scene was prefetched
    pub fn is_complete(&self) -> bool {
        self.aborted_at.is_none()
    }
}

struct SceneRecord {
    attempt: u64,
    future: SceneFuture,
    outcome: Option<Result<()>>,
}

struct Inner {
    plan: ScenePlan,
    prefetcher: Prefetcher,
    records: Mutex<HashMap<usize, SceneRecord>>,
    prefetched: Mutex<HashSet<String>>,
}

impl Inner {
    fn records(&self) -> MutexGuard<'_, HashMap<usize, SceneRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn prefetched(&self) -> MutexGuard<'_, HashSet<String>> {
        self.prefetched.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn load_scene(&self, index: usize, attempt: u64) -> Result<()> {
        let count = self.plan.scene_count();
        if index >= count {
            return Err(ScenePrefetchError::UnknownScene { scene: index, count });
        }

        let resources = self.plan.resources_for_scene(index);
        debug!(scene = index, attempt, assets = resources.len(), "Prefetching scene");

        let results = join_all(
            resources
                .iter()
                .map(|path| self.prefetcher.prefetch_asset(path)),
        )
        .await;

        let failure = results.into_iter().find_map(std::result::Result::err);
        match failure {
            Some(source) => {
                warn!(scene = index, asset = %source.path(), error = %source, "Scene prefetch failed");
                Err(ScenePrefetchError::Asset {
                    scene: index,
                    source,
                })
            }
            None => {
                self.prefetched().extend(resources);
                info!(scene = index, "Scene prefetched");
                Ok(())
            }
        }
    }

    fn settle(&self, index: usize, attempt: u64, outcome: &Result<()>) {
        if let Some(record) = self.records().get_mut(&index) {
            if record.attempt == attempt {
                record.outcome = Some(outcome.clone());
            }
        }
    }
}

/// Owns the prefetch record of every scene.
///
/// Cheap to clone; clones share records. Methods that start work spawn Tokio
/// tasks and must be called inside a runtime.
#[derive(Clone)]
pub struct ScenePrefetcher {
    inner: Arc<Inner>,
}

impl ScenePrefetcher {
    /// Create a prefetcher over a scene plan
    pub fn new(plan: ScenePlan, prefetcher: Prefetcher) -> Self {
        Self {
            inner: Arc::new(Inner {
                plan,
                prefetcher,
                records: Mutex::new(HashMap::new()),
                prefetched: Mutex::new(HashSet::new()),
            }),
        }
    }

    /// The plan the resource sets come from
    pub fn plan(&self) -> &ScenePlan {
        &self.inner.plan
    }

    fn spawn_attempt(&self, index: usize, attempt: u64) -> SceneFuture {
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let outcome = inner.load_scene(index, attempt).await;
            inner.settle(index, attempt, &outcome);
            outcome
        });

        task.map(move |joined| {
            joined.unwrap_or_else(|e| {
                Err(ScenePrefetchError::Aborted {
                    scene: index,
                    reason: e.to_string(),
                })
            })
        })
        .boxed()
        .shared()
    }

    /// Existing record's future and attempt, creating the record if absent.
    ///
    /// Indices outside the plan get a ready error and no record.
    fn current(&self, index: usize) -> (SceneFuture, u64) {
        let count = self.inner.plan.scene_count();
        if index >= count {
            debug!(scene = index, count, "Prefetch requested for unknown scene");
            let rejected = future::ready(Err(ScenePrefetchError::UnknownScene { scene: index, count }));
            return (rejected.boxed().shared(), 0);
        }

        let mut records = self.inner.records();
        if let Some(record) = records.get(&index) {
            return (record.future.clone(), record.attempt);
        }

        let future = self.spawn_attempt(index, 0);
        records.insert(
            index,
            SceneRecord {
                attempt: 0,
                future: future.clone(),
                outcome: None,
            },
        );
        (future, 0)
    }

    /// Replace attempt `failed` with a fresh one, unless another caller already did
    fn rearm(&self, index: usize, failed: u64) -> SceneFuture {
        let mut records = self.inner.records();
        if let Some(record) = records.get(&index) {
            if record.attempt != failed {
                return record.future.clone();
            }
        }

        let attempt = failed + 1;
        let future = self.spawn_attempt(index, attempt);
        records.insert(
            index,
            SceneRecord {
                attempt,
                future: future.clone(),
                outcome: None,
            },
        );
        future
    }

    /// Memoized prefetch of one scene.
    ///
    /// Every call for the same index returns the same shared attempt. Assets
    /// of the scene are fetched concurrently and the future resolves once all
    /// of them settled.
    pub fn prefetch_scene(&self, index: usize) -> SceneFuture {
        self.current(index).0
    }

    /// On-demand prefetch before a scene renders.
    ///
    /// Joins the scene's current attempt. If that attempt fails, whether it
    /// already had or fails while awaited, one fresh attempt is made and its
    /// outcome returned.
    pub async fn ensure_scene(&self, index: usize) -> Result<()> {
        let (future, attempt) = self.current(index);
        let Err(first) = future.await else {
            return Ok(());
        };

        if matches!(first, ScenePrefetchError::UnknownScene { .. }) {
            return Err(first);
        }

        warn!(scene = index, error = %first, "Retrying scene prefetch on demand");
        self.rearm(index, attempt).await
    }

    /// Prefetch every scene in ascending order, one scene at a time.
    ///
    /// Stops at the first failing scene; later scenes are left to on-demand
    /// prefetch. The handle may be dropped to run the sequence detached.
    pub fn run_full_sequence(&self) -> JoinHandle<SequenceReport> {
        let this = self.clone();
        tokio::spawn(async move {
            let mut report = SequenceReport::default();
            for index in 0..this.plan().scene_count() {
                match this.prefetch_scene(index).await {
                    Ok(()) => report.completed.push(index),
                    Err(e) => {
                        warn!(scene = index, error = %e, "Abandoning eager prefetch sequence");
                        report.aborted_at = Some(index);
                        report.failure = Some(e.to_string());
                        break;
                    }
                }
            }

            if report.is_complete() {
                info!(scenes = report.completed.len(), "Eager prefetch sequence complete");
            }
            report
        })
    }

    /// State of a scene's prefetch record
    pub fn status(&self, index: usize) -> PrefetchStatus {
        match self.inner.records().get(&index) {
            None => PrefetchStatus::NotStarted,
            Some(SceneRecord { outcome: None, .. }) => PrefetchStatus::InFlight,
            Some(SceneRecord {
                outcome: Some(Ok(())),
                ..
            }) => PrefetchStatus::Succeeded,
            Some(SceneRecord {
                outcome: Some(Err(e)),
                ..
            }) => PrefetchStatus::Failed(e.to_string()),
        }
    }

    /// Whether `path` belongs to a scene that prefetched successfully
    pub fn is_prefetched(&self, path: &str) -> bool {
        self.inner.prefetched().contains(path)
    }
}

impl std::fmt::Debug for ScenePrefetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenePrefetcher")
            .field("scenes", &self.inner.plan.scene_count())
            .field("records", &self.inner.records().len())
            .finish_non_exhaustive()
    }
}
