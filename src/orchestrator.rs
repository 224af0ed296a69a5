//! Bounded-concurrency plugin resolution
//!
//! Every declared plugin is resolved on its own task. A semaphore caps how
//! many resolutions run at once, and each failure is captured in that
//! plugin's [`FetchResult`] so siblings keep going. The shared cache is
//! written back once, after every task has finished.

use crate::cache::Cache;
use crate::error::{PlugupError, PlugupResult};
use crate::plugin::{Plugin, PluginDesc};
use crate::repo::SourceRepo;
use crate::upstream::FetchContext;
use futures_util::stream::{FuturesUnordered, StreamExt};
use indicatif::ProgressBar;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Semaphore;
use tracing::{debug, info, info_span, warn, Instrument};

/// Cache shared between concurrent resolutions
pub type SharedCache = Arc<Mutex<Cache>>;

/// Wrap a cache for sharing between tasks
pub fn shared(cache: Cache) -> SharedCache {
    Arc::new(Mutex::new(cache))
}

/// Lock the cache; entries stay valid even if a holder panicked
pub fn lock(cache: &SharedCache) -> MutexGuard<'_, Cache> {
    cache.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Outcome of resolving one declared plugin
#[derive(Debug)]
pub struct FetchResult {
    /// The description that was resolved
    pub desc: PluginDesc,
    /// Resolved plugin, or the failure wrapped as `PlugupError::Resolution`
    pub outcome: PlugupResult<Plugin>,
    /// New location reported by the host, if the repository moved
    pub redirect: Option<SourceRepo>,
}

/// Resolve one plugin to its newest commit and content hash.
///
/// When `cache` already knows the commit, the cached entry is reused with
/// the request's name and the fresh commit date, and nothing is hashed.
pub async fn resolve_one(
    ctx: &FetchContext,
    desc: &PluginDesc,
    cache: Option<&SharedCache>,
) -> PlugupResult<(Plugin, Option<SourceRepo>)> {
    let span = info_span!(parent: &ctx.span, "resolve", plugin = %desc.name());
    resolve_in_span(ctx, desc, cache).instrument(span).await
}

async fn resolve_in_span(
    ctx: &FetchContext,
    desc: &PluginDesc,
    cache: Option<&SharedCache>,
) -> PlugupResult<(Plugin, Option<SourceRepo>)> {
    info!(
        "Fetching last commit for plugin {} from {}@{}",
        desc.name(),
        desc.repo,
        desc.repo.branch()
    );
    let latest = desc.repo.latest_commit(ctx).await?;

    let cached = cache.and_then(|c| lock(c).get(&latest.commit).cloned());
    if let Some(mut plugin) = cached {
        debug!("Cache hit for {}", desc.name());
        plugin.name = desc.name().to_string();
        plugin.date = Some(latest.date);
        return Ok((plugin, latest.redirect));
    }

    let has_submodules = desc.repo.has_submodules(ctx).await?;
    debug!("Prefetching {}", desc.name());
    let content_hash = desc.repo.prefetch(ctx, &latest.commit).await?;

    let plugin = Plugin::new(
        desc.name(),
        latest.commit,
        has_submodules,
        content_hash,
        Some(latest.date),
    );
    Ok((plugin, latest.redirect))
}

/// Resolves batches of plugins with bounded parallelism
pub struct FetchOrchestrator {
    ctx: FetchContext,
    concurrency: usize,
    progress: Option<ProgressBar>,
}

impl FetchOrchestrator {
    /// Create an orchestrator running at most `concurrency` resolutions
    pub fn new(ctx: FetchContext, concurrency: usize) -> Self {
        Self {
            ctx,
            concurrency: concurrency.max(1),
            progress: None,
        }
    }

    /// Tick `bar` once per finished plugin
    pub fn with_progress(mut self, bar: Option<ProgressBar>) -> Self {
        self.progress = bar;
        self
    }

    /// Resolve every description, one result per input.
    ///
    /// Successful resolutions are added to `cache`, which is stored once
    /// all tasks are done. Completion order is not preserved.
    pub async fn resolve_many(&self, descs: Vec<PluginDesc>, cache: &SharedCache) -> Vec<FetchResult> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = FuturesUnordered::new();

        debug!(
            "Resolving {} plugins with {} workers",
            descs.len(),
            self.concurrency
        );

        for desc in descs {
            let ctx = self.ctx.clone();
            let cache = Arc::clone(cache);
            let semaphore = Arc::clone(&semaphore);
            let task_desc = desc.clone();

            let handle = tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| PlugupError::Internal(format!("worker pool closed: {e}")))?;
                let (plugin, redirect) = resolve_one(&ctx, &task_desc, Some(&cache)).await?;
                lock(&cache).insert(plugin.clone());
                Ok::<_, PlugupError>((plugin, redirect))
            });

            tasks.push(async move { (desc, handle.await) });
        }

        let mut results = Vec::with_capacity(tasks.len());
        while let Some((desc, joined)) = tasks.next().await {
            let resolved = joined.unwrap_or_else(|e| {
                Err(PlugupError::Internal(format!("resolution task failed: {e}")))
            });

            let (outcome, redirect) = match resolved {
                Ok((plugin, redirect)) => (Ok(plugin), redirect),
                Err(e) => (Err(PlugupError::resolution(desc.to_string(), e)), None),
            };

            if let Some(bar) = &self.progress {
                bar.inc(1);
            }
            results.push(FetchResult {
                desc,
                outcome,
                redirect,
            });
        }

        if let Err(e) = lock(cache).store() {
            warn!("Failed to store plugin cache: {}", e);
        }

        results
    }
}
