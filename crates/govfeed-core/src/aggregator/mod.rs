//! Fan-out search across every catalog source.
//!
//! One task per source runs in a [`JoinSet`]. Network fetches share a
//! bounded worker pool, results stream back over a channel, and the
//! collected items are sorted by score once every task has finished.
//! Per-source failures are logged and never reach the caller.

mod report;
mod task;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio::time::Instant;

pub use report::SearchReport;

use crate::cache::FetchCache;
use crate::catalog::SourceCatalog;
use crate::config::AppConfig;
use crate::expand::TermExpander;
use crate::feed::{FeedItem, SourceFetcher};
use crate::query::{normalize, NormalizedQuery, QuerySpec};
use crate::rank::{Classifier, ScoringPolicy, SeenSet};
use crate::storage::PersistenceQueue;
use task::{ItemFilter, ScoredItem, SourceTask};

const DEFAULT_WORKERS: usize = 8;
const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(20);
const RESULT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    /// Match against titles only
    #[default]
    Quick,
    /// Match titles and descriptions, with term expansion when available
    Deep,
}

#[derive(Debug, Clone, Copy)]
enum RunState {
    Dispatched,
    Collecting,
    Sorted,
    Done,
}

pub(crate) struct Inner {
    catalog: SourceCatalog,
    cache: Arc<FetchCache>,
    fetcher: Arc<dyn SourceFetcher>,
    classifier: Classifier,
    scoring: ScoringPolicy,
    expander: Option<Arc<dyn TermExpander>>,
    persistence: Option<PersistenceQueue>,
    pool: Arc<Semaphore>,
    task_timeout: Duration,
    serve_stale: bool,
}

/// Search orchestrator; cheap to clone, all clones share cache and pool
#[derive(Clone)]
pub struct Aggregator {
    inner: Arc<Inner>,
}

pub struct AggregatorBuilder {
    catalog: SourceCatalog,
    fetcher: Arc<dyn SourceFetcher>,
    cache: Option<Arc<FetchCache>>,
    classifier: Option<Classifier>,
    scoring: ScoringPolicy,
    expander: Option<Arc<dyn TermExpander>>,
    persistence: Option<PersistenceQueue>,
    workers: usize,
    task_timeout: Duration,
    serve_stale: bool,
}

impl AggregatorBuilder {
    pub fn cache(mut self, cache: Arc<FetchCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn scoring(mut self, scoring: ScoringPolicy) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn expander(mut self, expander: Option<Arc<dyn TermExpander>>) -> Self {
        self.expander = expander;
        self
    }

    pub fn persistence(mut self, queue: PersistenceQueue) -> Self {
        self.persistence = Some(queue);
        self
    }

    /// Size of the fetch worker pool; clamped to at least one
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }

    /// Whether a failed refetch may fall back to an expired cache entry
    pub fn serve_stale(mut self, enabled: bool) -> Self {
        self.serve_stale = enabled;
        self
    }

    /// Apply cache, fetch and scoring settings from configuration
    pub fn with_config(self, config: &AppConfig) -> Self {
        self.cache(Arc::new(FetchCache::new(Duration::from_secs(config.cache.ttl_secs))))
            .scoring(ScoringPolicy::from(&config.scoring))
            .workers(config.fetch.workers)
            .task_timeout(Duration::from_secs(config.fetch.task_timeout_secs))
            .serve_stale(config.cache.serve_stale_on_error)
    }

    pub fn build(self) -> Aggregator {
        let classifier = self
            .classifier
            .unwrap_or_else(|| Classifier::from_catalog(&self.catalog));

        Aggregator {
            inner: Arc::new(Inner {
                catalog: self.catalog,
                cache: self.cache.unwrap_or_default(),
                fetcher: self.fetcher,
                classifier,
                scoring: self.scoring,
                expander: self.expander,
                persistence: self.persistence,
                pool: Arc::new(Semaphore::new(self.workers)),
                task_timeout: self.task_timeout,
                serve_stale: self.serve_stale,
            }),
        }
    }
}

impl Aggregator {
    pub fn builder(catalog: SourceCatalog, fetcher: Arc<dyn SourceFetcher>) -> AggregatorBuilder {
        AggregatorBuilder {
            catalog,
            fetcher,
            cache: None,
            classifier: None,
            scoring: ScoringPolicy::default(),
            expander: None,
            persistence: None,
            workers: DEFAULT_WORKERS,
            task_timeout: DEFAULT_TASK_TIMEOUT,
            serve_stale: false,
        }
    }

    pub fn cache(&self) -> &FetchCache {
        &self.inner.cache
    }

    /// Title-only search
    pub async fn quick_search(&self, query: &str) -> Vec<FeedItem> {
        self.search(query, SearchMode::Quick).await
    }

    /// Title and description search, broadened by the term expander
    pub async fn deep_search(&self, query: &str) -> Vec<FeedItem> {
        self.search(query, SearchMode::Deep).await
    }

    pub async fn search(&self, query: &str, mode: SearchMode) -> Vec<FeedItem> {
        self.search_with_report(query, mode).await.0
    }

    pub async fn search_with_report(&self, query: &str, mode: SearchMode) -> (Vec<FeedItem>, SearchReport) {
        let started = Instant::now();

        let filter = match normalize(query) {
            NormalizedQuery::Nothing => {
                tracing::debug!(query, "Query has no terms; skipping fetch");
                let report = SearchReport {
                    sources: self.inner.catalog.len(),
                    elapsed: started.elapsed(),
                    ..SearchReport::default()
                };
                return (Vec::new(), report);
            }
            NormalizedQuery::Everything => ItemFilter::Everything,
            NormalizedQuery::Terms(spec) => {
                let deep = mode == SearchMode::Deep;
                let spec = if deep { self.expand_terms(spec).await } else { spec };
                ItemFilter::Terms { spec, deep }
            }
        };

        let (items, mut report) = self.run(filter).await;
        report.elapsed = started.elapsed();

        tracing::info!(
            query,
            mode = ?mode,
            results = report.results,
            failed = report.failed,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Search finished"
        );

        (items, report)
    }

    async fn run(&self, filter: ItemFilter) -> (Vec<FeedItem>, SearchReport) {
        let scored = matches!(filter, ItemFilter::Terms { .. });
        let filter = Arc::new(filter);
        let seen = Arc::new(SeenSet::new());
        let now = Utc::now();
        let (tx, mut rx) = mpsc::channel::<ScoredItem>(RESULT_CHANNEL_CAPACITY);

        let mut report = SearchReport {
            sources: self.inner.catalog.len(),
            ..SearchReport::default()
        };

        let mut join_set = JoinSet::new();
        for source in self.inner.catalog.sources() {
            let task = SourceTask {
                inner: Arc::clone(&self.inner),
                source: Arc::clone(source),
                filter: Arc::clone(&filter),
                seen: Arc::clone(&seen),
                results: tx.clone(),
                now,
            };
            join_set.spawn(task.run());
        }
        drop(tx);
        log_state(RunState::Dispatched, join_set.len());

        log_state(RunState::Collecting, join_set.len());
        let mut collected = Vec::new();
        while let Some(item) = rx.recv().await {
            collected.push(item);
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(stats) => report.absorb(stats),
                Err(e) => {
                    tracing::error!(error = %e, "Source task crashed");
                    report.panicked += 1;
                }
            }
        }

        if scored {
            // stable: equal scores keep arrival order
            collected.sort_by(|a, b| b.score.cmp(&a.score));
        }
        log_state(RunState::Sorted, collected.len());

        let items: Vec<FeedItem> = collected.into_iter().map(|s| s.item).collect();
        report.results = items.len();
        log_state(RunState::Done, items.len());

        (items, report)
    }

    /// Look up related terms concurrently; a failed lookup leaves its term as-is
    async fn expand_terms(&self, spec: QuerySpec) -> QuerySpec {
        let Some(ref expander) = self.inner.expander else {
            return spec;
        };

        let mut lookups = JoinSet::new();
        for term in spec.terms() {
            let expander = Arc::clone(expander);
            let term = term.to_string();
            lookups.spawn(async move {
                let related = expander.expand(&term).await;
                (term, related)
            });
        }

        let mut expansions = HashMap::new();
        while let Some(joined) = lookups.join_next().await {
            match joined {
                Ok((term, Ok(related))) => {
                    tracing::debug!(term = %term, related = ?related, provider = expander.name(), "Expanded term");
                    expansions.insert(term, related);
                }
                Ok((term, Err(e))) => {
                    tracing::warn!(term = %term, error = %e, "Term expansion failed; using term alone");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Term expansion task crashed");
                }
            }
        }

        if expansions.is_empty() {
            spec
        } else {
            spec.with_expansions(&expansions)
        }
    }
}

fn log_state(state: RunState, count: usize) {
    tracing::debug!(state = ?state, count, "Search state");
}
