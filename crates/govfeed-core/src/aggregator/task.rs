use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use super::report::{SourceOutcome, TaskStats};
use super::Inner;
use crate::catalog::FeedSource;
use crate::feed::{html_to_text, FeedItem, RawItem};
use crate::query::QuerySpec;
use crate::rank::SeenSet;
use crate::Error;

/// What a task keeps from its source
pub(crate) enum ItemFilter {
    /// Blank query: every item, unscored
    Everything,
    Terms { spec: QuerySpec, deep: bool },
}

pub(crate) struct ScoredItem {
    pub item: FeedItem,
    pub score: i64,
}

/// Everything one source task needs; owned so the task is `'static`
pub(crate) struct SourceTask {
    pub inner: Arc<Inner>,
    pub source: Arc<FeedSource>,
    pub filter: Arc<ItemFilter>,
    pub seen: Arc<SeenSet>,
    pub results: mpsc::Sender<ScoredItem>,
    pub now: DateTime<Utc>,
}

impl SourceTask {
    pub async fn run(self) -> TaskStats {
        let Some((entries, outcome)) = self.load_entries().await else {
            return TaskStats::new(SourceOutcome::Failed);
        };

        let mut stats = TaskStats::new(outcome);

        for raw in entries.iter() {
            let scored = match self.filter.as_ref() {
                ItemFilter::Everything => {
                    if !self.seen.admit(&raw.link) {
                        stats.duplicates += 1;
                        continue;
                    }
                    ScoredItem {
                        item: self.to_item(raw),
                        score: 0,
                    }
                }
                ItemFilter::Terms { spec, deep } => {
                    if !matches_item(spec, raw, *deep) {
                        continue;
                    }
                    stats.matched += 1;

                    let score = self.inner.scoring.score(&raw.title, raw.published_at, spec, self.now);
                    let item = self.to_item(raw);

                    if !self.seen.admit(&raw.link) {
                        stats.duplicates += 1;
                        continue;
                    }

                    if let Some(ref queue) = self.inner.persistence {
                        queue.enqueue(&raw.link, &raw.title);
                    }

                    ScoredItem { item, score }
                }
            };

            if self.results.send(scored).await.is_err() {
                // Collector is gone; nothing left to deliver to
                break;
            }
        }

        tracing::debug!(
            source = %self.source.url(),
            outcome = ?stats.outcome,
            matched = stats.matched,
            "Source task finished"
        );

        stats
    }

    fn to_item(&self, raw: &RawItem) -> FeedItem {
        let category = self
            .inner
            .classifier
            .classify(&self.source, &raw.title, &raw.description);
        FeedItem::from_raw(raw, category)
    }

    /// Cache lookup, then a bounded, deadline-guarded fetch on miss or stale
    async fn load_entries(&self) -> Option<(Arc<Vec<RawItem>>, SourceOutcome)> {
        if let Some(hit) = self.fresh_entries() {
            tracing::debug!(source = %self.source.url(), "Cache hit");
            return Some((hit, SourceOutcome::CacheHit));
        }

        // Held until the new entry is in the cache
        let _refetch = self.inner.cache.fetch_lock(self.source.id()).await;
        if let Some(hit) = self.fresh_entries() {
            tracing::debug!(source = %self.source.url(), "Cache filled by concurrent fetch");
            return Some((hit, SourceOutcome::CacheHit));
        }
        let cached = self.inner.cache.get(self.source.id());

        let result = {
            let _permit = match self.inner.pool.acquire().await {
                Ok(permit) => permit,
                Err(_) => {
                    tracing::error!("Worker pool closed");
                    return None;
                }
            };

            match tokio::time::timeout(self.inner.task_timeout, self.inner.fetcher.fetch(&self.source)).await {
                Ok(result) => result,
                Err(_) => Err(Error::unavailable(
                    self.source.url(),
                    format!("timed out after {}s", self.inner.task_timeout.as_secs_f32()),
                )),
            }
        };

        match result {
            Ok(items) => {
                tracing::debug!(source = %self.source.url(), items = items.len(), "Fetched source");
                Some((self.inner.cache.put(self.source.id(), items), SourceOutcome::Fetched))
            }
            Err(e) => match cached {
                Some(stale) if self.inner.serve_stale => {
                    tracing::warn!(source = %self.source.url(), error = %e, "Fetch failed; serving stale cache");
                    Some((stale.entries, SourceOutcome::Stale))
                }
                _ => {
                    tracing::warn!(source = %self.source.url(), error = %e, "Fetch failed; skipping source");
                    None
                }
            },
        }
    }

    fn fresh_entries(&self) -> Option<Arc<Vec<RawItem>>> {
        self.inner
            .cache
            .get(self.source.id())
            .filter(|hit| hit.is_fresh)
            .map(|hit| hit.entries)
    }
}

/// Quick mode: title only; deep mode: title plus plain-text description
fn matches_item(spec: &QuerySpec, raw: &RawItem, deep: bool) -> bool {
    if spec.matches(&raw.title) {
        return true;
    }
    if !deep || raw.description.is_empty() {
        return false;
    }

    let haystack = format!("{} {}", raw.title, html_to_text(&raw.description));
    spec.matches(&haystack)
}
