use std::fmt;
use std::time::Duration;

use serde::Serialize;

/// How one source was served during a search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SourceOutcome {
    CacheHit,
    Fetched,
    /// Refetch failed; the previous entry was used
    Stale,
    Failed,
}

/// Per-task counters returned through the join set
#[derive(Debug, Clone, Copy)]
pub(crate) struct TaskStats {
    pub outcome: SourceOutcome,
    pub matched: usize,
    pub duplicates: usize,
}

impl TaskStats {
    pub fn new(outcome: SourceOutcome) -> Self {
        Self {
            outcome,
            matched: 0,
            duplicates: 0,
        }
    }
}

/// Counters for one search run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchReport {
    pub sources: usize,
    pub cache_hits: usize,
    pub fetched: usize,
    pub served_stale: usize,
    pub failed: usize,
    /// Tasks that panicked; counted separately from `failed`
    pub panicked: usize,
    /// Items that passed the query filter, before deduplication
    pub matched: usize,
    pub duplicates: usize,
    pub results: usize,
    #[serde(serialize_with = "serialize_millis", rename = "elapsed_ms")]
    pub elapsed: Duration,
}

impl SearchReport {
    pub(crate) fn absorb(&mut self, stats: TaskStats) {
        match stats.outcome {
            SourceOutcome::CacheHit => self.cache_hits += 1,
            SourceOutcome::Fetched => self.fetched += 1,
            SourceOutcome::Stale => self.served_stale += 1,
            SourceOutcome::Failed => self.failed += 1,
        }
        self.matched += stats.matched;
        self.duplicates += stats.duplicates;
    }
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

impl fmt::Display for SearchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} results from {} sources ({} cached, {} fetched, {} stale, {} failed",
            self.results, self.sources, self.cache_hits, self.fetched, self.served_stale, self.failed
        )?;
        if self.panicked > 0 {
            write!(f, ", {} crashed", self.panicked)?;
        }
        write!(
            f,
            "); {} matched, {} duplicates, {}ms",
            self.matched,
            self.duplicates,
            self.elapsed.as_millis()
        )
    }
}
