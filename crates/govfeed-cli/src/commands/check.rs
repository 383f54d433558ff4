use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use govfeed_core::feed::SourceFetcher;
use govfeed_core::{AppConfig, FeedSource, SourceCatalog};

pub async fn run(catalog: &SourceCatalog, fetcher: Arc<dyn SourceFetcher>, config: &AppConfig) -> Result<()> {
    let pool = Arc::new(Semaphore::new(config.fetch.workers.max(1)));
    let deadline = Duration::from_secs(config.fetch.task_timeout_secs);
    let mut join_set = JoinSet::new();

    for (index, source) in catalog.sources().iter().enumerate() {
        let source = Arc::clone(source);
        let fetcher = Arc::clone(&fetcher);
        let pool = Arc::clone(&pool);
        join_set.spawn(async move {
            let _permit = pool.acquire_owned().await.ok();
            let outcome = match tokio::time::timeout(deadline, fetcher.fetch(&source)).await {
                Ok(Ok(items)) => Ok(items.len()),
                Ok(Err(e)) => Err(e.to_string()),
                Err(_) => Err(format!("timed out after {}s", deadline.as_secs())),
            };
            (index, source, outcome)
        });
    }

    let mut rows: Vec<(usize, Arc<FeedSource>, std::result::Result<usize, String>)> = Vec::new();
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok(row) => rows.push(row),
            Err(e) => tracing::error!("Check task failed: {}", e),
        }
    }
    rows.sort_by_key(|(index, _, _)| *index);

    let failed = rows.iter().filter(|(_, _, outcome)| outcome.is_err()).count();
    println!("Checked {} sources ({} failed):\n", rows.len(), failed);

    for (_, source, outcome) in &rows {
        match outcome {
            Ok(count) => println!("  OK    {} - {} items", source.name(), count),
            Err(reason) => println!("  FAIL  {} - {}", source.name(), reason),
        }
        println!("        {}", source.url());
    }

    Ok(())
}
