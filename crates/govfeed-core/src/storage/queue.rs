use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::ArticleStore;

#[derive(Debug)]
struct ArticleRecord {
    link: String,
    title: String,
}

/// Fire-and-forget handle for recording seen articles
///
/// Enqueueing never waits. A background task drains the queue into the
/// store and swallows its errors; it ends once every handle is dropped.
#[derive(Clone)]
pub struct PersistenceQueue {
    tx: mpsc::UnboundedSender<ArticleRecord>,
}

impl PersistenceQueue {
    /// Start the background writer; the handle resolves to the number of
    /// successful upserts once the queue closes
    pub fn spawn(store: Arc<dyn ArticleStore>) -> (Self, JoinHandle<u64>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<ArticleRecord>();

        let handle = tokio::spawn(async move {
            let mut stored = 0u64;
            while let Some(record) = rx.recv().await {
                match store.upsert_article(&record.link, &record.title).await {
                    Ok(()) => stored += 1,
                    Err(e) => {
                        tracing::debug!(link = %record.link, error = %e, "Article upsert failed");
                    }
                }
            }
            tracing::debug!(stored, "Persistence queue closed");
            stored
        });

        (Self { tx }, handle)
    }

    pub fn enqueue(&self, link: &str, title: &str) {
        let record = ArticleRecord {
            link: link.to_string(),
            title: title.to_string(),
        };
        if self.tx.send(record).is_err() {
            tracing::debug!(link, "Persistence queue closed; dropping article");
        }
    }
}
