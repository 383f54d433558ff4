use chrono::Utc;

use super::retry::execute_with_retry;
use super::Database;
use crate::Result;

/// Sink for articles seen by searches
///
/// Implementations must be idempotent: a link stored twice is a no-op.
#[async_trait::async_trait]
pub trait ArticleStore: Send + Sync {
    async fn upsert_article(&self, link: &str, title: &str) -> Result<()>;
}

/// SQLite-backed article store
#[derive(Clone)]
pub struct SqliteArticleStore {
    db: Database,
}

impl SqliteArticleStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles")
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }

    pub async fn title_of(&self, link: &str) -> Result<Option<String>> {
        let title = sqlx::query_scalar("SELECT title FROM articles WHERE link = ?")
            .bind(link)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(title)
    }
}

#[async_trait::async_trait]
impl ArticleStore for SqliteArticleStore {
    async fn upsert_article(&self, link: &str, title: &str) -> Result<()> {
        let now = Utc::now();

        execute_with_retry(|| async move {
            sqlx::query("INSERT OR IGNORE INTO articles (link, title, first_seen_at) VALUES (?, ?, ?)")
                .bind(link)
                .bind(title)
                .bind(now)
                .execute(self.db.pool())
                .await
                .map(|_| ())
        })
        .await?;

        Ok(())
    }
}
