mod article_store;
mod database;
mod queue;
mod retry;

pub use article_store::{ArticleStore, SqliteArticleStore};
pub use database::Database;
pub use queue::PersistenceQueue;
