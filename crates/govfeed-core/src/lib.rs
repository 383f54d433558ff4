pub mod aggregator;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod expand;
pub mod feed;
pub mod query;
pub mod rank;
pub mod storage;

pub use aggregator::{Aggregator, AggregatorBuilder, SearchMode, SearchReport};
pub use cache::FetchCache;
pub use catalog::{FeedSource, SourceCatalog, SourceKind};
pub use config::AppConfig;
pub use error::{Error, Result};
pub use feed::FeedItem;
