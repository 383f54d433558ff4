mod federal;
mod fetcher;
mod models;
mod parser;

pub use federal::parse_federal_register;
pub use fetcher::{HttpFeedFetcher, SourceFetcher};
pub use models::{FeedItem, RawItem};
pub use parser::{html_to_text, parse_feed};
