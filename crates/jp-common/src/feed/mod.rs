pub mod cache;

pub use cache::{CachedFeed, CorpusVersion, FeedCache, FeedKey};
