pub mod aggregator;
pub mod career_page;
pub mod internal;

use async_trait::async_trait;
use deadpool_postgres::PoolError;
use tokio_postgres::Error as PgError;

use crate::{JobSource, RawPosting};

pub use aggregator::AggregatorApiAdapter;
pub use career_page::CareerPageAdapter;
pub use internal::InternalBoardAdapter;

/// Delay between consecutive requests to the same origin.
pub const DEFAULT_REQUEST_DELAY_SECS: u64 = 2;

/// Per-request timeout for external fetches.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("failed to render posting html: {0}")]
    HtmlToText(#[from] html2text::Error),
    #[error("failed to get postgres connection: {0}")]
    Pool(#[from] PoolError),
    #[error("postgres error: {0}")]
    Postgres(#[from] PgError),
}

/// One upstream origin of raw postings. Adapters only fetch and reshape;
/// canonicalization and dedup happen downstream in the ingest pipeline.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source(&self) -> JobSource;

    async fn fetch(&self) -> Result<Vec<RawPosting>, AdapterError>;
}
