pub mod feed_response;
pub mod ingest_response;

pub use feed_response::{FeedResponse, MatchResultDto, ScoreBreakdownDto};
pub use ingest_response::{IngestResponse, SourceReportDto};
