use serde::{Deserialize, Serialize};

use crate::feed::CorpusVersion;
use crate::ingest::{BatchSummary, SourceReport};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceReportDto {
    pub source: String,
    pub fetched: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&SourceReport> for SourceReportDto {
    fn from(value: &SourceReport) -> Self {
        Self {
            source: value.source.clone(),
            fetched: value.fetched,
            error: value.error.clone(),
        }
    }
}

/// Outcome of one triggered ingestion batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    pub run_id: String,
    pub corpus_version: CorpusVersion,
    pub fetched: usize,
    pub inserted: usize,
    pub updated: usize,
    pub absorbed: usize,
    pub ambiguous: usize,
    pub skipped: usize,
    pub sources: Vec<SourceReportDto>,
}

impl From<&BatchSummary> for IngestResponse {
    fn from(value: &BatchSummary) -> Self {
        Self {
            run_id: value.run_id.clone(),
            corpus_version: value.corpus_version,
            fetched: value.counts.fetched,
            inserted: value.counts.inserted,
            updated: value.counts.updated,
            absorbed: value.counts.absorbed,
            ambiguous: value.counts.ambiguous,
            skipped: value.counts.skipped,
            sources: value.sources.iter().map(SourceReportDto::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::BatchCounts;

    #[test]
    fn response_flattens_batch_counts() {
        let summary = BatchSummary {
            run_id: "01ARZ3NDEKTSV4RRFFQ69G5FAV".into(),
            corpus_version: 7,
            counts: BatchCounts {
                fetched: 40,
                inserted: 12,
                updated: 20,
                absorbed: 5,
                ambiguous: 1,
                skipped: 3,
            },
            sources: vec![SourceReport {
                source: "jobhub".into(),
                fetched: 40,
                error: None,
            }],
        };

        let response = IngestResponse::from(&summary);
        assert_eq!(response.corpus_version, 7);
        assert_eq!(response.inserted, 12);
        assert_eq!(response.sources.len(), 1);
        assert_eq!(response.sources[0].source, "jobhub");
    }

    #[test]
    fn error_field_is_omitted_when_none() {
        let report = SourceReportDto {
            source: "acme".into(),
            fetched: 3,
            error: None,
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(!json.contains("error"));
    }
}
