use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::time::{Duration, sleep};
use tracing::instrument;

use crate::{JobSource, RawPosting};

use super::{AdapterError, DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_REQUEST_DELAY_SECS, SourceAdapter};

/// Hard cap on pagination so a looping `next_page` cannot hold a batch open
/// forever.
const MAX_PAGES: u32 = 100;

/// Wire shape of one page from an aggregator board API.
#[derive(Debug, Deserialize)]
struct AggregatorPage {
    jobs: Vec<AggregatorJob>,
    next_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct AggregatorJob {
    id: String,
    title: String,
    company: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    description: String,
    url: String,
    posted_at: Option<DateTime<Utc>>,
    salary: Option<String>,
    work_type: Option<String>,
    seniority: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

/// Paginated JSON board API. One GET per page with a politeness delay
/// between pages.
pub struct AggregatorApiAdapter {
    board: String,
    base_url: String,
    client: reqwest::Client,
    request_delay: Duration,
}

impl AggregatorApiAdapter {
    pub fn new(board: impl Into<String>, base_url: impl Into<String>) -> Result<Self, AdapterError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            board: board.into(),
            base_url: base_url.into(),
            client,
            request_delay: Duration::from_secs(DEFAULT_REQUEST_DELAY_SECS),
        })
    }

    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    async fn fetch_page(&self, page: u32) -> Result<AggregatorPage, AdapterError> {
        let url = format!("{}/jobs?page={page}", self.base_url.trim_end_matches('/'));
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::UnexpectedStatus {
                status: status.as_u16(),
                url,
            });
        }
        Ok(response.json::<AggregatorPage>().await?)
    }
}

fn map_job(board: &str, job: AggregatorJob) -> RawPosting {
    RawPosting {
        source: JobSource::Aggregator(board.to_string()),
        source_id: Some(job.id),
        title: job.title,
        company: job.company,
        location: job.location,
        description: job.description,
        url: job.url,
        posted_at: job.posted_at,
        salary_text: job.salary,
        work_type_text: job.work_type,
        seniority_text: job.seniority,
        latitude: job.latitude,
        longitude: job.longitude,
    }
}

#[async_trait::async_trait]
impl SourceAdapter for AggregatorApiAdapter {
    fn source(&self) -> JobSource {
        JobSource::Aggregator(self.board.clone())
    }

    #[instrument(skip(self), fields(board = %self.board))]
    async fn fetch(&self) -> Result<Vec<RawPosting>, AdapterError> {
        let mut postings = Vec::new();
        let mut page = 1u32;

        loop {
            let body = self.fetch_page(page).await?;
            let fetched = body.jobs.len();
            postings.extend(body.jobs.into_iter().map(|job| map_job(&self.board, job)));
            tracing::debug!(page, fetched, "fetched aggregator page");

            match body.next_page {
                Some(next) if next > page && next <= MAX_PAGES => {
                    page = next;
                    sleep(self.request_delay).await;
                }
                _ => break,
            }
        }

        Ok(postings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_deserializes_with_optional_fields_missing() {
        let body = r#"{
            "jobs": [{
                "id": "agg-123",
                "title": "Backend Engineer",
                "company": "Acme Robotics",
                "url": "https://boards.example.com/jobs/agg-123"
            }],
            "next_page": 2
        }"#;
        let page: AggregatorPage = serde_json::from_str(body).unwrap();
        assert_eq!(page.jobs.len(), 1);
        assert_eq!(page.next_page, Some(2));
        assert!(page.jobs[0].posted_at.is_none());
        assert!(page.jobs[0].location.is_empty());
    }

    #[test]
    fn mapped_posting_carries_board_identity() {
        let job = AggregatorJob {
            id: "agg-123".into(),
            title: "Backend Engineer".into(),
            company: "Acme Robotics".into(),
            location: "Portland, OR".into(),
            description: "Build services.".into(),
            url: "https://boards.example.com/jobs/agg-123".into(),
            posted_at: None,
            salary: Some("$120k-$150k".into()),
            work_type: Some("remote".into()),
            seniority: None,
            latitude: None,
            longitude: None,
        };

        let posting = map_job("jobhub", job);
        assert_eq!(posting.source, JobSource::Aggregator("jobhub".into()));
        assert_eq!(posting.source_id.as_deref(), Some("agg-123"));
        assert_eq!(posting.salary_text.as_deref(), Some("$120k-$150k"));
    }
}
