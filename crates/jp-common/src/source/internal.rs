use tracing::instrument;

use crate::db::PgPool;
use crate::{JobSource, RawPosting};

use super::{AdapterError, SourceAdapter};

const OPEN_POSTINGS_QUERY: &str = "SELECT \
        source_id,\
        title,\
        company,\
        location,\
        description,\
        url,\
        posted_at,\
        salary_text,\
        work_type_text,\
        seniority_text,\
        latitude,\
        longitude \
    FROM internal_postings \
    WHERE is_open = true \
    ORDER BY posted_at DESC NULLS LAST, source_id";

/// First-party postings come straight from our own table; no scraping and
/// no politeness delay.
pub struct InternalBoardAdapter {
    pool: PgPool,
}

impl InternalBoardAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SourceAdapter for InternalBoardAdapter {
    fn source(&self) -> JobSource {
        JobSource::Internal
    }

    #[instrument(skip(self))]
    async fn fetch(&self) -> Result<Vec<RawPosting>, AdapterError> {
        let client = self.pool.get().await?;
        let rows = client.query(OPEN_POSTINGS_QUERY, &[]).await?;

        let postings = rows
            .into_iter()
            .map(|row| RawPosting {
                source: JobSource::Internal,
                source_id: Some(row.get("source_id")),
                title: row.get("title"),
                company: row.get("company"),
                location: row
                    .get::<_, Option<String>>("location")
                    .unwrap_or_default(),
                description: row
                    .get::<_, Option<String>>("description")
                    .unwrap_or_default(),
                url: row.get("url"),
                posted_at: row.get("posted_at"),
                salary_text: row.get("salary_text"),
                work_type_text: row.get("work_type_text"),
                seniority_text: row.get("seniority_text"),
                latitude: row.get("latitude"),
                longitude: row.get("longitude"),
            })
            .collect();

        Ok(postings)
    }
}
