use axum::{
    Json,
    extract::{Path, State},
};
use tracing::info;

use jp_common::api::IngestResponse;

use crate::SharedState;
use crate::error::ApiError;

/// Runs one ingestion batch for a single registered source. Batches are
/// idempotent, so a retried request is safe.
pub async fn trigger_ingest(
    State(state): State<SharedState>,
    Path(source): Path<String>,
) -> Result<Json<IngestResponse>, ApiError> {
    if !state.ingestor.sources().iter().any(|name| name == &source) {
        return Err(ApiError::NotFound(format!("unknown source: {source}")));
    }

    info!(source, "ingestion batch triggered");
    let summary = state.ingestor.run_batch_for(Some(&source)).await?;

    Ok(Json(IngestResponse::from(&summary)))
}
