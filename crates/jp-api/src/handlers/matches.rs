use axum::{
    Json,
    extract::{Path, State},
};
use chrono::Utc;

use jp_common::api::MatchResultDto;
use jp_common::db;

use crate::SharedState;
use crate::error::ApiError;

/// Sub-score breakdown for one candidate and job pair. Skips the feed
/// filters so stale and sub-threshold matches can still be explained.
pub async fn match_breakdown(
    State(state): State<SharedState>,
    Path((candidate_id, job_id)): Path<(String, String)>,
) -> Result<Json<MatchResultDto>, ApiError> {
    let profile = db::fetch_profile(&state.pool, &candidate_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("candidate {candidate_id} not found")))?;

    let job = db::fetch_job(&state.pool, &job_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("job {job_id} not found")))?;

    let actions = db::fetch_actions(&state.pool, &candidate_id).await?;
    let result = state
        .engine
        .breakdown(&profile, &job, &actions.signal, Utc::now());

    Ok(Json(MatchResultDto::from(&result)))
}
