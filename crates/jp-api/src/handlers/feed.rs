use axum::{
    Json,
    extract::{Path, State},
};
use chrono::Utc;

use jp_common::api::FeedResponse;
use jp_common::db;
use jp_common::feed::FeedKey;

use crate::SharedState;
use crate::error::ApiError;

/// Daily feed for one candidate. Served from the feed cache when the
/// profile and corpus are unchanged; recomputed and cached otherwise.
pub async fn candidate_feed(
    State(state): State<SharedState>,
    Path(candidate_id): Path<String>,
) -> Result<Json<FeedResponse>, ApiError> {
    let profile = db::fetch_profile(&state.pool, &candidate_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("candidate {candidate_id} not found")))?;

    let corpus_version = db::current_corpus_version(&state.pool).await?;
    let now = Utc::now();
    let key = FeedKey {
        candidate_id: candidate_id.clone(),
        profile_hash: profile.profile_hash(),
        corpus_version,
    };

    if let Some(results) = state.feed_cache.get(&key, now) {
        return Ok(Json(FeedResponse::from_results(
            &candidate_id,
            corpus_version,
            now,
            &results,
        )));
    }

    let actions = db::fetch_actions(&state.pool, &candidate_id).await?;
    let jobs = db::fetch_feed_jobs(&state.pool).await?;
    let results = state.engine.rank(
        &profile,
        &jobs,
        &actions.excluded_job_ids,
        &actions.signal,
        now,
    );
    state.feed_cache.put(key, results.clone(), now);

    Ok(Json(FeedResponse::from_results(
        &candidate_id,
        corpus_version,
        now,
        &results,
    )))
}
