//! Single-track rating endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::ratings::{RatingEntry, RatingFilters, RatingSort, RatingWorklist};
use crate::AppState;

/// Query parameters for the worklist
#[derive(Debug, Deserialize)]
pub struct RateQuery {
    #[serde(default)]
    pub tester: String,
    pub composer: Option<String>,
    pub piece: Option<String>,
    pub model: Option<String>,
    #[serde(default)]
    pub sort: RatingSort,
}

#[derive(Debug, Deserialize)]
pub struct RatingSubmission {
    pub tester: String,
    #[serde(default)]
    pub ratings: Vec<RatingEntry>,
}

#[derive(Debug, Serialize)]
pub struct RatingReceipt {
    pub submitted: usize,
}

/// GET /api/rate?tester=&composer=&piece=&model=&sort=
pub async fn rating_worklist(
    State(state): State<AppState>,
    Query(query): Query<RateQuery>,
) -> ApiResult<Json<RatingWorklist>> {
    let filters = RatingFilters {
        composer: query.composer,
        piece: query.piece,
        model: query.model,
        sort: query.sort,
    };
    let snapshot = state.catalog.snapshot()?;
    let worklist = state.ratings.unrated_for(&snapshot, &query.tester, &filters)?;
    Ok(Json(worklist))
}

/// POST /api/rate
pub async fn submit_ratings(
    State(state): State<AppState>,
    Json(submission): Json<RatingSubmission>,
) -> ApiResult<Json<RatingReceipt>> {
    let submitted = state
        .ratings
        .record_batch(&submission.tester, &submission.ratings)
        .await?;
    Ok(Json(RatingReceipt { submitted }))
}
