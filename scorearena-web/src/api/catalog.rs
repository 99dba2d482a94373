//! Catalog browsing endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::catalog::{PieceId, PieceSummary, Track};
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct PiecesResponse {
    pub pieces: Vec<PieceSummary>,
}

#[derive(Debug, Serialize)]
pub struct TracksResponse {
    pub piece_id: PieceId,
    pub tracks: Vec<Track>,
}

/// GET /api/pieces
///
/// Every piece with at least one track, flagged with arena eligibility.
pub async fn list_pieces(State(state): State<AppState>) -> ApiResult<Json<PiecesResponse>> {
    let snapshot = state.catalog.snapshot()?;
    Ok(Json(PiecesResponse {
        pieces: snapshot.summaries(),
    }))
}

/// GET /api/pieces/:piece_id/tracks
pub async fn piece_tracks(
    State(state): State<AppState>,
    Path(piece_id): Path<String>,
) -> ApiResult<Json<TracksResponse>> {
    let piece_id = PieceId::from(piece_id);
    let tracks = state.catalog.tracks_for(&piece_id)?;
    Ok(Json(TracksResponse { piece_id, tracks }))
}
