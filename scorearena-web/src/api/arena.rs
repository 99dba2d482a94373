//! Arena endpoints
//!
//! The pairing returned by GET is what the client sends back with its vote.

use axum::{
    extract::{Query, State},
    Json,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;

use crate::arena::{Pairing, SessionFlow, SubmitOutcome, VerdictSubmission};
use crate::catalog::PieceId;
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PairingQuery {
    /// Piece to compare; any eligible piece when absent or blank
    #[serde(default)]
    pub piece: Option<String>,
}

/// GET /api/arena/pairing?piece=
pub async fn get_pairing(
    State(state): State<AppState>,
    Query(query): Query<PairingQuery>,
) -> ApiResult<Json<Pairing>> {
    let piece_id = query
        .piece
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(PieceId::from);

    let flow = SessionFlow::new(&state.catalog, &state.verdicts);
    let mut rng = StdRng::from_entropy();
    let pairing = flow.comparison(piece_id.as_ref(), &mut rng)?;
    Ok(Json(pairing))
}

/// POST /api/arena/verdict
pub async fn submit_verdict(
    State(state): State<AppState>,
    Json(submission): Json<VerdictSubmission>,
) -> ApiResult<Json<SubmitOutcome>> {
    let flow = SessionFlow::new(&state.catalog, &state.verdicts);
    let mut rng = StdRng::from_entropy();
    let outcome = flow.submit(submission, &mut rng).await?;
    Ok(Json(outcome))
}
