//! scorearena-web library
//!
//! Blind A/B "model arena" for comparing renditions of the same piece, plus
//! single-track ratings and notation upload. Exposed as a library so the
//! router can be driven from integration tests.

pub mod api;
pub mod arena;
pub mod catalog;
pub mod converter;
pub mod error;
pub mod ratings;
pub mod upload;

pub use crate::error::{ApiError, ApiResult};

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use scorearena_common::config::ServiceConfig;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::arena::VerdictRecorder;
use crate::catalog::{ArtifactStore, MetadataStore, TrackCatalog};
use crate::converter::Converter;
use crate::ratings::RatingStore;
use crate::upload::Uploader;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<TrackCatalog>,
    pub verdicts: Arc<VerdictRecorder>,
    pub ratings: Arc<RatingStore>,
    pub uploader: Arc<Uploader>,
    /// Request body limit for uploads
    pub max_upload_bytes: usize,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Wire every component to the folders and logs named by `config`
    pub fn new(config: &ServiceConfig) -> Self {
        let uploads = config.uploads_dir();
        let metadata = MetadataStore::new(config.metadata_csv());

        Self {
            catalog: Arc::new(TrackCatalog::new(
                ArtifactStore::new(&uploads),
                metadata.clone(),
            )),
            verdicts: Arc::new(VerdictRecorder::new(config.verdicts_csv())),
            ratings: Arc::new(RatingStore::new(config.ratings_csv())),
            uploader: Arc::new(Uploader::new(
                uploads,
                Converter::new(config.converter_bin.clone()),
                metadata,
            )),
            max_upload_bytes: config.max_upload_bytes,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
///
/// Uploaded and converted artifacts are served as static files under `/uploads`.
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let media = ServeDir::new(state.catalog.artifacts().dir());

    Router::new()
        .route("/", get(api::serve_index))
        .route("/api/buildinfo", get(api::get_build_info))
        .route("/api/pieces", get(api::list_pieces))
        .route("/api/pieces/:piece_id/tracks", get(api::piece_tracks))
        .route("/api/arena/pairing", get(api::get_pairing))
        .route("/api/arena/verdict", post(api::submit_verdict))
        .route(
            "/api/rate",
            get(api::rating_worklist).post(api::submit_ratings),
        )
        .route(
            "/api/upload",
            post(api::upload_score).layer(DefaultBodyLimit::max(state.max_upload_bytes)),
        )
        .merge(api::health_routes())
        .nest_service(catalog::MEDIA_URL_PREFIX, media)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
