//! Notation upload endpoint

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};

use crate::error::{ApiError, ApiResult, UploadError};
use crate::upload::{UploadMetadata, UploadReceipt};
use crate::AppState;

/// POST /api/upload (multipart)
///
/// Parts: `file` (the `.mscz` score), optional text parts `model_name`,
/// `composer` and `piece_name`. Unknown parts are ignored.
pub async fn upload_score(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<UploadReceipt>)> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut metadata = UploadMetadata::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                file = Some((filename, bytes.to_vec()));
            }
            "model_name" | "composer" | "piece_name" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                match name.as_str() {
                    "model_name" => metadata.model_name = value,
                    "composer" => metadata.composer = value,
                    _ => metadata.piece_name = value,
                }
            }
            _ => {}
        }
    }

    let (filename, content) = file.ok_or(UploadError::MissingFile)?;
    let receipt = state.uploader.accept(&filename, &content, metadata).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}
