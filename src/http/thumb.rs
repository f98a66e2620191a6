use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::error::{AppError, AppResult};
use crate::http::state::AppState;
use crate::media::content_id;

/// GET /thumb/{id}
///
/// Any failure to produce a preview is a 404 so clients fall back to their own
/// icon.
pub async fn serve_thumbnail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let path = content_id::decode(&id).ok_or(AppError::NotFound)?;
    let path = state.authority.authorize(&path)?;

    match state.thumbnails.get_thumbnail(&path).await {
        Ok(bytes) => {
            let content_type = image::guess_format(&bytes)
                .map(|format| format.to_mime_type())
                .unwrap_or("image/jpeg");
            Ok((StatusCode::OK, [(header::CONTENT_TYPE, content_type)], bytes).into_response())
        }
        Err(e) => {
            tracing::debug!("no thumbnail for {}: {}", id, e);
            Err(AppError::NotFound)
        }
    }
}
