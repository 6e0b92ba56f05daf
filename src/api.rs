use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::{AppState, error::ApiError, import::ImportError, models::ProxyRequest};

/// `POST /api/tmdb-import`: `search` returns the provider payload verbatim,
/// `import` returns the inserted movie row.
pub async fn tmdb_import(
    State(state): State<AppState>,
    body: Result<Json<ProxyRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let proxy = state.import.as_ref().ok_or(ImportError::NotConfigured)?;

    debug!(action = %req.action, "import proxy request");

    match req.action.as_str() {
        "search" => {
            let query = req
                .query
                .as_deref()
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .ok_or_else(|| ApiError::bad_request("query is required"))?;
            Ok(Json(proxy.search(query).await?).into_response())
        },
        "import" => {
            let movie_id =
                req.movie_id.ok_or_else(|| ApiError::bad_request("movieId is required"))?;
            Ok(Json(proxy.import(movie_id, req.category_id).await?).into_response())
        },
        _ => Err(ApiError::bad_request("Invalid action")),
    }
}

/// Bare `OPTIONS` answer; real CORS preflights are handled by the CORS layer.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}
