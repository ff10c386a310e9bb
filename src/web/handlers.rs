//! HTTP handlers

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::io::ErrorKind;
use tracing::{debug, error};

use super::AppState;

pub async fn serve_guide(State(state): State<AppState>) -> Response {
    match tokio::fs::read(state.guide_path.as_ref()).await {
        Ok(contents) => ([(header::CONTENT_TYPE, "text/xml")], contents).into_response(),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("Guide not generated yet: {}", state.guide_path.display());
            not_found().await.into_response()
        }
        Err(e) => {
            error!("Failed to read guide {}: {}", state.guide_path.display(), e);
            (StatusCode::INTERNAL_SERVER_ERROR, "500 Internal Server Error").into_response()
        }
    }
}

pub async fn health_check() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain")], "OK")
}

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "404 Not Found")
}
