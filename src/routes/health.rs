use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::app::AppState;
use crate::errors::AppResult;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub upstream: Option<String>,
}

pub async fn health(State(state): State<AppState>) -> AppResult<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "ok",
        upstream: state.config.upstream.as_ref().map(|url| url.to_string()),
    }))
}
