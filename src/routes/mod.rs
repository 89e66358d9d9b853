mod achievements;
mod auth;
mod challenges;
mod follows;
mod health;
mod leaderboard;
mod quiz;
mod reviews;
mod study_sessions;
mod users;
mod words;

use std::sync::Arc;

use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::{Json, Router};
use serde::Serialize;

use crate::response::{json_error, AppError};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/health", health::router())
        .nest("/api/auth", auth::router())
        .nest("/api/users", users::router())
        .nest("/api/words", words::router())
        .nest("/api/quiz", quiz::router())
        .nest("/api/reviews", reviews::router())
        .nest("/api/achievements", achievements::router())
        .nest("/api/challenges", challenges::router())
        .nest("/api/leaderboard", leaderboard::router())
        .nest("/api/follows", follows::router())
        .nest("/api/study-sessions", study_sessions::router())
        .fallback(fallback_handler)
        .with_state(state)
}

async fn fallback_handler() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "route not found")
}

#[derive(Serialize)]
pub(crate) struct SuccessResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[derive(Serialize)]
pub(crate) struct MessageResponse {
    pub success: bool,
    pub message: String,
}

pub(crate) fn require_proxy(state: &AppState) -> Result<Arc<crate::db::DatabaseProxy>, AppError> {
    state
        .db_proxy()
        .ok_or_else(|| AppError::service_unavailable("database unavailable"))
}

pub(crate) async fn require_user(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<(Arc<crate::db::DatabaseProxy>, crate::auth::AuthUser), AppError> {
    let token = crate::auth::extract_token(headers)
        .ok_or_else(|| AppError::unauthorized("missing authentication token"))?;

    let proxy = require_proxy(state)?;

    let user = crate::auth::verify_request_token(proxy.as_ref(), &token)
        .await
        .map_err(|_| AppError::unauthorized("authentication failed, please log in again"))?;

    Ok((proxy, user))
}

pub(crate) fn today() -> chrono::NaiveDate {
    chrono::Utc::now().date_naive()
}

pub(crate) fn internal_error(err: impl std::fmt::Display) -> AppError {
    tracing::error!(error = %err, "request failed");
    AppError::internal(err.to_string())
}

pub(crate) fn json_ok<T: Serialize>(data: T) -> Json<SuccessResponse<T>> {
    Json(SuccessResponse::new(data))
}
