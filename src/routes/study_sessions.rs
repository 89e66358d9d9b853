use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::response::AppError;
use crate::routes::{internal_error, json_ok, require_user};
use crate::services::study::{self, StudyError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/start", post(start))
        .route("/:id/finish", post(finish))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartPayload {
    #[serde(default = "default_session_type")]
    session_type: String,
}

fn default_session_type() -> String {
    "flashcards".to_string()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StartData {
    session_id: String,
}

async fn start(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<StartPayload>,
) -> Result<impl IntoResponse, AppError> {
    let (proxy, user) = require_user(&state, &headers).await?;

    let session_id = study::start_session(proxy.pool(), &user.id, &payload.session_type)
        .await
        .map_err(map_study_error)?;

    Ok(json_ok(StartData { session_id }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FinishPayload {
    #[serde(default)]
    cards_reviewed: i64,
}

async fn finish(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(payload): Json<FinishPayload>,
) -> Result<impl IntoResponse, AppError> {
    let (proxy, user) = require_user(&state, &headers).await?;

    let summary = study::finish_session(proxy.pool(), &user.id, &id, payload.cards_reviewed)
        .await
        .map_err(map_study_error)?;

    Ok(json_ok(summary))
}

fn map_study_error(err: StudyError) -> AppError {
    match err {
        StudyError::NotFound => AppError::not_found("study session not found"),
        StudyError::AlreadyFinished => AppError::conflict("study session already finished"),
        StudyError::Sql(err) => internal_error(err),
    }
}
