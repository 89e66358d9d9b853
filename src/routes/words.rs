use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::response::AppError;
use crate::routes::{internal_error, json_ok, require_proxy, require_user, today};
use crate::services::words::{self, WordError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(add_word))
        .route("/word-of-the-day", get(word_of_the_day))
        .route("/:word", get(word_details))
}

#[derive(Debug, Deserialize)]
struct AddWordPayload {
    word: String,
}

async fn add_word(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<AddWordPayload>,
) -> Result<impl IntoResponse, AppError> {
    let (proxy, user) = require_user(&state, &headers).await?;

    let details = words::add_word(
        proxy.pool(),
        state.dictionary().as_ref(),
        &payload.word,
        &user.username,
        today(),
    )
    .await
    .map_err(map_word_error)?;

    Ok(json_ok(details))
}

async fn word_details(
    State(state): State<AppState>,
    Path(word): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let proxy = require_proxy(&state)?;

    let details = words::get_word_details(proxy.pool(), &word.to_lowercase())
        .await
        .map_err(internal_error)?
        .ok_or_else(|| AppError::not_found("word not found"))?;

    Ok(json_ok(details))
}

async fn word_of_the_day(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let proxy = require_proxy(&state)?;

    let details = words::word_of_the_day(proxy.pool(), today())
        .await
        .map_err(internal_error)?
        .ok_or_else(|| AppError::not_found("no words in the catalog yet"))?;

    Ok(json_ok(details))
}

fn map_word_error(err: WordError) -> AppError {
    match err {
        WordError::Validation(message) => AppError::validation(message),
        WordError::AlreadyExists => AppError::conflict("word already exists"),
        WordError::NotFound => AppError::not_found("word not found"),
        WordError::Sql(err) => internal_error(err),
    }
}
