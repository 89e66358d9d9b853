use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::response::AppError;
use crate::routes::{internal_error, json_ok, require_user, today};
use crate::services::memory::{self, MemoryError, MAX_QUALITY, MIN_QUALITY};
use crate::services::words;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/due", get(due))
        .route("/answer", post(answer))
}

#[derive(Debug, Deserialize)]
struct DueQuery {
    limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DueWordsData {
    words: Vec<words::WordDetails>,
    count: usize,
}

async fn due(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DueQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (proxy, user) = require_user(&state, &headers).await?;
    let limit = query.limit.unwrap_or(20).clamp(1, 100);

    let pool = proxy.pool();
    let due = memory::due_words(pool, &user.id, today(), limit)
        .await
        .map_err(internal_error)?;

    let mut details = Vec::with_capacity(due.len());
    for word in due {
        if let Some(found) = words::get_word_details(pool, &word)
            .await
            .map_err(internal_error)?
        {
            details.push(found);
        }
    }

    Ok(json_ok(DueWordsData {
        count: details.len(),
        words: details,
    }))
}

#[derive(Debug, Deserialize)]
struct ReviewAnswerPayload {
    word: String,
    quality: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReviewAnswerData {
    word: String,
    interval_days: i64,
    ease_factor: f64,
    repetitions: i64,
}

async fn answer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ReviewAnswerPayload>,
) -> Result<impl IntoResponse, AppError> {
    let (proxy, user) = require_user(&state, &headers).await?;

    if !(MIN_QUALITY..=MAX_QUALITY).contains(&payload.quality) {
        return Err(AppError::validation(format!(
            "quality must be between {MIN_QUALITY} and {MAX_QUALITY}"
        )));
    }

    let word = payload.word.trim().to_lowercase();
    let pool = proxy.pool();

    if words::get_word_details(pool, &word)
        .await
        .map_err(internal_error)?
        .is_none()
    {
        return Err(AppError::not_found("word not found"));
    }

    let mut tx = pool.begin().await.map_err(internal_error)?;
    let next = memory::apply_review(&mut tx, &user.id, &word, payload.quality, today())
        .await
        .map_err(|err| match err {
            MemoryError::InvalidQuality(q) => {
                AppError::validation(format!("quality {q} is out of range"))
            }
            MemoryError::Sql(err) => internal_error(err),
        })?;
    tx.commit().await.map_err(internal_error)?;

    Ok(json_ok(ReviewAnswerData {
        word,
        interval_days: next.interval_days,
        ease_factor: next.ease_factor,
        repetitions: next.repetitions,
    }))
}
