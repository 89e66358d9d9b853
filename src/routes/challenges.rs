use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;

use crate::response::AppError;
use crate::routes::{internal_error, json_ok, require_user, today};
use crate::services::challenge::{self, ChallengeAward, DailyChallenge};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/today", get(today_challenge))
        .route("/check", post(check_completion))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TodayChallengeData {
    challenge: DailyChallenge,
    completed: bool,
}

async fn today_challenge(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let (proxy, user) = require_user(&state, &headers).await?;
    let pool = proxy.pool();

    let challenge =
        challenge::ensure_daily_challenge(pool, state.challenge_catalog().as_ref(), today())
            .await
            .map_err(internal_error)?;

    let completed = challenge::is_completed_by(pool, &user.id, &challenge.id)
        .await
        .map_err(internal_error)?;

    Ok(json_ok(TodayChallengeData {
        challenge,
        completed,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckCompletionData {
    #[serde(skip_serializing_if = "Option::is_none")]
    award: Option<ChallengeAward>,
    completed_now: bool,
}

async fn check_completion(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let (proxy, user) = require_user(&state, &headers).await?;

    let mut tx = proxy.pool().begin().await.map_err(internal_error)?;
    let award = challenge::check_completion(&mut tx, &user.id, today())
        .await
        .map_err(internal_error)?;
    tx.commit().await.map_err(internal_error)?;

    Ok(json_ok(CheckCompletionData {
        completed_now: award.is_some(),
        award,
    }))
}
