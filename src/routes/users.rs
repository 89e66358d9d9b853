use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Deserialize;
use sqlx::Row;

use crate::response::AppError;
use crate::routes::{internal_error, json_ok, require_user, today, MessageResponse};
use crate::services::stats;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(me))
        .route("/me/statistics", get(statistics))
        .route("/me/password", put(update_password))
}

async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let (proxy, user) = require_user(&state, &headers).await?;

    let user_stats = stats::get_user_stats(proxy.pool(), &user.id, today())
        .await
        .map_err(internal_error)?
        .ok_or_else(|| AppError::not_found("user not found"))?;

    Ok(json_ok(user_stats))
}

async fn statistics(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    me(State(state), headers).await
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdatePasswordPayload {
    current_password: String,
    new_password: String,
}

async fn update_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<UpdatePasswordPayload>,
) -> Result<impl IntoResponse, AppError> {
    let (proxy, user) = require_user(&state, &headers).await?;

    if payload.new_password.len() < 4 {
        return Err(AppError::validation(
            "new password must be at least 4 characters",
        ));
    }

    let pool = proxy.pool();
    let row = sqlx::query(r#"SELECT "passwordHash" FROM "users" WHERE "id" = $1"#)
        .bind(&user.id)
        .fetch_one(pool)
        .await
        .map_err(internal_error)?;
    let stored: String = row.try_get("passwordHash").map_err(internal_error)?;

    if !crate::auth::verify_password(&payload.current_password, &stored) {
        return Err(AppError::unauthorized("current password is incorrect"));
    }

    let new_hash = crate::auth::hash_password(&payload.new_password).map_err(internal_error)?;
    sqlx::query(r#"UPDATE "users" SET "passwordHash" = $1 WHERE "id" = $2"#)
        .bind(&new_hash)
        .bind(&user.id)
        .execute(pool)
        .await
        .map_err(internal_error)?;

    Ok(Json(MessageResponse {
        success: true,
        message: "password updated".to_string(),
    }))
}
