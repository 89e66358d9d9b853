use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::Row;
use uuid::Uuid;

use crate::response::AppError;
use crate::routes::{internal_error, json_ok, require_proxy, MessageResponse};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

#[derive(Debug, Deserialize)]
struct CredentialsPayload {
    username: String,
    password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthData {
    token: String,
    user_id: String,
    username: String,
}

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsPayload>,
) -> Result<impl IntoResponse, AppError> {
    let username = payload.username.trim().to_string();
    validate_username(&username)?;
    if payload.password.len() < 4 {
        return Err(AppError::validation(
            "password must be at least 4 characters",
        ));
    }

    let proxy = require_proxy(&state)?;
    let pool = proxy.pool();

    let existing = sqlx::query(r#"SELECT 1 as "one" FROM "users" WHERE "username" = $1"#)
        .bind(&username)
        .fetch_optional(pool)
        .await
        .map_err(internal_error)?;
    if existing.is_some() {
        return Err(AppError::conflict("username already taken"));
    }

    let password_hash =
        crate::auth::hash_password(&payload.password).map_err(internal_error)?;
    let user_id = Uuid::new_v4().to_string();

    let (token, expires_at) =
        crate::auth::sign_jwt_for_user(&user_id).map_err(internal_error)?;
    let token_hash = crate::auth::hash_token(&token);

    let mut tx = pool.begin().await.map_err(internal_error)?;

    sqlx::query(
        r#"
        INSERT INTO "users" ("id", "username", "passwordHash")
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(&user_id)
    .bind(&username)
    .bind(&password_hash)
    .execute(&mut *tx)
    .await
    .map_err(internal_error)?;

    sqlx::query(
        r#"
        INSERT INTO "sessions" ("id", "userId", "token", "expiresAt")
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&user_id)
    .bind(&token_hash)
    .bind(expires_at)
    .execute(&mut *tx)
    .await
    .map_err(internal_error)?;

    tx.commit().await.map_err(internal_error)?;

    Ok(json_ok(AuthData {
        token,
        user_id,
        username,
    }))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsPayload>,
) -> Result<impl IntoResponse, AppError> {
    let proxy = require_proxy(&state)?;
    let pool = proxy.pool();

    let row = sqlx::query(r#"SELECT "id", "passwordHash" FROM "users" WHERE "username" = $1"#)
        .bind(payload.username.trim())
        .fetch_optional(pool)
        .await
        .map_err(internal_error)?;

    let Some(row) = row else {
        return Err(AppError::unauthorized("invalid credentials"));
    };

    let user_id: String = row.try_get("id").map_err(internal_error)?;
    let password_hash: String = row.try_get("passwordHash").map_err(internal_error)?;

    if !crate::auth::verify_password(&payload.password, &password_hash) {
        return Err(AppError::unauthorized("invalid credentials"));
    }

    let (token, expires_at) =
        crate::auth::sign_jwt_for_user(&user_id).map_err(internal_error)?;
    let token_hash = crate::auth::hash_token(&token);

    let mut tx = pool.begin().await.map_err(internal_error)?;

    sqlx::query(
        r#"
        INSERT INTO "sessions" ("id", "userId", "token", "expiresAt")
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&user_id)
    .bind(&token_hash)
    .bind(expires_at)
    .execute(&mut *tx)
    .await
    .map_err(internal_error)?;

    sqlx::query(r#"UPDATE "users" SET "lastLogin" = $1 WHERE "id" = $2"#)
        .bind(Utc::now().naive_utc())
        .bind(&user_id)
        .execute(&mut *tx)
        .await
        .map_err(internal_error)?;

    tx.commit().await.map_err(internal_error)?;

    Ok(json_ok(AuthData {
        token,
        user_id,
        username: payload.username.trim().to_string(),
    }))
}

async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let proxy = require_proxy(&state)?;

    if let Some(token) = crate::auth::extract_token(&headers) {
        let token_hash = crate::auth::hash_token(&token);
        if let Err(err) =
            crate::auth::delete_session_by_token_hash(proxy.as_ref(), &token_hash).await
        {
            tracing::warn!(error = %err, "session delete failed during logout");
        }
    }

    Ok(Json(MessageResponse {
        success: true,
        message: "logged out".to_string(),
    }))
}

fn validate_username(username: &str) -> Result<(), AppError> {
    if username.len() < 3 {
        return Err(AppError::validation(
            "username must be at least 3 characters",
        ));
    }
    let valid = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(AppError::validation(
            "username can only contain letters, numbers, hyphens, and underscores",
        ));
    }
    Ok(())
}
