use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use crate::response::AppError;
use crate::routes::{internal_error, json_ok, require_user, MessageResponse};
use crate::services::follows::{self, FollowError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(following))
        .route("/:username", post(follow).delete(unfollow))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FollowingData {
    following: Vec<String>,
    followers: i64,
}

async fn following(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let (proxy, user) = require_user(&state, &headers).await?;
    let pool = proxy.pool();

    let following = follows::following_usernames(pool, &user.id)
        .await
        .map_err(internal_error)?;
    let followers = follows::follower_count(pool, &user.id)
        .await
        .map_err(internal_error)?;

    Ok(json_ok(FollowingData {
        following,
        followers,
    }))
}

async fn follow(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (proxy, user) = require_user(&state, &headers).await?;

    follows::follow(proxy.pool(), &user.id, &username)
        .await
        .map_err(map_follow_error)?;

    Ok(Json(MessageResponse {
        success: true,
        message: format!("now following {username}"),
    }))
}

async fn unfollow(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (proxy, user) = require_user(&state, &headers).await?;

    follows::unfollow(proxy.pool(), &user.id, &username)
        .await
        .map_err(map_follow_error)?;

    Ok(Json(MessageResponse {
        success: true,
        message: format!("unfollowed {username}"),
    }))
}

fn map_follow_error(err: FollowError) -> AppError {
    match err {
        FollowError::Validation(message) => AppError::validation(message),
        FollowError::NotFound => AppError::not_found("user not found"),
        FollowError::Sql(err) => internal_error(err),
    }
}
