use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use serde::Serialize;

use crate::response::AppError;
use crate::routes::{internal_error, json_ok, require_user};
use crate::services::achievement::{self, AchievementStatus};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_achievements))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AchievementsData {
    achievements: Vec<AchievementStatus>,
    total_count: usize,
    unlocked_count: usize,
}

async fn list_achievements(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let (proxy, user) = require_user(&state, &headers).await?;

    let achievements = achievement::catalog_with_status(
        proxy.pool(),
        &user.id,
        state.achievement_catalog().as_ref(),
    )
    .await
    .map_err(internal_error)?;

    let unlocked_count = achievements.iter().filter(|a| a.unlocked).count();

    Ok(json_ok(AchievementsData {
        total_count: achievements.len(),
        unlocked_count,
        achievements,
    }))
}
