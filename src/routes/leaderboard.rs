use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::response::AppError;
use crate::routes::{internal_error, json_ok, require_proxy};
use crate::services::stats::{self, LeaderboardEntry};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(leaderboard))
}

#[derive(Debug, Deserialize)]
struct LeaderboardQuery {
    limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LeaderboardData {
    entries: Vec<LeaderboardEntry>,
}

async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<impl IntoResponse, AppError> {
    let proxy = require_proxy(&state)?;
    let limit = query.limit.unwrap_or(10).clamp(1, 100);

    let entries = stats::leaderboard(proxy.pool(), limit)
        .await
        .map_err(internal_error)?;

    Ok(json_ok(LeaderboardData { entries }))
}
