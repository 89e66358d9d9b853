use chrono::Utc;
use serde::Serialize;
use sqlx::{PgPool, Row};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StudyError {
    #[error("study session not found")]
    NotFound,
    #[error("study session already finished")]
    AlreadyFinished,
    #[error("sql error: {0}")]
    Sql(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySessionSummary {
    pub id: String,
    pub session_type: String,
    pub duration: f64,
    pub cards_reviewed: i64,
}

pub async fn start_session(
    pool: &PgPool,
    user_id: &str,
    session_type: &str,
) -> Result<String, StudyError> {
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO "study_sessions" ("id", "userId", "sessionType", "startTime")
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(session_type)
    .bind(Utc::now().naive_utc())
    .execute(pool)
    .await?;
    Ok(id)
}

/// Closes a study session and folds its duration into the user's total study
/// time. Both writes commit together so the study-time aggregates never drift
/// from the session log.
pub async fn finish_session(
    pool: &PgPool,
    user_id: &str,
    session_id: &str,
    cards_reviewed: i64,
) -> Result<StudySessionSummary, StudyError> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query(
        r#"
        SELECT "sessionType", "startTime", "endTime"
        FROM "study_sessions"
        WHERE "id" = $1 AND "userId" = $2
        "#,
    )
    .bind(session_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(row) = row else {
        return Err(StudyError::NotFound);
    };
    if row
        .try_get::<Option<chrono::NaiveDateTime>, _>("endTime")
        .ok()
        .flatten()
        .is_some()
    {
        return Err(StudyError::AlreadyFinished);
    }

    let start_time: chrono::NaiveDateTime = row
        .try_get("startTime")
        .unwrap_or_else(|_| Utc::now().naive_utc());
    let session_type: String = row.try_get("sessionType").unwrap_or_default();

    let end_time = Utc::now().naive_utc();
    let duration = (end_time - start_time).num_milliseconds().max(0) as f64 / 1000.0;

    sqlx::query(
        r#"
        UPDATE "study_sessions"
        SET "endTime" = $1, "duration" = $2, "cardsReviewed" = $3
        WHERE "id" = $4
        "#,
    )
    .bind(end_time)
    .bind(duration)
    .bind(cards_reviewed as i32)
    .bind(session_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query(r#"UPDATE "users" SET "totalStudyTime" = "totalStudyTime" + $1 WHERE "id" = $2"#)
        .bind(duration)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(StudySessionSummary {
        id: session_id.to_string(),
        session_type,
        duration,
        cards_reviewed,
    })
}
