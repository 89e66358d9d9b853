use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use sqlx::{PgPool, Row};

use crate::services::scoring;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub username: String,
    pub points: i64,
    pub level: i64,
    pub next_level_threshold: i64,
    pub progress_to_next: f64,
    pub streak: i64,
    pub total_questions: i64,
    pub correct_answers: i64,
    pub accuracy: f64,
    pub time_spent: f64,
    pub study_time: f64,
    pub avg_time_per_question: f64,
    pub known_words: i64,
    pub wrong_words: i64,
    pub followers: i64,
    pub following: i64,
    pub quiz_history: Vec<QuizHistoryEntry>,
    pub member_since: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizHistoryEntry {
    pub date: NaiveDate,
    pub quiz_type: String,
    pub length: i64,
    pub correct: i64,
    pub accuracy: f64,
    pub points_earned: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: i64,
    pub username: String,
    pub points: i64,
    pub level: i64,
    pub streak: i64,
    pub accuracy: f64,
    pub total_questions: i64,
}

pub async fn get_user_stats(
    pool: &PgPool,
    user_id: &str,
    today: NaiveDate,
) -> Result<Option<UserStats>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT "username", "points", "streak", "totalQuestions", "totalCorrect",
               "timeSpentSeconds", "totalStudyTime", "createdAt"
        FROM "users"
        WHERE "id" = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let points = row.try_get::<i32, _>("points").map(i64::from).unwrap_or(0);
    let streak = row.try_get::<i32, _>("streak").map(i64::from).unwrap_or(0);
    let total_questions = row
        .try_get::<i32, _>("totalQuestions")
        .map(i64::from)
        .unwrap_or(0);
    let correct_answers = row
        .try_get::<i32, _>("totalCorrect")
        .map(i64::from)
        .unwrap_or(0);
    let time_spent: f64 = row.try_get("timeSpentSeconds").unwrap_or(0.0);
    let study_time: f64 = row.try_get("totalStudyTime").unwrap_or(0.0);
    let created_at: NaiveDateTime = row
        .try_get("createdAt")
        .unwrap_or_else(|_| Utc::now().naive_utc());

    let (known_words, wrong_words) = count_word_statuses(pool, user_id).await?;
    let (followers, following) = follow_counts(pool, user_id).await?;
    let quiz_history = quiz_history(pool, user_id, today - Duration::days(30)).await?;

    let accuracy = scoring::accuracy_percent(correct_answers, total_questions);
    let avg_time_per_question = if total_questions > 0 {
        time_spent / total_questions as f64
    } else {
        0.0
    };
    let progress = scoring::level_progress(points);

    Ok(Some(UserStats {
        username: row.try_get("username").unwrap_or_default(),
        points,
        level: progress.level,
        next_level_threshold: progress.next_threshold,
        progress_to_next: progress.progress_ratio,
        streak,
        total_questions,
        correct_answers,
        accuracy: (accuracy * 10.0).round() / 10.0,
        time_spent,
        study_time,
        avg_time_per_question: (avg_time_per_question * 10.0).round() / 10.0,
        known_words,
        wrong_words,
        followers,
        following,
        quiz_history,
        member_since: created_at.and_utc().to_rfc3339(),
    }))
}

async fn count_word_statuses(pool: &PgPool, user_id: &str) -> Result<(i64, i64), sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT "status", COUNT(*)::bigint as "count"
        FROM "word_memory"
        WHERE "userId" = $1
        GROUP BY "status"
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let mut known = 0i64;
    let mut wrong = 0i64;
    for row in rows {
        let status: String = row.try_get("status").unwrap_or_default();
        let count: i64 = row.try_get("count").unwrap_or(0);
        match status.as_str() {
            "known" => known = count,
            "wrong" => wrong = count,
            _ => {}
        }
    }
    Ok((known, wrong))
}

async fn follow_counts(pool: &PgPool, user_id: &str) -> Result<(i64, i64), sqlx::Error> {
    let followers: i64 =
        sqlx::query_scalar(r#"SELECT COUNT(*) FROM "follows" WHERE "following" = $1"#)
            .bind(user_id)
            .fetch_one(pool)
            .await?;
    let following: i64 =
        sqlx::query_scalar(r#"SELECT COUNT(*) FROM "follows" WHERE "follower" = $1"#)
            .bind(user_id)
            .fetch_one(pool)
            .await?;
    Ok((followers, following))
}

async fn quiz_history(
    pool: &PgPool,
    user_id: &str,
    since: NaiveDate,
) -> Result<Vec<QuizHistoryEntry>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT "date", "quizType", "length", "correct", "accuracy", "pointsEarned"
        FROM "quiz_log"
        WHERE "userId" = $1 AND "date" >= $2
        ORDER BY "date" DESC
        "#,
    )
    .bind(user_id)
    .bind(since)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| QuizHistoryEntry {
            date: row
                .try_get("date")
                .unwrap_or_else(|_| Utc::now().date_naive()),
            quiz_type: row.try_get("quizType").unwrap_or_default(),
            length: row.try_get::<i32, _>("length").map(i64::from).unwrap_or(0),
            correct: row.try_get::<i32, _>("correct").map(i64::from).unwrap_or(0),
            accuracy: row.try_get("accuracy").unwrap_or(0.0),
            points_earned: row
                .try_get::<i32, _>("pointsEarned")
                .map(i64::from)
                .unwrap_or(0),
        })
        .collect())
}

pub async fn leaderboard(pool: &PgPool, limit: i64) -> Result<Vec<LeaderboardEntry>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT "username", "points", "streak", "totalQuestions", "totalCorrect"
        FROM "users"
        ORDER BY "points" DESC, "streak" DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            let points = row.try_get::<i32, _>("points").map(i64::from).unwrap_or(0);
            let total = row
                .try_get::<i32, _>("totalQuestions")
                .map(i64::from)
                .unwrap_or(0);
            let correct = row
                .try_get::<i32, _>("totalCorrect")
                .map(i64::from)
                .unwrap_or(0);
            let accuracy = scoring::accuracy_percent(correct, total);
            LeaderboardEntry {
                rank: i as i64 + 1,
                username: row.try_get("username").unwrap_or_default(),
                points,
                level: scoring::level_for_points(points),
                streak: row.try_get::<i32, _>("streak").map(i64::from).unwrap_or(0),
                accuracy: (accuracy * 10.0).round() / 10.0,
                total_questions: total,
            }
        })
        .collect())
}
