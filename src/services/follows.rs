use sqlx::{PgPool, Row};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FollowError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("user not found")]
    NotFound,
    #[error("sql error: {0}")]
    Sql(#[from] sqlx::Error),
}

/// Follows another user by username. Re-following is a no-op.
pub async fn follow(pool: &PgPool, follower_id: &str, username: &str) -> Result<(), FollowError> {
    let target_id = user_id_for_username(pool, username)
        .await?
        .ok_or(FollowError::NotFound)?;

    if target_id == follower_id {
        return Err(FollowError::Validation(
            "cannot follow yourself".to_string(),
        ));
    }

    sqlx::query(
        r#"
        INSERT INTO "follows" ("follower", "following")
        VALUES ($1, $2)
        ON CONFLICT ("follower", "following") DO NOTHING
        "#,
    )
    .bind(follower_id)
    .bind(&target_id)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn unfollow(pool: &PgPool, follower_id: &str, username: &str) -> Result<(), FollowError> {
    let target_id = user_id_for_username(pool, username)
        .await?
        .ok_or(FollowError::NotFound)?;

    sqlx::query(r#"DELETE FROM "follows" WHERE "follower" = $1 AND "following" = $2"#)
        .bind(follower_id)
        .bind(&target_id)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn follower_count(pool: &PgPool, user_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(r#"SELECT COUNT(*) FROM "follows" WHERE "following" = $1"#)
        .bind(user_id)
        .fetch_one(pool)
        .await
}

pub async fn following_usernames(
    pool: &PgPool,
    user_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT u."username"
        FROM "follows" f
        JOIN "users" u ON u."id" = f."following"
        WHERE f."follower" = $1
        ORDER BY f."dateFollowed" DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .filter_map(|row| row.try_get::<String, _>("username").ok())
        .collect())
}

async fn user_id_for_username(
    pool: &PgPool,
    username: &str,
) -> Result<Option<String>, sqlx::Error> {
    let row = sqlx::query(r#"SELECT "id" FROM "users" WHERE "username" = $1"#)
        .bind(username)
        .fetch_optional(pool)
        .await?;
    Ok(row.and_then(|row| row.try_get::<String, _>("id").ok()))
}
