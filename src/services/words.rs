use chrono::NaiveDate;
use serde::Serialize;
use sqlx::{PgPool, Row};
use thiserror::Error;

use crate::services::dictionary::DictionaryProvider;

#[derive(Debug, Error)]
pub enum WordError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("word already exists")]
    AlreadyExists,
    #[error("word not found")]
    NotFound,
    #[error("sql error: {0}")]
    Sql(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WordDetails {
    pub word: String,
    pub definition: String,
    pub pronunciation: String,
    pub example1: String,
    pub example2: String,
}

pub fn normalize_word(raw: &str) -> Result<String, WordError> {
    let word = raw.trim().to_lowercase();
    if word.len() < 2 {
        return Err(WordError::Validation(
            "word must be at least 2 characters".to_string(),
        ));
    }
    if !word.chars().all(|c| c.is_ascii_alphabetic() || c == '-' || c == '\'') {
        return Err(WordError::Validation(
            "word may only contain letters, hyphens, and apostrophes".to_string(),
        ));
    }
    Ok(word)
}

/// Adds a word to the catalog, asking the dictionary provider for its
/// definition. Provider failures degrade to a placeholder definition rather
/// than failing the add.
pub async fn add_word(
    pool: &PgPool,
    dictionary: &DictionaryProvider,
    raw_word: &str,
    added_by: &str,
    today: NaiveDate,
) -> Result<WordDetails, WordError> {
    let word = normalize_word(raw_word)?;

    let existing = sqlx::query(r#"SELECT 1 as "one" FROM "words" WHERE "word" = $1"#)
        .bind(&word)
        .fetch_optional(pool)
        .await?;
    if existing.is_some() {
        return Err(WordError::AlreadyExists);
    }

    let info = dictionary.lookup(&word).await;
    let example1 = info.examples.first().cloned().unwrap_or_default();
    let example2 = info.examples.get(1).cloned().unwrap_or_default();

    sqlx::query(
        r#"
        INSERT INTO "words"
          ("word", "definition", "pronunciation", "example1", "example2", "addedBy", "dateAdded")
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT ("word") DO NOTHING
        "#,
    )
    .bind(&word)
    .bind(&info.definition)
    .bind(&info.pronunciation)
    .bind(&example1)
    .bind(&example2)
    .bind(added_by)
    .bind(today)
    .execute(pool)
    .await?;

    Ok(WordDetails {
        word,
        definition: info.definition,
        pronunciation: info.pronunciation,
        example1,
        example2,
    })
}

pub async fn get_word_details(
    pool: &PgPool,
    word: &str,
) -> Result<Option<WordDetails>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT "word", "definition", "pronunciation", "example1", "example2"
        FROM "words"
        WHERE "word" = $1
        "#,
    )
    .bind(word)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(map_word_details))
}

fn map_word_details(row: sqlx::postgres::PgRow) -> WordDetails {
    WordDetails {
        word: row.try_get("word").unwrap_or_default(),
        definition: row.try_get("definition").unwrap_or_default(),
        pronunciation: row.try_get("pronunciation").unwrap_or_default(),
        example1: row.try_get("example1").unwrap_or_default(),
        example2: row.try_get("example2").unwrap_or_default(),
    }
}

pub async fn random_words(pool: &PgPool, limit: i64) -> Result<Vec<String>, sqlx::Error> {
    let rows = sqlx::query(r#"SELECT "word" FROM "words" ORDER BY RANDOM() LIMIT $1"#)
        .bind(limit)
        .fetch_all(pool)
        .await?;
    Ok(collect_words(rows))
}

/// Random words the user has never answered, for padding review quizzes.
pub async fn random_unseen_words(
    pool: &PgPool,
    user_id: &str,
    limit: i64,
) -> Result<Vec<String>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT "word" FROM "words"
        WHERE "word" NOT IN (SELECT "word" FROM "word_memory" WHERE "userId" = $1)
        ORDER BY RANDOM()
        LIMIT $2
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(collect_words(rows))
}

/// Words the user previously answered wrong, randomized, for review quizzes.
pub async fn wrong_words(
    pool: &PgPool,
    user_id: &str,
    limit: i64,
) -> Result<Vec<String>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT "word" FROM "word_memory"
        WHERE "userId" = $1 AND "status" = 'wrong'
        ORDER BY RANDOM()
        LIMIT $2
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(collect_words(rows))
}

pub async fn count_wrong_words(pool: &PgPool, user_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"SELECT COUNT(*) FROM "word_memory" WHERE "userId" = $1 AND "status" = 'wrong'"#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
}

/// Wrong definitions from other words, used as multiple-choice distractors.
pub async fn distractor_definitions(
    pool: &PgPool,
    exclude_word: &str,
    exclude_definition: &str,
    limit: i64,
) -> Result<Vec<String>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT "definition" FROM "words"
        WHERE "word" != $1 AND "definition" != $2
        ORDER BY RANDOM()
        LIMIT $3
        "#,
    )
    .bind(exclude_word)
    .bind(exclude_definition)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .filter_map(|row| row.try_get::<String, _>("definition").ok())
        .collect())
}

pub async fn update_word_usage(
    pool: &PgPool,
    word: &str,
    today: NaiveDate,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"UPDATE "words" SET "usageCount" = "usageCount" + 1, "lastUsed" = $1 WHERE "word" = $2"#,
    )
    .bind(today)
    .bind(word)
    .execute(pool)
    .await?;
    Ok(())
}

/// Word of the day: a random-looking but date-stable pick, so every request
/// within a calendar day sees the same word.
pub async fn word_of_the_day(
    pool: &PgPool,
    today: NaiveDate,
) -> Result<Option<WordDetails>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT "word", "definition", "pronunciation", "example1", "example2"
        FROM "words"
        ORDER BY md5("word" || $1)
        LIMIT 1
        "#,
    )
    .bind(today.to_string())
    .fetch_optional(pool)
    .await?;

    Ok(row.map(map_word_details))
}

pub async fn count_words(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(r#"SELECT COUNT(*) FROM "words""#)
        .fetch_one(pool)
        .await
}

fn collect_words(rows: Vec<sqlx::postgres::PgRow>) -> Vec<String> {
    rows.into_iter()
        .filter_map(|row| row.try_get::<String, _>("word").ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_word() {
        assert_eq!(normalize_word("  Ephemeral ").unwrap(), "ephemeral");
        assert_eq!(normalize_word("self-aware").unwrap(), "self-aware");
        assert!(normalize_word("a").is_err());
        assert!(normalize_word("not a word").is_err());
        assert!(normalize_word("12345").is_err());
    }
}
