use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Row, Transaction};
use thiserror::Error;

pub const MIN_EASE_FACTOR: f64 = 1.3;
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;
pub const MIN_QUALITY: i32 = 0;
pub const MAX_QUALITY: i32 = 5;

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("quality must be between {MIN_QUALITY} and {MAX_QUALITY}, got {0}")]
    InvalidQuality(i32),
    #[error("sql error: {0}")]
    Sql(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WordStatus {
    Unseen,
    Known,
    Wrong,
}

impl WordStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "known" => Self::Known,
            "wrong" => Self::Wrong,
            _ => Self::Unseen,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unseen => "unseen",
            Self::Known => "known",
            Self::Wrong => "wrong",
        }
    }

    pub fn from_correct(is_correct: bool) -> Self {
        if is_correct {
            Self::Known
        } else {
            Self::Wrong
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemoryState {
    pub ease_factor: f64,
    pub interval_days: i64,
    pub repetitions: i64,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self {
            ease_factor: DEFAULT_EASE_FACTOR,
            interval_days: 1,
            repetitions: 0,
        }
    }
}

/// SM-2 scheduling step. Quality runs 0 (blackout) to 5 (perfect recall);
/// anything below 3 discards all accumulated progress. The ease adjustment is
/// applied on every call and never drops below 1.3.
pub fn advance(state: &MemoryState, quality: i32) -> Result<MemoryState, MemoryError> {
    if !(MIN_QUALITY..=MAX_QUALITY).contains(&quality) {
        return Err(MemoryError::InvalidQuality(quality));
    }

    let mut repetitions = state.repetitions + 1;
    let interval_days = if quality < 3 {
        repetitions = 0;
        1
    } else if repetitions <= 1 {
        1
    } else if repetitions == 2 {
        6
    } else {
        (state.interval_days as f64 * state.ease_factor) as i64
    };

    let penalty = (5 - quality) as f64;
    let ease_factor = state.ease_factor + (0.1 - penalty * (0.08 + penalty * 0.02));
    let ease_factor = ease_factor.max(MIN_EASE_FACTOR);

    Ok(MemoryState {
        ease_factor,
        interval_days,
        repetitions,
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WordMemoryRow {
    pub word: String,
    pub status: WordStatus,
    pub attempts: i64,
    pub ease_factor: f64,
    pub interval_days: i64,
    pub repetitions: i64,
    pub last_seen: NaiveDate,
    pub next_review: Option<NaiveDate>,
}

/// Words due for review: known words whose next review date has arrived or
/// was never scheduled, oldest-reviewed first.
pub async fn due_words(
    pool: &PgPool,
    user_id: &str,
    today: NaiveDate,
    limit: i64,
) -> Result<Vec<String>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT "word"
        FROM "word_memory"
        WHERE "userId" = $1 AND "status" = 'known'
          AND ("nextReview" IS NULL OR "nextReview" <= $2)
        ORDER BY "lastSeen" ASC
        LIMIT $3
        "#,
    )
    .bind(user_id)
    .bind(today)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .filter_map(|row| row.try_get::<String, _>("word").ok())
        .collect())
}

pub async fn get_word_memory(
    pool: &PgPool,
    user_id: &str,
    word: &str,
) -> Result<Option<WordMemoryRow>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT "word", "status", "attempts", "easeFactor", "intervalDays",
               "repetitions", "lastSeen", "nextReview"
        FROM "word_memory"
        WHERE "userId" = $1 AND "word" = $2
        "#,
    )
    .bind(user_id)
    .bind(word)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(map_word_memory_row))
}

fn map_word_memory_row(row: sqlx::postgres::PgRow) -> WordMemoryRow {
    WordMemoryRow {
        word: row.try_get("word").unwrap_or_default(),
        status: WordStatus::parse(&row.try_get::<String, _>("status").unwrap_or_default()),
        attempts: row.try_get::<i32, _>("attempts").map(i64::from).unwrap_or(0),
        ease_factor: row.try_get("easeFactor").unwrap_or(DEFAULT_EASE_FACTOR),
        interval_days: row
            .try_get::<i32, _>("intervalDays")
            .map(i64::from)
            .unwrap_or(1),
        repetitions: row
            .try_get::<i32, _>("repetitions")
            .map(i64::from)
            .unwrap_or(0),
        last_seen: row
            .try_get("lastSeen")
            .unwrap_or_else(|_| chrono::Utc::now().date_naive()),
        next_review: row.try_get::<Option<NaiveDate>, _>("nextReview").ok().flatten(),
    }
}

/// Applies one review outcome to the stored memory state. Creates the record
/// on a first-ever review, otherwise advances the existing state. The caller
/// owns the transaction.
pub async fn apply_review(
    tx: &mut Transaction<'_, Postgres>,
    user_id: &str,
    word: &str,
    quality: i32,
    today: NaiveDate,
) -> Result<MemoryState, MemoryError> {
    let row = sqlx::query(
        r#"
        SELECT "easeFactor", "intervalDays", "repetitions"
        FROM "word_memory"
        WHERE "userId" = $1 AND "word" = $2
        "#,
    )
    .bind(user_id)
    .bind(word)
    .fetch_optional(&mut **tx)
    .await?;

    let current = match &row {
        Some(row) => MemoryState {
            ease_factor: row.try_get("easeFactor").unwrap_or(DEFAULT_EASE_FACTOR),
            interval_days: row
                .try_get::<i32, _>("intervalDays")
                .map(i64::from)
                .unwrap_or(1),
            repetitions: row
                .try_get::<i32, _>("repetitions")
                .map(i64::from)
                .unwrap_or(0),
        },
        None => MemoryState::default(),
    };

    let next = advance(&current, quality)?;
    let next_review = today + Duration::days(next.interval_days);
    let status = WordStatus::from_correct(quality >= 3);

    sqlx::query(
        r#"
        INSERT INTO "word_memory"
          ("userId", "word", "status", "attempts", "firstSeen", "lastSeen",
           "nextReview", "easeFactor", "intervalDays", "repetitions")
        VALUES ($1, $2, $3, 1, $4, $4, $5, $6, $7, $8)
        ON CONFLICT ("userId", "word") DO UPDATE SET
          "easeFactor" = EXCLUDED."easeFactor",
          "intervalDays" = EXCLUDED."intervalDays",
          "repetitions" = EXCLUDED."repetitions",
          "nextReview" = EXCLUDED."nextReview",
          "lastSeen" = EXCLUDED."lastSeen"
        "#,
    )
    .bind(user_id)
    .bind(word)
    .bind(status.as_str())
    .bind(today)
    .bind(next_review)
    .bind(next.ease_factor)
    .bind(next.interval_days as i32)
    .bind(next.repetitions as i32)
    .execute(&mut **tx)
    .await?;

    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_resets_progress() {
        for quality in 0..3 {
            let state = MemoryState {
                ease_factor: 2.5,
                interval_days: 42,
                repetitions: 9,
            };
            let next = advance(&state, quality).unwrap();
            assert_eq!(next.repetitions, 0);
            assert_eq!(next.interval_days, 1);
        }
    }

    #[test]
    fn test_success_progression() {
        let first = advance(&MemoryState::default(), 5).unwrap();
        assert_eq!(first.repetitions, 1);
        assert_eq!(first.interval_days, 1);

        let second = advance(&first, 5).unwrap();
        assert_eq!(second.repetitions, 2);
        assert_eq!(second.interval_days, 6);

        let third = advance(&second, 5).unwrap();
        assert_eq!(third.repetitions, 3);
        // 6 * ease, floored
        assert_eq!(third.interval_days, (6.0 * second.ease_factor) as i64);
    }

    #[test]
    fn test_canonical_third_step() {
        let state = MemoryState {
            ease_factor: 2.5,
            interval_days: 6,
            repetitions: 2,
        };
        let next = advance(&state, 5).unwrap();
        assert_eq!(next.repetitions, 3);
        assert_eq!(next.interval_days, 15);
    }

    #[test]
    fn test_ease_floor_holds() {
        let mut state = MemoryState {
            ease_factor: MIN_EASE_FACTOR,
            interval_days: 1,
            repetitions: 0,
        };
        for _ in 0..20 {
            state = advance(&state, 0).unwrap();
            assert!(state.ease_factor >= MIN_EASE_FACTOR);
        }
    }

    #[test]
    fn test_perfect_recall_raises_ease() {
        let next = advance(&MemoryState::default(), 5).unwrap();
        assert!(next.ease_factor > DEFAULT_EASE_FACTOR);
        assert!((next.ease_factor - 2.6).abs() < 1e-9);
    }

    #[test]
    fn test_quality_out_of_range_rejected() {
        assert!(matches!(
            advance(&MemoryState::default(), -1),
            Err(MemoryError::InvalidQuality(-1))
        ));
        assert!(matches!(
            advance(&MemoryState::default(), 6),
            Err(MemoryError::InvalidQuality(6))
        ));
    }
}
