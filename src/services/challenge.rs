use chrono::NaiveDate;
use rand::seq::IndexedRandom;
use serde::Serialize;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
pub struct ChallengeSpec {
    pub challenge_type: &'static str,
    pub target: i64,
    pub reward: i64,
    pub description: &'static str,
}

/// The pool a day's challenge is drawn from.
#[derive(Debug, Clone)]
pub struct ChallengeCatalog {
    specs: Vec<ChallengeSpec>,
}

impl ChallengeCatalog {
    pub fn standard() -> Self {
        Self {
            specs: vec![
                ChallengeSpec {
                    challenge_type: "quiz_words",
                    target: 20,
                    reward: 100,
                    description: "Complete a 20-word quiz",
                },
                ChallengeSpec {
                    challenge_type: "perfect_quiz",
                    target: 1,
                    reward: 150,
                    description: "Get 100% on any quiz",
                },
                ChallengeSpec {
                    challenge_type: "study_time",
                    target: 1800,
                    reward: 80,
                    description: "Study for 30 minutes",
                },
                ChallengeSpec {
                    challenge_type: "learn_new",
                    target: 10,
                    reward: 120,
                    description: "Learn 10 new words",
                },
            ],
        }
    }

    pub fn specs(&self) -> &[ChallengeSpec] {
        &self.specs
    }

    pub fn pick_random(&self) -> ChallengeSpec {
        let mut rng = rand::rng();
        *self
            .specs
            .choose(&mut rng)
            .expect("challenge catalog is never empty")
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyChallenge {
    pub id: String,
    pub date: NaiveDate,
    pub challenge_type: String,
    pub target_value: i64,
    pub reward_points: i64,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeAward {
    pub challenge_id: String,
    pub description: String,
    pub points_earned: i64,
}

/// Returns today's challenge, creating it first if no row exists for the
/// date. Concurrent creation races resolve through the unique date column.
pub async fn ensure_daily_challenge(
    pool: &PgPool,
    catalog: &ChallengeCatalog,
    today: NaiveDate,
) -> Result<DailyChallenge, sqlx::Error> {
    if let Some(existing) = get_daily_challenge(pool, today).await? {
        return Ok(existing);
    }

    let spec = catalog.pick_random();
    sqlx::query(
        r#"
        INSERT INTO "daily_challenges"
          ("id", "date", "challengeType", "targetValue", "rewardPoints", "description")
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT ("date") DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(today)
    .bind(spec.challenge_type)
    .bind(spec.target as i32)
    .bind(spec.reward as i32)
    .bind(spec.description)
    .execute(pool)
    .await?;

    match get_daily_challenge(pool, today).await? {
        Some(challenge) => Ok(challenge),
        None => Err(sqlx::Error::RowNotFound),
    }
}

pub async fn get_daily_challenge(
    pool: &PgPool,
    today: NaiveDate,
) -> Result<Option<DailyChallenge>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT "id", "date", "challengeType", "targetValue", "rewardPoints", "description"
        FROM "daily_challenges"
        WHERE "date" = $1
        "#,
    )
    .bind(today)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(map_challenge_row))
}

async fn get_daily_challenge_tx(
    tx: &mut Transaction<'_, Postgres>,
    today: NaiveDate,
) -> Result<Option<DailyChallenge>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT "id", "date", "challengeType", "targetValue", "rewardPoints", "description"
        FROM "daily_challenges"
        WHERE "date" = $1
        "#,
    )
    .bind(today)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(row.map(map_challenge_row))
}

fn map_challenge_row(row: sqlx::postgres::PgRow) -> DailyChallenge {
    DailyChallenge {
        id: row.try_get("id").unwrap_or_default(),
        date: row
            .try_get("date")
            .unwrap_or_else(|_| chrono::Utc::now().date_naive()),
        challenge_type: row.try_get("challengeType").unwrap_or_default(),
        target_value: row
            .try_get::<i32, _>("targetValue")
            .map(i64::from)
            .unwrap_or(0),
        reward_points: row
            .try_get::<i32, _>("rewardPoints")
            .map(i64::from)
            .unwrap_or(0),
        description: row.try_get("description").unwrap_or_default(),
    }
}

pub async fn is_completed_by(
    pool: &PgPool,
    user_id: &str,
    challenge_id: &str,
) -> Result<bool, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT 1 as "one" FROM "challenge_completions" WHERE "userId" = $1 AND "challengeId" = $2"#,
    )
    .bind(user_id)
    .bind(challenge_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.is_some())
}

/// Checks whether the user just met today's challenge and, if so, records the
/// completion and credits its reward inside the caller's transaction. A
/// second completion of the same challenge is a no-op.
pub async fn check_completion(
    tx: &mut Transaction<'_, Postgres>,
    user_id: &str,
    today: NaiveDate,
) -> Result<Option<ChallengeAward>, sqlx::Error> {
    let Some(challenge) = get_daily_challenge_tx(tx, today).await? else {
        return Ok(None);
    };

    if !challenge_met_tx(tx, user_id, &challenge, today).await? {
        return Ok(None);
    }

    let inserted = sqlx::query(
        r#"
        INSERT INTO "challenge_completions" ("userId", "challengeId", "completedDate", "pointsEarned")
        VALUES ($1, $2, $3, $4)
        ON CONFLICT ("userId", "challengeId") DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(&challenge.id)
    .bind(today)
    .bind(challenge.reward_points as i32)
    .execute(&mut **tx)
    .await?
    .rows_affected();

    if inserted == 0 {
        return Ok(None);
    }

    sqlx::query(r#"UPDATE "users" SET "points" = "points" + $1 WHERE "id" = $2"#)
        .bind(challenge.reward_points as i32)
        .bind(user_id)
        .execute(&mut **tx)
        .await?;

    Ok(Some(ChallengeAward {
        challenge_id: challenge.id,
        description: challenge.description,
        points_earned: challenge.reward_points,
    }))
}

async fn challenge_met_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: &str,
    challenge: &DailyChallenge,
    today: NaiveDate,
) -> Result<bool, sqlx::Error> {
    match challenge.challenge_type.as_str() {
        "quiz_words" => {
            let total: Option<i64> = sqlx::query_scalar(
                r#"SELECT SUM("length")::bigint FROM "quiz_log" WHERE "userId" = $1 AND "date" = $2"#,
            )
            .bind(user_id)
            .bind(today)
            .fetch_one(&mut **tx)
            .await?;
            Ok(total.unwrap_or(0) >= challenge.target_value)
        }
        "perfect_quiz" => {
            let row = sqlx::query(
                r#"
                SELECT 1 as "one" FROM "quiz_log"
                WHERE "userId" = $1 AND "date" = $2 AND "accuracy" = 100
                LIMIT 1
                "#,
            )
            .bind(user_id)
            .bind(today)
            .fetch_optional(&mut **tx)
            .await?;
            Ok(row.is_some())
        }
        "study_time" => {
            let total: Option<f64> = sqlx::query_scalar(
                r#"
                SELECT SUM("duration") FROM "study_sessions"
                WHERE "userId" = $1 AND DATE("startTime") = $2
                "#,
            )
            .bind(user_id)
            .bind(today)
            .fetch_one(&mut **tx)
            .await?;
            Ok(total.unwrap_or(0.0) >= challenge.target_value as f64)
        }
        "learn_new" => {
            let count: i64 = sqlx::query_scalar(
                r#"
                SELECT COUNT(*) FROM "word_memory"
                WHERE "userId" = $1 AND "firstSeen" = $2 AND "status" = 'known'
                "#,
            )
            .bind(user_id)
            .bind(today)
            .fetch_one(&mut **tx)
            .await?;
            Ok(count >= challenge.target_value)
        }
        other => {
            tracing::warn!(challenge_type = other, "unknown challenge type");
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_catalog() {
        let catalog = ChallengeCatalog::standard();
        assert_eq!(catalog.specs().len(), 4);
        for spec in catalog.specs() {
            assert!(spec.target > 0);
            assert!(spec.reward > 0);
            assert!(!spec.description.is_empty());
        }
    }

    #[test]
    fn test_pick_random_draws_from_catalog() {
        let catalog = ChallengeCatalog::standard();
        for _ in 0..20 {
            let spec = catalog.pick_random();
            assert!(catalog
                .specs()
                .iter()
                .any(|s| s.challenge_type == spec.challenge_type));
        }
    }
}
