use chrono::NaiveDate;
use sqlx::{Postgres, Row, Transaction};

/// Advances the consecutive-day counter for one completed quiz and stamps
/// today's date. Must run exactly once per completion, before anything else
/// in the transaction touches "lastQuizDate": the decision depends on the
/// previous value.
pub async fn update_streak(
    tx: &mut Transaction<'_, Postgres>,
    user_id: &str,
    today: NaiveDate,
) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(r#"SELECT "streak", "lastQuizDate" FROM "users" WHERE "id" = $1"#)
        .bind(user_id)
        .fetch_one(&mut **tx)
        .await?;

    let streak: i64 = row.try_get::<i32, _>("streak").map(i64::from).unwrap_or(0);
    let last_quiz_date: Option<NaiveDate> = row.try_get("lastQuizDate").ok().flatten();

    let new_streak = match last_quiz_date {
        None => 1,
        Some(last) => {
            let delta = (today - last).num_days();
            if delta == 0 {
                streak
            } else if delta == 1 {
                streak + 1
            } else {
                if delta < 0 {
                    tracing::warn!(
                        user_id,
                        %last,
                        %today,
                        "last quiz date is in the future, resetting streak"
                    );
                }
                1
            }
        }
    };

    sqlx::query(r#"UPDATE "users" SET "streak" = $1, "lastQuizDate" = $2 WHERE "id" = $3"#)
        .bind(new_streak as i32)
        .bind(today)
        .bind(user_id)
        .execute(&mut **tx)
        .await?;

    Ok(new_streak)
}

/// The pure transition behind [`update_streak`], separated so the date-delta
/// rules are testable without a database.
pub fn next_streak(streak: i64, last_quiz_date: Option<NaiveDate>, today: NaiveDate) -> i64 {
    match last_quiz_date {
        None => 1,
        Some(last) => match (today - last).num_days() {
            0 => streak,
            1 => streak + 1,
            _ => 1,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_first_quiz_starts_streak() {
        assert_eq!(next_streak(0, None, date(2024, 3, 10)), 1);
    }

    #[test]
    fn test_same_day_unchanged() {
        assert_eq!(next_streak(4, Some(date(2024, 3, 10)), date(2024, 3, 10)), 4);
    }

    #[test]
    fn test_consecutive_day_increments() {
        assert_eq!(next_streak(4, Some(date(2024, 3, 9)), date(2024, 3, 10)), 5);
    }

    #[test]
    fn test_gap_resets() {
        assert_eq!(next_streak(9, Some(date(2024, 3, 1)), date(2024, 3, 10)), 1);
    }

    #[test]
    fn test_backdated_record_resets() {
        assert_eq!(next_streak(9, Some(date(2024, 3, 12)), date(2024, 3, 10)), 1);
    }
}
