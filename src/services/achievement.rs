use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Row, Transaction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementCategory {
    Points,
    Streak,
    KnownWords,
    QuizCount,
    StudyTime,
    Followers,
}

impl AchievementCategory {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "streak" => Self::Streak,
            "known_words" => Self::KnownWords,
            "quiz_count" => Self::QuizCount,
            "study_time" => Self::StudyTime,
            "followers" => Self::Followers,
            _ => Self::Points,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Points => "points",
            Self::Streak => "streak",
            Self::KnownWords => "known_words",
            Self::QuizCount => "quiz_count",
            Self::StudyTime => "study_time",
            Self::Followers => "followers",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementRule {
    pub name: &'static str,
    pub category: AchievementCategory,
    pub threshold: i64,
    pub reward_points: i64,
}

/// Fixed achievement table, loaded once at startup and passed in explicitly.
/// Thresholds for StudyTime are seconds.
#[derive(Debug, Clone)]
pub struct AchievementCatalog {
    rules: Vec<AchievementRule>,
}

impl AchievementCatalog {
    pub fn standard() -> Self {
        use AchievementCategory::*;

        let rule = |name, category, threshold, reward_points| AchievementRule {
            name,
            category,
            threshold,
            reward_points,
        };

        Self {
            rules: vec![
                rule("First Century", Points, 100, 50),
                rule("Half Millennium", Points, 500, 100),
                rule("Millennium Master", Points, 1000, 200),
                rule("Point Collector", Points, 2000, 300),
                rule("Sky High", Points, 5000, 500),
                rule("Week Streak", Streak, 7, 70),
                rule("Monthly Master", Streak, 30, 300),
                rule("Century Streak", Streak, 100, 1000),
                rule("Vocabulary Builder", KnownWords, 50, 100),
                rule("Word Scholar", KnownWords, 200, 300),
                rule("Lexicon Legend", KnownWords, 500, 500),
                rule("Dictionary Master", KnownWords, 1000, 1000),
                rule("Quiz Master", QuizCount, 50, 200),
                rule("Marathon Runner", QuizCount, 100, 400),
                rule("Dedicated Learner", StudyTime, 3600, 150),
                rule("Time Master", StudyTime, 18000, 500),
                rule("Social Butterfly", Followers, 5, 100),
                rule("Influencer", Followers, 20, 300),
            ],
        }
    }

    pub fn rules(&self) -> &[AchievementRule] {
        &self.rules
    }

    pub fn find(&self, name: &str) -> Option<&AchievementRule> {
        self.rules.iter().find(|rule| rule.name == name)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UserAggregates {
    pub points: i64,
    pub streak: i64,
    pub known_words: i64,
    pub quiz_count: i64,
    pub study_time_secs: f64,
    pub followers: i64,
}

impl UserAggregates {
    pub fn value_for(&self, category: AchievementCategory) -> i64 {
        match category {
            AchievementCategory::Points => self.points,
            AchievementCategory::Streak => self.streak,
            AchievementCategory::KnownWords => self.known_words,
            AchievementCategory::QuizCount => self.quiz_count,
            AchievementCategory::StudyTime => self.study_time_secs as i64,
            AchievementCategory::Followers => self.followers,
        }
    }
}

pub fn rule_is_met(rule: &AchievementRule, aggregates: &UserAggregates) -> bool {
    aggregates.value_for(rule.category) >= rule.threshold
}

/// Evaluates the whole catalog against the user's current aggregates and
/// grants whatever newly qualifies. Grant row and point reward are written
/// inside the caller's transaction; a concurrent pre-existing grant makes the
/// insert a no-op and the reward is skipped with it. One pass per call: a
/// reward that pushes the user over a points threshold is picked up by the
/// next evaluation.
pub async fn evaluate(
    tx: &mut Transaction<'_, Postgres>,
    user_id: &str,
    catalog: &AchievementCatalog,
    today: NaiveDate,
) -> Result<Vec<String>, sqlx::Error> {
    let aggregates = load_aggregates_tx(tx, user_id).await?;
    let existing = granted_names_tx(tx, user_id).await?;

    let mut granted = Vec::new();
    for rule in catalog.rules() {
        if existing.contains(rule.name) {
            continue;
        }
        if !rule_is_met(rule, &aggregates) {
            continue;
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO "user_achievements" ("userId", "achievement", "dateEarned", "pointsEarned")
            VALUES ($1, $2, $3, $4)
            ON CONFLICT ("userId", "achievement") DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(rule.name)
        .bind(today)
        .bind(rule.reward_points as i32)
        .execute(&mut **tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            continue;
        }

        sqlx::query(r#"UPDATE "users" SET "points" = "points" + $1 WHERE "id" = $2"#)
            .bind(rule.reward_points as i32)
            .bind(user_id)
            .execute(&mut **tx)
            .await?;

        granted.push(rule.name.to_string());
    }

    Ok(granted)
}

async fn load_aggregates_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: &str,
) -> Result<UserAggregates, sqlx::Error> {
    let user_row = sqlx::query(
        r#"SELECT "points", "streak", "totalStudyTime" FROM "users" WHERE "id" = $1"#,
    )
    .bind(user_id)
    .fetch_one(&mut **tx)
    .await?;

    let known_words: i64 = sqlx::query_scalar(
        r#"SELECT COUNT(*) FROM "word_memory" WHERE "userId" = $1 AND "status" = 'known'"#,
    )
    .bind(user_id)
    .fetch_one(&mut **tx)
    .await?;

    let quiz_count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM "quiz_log" WHERE "userId" = $1"#)
        .bind(user_id)
        .fetch_one(&mut **tx)
        .await?;

    let followers: i64 =
        sqlx::query_scalar(r#"SELECT COUNT(*) FROM "follows" WHERE "following" = $1"#)
            .bind(user_id)
            .fetch_one(&mut **tx)
            .await?;

    Ok(UserAggregates {
        points: user_row.try_get::<i32, _>("points").map(i64::from).unwrap_or(0),
        streak: user_row.try_get::<i32, _>("streak").map(i64::from).unwrap_or(0),
        known_words,
        quiz_count,
        study_time_secs: user_row.try_get("totalStudyTime").unwrap_or(0.0),
        followers,
    })
}

async fn granted_names_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: &str,
) -> Result<HashSet<String>, sqlx::Error> {
    let rows = sqlx::query(r#"SELECT "achievement" FROM "user_achievements" WHERE "userId" = $1"#)
        .bind(user_id)
        .fetch_all(&mut **tx)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|row| row.try_get::<String, _>("achievement").ok())
        .collect())
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementStatus {
    pub name: String,
    pub category: AchievementCategory,
    pub threshold: i64,
    pub reward_points: i64,
    pub unlocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub earned_on: Option<NaiveDate>,
    pub progress: i64,
}

/// Full catalog with per-entry unlock state and progress percentage, for the
/// achievements listing.
pub async fn catalog_with_status(
    pool: &PgPool,
    user_id: &str,
    catalog: &AchievementCatalog,
) -> Result<Vec<AchievementStatus>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT "achievement", "dateEarned" FROM "user_achievements" WHERE "userId" = $1"#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let earned: std::collections::HashMap<String, NaiveDate> = rows
        .into_iter()
        .filter_map(|row| {
            let name: String = row.try_get("achievement").ok()?;
            let date: NaiveDate = row.try_get("dateEarned").ok()?;
            Some((name, date))
        })
        .collect();

    let aggregates = load_aggregates(pool, user_id).await?;

    Ok(catalog
        .rules()
        .iter()
        .map(|rule| {
            let earned_on = earned.get(rule.name).copied();
            let progress = if earned_on.is_some() {
                100
            } else if rule.threshold > 0 {
                (aggregates.value_for(rule.category) * 100 / rule.threshold).clamp(0, 100)
            } else {
                0
            };
            AchievementStatus {
                name: rule.name.to_string(),
                category: rule.category,
                threshold: rule.threshold,
                reward_points: rule.reward_points,
                unlocked: earned_on.is_some(),
                earned_on,
                progress,
            }
        })
        .collect())
}

pub async fn load_aggregates(
    pool: &PgPool,
    user_id: &str,
) -> Result<UserAggregates, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let aggregates = load_aggregates_tx(&mut tx, user_id).await?;
    tx.commit().await?;
    Ok(aggregates)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_catalog_is_unique() {
        let catalog = AchievementCatalog::standard();
        let mut names = HashSet::new();
        for rule in catalog.rules() {
            assert!(names.insert(rule.name), "duplicate rule {}", rule.name);
            assert!(rule.threshold > 0);
            assert!(rule.reward_points > 0);
        }
        assert_eq!(catalog.rules().len(), 18);
    }

    #[test]
    fn test_rule_thresholds() {
        let aggregates = UserAggregates {
            points: 499,
            streak: 7,
            known_words: 50,
            quiz_count: 10,
            study_time_secs: 3599.9,
            followers: 0,
        };
        let catalog = AchievementCatalog::standard();

        assert!(rule_is_met(catalog.find("First Century").unwrap(), &aggregates));
        assert!(!rule_is_met(catalog.find("Half Millennium").unwrap(), &aggregates));
        assert!(rule_is_met(catalog.find("Week Streak").unwrap(), &aggregates));
        assert!(rule_is_met(catalog.find("Vocabulary Builder").unwrap(), &aggregates));
        // 3599.9s truncates below the one-hour threshold
        assert!(!rule_is_met(catalog.find("Dedicated Learner").unwrap(), &aggregates));
        assert!(!rule_is_met(catalog.find("Social Butterfly").unwrap(), &aggregates));
    }

    #[test]
    fn test_category_parse_round_trip() {
        for category in [
            AchievementCategory::Points,
            AchievementCategory::Streak,
            AchievementCategory::KnownWords,
            AchievementCategory::QuizCount,
            AchievementCategory::StudyTime,
            AchievementCategory::Followers,
        ] {
            assert_eq!(AchievementCategory::parse(category.as_str()), category);
        }
    }
}
