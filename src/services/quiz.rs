use std::time::Instant;

use chrono::NaiveDate;
use rand::seq::SliceRandom;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::db::DatabaseProxy;
use crate::services::achievement::{self, AchievementCatalog};
use crate::services::challenge::{self, ChallengeAward};
use crate::services::memory::{self, MemoryError, WordStatus};
use crate::services::scoring;
use crate::services::streak;
use crate::services::words;

pub const MIN_QUIZ_LENGTH: i64 = 1;
pub const MAX_QUIZ_LENGTH: i64 = 50;

pub const SPACED_QUALITY_CORRECT: i32 = 5;
pub const SPACED_QUALITY_INCORRECT: i32 = 2;

#[derive(Debug, Error)]
pub enum QuizError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("no usable words available for this quiz")]
    EmptyWordPool,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("sql error: {0}")]
    Sql(#[from] sqlx::Error),
    #[error(transparent)]
    Memory(#[from] MemoryError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizType {
    Random,
    Review,
    Spaced,
}

impl QuizType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "random" => Some(Self::Random),
            "review" => Some(Self::Review),
            "spaced" => Some(Self::Spaced),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::Review => "review",
            Self::Spaced => "spaced",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub word: String,
    pub pronunciation: String,
    pub examples: Vec<String>,
    pub options: Vec<String>,
    #[serde(skip_serializing)]
    pub correct_index: usize,
    #[serde(skip_serializing)]
    pub definition: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnsweredQuestion {
    pub word: String,
    pub chosen: String,
    pub correct: String,
    pub is_correct: bool,
}

/// One in-flight quiz. Lives only in the in-process session store until
/// completion commits; dropping it mid-run leaves no trace in the database.
#[derive(Debug, Clone)]
pub struct QuizSession {
    pub id: String,
    pub user_id: String,
    pub quiz_type: QuizType,
    pub questions: Vec<QuizQuestion>,
    pub current: usize,
    pub score: i64,
    pub started_at: Instant,
    pub answers: Vec<AnsweredQuestion>,
}

impl QuizSession {
    pub fn length(&self) -> i64 {
        self.questions.len() as i64
    }

    pub fn is_complete(&self) -> bool {
        self.current >= self.questions.len()
    }

    pub fn current_question(&self) -> Option<&QuizQuestion> {
        self.questions.get(self.current)
    }

    /// Records the answer for the current question and advances.
    pub fn answer_current(&mut self, choice_index: usize) -> Result<bool, QuizError> {
        let Some(question) = self.questions.get(self.current) else {
            return Err(QuizError::Validation(
                "quiz has already reached the end".to_string(),
            ));
        };
        let Some(chosen) = question.options.get(choice_index) else {
            return Err(QuizError::Validation(format!(
                "choice index {choice_index} is out of range"
            )));
        };

        let is_correct = choice_index == question.correct_index;
        self.answers.push(AnsweredQuestion {
            word: question.word.clone(),
            chosen: chosen.clone(),
            correct: question.definition.clone(),
            is_correct,
        });
        if is_correct {
            self.score += 1;
        }
        self.current += 1;
        Ok(is_correct)
    }

    /// Steps back one question, discarding its recorded answer.
    pub fn step_back(&mut self) -> Result<(), QuizError> {
        if self.current == 0 {
            return Err(QuizError::Validation(
                "already at the first question".to_string(),
            ));
        }
        self.current -= 1;
        if let Some(answer) = self.answers.pop() {
            if answer.is_correct {
                self.score -= 1;
            }
        }
        Ok(())
    }

    /// Reopens the quiz from the first question, discarding all answers.
    pub fn restart(&mut self) {
        self.current = 0;
        self.score = 0;
        self.answers.clear();
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizCompletion {
    pub points_earned: i64,
    pub correct: i64,
    pub length: i64,
    pub accuracy: f64,
    pub time_spent: f64,
    pub streak: i64,
    pub new_achievements: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge: Option<ChallengeAward>,
}

/// Builds a quiz for the user. Fails closed with [`QuizError::EmptyWordPool`]
/// when no usable words exist; a partially filled quiz (fewer questions than
/// requested) is fine.
pub async fn start_quiz(
    proxy: &DatabaseProxy,
    user_id: &str,
    quiz_type: QuizType,
    length: i64,
    today: NaiveDate,
) -> Result<QuizSession, QuizError> {
    if !(MIN_QUIZ_LENGTH..=MAX_QUIZ_LENGTH).contains(&length) {
        return Err(QuizError::Validation(format!(
            "quiz length must be between {MIN_QUIZ_LENGTH} and {MAX_QUIZ_LENGTH}"
        )));
    }

    let pool = proxy.pool();
    let candidates = select_candidate_words(pool, user_id, quiz_type, length, today).await?;

    let mut questions = Vec::with_capacity(candidates.len());
    for word in candidates {
        let Some(details) = words::get_word_details(pool, &word).await? else {
            continue;
        };

        let distractors =
            words::distractor_definitions(pool, &details.word, &details.definition, 3).await?;

        let mut options = Vec::with_capacity(distractors.len() + 1);
        options.push(details.definition.clone());
        options.extend(distractors);
        options.shuffle(&mut rand::rng());

        let correct_index = options
            .iter()
            .position(|option| option == &details.definition)
            .unwrap_or(0);

        let mut examples = Vec::new();
        if !details.example1.is_empty() {
            examples.push(details.example1.clone());
        }
        if !details.example2.is_empty() {
            examples.push(details.example2.clone());
        }

        words::update_word_usage(pool, &details.word, today).await?;

        questions.push(QuizQuestion {
            word: details.word,
            pronunciation: details.pronunciation,
            examples,
            options,
            correct_index,
            definition: details.definition,
        });
    }

    if questions.is_empty() {
        return Err(QuizError::EmptyWordPool);
    }

    Ok(QuizSession {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        quiz_type,
        questions,
        current: 0,
        score: 0,
        started_at: Instant::now(),
        answers: Vec::new(),
    })
}

async fn select_candidate_words(
    pool: &PgPool,
    user_id: &str,
    quiz_type: QuizType,
    length: i64,
    today: NaiveDate,
) -> Result<Vec<String>, QuizError> {
    let mut selected = match quiz_type {
        QuizType::Random => words::random_words(pool, length).await?,
        QuizType::Review => {
            let mut picked = words::wrong_words(pool, user_id, length).await?;
            let missing = length - picked.len() as i64;
            if missing > 0 {
                picked.extend(words::random_unseen_words(pool, user_id, missing).await?);
            }
            picked
        }
        QuizType::Spaced => {
            let mut picked = memory::due_words(pool, user_id, today, length).await?;
            let missing = length - picked.len() as i64;
            if missing > 0 {
                picked.extend(words::random_words(pool, missing).await?);
            }
            picked
        }
    };

    // padding can duplicate earlier picks
    let mut seen = std::collections::HashSet::new();
    selected.retain(|word| seen.insert(word.clone()));
    selected.truncate(length as usize);

    Ok(selected)
}

/// Commits a finished quiz as one transaction: quiz log entry, account
/// counters, streak, per-word memory updates (with SM-2 scheduling in spaced
/// mode), achievement grants, and the daily-challenge check. Any failure
/// rolls the whole completion back; nothing is retried here.
pub async fn complete_quiz(
    proxy: &DatabaseProxy,
    session: &QuizSession,
    catalog: &AchievementCatalog,
    today: NaiveDate,
) -> Result<QuizCompletion, QuizError> {
    if !session.is_complete() {
        return Err(QuizError::Validation(format!(
            "quiz is still in progress ({}/{} answered)",
            session.answers.len(),
            session.questions.len()
        )));
    }

    let length = session.length();
    let correct = session.score;
    let time_spent = session.started_at.elapsed().as_secs_f64();
    let accuracy = scoring::accuracy_percent(correct, length);
    let points_earned = scoring::quiz_points(correct, length, time_spent);

    let mut tx = proxy.pool().begin().await?;

    sqlx::query(
        r#"
        INSERT INTO "quiz_log"
          ("id", "userId", "date", "quizType", "length", "correct", "timeSpent", "accuracy", "pointsEarned")
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&session.user_id)
    .bind(today)
    .bind(session.quiz_type.as_str())
    .bind(length as i32)
    .bind(correct as i32)
    .bind(time_spent)
    .bind(accuracy)
    .bind(points_earned as i32)
    .execute(&mut *tx)
    .await?;

    // streak first: it decides off the previous lastQuizDate
    let new_streak = streak::update_streak(&mut tx, &session.user_id, today).await?;

    sqlx::query(
        r#"
        UPDATE "users"
        SET "totalQuestions" = "totalQuestions" + $1,
            "totalCorrect" = "totalCorrect" + $2,
            "timeSpentSeconds" = "timeSpentSeconds" + $3,
            "points" = "points" + $4
        WHERE "id" = $5
        "#,
    )
    .bind(length as i32)
    .bind(correct as i32)
    .bind(time_spent)
    .bind(points_earned as i32)
    .bind(&session.user_id)
    .execute(&mut *tx)
    .await?;

    for answer in &session.answers {
        let status = WordStatus::from_correct(answer.is_correct);
        sqlx::query(
            r#"
            INSERT INTO "word_memory"
              ("userId", "word", "status", "attempts", "firstSeen", "lastSeen")
            VALUES ($1, $2, $3, 1, $4, $4)
            ON CONFLICT ("userId", "word") DO UPDATE SET
              "status" = EXCLUDED."status",
              "attempts" = "word_memory"."attempts" + 1,
              "lastSeen" = EXCLUDED."lastSeen"
            "#,
        )
        .bind(&session.user_id)
        .bind(&answer.word)
        .bind(status.as_str())
        .bind(today)
        .execute(&mut *tx)
        .await?;

        if session.quiz_type == QuizType::Spaced {
            let quality = if answer.is_correct {
                SPACED_QUALITY_CORRECT
            } else {
                SPACED_QUALITY_INCORRECT
            };
            memory::apply_review(&mut tx, &session.user_id, &answer.word, quality, today).await?;
        }
    }

    let new_achievements =
        achievement::evaluate(&mut tx, &session.user_id, catalog, today).await?;
    let challenge_award = challenge::check_completion(&mut tx, &session.user_id, today).await?;

    tx.commit().await?;

    Ok(QuizCompletion {
        points_earned,
        correct,
        length,
        accuracy,
        time_spent,
        streak: new_streak,
        new_achievements,
        challenge: challenge_award,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with_questions(n: usize) -> QuizSession {
        let questions = (0..n)
            .map(|i| QuizQuestion {
                word: format!("word{i}"),
                pronunciation: String::new(),
                examples: Vec::new(),
                options: vec![
                    format!("def{i}"),
                    "foo".to_string(),
                    "bar".to_string(),
                    "baz".to_string(),
                ],
                correct_index: 0,
                definition: format!("def{i}"),
            })
            .collect();

        QuizSession {
            id: "test".to_string(),
            user_id: "user-1".to_string(),
            quiz_type: QuizType::Random,
            questions,
            current: 0,
            score: 0,
            started_at: Instant::now(),
            answers: Vec::new(),
        }
    }

    #[test]
    fn test_answer_advances_and_scores() {
        let mut session = session_with_questions(3);
        assert!(session.answer_current(0).unwrap());
        assert!(!session.answer_current(1).unwrap());
        assert_eq!(session.current, 2);
        assert_eq!(session.score, 1);
        assert_eq!(session.answers.len(), 2);
        assert!(!session.is_complete());

        assert!(session.answer_current(0).unwrap());
        assert!(session.is_complete());
    }

    #[test]
    fn test_answer_past_end_rejected() {
        let mut session = session_with_questions(1);
        session.answer_current(0).unwrap();
        assert!(matches!(
            session.answer_current(0),
            Err(QuizError::Validation(_))
        ));
    }

    #[test]
    fn test_out_of_range_choice_rejected() {
        let mut session = session_with_questions(1);
        assert!(matches!(
            session.answer_current(9),
            Err(QuizError::Validation(_))
        ));
        assert_eq!(session.answers.len(), 0);
        assert_eq!(session.current, 0);
    }

    #[test]
    fn test_step_back_discards_answer() {
        let mut session = session_with_questions(2);
        session.answer_current(0).unwrap();
        assert_eq!(session.score, 1);

        session.step_back().unwrap();
        assert_eq!(session.current, 0);
        assert_eq!(session.score, 0);
        assert!(session.answers.is_empty());

        assert!(session.step_back().is_err());
    }

    #[test]
    fn test_restart_resets_everything() {
        let mut session = session_with_questions(3);
        session.answer_current(0).unwrap();
        session.answer_current(0).unwrap();

        session.restart();
        assert_eq!(session.current, 0);
        assert_eq!(session.score, 0);
        assert!(session.answers.is_empty());
    }

    #[test]
    fn test_spaced_mode_quality_scale() {
        // spaced completions use exactly this coarse two-point scale
        assert_eq!(SPACED_QUALITY_CORRECT, 5);
        assert_eq!(SPACED_QUALITY_INCORRECT, 2);
        // an incorrect answer lands on the failure path of the scheduler
        assert!(SPACED_QUALITY_INCORRECT < 3);
        let reset = crate::services::memory::advance(
            &crate::services::memory::MemoryState::default(),
            SPACED_QUALITY_INCORRECT,
        )
        .unwrap();
        assert_eq!(reset.repetitions, 0);
        assert_eq!(reset.interval_days, 1);
    }

    #[test]
    fn test_quiz_type_parse() {
        assert_eq!(QuizType::parse("random"), Some(QuizType::Random));
        assert_eq!(QuizType::parse("review"), Some(QuizType::Review));
        assert_eq!(QuizType::parse("spaced"), Some(QuizType::Spaced));
        assert_eq!(QuizType::parse("other"), None);
    }
}
