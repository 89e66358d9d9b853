use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::{delete, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::response::AppError;
use crate::routes::{internal_error, json_ok, require_user, today, MessageResponse};
use crate::services::quiz::{self, QuizError, QuizQuestion, QuizSession, QuizType};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/start", post(start))
        .route("/:id/answer", post(answer))
        .route("/:id/back", post(back))
        .route("/:id/restart", post(restart))
        .route("/:id/complete", post(complete))
        .route("/:id", delete(abandon))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartQuizPayload {
    quiz_type: String,
    length: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionView {
    id: String,
    quiz_type: QuizType,
    length: i64,
    current: usize,
    answered: usize,
    completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    question: Option<QuizQuestion>,
}

impl SessionView {
    fn from_session(session: &QuizSession) -> Self {
        Self {
            id: session.id.clone(),
            quiz_type: session.quiz_type,
            length: session.length(),
            current: session.current,
            answered: session.answers.len(),
            completed: session.is_complete(),
            question: session.current_question().cloned(),
        }
    }
}

async fn start(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<StartQuizPayload>,
) -> Result<impl IntoResponse, AppError> {
    let (proxy, user) = require_user(&state, &headers).await?;

    let quiz_type = QuizType::parse(&payload.quiz_type)
        .ok_or_else(|| AppError::validation("quiz type must be random, review, or spaced"))?;

    let session = quiz::start_quiz(proxy.as_ref(), &user.id, quiz_type, payload.length, today())
        .await
        .map_err(map_quiz_error)?;

    let view = SessionView::from_session(&session);
    state.quiz_sessions().insert(session);

    Ok(json_ok(view))
}

#[derive(Debug, Deserialize)]
struct AnswerPayload {
    choice: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnswerView {
    is_correct: bool,
    #[serde(flatten)]
    session: SessionView,
}

async fn answer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(payload): Json<AnswerPayload>,
) -> Result<impl IntoResponse, AppError> {
    let (_proxy, user) = require_user(&state, &headers).await?;

    let result = state
        .quiz_sessions()
        .with_session(&id, |session| {
            if session.user_id != user.id {
                return Err(AppError::forbidden("not your quiz session"));
            }
            let is_correct = session
                .answer_current(payload.choice)
                .map_err(map_quiz_error)?;
            Ok(AnswerView {
                is_correct,
                session: SessionView::from_session(session),
            })
        })
        .ok_or_else(|| AppError::not_found("quiz session not found"))??;

    Ok(json_ok(result))
}

async fn back(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (_proxy, user) = require_user(&state, &headers).await?;

    let view = state
        .quiz_sessions()
        .with_session(&id, |session| {
            if session.user_id != user.id {
                return Err(AppError::forbidden("not your quiz session"));
            }
            session.step_back().map_err(map_quiz_error)?;
            Ok(SessionView::from_session(session))
        })
        .ok_or_else(|| AppError::not_found("quiz session not found"))??;

    Ok(json_ok(view))
}

async fn restart(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (_proxy, user) = require_user(&state, &headers).await?;

    let view = state
        .quiz_sessions()
        .with_session(&id, |session| {
            if session.user_id != user.id {
                return Err(AppError::forbidden("not your quiz session"));
            }
            session.restart();
            Ok(SessionView::from_session(session))
        })
        .ok_or_else(|| AppError::not_found("quiz session not found"))??;

    Ok(json_ok(view))
}

async fn complete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (proxy, user) = require_user(&state, &headers).await?;

    let session = state
        .quiz_sessions()
        .get(&id)
        .ok_or_else(|| AppError::not_found("quiz session not found"))?;
    if session.user_id != user.id {
        return Err(AppError::forbidden("not your quiz session"));
    }

    let completion = quiz::complete_quiz(
        proxy.as_ref(),
        &session,
        state.achievement_catalog().as_ref(),
        today(),
    )
    .await
    .map_err(map_quiz_error)?;

    // only a committed completion removes the session
    state.quiz_sessions().remove(&id);

    Ok(json_ok(completion))
}

async fn abandon(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (_proxy, user) = require_user(&state, &headers).await?;

    let session = state
        .quiz_sessions()
        .get(&id)
        .ok_or_else(|| AppError::not_found("quiz session not found"))?;
    if session.user_id != user.id {
        return Err(AppError::forbidden("not your quiz session"));
    }

    state.quiz_sessions().remove(&id);

    Ok(Json(MessageResponse {
        success: true,
        message: "quiz abandoned".to_string(),
    }))
}

fn map_quiz_error(err: QuizError) -> AppError {
    match err {
        QuizError::Validation(message) => AppError::validation(message),
        QuizError::EmptyWordPool => {
            AppError::validation("no usable words available for this quiz")
        }
        QuizError::NotFound(message) => AppError::not_found(message),
        QuizError::Sql(err) => internal_error(err),
        QuizError::Memory(err) => internal_error(err),
    }
}
