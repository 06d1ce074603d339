// src/handlers/session.rs

use std::collections::HashMap;

use axum::{Extension, Json, extract::State, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;

use crate::{
    error::AppError,
    models::question::PublicQuestion,
    quiz::session::{QuizSession, SessionError},
    state::{ActiveQuiz, AppState},
    utils::jwt::Claims,
};

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

fn active_session_mut(
    quizzes: &mut HashMap<i64, ActiveQuiz>,
    user_id: i64,
) -> Result<&mut QuizSession, AppError> {
    quizzes
        .get_mut(&user_id)
        .ok_or_else(|| AppError::NotFound("No active quiz".to_string()))?
        .session
        .as_mut()
        .ok_or_else(|| {
            AppError::NotFound("The current quiz has no interactive session".to_string())
        })
}

/// Renders the state a client needs to draw the current question, or the
/// final summary once the quiz has been submitted. Re-rendering a question
/// reports the previously selected option so it can be pre-selected.
fn render_session(session: &QuizSession) -> serde_json::Value {
    if session.is_completed() {
        return json!({
            "completed": true,
            "score": session.score(),
            "total_questions": session.len(),
            "results": results_json(session),
        });
    }

    let index = session.current_index();
    json!({
        "completed": false,
        "index": index,
        "total_questions": session.len(),
        "question": PublicQuestion::from(session.current_question()),
        "selected": session.answer_for(index),
        "answered": (0..session.len())
            .filter(|i| session.answer_for(*i).is_some())
            .count(),
    })
}

fn results_json(session: &QuizSession) -> Vec<serde_json::Value> {
    session
        .questions()
        .iter()
        .enumerate()
        .map(|(i, q)| {
            let selected = session.answer_for(i);
            json!({
                "index": q.index,
                "prompt": q.prompt,
                "options": q.options,
                "selected": selected,
                "correct_answer": q.correct_answer,
                "correct": selected == Some(q.correct_answer),
                "explanation": session.explanation_for(i).unwrap_or(""),
            })
        })
        .collect()
}

/// Returns the current question view, or the result summary after submission.
pub async fn view(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let mut quizzes = state.quizzes.lock().await;
    let session = active_session_mut(&mut quizzes, claims.user_id())?;
    Ok(Json(render_session(session)))
}

/// DTO for answering the current question.
#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub answer: char,
}

/// Records (or overwrites) the answer for the current question.
pub async fn answer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<AnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut quizzes = state.quizzes.lock().await;
    let session = active_session_mut(&mut quizzes, claims.user_id())?;

    session.select_answer(payload.answer)?;

    Ok(Json(json!({
        "index": session.current_index(),
        "selected": session.answer_for(session.current_index()),
    })))
}

/// Moves to the next question.
pub async fn next_question(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let mut quizzes = state.quizzes.lock().await;
    let session = active_session_mut(&mut quizzes, claims.user_id())?;

    session.next()?;

    Ok(Json(render_session(session)))
}

/// Moves back to the previous question.
pub async fn previous_question(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let mut quizzes = state.quizzes.lock().await;
    let session = active_session_mut(&mut quizzes, claims.user_id())?;

    session.previous()?;

    Ok(Json(render_session(session)))
}

/// Submits the quiz: scores it, records the score and fetches per-question
/// explanations.
pub async fn submit(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    // Finalize the state machine under the lock; everything needed afterwards
    // is copied out so the lock is not held across network calls.
    let (score, questions, answers) = {
        let mut quizzes = state.quizzes.lock().await;
        let session = active_session_mut(&mut quizzes, user_id)?;
        let score = session.submit()?;
        let questions = session.questions().to_vec();
        let answers: Vec<Option<char>> = (0..questions.len())
            .map(|i| session.answer_for(i))
            .collect();
        (score, questions, answers)
    };

    let total = questions.len() as i64;

    // One score row per transition into the submitted state.
    sqlx::query("INSERT INTO scores (user_id, score, total_questions) VALUES (?, ?, ?)")
        .bind(user_id)
        .bind(score as i64)
        .bind(total)
        .execute(&state.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to record score: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    tracing::info!("User {} submitted quiz: {}/{}", user_id, score, total);

    // Explanations are best-effort and independent: a failed request stores
    // an empty placeholder and the loop continues.
    let mut explanations = Vec::with_capacity(questions.len());
    for question in &questions {
        let explanation = match state.requester.request_explanation(question).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Explanation request for Q{} failed: {}", question.index, e);
                String::new()
            }
        };
        explanations.push(explanation);
    }

    // The user may have reset or replaced the quiz while explanations were in
    // flight; in that case there is nothing to store them on.
    {
        let mut quizzes = state.quizzes.lock().await;
        if let Some(session) = quizzes
            .get_mut(&user_id)
            .and_then(|active| active.session.as_mut())
        {
            if session.is_completed() {
                for (i, text) in explanations.iter().enumerate() {
                    session.store_explanation(i, text.clone());
                }
            }
        }
    }

    let results: Vec<serde_json::Value> = questions
        .iter()
        .enumerate()
        .map(|(i, q)| {
            let selected = answers[i];
            json!({
                "index": q.index,
                "prompt": q.prompt,
                "options": q.options,
                "selected": selected,
                "correct_answer": q.correct_answer,
                "correct": selected == Some(q.correct_answer),
                "explanation": explanations[i],
            })
        })
        .collect();

    Ok(Json(json!({
        "score": score,
        "total_questions": total,
        "results": results,
    })))
}

/// Discards the active quiz entirely, returning the user to "no active quiz".
pub async fn reset(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let removed = state
        .quizzes
        .lock()
        .await
        .remove(&claims.user_id())
        .is_some();

    if !removed {
        return Err(AppError::NotFound("No active quiz".to_string()));
    }

    Ok(Json(json!({ "message": "Quiz discarded" })))
}
