// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{Multipart, State},
    http::header,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;

use crate::{
    config::{LEADERBOARD_LIMIT, MAX_QUESTION_COUNT, MIN_QUESTION_COUNT},
    error::AppError,
    models::{
        question::{QuestionRecord, QuizType},
        score::LeaderboardEntry,
    },
    quiz::{
        parser::{QuizParser, RegexQuizParser},
        session::QuizSession,
    },
    services::{
        ai::ModelChoice,
        extract::{self, extract_text},
    },
    state::{ActiveQuiz, AppState},
    utils::{html::clean_html, jwt::Claims},
};

/// DTO for generating a quiz from pasted text.
#[derive(Debug, Deserialize)]
pub struct GenerateQuizRequest {
    pub text: String,
    pub quiz_type: QuizType,
    pub num_questions: u8,
    #[serde(default)]
    pub model: ModelChoice,
}

/// Generates a quiz from pasted syllabus text.
pub async fn generate(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<GenerateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let text = payload.text.trim().to_string();
    if text.is_empty() {
        return Err(AppError::EmptyInput(
            "Please provide syllabus content".to_string(),
        ));
    }

    generate_and_store(
        &state,
        claims.user_id(),
        &text,
        payload.quiz_type,
        payload.num_questions,
        payload.model,
    )
    .await
}

/// Generates a quiz from an uploaded document (PDF, DOCX or TXT).
///
/// Multipart fields: `file` (the document), `quiz_type`, `num_questions`
/// and optionally `model`.
pub async fn upload(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut file: Option<(Vec<u8>, String)> = None;
    let mut quiz_type: Option<QuizType> = None;
    let mut num_questions: Option<u8> = None;
    let mut model = ModelChoice::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart payload: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                // The declared content type wins; fall back to the file
                // extension for clients that do not set one per part.
                let mime = field
                    .content_type()
                    .map(str::to_string)
                    .or_else(|| field.file_name().and_then(mime_from_extension))
                    .unwrap_or_default();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?;
                file = Some((data.to_vec(), mime));
            }
            "quiz_type" => {
                let value = read_text_field(field).await?;
                quiz_type = Some(QuizType::from_param(value.trim()).ok_or_else(|| {
                    AppError::BadRequest(format!("Unknown quiz type: {}", value))
                })?);
            }
            "num_questions" => {
                let value = read_text_field(field).await?;
                num_questions = Some(value.trim().parse().map_err(|_| {
                    AppError::BadRequest(format!("Invalid question count: {}", value))
                })?);
            }
            "model" => {
                let value = read_text_field(field).await?;
                model = ModelChoice::from_param(value.trim())
                    .ok_or_else(|| AppError::BadRequest(format!("Unknown model: {}", value)))?;
            }
            _ => {}
        }
    }

    let (bytes, mime) =
        file.ok_or_else(|| AppError::BadRequest("Missing 'file' part".to_string()))?;
    let quiz_type =
        quiz_type.ok_or_else(|| AppError::BadRequest("Missing 'quiz_type' part".to_string()))?;
    let num_questions = num_questions
        .ok_or_else(|| AppError::BadRequest("Missing 'num_questions' part".to_string()))?;

    let text = extract_text(&bytes, &mime)?;
    tracing::info!("Extracted {} characters from uploaded {}", text.len(), mime);

    generate_and_store(&state, claims.user_id(), &text, quiz_type, num_questions, model).await
}

async fn read_text_field(
    field: axum::extract::multipart::Field<'_>,
) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart field: {}", e)))
}

fn mime_from_extension(file_name: &str) -> Option<String> {
    let ext = std::path::Path::new(file_name).extension()?.to_str()?;
    match ext.to_ascii_lowercase().as_str() {
        "pdf" => Some(extract::PDF_MIME.to_string()),
        "docx" => Some(extract::DOCX_MIME.to_string()),
        "txt" => Some(extract::TXT_MIME.to_string()),
        _ => None,
    }
}

/// Shared tail of both generation paths: call the requester, parse MCQ output
/// into an interactive session, and replace the user's active quiz.
///
/// A failed generation returns before the store is touched, so the previous
/// quiz (if any) survives.
async fn generate_and_store(
    state: &AppState,
    user_id: i64,
    text: &str,
    quiz_type: QuizType,
    num_questions: u8,
    model: ModelChoice,
) -> Result<Json<serde_json::Value>, AppError> {
    if !(MIN_QUESTION_COUNT..=MAX_QUESTION_COUNT).contains(&num_questions) {
        return Err(AppError::BadRequest(format!(
            "Number of questions must be between {} and {}",
            MIN_QUESTION_COUNT, MAX_QUESTION_COUNT
        )));
    }

    tracing::info!(
        "Generating {} {} questions for user {}",
        num_questions,
        quiz_type.label(),
        user_id
    );

    let raw = state
        .requester
        .request_quiz(text, quiz_type, num_questions, model)
        .await?;

    let session = match quiz_type {
        QuizType::Mcq => QuizSession::new(RegexQuizParser.parse(&raw)),
        _ => None,
    };
    let interactive = session.is_some();
    let total_questions = session.as_ref().map(QuizSession::len).unwrap_or(0);

    state.quizzes.lock().await.insert(
        user_id,
        ActiveQuiz {
            raw_text: raw.clone(),
            quiz_type,
            model,
            session,
        },
    );

    Ok(Json(json!({
        "quiz_type": quiz_type,
        "model": model.model_id(),
        "interactive": interactive,
        "total_questions": total_questions,
        "raw_text": clean_html(&raw),
    })))
}

/// Downloads the raw generated quiz as a text file.
pub async fn export_txt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let quizzes = state.quizzes.lock().await;
    let active = quizzes
        .get(&claims.user_id())
        .ok_or_else(|| AppError::NotFound("No generated quiz to export".to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"generated_quiz.txt\"",
            ),
        ],
        active.raw_text.clone(),
    ))
}

/// Downloads the parsed MCQ quiz as a CSV table.
pub async fn export_csv(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let quizzes = state.quizzes.lock().await;
    let active = quizzes
        .get(&claims.user_id())
        .ok_or_else(|| AppError::NotFound("No generated quiz to export".to_string()))?;

    if active.quiz_type != QuizType::Mcq {
        return Err(AppError::BadRequest(
            "CSV export is only available for MCQ quizzes".to_string(),
        ));
    }

    let session = active.session.as_ref().ok_or_else(|| {
        AppError::BadRequest("Could not convert quiz to CSV format".to_string())
    })?;

    let body = questions_to_csv(session.questions())?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"generated_quiz.csv\"",
            ),
        ],
        body,
    ))
}

fn questions_to_csv(questions: &[QuestionRecord]) -> Result<String, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record([
            "Question",
            "Option A",
            "Option B",
            "Option C",
            "Option D",
            "Correct Answer",
        ])
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    for q in questions {
        let option = |letter: char| q.options.get(&letter).map(String::as_str).unwrap_or("");
        let correct = q.correct_answer.to_string();
        writer
            .write_record([
                q.prompt.as_str(),
                option('a'),
                option('b'),
                option('c'),
                option('d'),
                correct.as_str(),
            ])
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Retrieves the top high scores, one row per user.
pub async fn leaderboard(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    // Each aggregate is computed independently per user, so a row can mix
    // columns from different attempts when a user's best-percentage attempt
    // is not also their highest-raw-score attempt.
    let entries = sqlx::query_as::<_, LeaderboardEntry>(
        r#"
        SELECT
            u.username,
            MAX(s.score * 100.0 / s.total_questions) AS percentage,
            MAX(s.score) AS score,
            MAX(s.total_questions) AS total_questions,
            MAX(s.created_at) AS created_at,
            COUNT(s.id) AS attempts
        FROM scores s
        JOIN users u ON s.user_id = u.id
        GROUP BY u.username
        ORDER BY percentage DESC
        LIMIT ?
        "#,
    )
    .bind(LEADERBOARD_LIMIT)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch leaderboard: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(entries))
}
