// tests/quiz_flow_tests.rs

use std::sync::Arc;

use quizgen_backend::{
    config::Config,
    error::AppError,
    models::question::{QuestionRecord, QuizType},
    routes,
    services::ai::{ModelChoice, QuizRequester},
    state::AppState,
};
use sqlx::sqlite::SqlitePoolOptions;

/// Deterministic two-question MCQ quiz; answers are 'b' and 'c'.
const MCQ_TEXT: &str = "Q1. What is 2+2?\na) 3\nb) 4\nc) 5\nd) 6\nAnswer: b\n\n\
                        Q2. Sky color?\na) Red\nb) Green\nc) Blue\nd) Yellow\nAnswer: c";

/// Requester stub. Source text containing "FAIL" simulates an inference
/// outage; explanations fail for question 2 to exercise best-effort handling.
struct StubRequester;

#[async_trait::async_trait]
impl QuizRequester for StubRequester {
    async fn request_quiz(
        &self,
        source_text: &str,
        quiz_type: QuizType,
        _num_questions: u8,
        _model: ModelChoice,
    ) -> Result<String, AppError> {
        if source_text.contains("FAIL") {
            return Err(AppError::GenerationFailed("stubbed outage".to_string()));
        }
        match quiz_type {
            QuizType::Mcq => Ok(MCQ_TEXT.to_string()),
            _ => Ok("Q1. The sky is green.\nAnswer: False".to_string()),
        }
    }

    async fn request_explanation(&self, question: &QuestionRecord) -> Result<String, AppError> {
        if question.index == 2 {
            return Err(AppError::GenerationFailed("stubbed outage".to_string()));
        }
        Ok(format!("Option {} is correct.", question.correct_answer))
    }
}

async fn spawn_app() -> String {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "quiz_flow_test_secret".to_string(),
        jwt_expiration: 600,
        groq_api_key: "test-key".to_string(),
        groq_api_base: "http://127.0.0.1:9".to_string(),
        generation_timeout_secs: 5,
        rust_log: "error".to_string(),
    };

    let state = AppState::new(pool, config, Arc::new(StubRequester));
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

/// Registers a fresh user and returns (username, bearer token).
async fn register_and_login(client: &reqwest::Client, address: &str) -> (String, String) {
    let username = format!("u_{}", &uuid::Uuid::new_v4().to_string()[..8]);
    let password = "password123";

    client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "username": username,
            "password": password,
            "confirm_password": password
        }))
        .send()
        .await
        .expect("Register failed");

    let login: serde_json::Value = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({
            "username": username,
            "password": password
        }))
        .send()
        .await
        .expect("Login failed")
        .json()
        .await
        .expect("Failed to parse login json");

    let token = login["token"].as_str().expect("Token not found").to_string();
    (username, token)
}

async fn generate_mcq(client: &reqwest::Client, address: &str, token: &str) -> serde_json::Value {
    let response = client
        .post(format!("{}/api/quiz/generate", address))
        .bearer_auth(token)
        .json(&serde_json::json!({
            "text": "Week 1: arithmetic. Week 2: the atmosphere.",
            "quiz_type": "mcq",
            "num_questions": 2
        }))
        .send()
        .await
        .expect("Generate failed");
    assert_eq!(response.status().as_u16(), 200);
    response.json().await.expect("Failed to parse generate json")
}

/// Walks an already generated two-question quiz to submission and returns the
/// submit response.
async fn run_quiz(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    answers: [char; 2],
) -> serde_json::Value {
    for (i, answer) in answers.iter().enumerate() {
        let response = client
            .post(format!("{}/api/quiz/session/answer", address))
            .bearer_auth(token)
            .json(&serde_json::json!({ "answer": answer }))
            .send()
            .await
            .expect("Answer failed");
        assert_eq!(response.status().as_u16(), 200);

        if i == 0 {
            let response = client
                .post(format!("{}/api/quiz/session/next", address))
                .bearer_auth(token)
                .send()
                .await
                .expect("Next failed");
            assert_eq!(response.status().as_u16(), 200);
        }
    }

    let response = client
        .post(format!("{}/api/quiz/session/submit", address))
        .bearer_auth(token)
        .send()
        .await
        .expect("Submit failed");
    assert_eq!(response.status().as_u16(), 200);
    response.json().await.expect("Failed to parse submit json")
}

#[tokio::test]
async fn mcq_generation_creates_an_interactive_session() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, token) = register_and_login(&client, &address).await;

    let generated = generate_mcq(&client, &address, &token).await;
    assert_eq!(generated["interactive"], true);
    assert_eq!(generated["total_questions"], 2);
    assert_eq!(generated["quiz_type"], "mcq");

    let session: serde_json::Value = client
        .get(format!("{}/api/quiz/session", address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Fetch session failed")
        .json()
        .await
        .unwrap();

    assert_eq!(session["completed"], false);
    assert_eq!(session["index"], 0);
    assert_eq!(session["question"]["prompt"], "What is 2+2?");
    assert_eq!(session["question"]["options"]["b"], "4");
    assert!(session["selected"].is_null());
    // The correct answer must not leak into the client view.
    assert!(session["question"].get("correct_answer").is_none());
}

#[tokio::test]
async fn previous_restores_the_selected_answer() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, token) = register_and_login(&client, &address).await;
    generate_mcq(&client, &address, &token).await;

    client
        .post(format!("{}/api/quiz/session/answer", address))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "answer": "b" }))
        .send()
        .await
        .expect("Answer failed");

    client
        .post(format!("{}/api/quiz/session/next", address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Next failed");

    let back: serde_json::Value = client
        .post(format!("{}/api/quiz/session/previous", address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Previous failed")
        .json()
        .await
        .unwrap();

    assert_eq!(back["index"], 0);
    assert_eq!(back["selected"], "b");

    // Stepping past either end is rejected.
    let response = client
        .post(format!("{}/api/quiz/session/previous", address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Previous failed");
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn submit_scores_and_explains_best_effort() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (username, token) = register_and_login(&client, &address).await;
    generate_mcq(&client, &address, &token).await;

    // 'b' is correct for Q1; 'x' matches nothing.
    let submitted = run_quiz(&client, &address, &token, ['b', 'x']).await;
    assert_eq!(submitted["score"], 1);
    assert_eq!(submitted["total_questions"], 2);

    let results = submitted["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["correct"], true);
    assert_eq!(results[0]["explanation"], "Option b is correct.");
    assert_eq!(results[1]["correct"], false);
    // The stub fails Q2's explanation; scoring must survive with a placeholder.
    assert_eq!(results[1]["explanation"], "");

    // The summary stays readable after submission.
    let session: serde_json::Value = client
        .get(format!("{}/api/quiz/session", address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Fetch session failed")
        .json()
        .await
        .unwrap();
    assert_eq!(session["completed"], true);
    assert_eq!(session["score"], 1);

    // Exactly one score row was appended.
    let leaderboard: Vec<serde_json::Value> = client
        .get(format!("{}/api/quiz/leaderboard", address))
        .send()
        .await
        .expect("Leaderboard failed")
        .json()
        .await
        .unwrap();
    let row = leaderboard
        .iter()
        .find(|e| e["username"] == username.as_str())
        .expect("User missing from leaderboard");
    assert_eq!(row["attempts"], 1);
    assert_eq!(row["percentage"], 50.0);

    // A second submit is rejected; reset is the only way out.
    let response = client
        .post(format!("{}/api/quiz/session/submit", address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Submit failed");
    assert_eq!(response.status().as_u16(), 400);

    let response = client
        .post(format!("{}/api/quiz/session/reset", address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Reset failed");
    assert_eq!(response.status().as_u16(), 200);

    let response = client
        .get(format!("{}/api/quiz/session", address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Fetch session failed");
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn leaderboard_ranks_by_best_percentage() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // First user: 50% then 100%.
    let (high_scorer, token) = register_and_login(&client, &address).await;
    generate_mcq(&client, &address, &token).await;
    run_quiz(&client, &address, &token, ['b', 'x']).await;
    generate_mcq(&client, &address, &token).await;
    run_quiz(&client, &address, &token, ['b', 'c']).await;

    // Second user: one 50% attempt.
    let (low_scorer, token2) = register_and_login(&client, &address).await;
    generate_mcq(&client, &address, &token2).await;
    run_quiz(&client, &address, &token2, ['b', 'a']).await;

    let leaderboard: Vec<serde_json::Value> = client
        .get(format!("{}/api/quiz/leaderboard", address))
        .send()
        .await
        .expect("Leaderboard failed")
        .json()
        .await
        .unwrap();

    assert_eq!(leaderboard.len(), 2);
    assert_eq!(leaderboard[0]["username"], high_scorer.as_str());
    assert_eq!(leaderboard[0]["percentage"], 100.0);
    assert_eq!(leaderboard[0]["attempts"], 2);
    assert_eq!(leaderboard[1]["username"], low_scorer.as_str());
    assert_eq!(leaderboard[1]["percentage"], 50.0);
}

#[tokio::test]
async fn non_mcq_quiz_is_display_only() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, token) = register_and_login(&client, &address).await;

    let response = client
        .post(format!("{}/api/quiz/generate", address))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "text": "Week 1: the atmosphere.",
            "quiz_type": "true_false",
            "num_questions": 1
        }))
        .send()
        .await
        .expect("Generate failed");
    assert_eq!(response.status().as_u16(), 200);
    let generated: serde_json::Value = response.json().await.unwrap();
    assert_eq!(generated["interactive"], false);

    let response = client
        .get(format!("{}/api/quiz/session", address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Fetch session failed");
    assert_eq!(response.status().as_u16(), 404);

    // TXT export still works; CSV is MCQ-only.
    let response = client
        .get(format!("{}/api/quiz/export/txt", address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Export failed");
    assert_eq!(response.status().as_u16(), 200);

    let response = client
        .get(format!("{}/api/quiz/export/csv", address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Export failed");
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn exports_return_attachments() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, token) = register_and_login(&client, &address).await;
    generate_mcq(&client, &address, &token).await;

    let response = client
        .get(format!("{}/api/quiz/export/txt", address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Export failed");
    assert_eq!(response.status().as_u16(), 200);
    let disposition = response
        .headers()
        .get("content-disposition")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(disposition.contains("generated_quiz.txt"));
    let body = response.text().await.unwrap();
    assert!(body.contains("Q1. What is 2+2?"));

    let response = client
        .get(format!("{}/api/quiz/export/csv", address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Export failed");
    assert_eq!(response.status().as_u16(), 200);
    let body = response.text().await.unwrap();
    let mut lines = body.lines();
    assert_eq!(
        lines.next().unwrap(),
        "Question,Option A,Option B,Option C,Option D,Correct Answer"
    );
    assert_eq!(lines.next().unwrap(), "What is 2+2?,3,4,5,6,b");
}

#[tokio::test]
async fn failed_generation_keeps_the_previous_quiz() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, token) = register_and_login(&client, &address).await;
    generate_mcq(&client, &address, &token).await;

    let response = client
        .post(format!("{}/api/quiz/generate", address))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "text": "FAIL on purpose",
            "quiz_type": "mcq",
            "num_questions": 2
        }))
        .send()
        .await
        .expect("Generate failed");
    assert_eq!(response.status().as_u16(), 502);

    // The earlier quiz is untouched.
    let session: serde_json::Value = client
        .get(format!("{}/api/quiz/session", address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Fetch session failed")
        .json()
        .await
        .unwrap();
    assert_eq!(session["completed"], false);
    assert_eq!(session["total_questions"], 2);
}

#[tokio::test]
async fn blank_text_is_rejected() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, token) = register_and_login(&client, &address).await;

    let response = client
        .post(format!("{}/api/quiz/generate", address))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "text": "   ",
            "quiz_type": "mcq",
            "num_questions": 2
        }))
        .send()
        .await
        .expect("Generate failed");
    assert_eq!(response.status().as_u16(), 422);
}

#[tokio::test]
async fn question_count_is_bounded() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, token) = register_and_login(&client, &address).await;

    let response = client
        .post(format!("{}/api/quiz/generate", address))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "text": "Some content",
            "quiz_type": "mcq",
            "num_questions": 21
        }))
        .send()
        .await
        .expect("Generate failed");
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn upload_accepts_a_plain_text_file() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, token) = register_and_login(&client, &address).await;

    let file = reqwest::multipart::Part::bytes("Week 1: arithmetic.".as_bytes().to_vec())
        .file_name("syllabus.txt")
        .mime_str("text/plain")
        .unwrap();
    let form = reqwest::multipart::Form::new()
        .part("file", file)
        .text("quiz_type", "mcq")
        .text("num_questions", "2");

    let response = client
        .post(format!("{}/api/quiz/upload", address))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .expect("Upload failed");

    assert_eq!(response.status().as_u16(), 200);
    let generated: serde_json::Value = response.json().await.unwrap();
    assert_eq!(generated["interactive"], true);
    assert_eq!(generated["total_questions"], 2);
}

#[tokio::test]
async fn upload_rejects_unsupported_file_types() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, token) = register_and_login(&client, &address).await;

    let file = reqwest::multipart::Part::bytes(vec![0u8; 16])
        .file_name("syllabus.png")
        .mime_str("image/png")
        .unwrap();
    let form = reqwest::multipart::Form::new()
        .part("file", file)
        .text("quiz_type", "mcq")
        .text("num_questions", "2");

    let response = client
        .post(format!("{}/api/quiz/upload", address))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .expect("Upload failed");

    assert_eq!(response.status().as_u16(), 415);
}
