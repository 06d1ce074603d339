// src/services/ai.rs

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::{
    error::AppError,
    models::question::{QuestionRecord, QuizType},
};

/// Model choices offered in the UI, mapped to hosted model identifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelChoice {
    #[default]
    Llama3_70b,
    Mixtral8x7b,
    Llama3_8b,
}

impl ModelChoice {
    pub fn model_id(&self) -> &'static str {
        match self {
            ModelChoice::Llama3_70b => "llama3-70b-8192",
            ModelChoice::Mixtral8x7b => "mixtral-8x7b-32768",
            ModelChoice::Llama3_8b => "llama3-8b-8192",
        }
    }

    /// Parses the value of a multipart form field.
    pub fn from_param(value: &str) -> Option<Self> {
        match value {
            "llama3_70b" => Some(ModelChoice::Llama3_70b),
            "mixtral8x7b" => Some(ModelChoice::Mixtral8x7b),
            "llama3_8b" => Some(ModelChoice::Llama3_8b),
            _ => None,
        }
    }
}

/// Issues quiz-generation and explanation requests against a hosted
/// inference API. Implementations must be swappable so tests can stub the
/// network out.
#[async_trait]
pub trait QuizRequester: Send + Sync {
    /// Asks the model for `num_questions` questions of the given type over
    /// `source_text`. Returns the raw completion text.
    async fn request_quiz(
        &self,
        source_text: &str,
        quiz_type: QuizType,
        num_questions: u8,
        model: ModelChoice,
    ) -> Result<String, AppError>;

    /// Asks the model to explain why the recorded answer of `question` is
    /// correct.
    async fn request_explanation(&self, question: &QuestionRecord) -> Result<String, AppError>;
}

/// Client for the Groq chat-completions endpoint (OpenAI wire format).
#[derive(Clone)]
pub struct GroqClient {
    client: Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl GroqClient {
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url,
            timeout,
        }
    }

    async fn chat(&self, model: &str, prompt: String) -> Result<String, AppError> {
        let payload = serde_json::json!({
            "model": model,
            "messages": [
                {"role": "user", "content": prompt}
            ],
            "temperature": 0.2,
        });

        let res = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| AppError::GenerationFailed(format!("Inference request failed: {}", e)))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(AppError::GenerationFailed(format!(
                "Inference API error {}: {}",
                status, text
            )));
        }

        let body: JsonValue = res
            .json()
            .await
            .map_err(|e| AppError::GenerationFailed(format!("Invalid inference response: {}", e)))?;

        body.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(|s| s.trim().to_string())
            .ok_or_else(|| {
                AppError::GenerationFailed("Inference response carried no content".to_string())
            })
    }
}

#[async_trait]
impl QuizRequester for GroqClient {
    async fn request_quiz(
        &self,
        source_text: &str,
        quiz_type: QuizType,
        num_questions: u8,
        model: ModelChoice,
    ) -> Result<String, AppError> {
        let prompt = quiz_prompt(source_text, quiz_type, num_questions);
        self.chat(model.model_id(), prompt).await
    }

    async fn request_explanation(&self, question: &QuestionRecord) -> Result<String, AppError> {
        let prompt = explanation_prompt(question);
        self.chat(ModelChoice::default().model_id(), prompt).await
    }
}

/// Builds the generation prompt for one quiz type. The formats here are what
/// the MCQ parser expects back.
pub fn quiz_prompt(text: &str, quiz_type: QuizType, num_questions: u8) -> String {
    match quiz_type {
        QuizType::Mcq => format!(
            "Using the following syllabus content, generate {num_questions} multiple-choice questions (MCQs) with 4 options each (a, b, c, d) and specify the correct answer.\n\
             Each question should be relevant to the content and formatted as follows:\n\n\
             Q1. [Question]\n\
             a) [Option 1]\n\
             b) [Option 2]\n\
             c) [Option 3]\n\
             d) [Option 4]\n\
             Answer: [Correct option letter]\n\n\
             Syllabus Content:\n{text}"
        ),
        QuizType::TrueFalse => format!(
            "Using the following syllabus content, generate {num_questions} true/false questions.\n\
             Each question should be relevant to the content and formatted as follows:\n\n\
             Q1. [Statement]\n\
             Answer: [True/False]\n\n\
             Syllabus Content:\n{text}"
        ),
        QuizType::FillBlank => format!(
            "Using the following syllabus content, generate exactly {num_questions} fill-in-the-blank questions.\n\
             Each question should be relevant to the content and formatted as follows:\n\n\
             Q[number]. [Sentence with ____ for the blank]\n\
             Answer: [Correct word/phrase]\n\n\
             Where [number] is the question number starting from 1 up to {num_questions}.\n\
             Ensure that all {num_questions} questions are generated and included in the output.\n\n\
             Syllabus Content:\n{text}"
        ),
    }
}

/// Builds the post-submission explanation prompt for one question.
pub fn explanation_prompt(question: &QuestionRecord) -> String {
    let options = question
        .options
        .iter()
        .map(|(letter, text)| format!("{}) {}", letter, text))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Explain in two or three sentences why option {answer}) is the correct answer to the \
         following multiple-choice question. Do not restate the question.\n\n\
         Question: {prompt}\n{options}\nCorrect answer: {answer}",
        answer = question.correct_answer,
        prompt = question.prompt,
    )
}
