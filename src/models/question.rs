// src/models/question.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Quiz formats the generator can be asked for.
/// Only MCQ output is parsed into structured questions; the other two are
/// kept as display text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizType {
    Mcq,
    TrueFalse,
    FillBlank,
}

impl QuizType {
    /// Parses the value of a multipart form field.
    pub fn from_param(value: &str) -> Option<Self> {
        match value {
            "mcq" => Some(QuizType::Mcq),
            "true_false" => Some(QuizType::TrueFalse),
            "fill_blank" => Some(QuizType::FillBlank),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QuizType::Mcq => "MCQ",
            QuizType::TrueFalse => "True/False",
            QuizType::FillBlank => "Fill-in-the-Blank",
        }
    }
}

/// One multiple-choice question extracted from the generated quiz text.
/// Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    /// 1-based number captured from the "Q<N>." line.
    pub index: u32,

    pub prompt: String,

    /// Option text keyed by letter. Keys are exactly 'a'..='d'.
    pub options: BTreeMap<char, String>,

    /// Lowercased correct option letter.
    pub correct_answer: char,
}

/// Client-facing view of a question (correct answer withheld).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub index: u32,
    pub prompt: String,
    pub options: BTreeMap<char, String>,
}

impl From<&QuestionRecord> for PublicQuestion {
    fn from(q: &QuestionRecord) -> Self {
        PublicQuestion {
            index: q.index,
            prompt: q.prompt.clone(),
            options: q.options.clone(),
        }
    }
}
