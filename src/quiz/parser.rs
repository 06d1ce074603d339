// src/quiz/parser.rs

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::question::QuestionRecord;

/// One MCQ block in the generated text: a "Q<N>." line, four option lines
/// and an "Answer:" line. Matched across the whole text in dot-matches-newline
/// mode so question bodies and options may span lines.
static MCQ_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)Q(\d+)\.\s*(.*?)\s*a\)\s*(.*?)\s*b\)\s*(.*?)\s*c\)\s*(.*?)\s*d\)\s*(.*?)\s*Answer:\s*(\w)",
    )
    .expect("MCQ block pattern must compile")
});

/// Extracts structured questions from one raw LLM reply.
///
/// The matching strategy is an implementation detail behind this trait, so it
/// can be swapped (grammar, structured-output request) without touching
/// callers.
pub trait QuizParser: Send + Sync {
    /// Returns the questions found in `raw`, in source order. Blocks that do
    /// not match the expected shape are skipped; an empty result means the
    /// caller should fall back to displaying the raw text.
    fn parse(&self, raw: &str) -> Vec<QuestionRecord>;
}

/// Regex-based parser for the "Q1. / a)..d) / Answer: x" format the quiz
/// prompts ask the model to produce.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexQuizParser;

impl QuizParser for RegexQuizParser {
    fn parse(&self, raw: &str) -> Vec<QuestionRecord> {
        MCQ_BLOCK
            .captures_iter(raw)
            .filter_map(|caps| {
                let index: u32 = caps[1].parse().ok()?;
                let answer = caps[7].to_lowercase().chars().next()?;
                if !('a'..='d').contains(&answer) {
                    return None;
                }

                let mut options = BTreeMap::new();
                for (group, letter) in [(3, 'a'), (4, 'b'), (5, 'c'), (6, 'd')] {
                    options.insert(letter, caps[group].trim().to_string());
                }

                Some(QuestionRecord {
                    index,
                    prompt: caps[2].trim().to_string(),
                    options,
                    correct_answer: answer,
                })
            })
            .collect()
    }
}
