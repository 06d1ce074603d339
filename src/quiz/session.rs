// src/quiz/session.rs

use std::collections::HashMap;
use std::fmt;

use crate::models::question::QuestionRecord;

/// Rejected state-machine transitions. Surfaced to clients as 400s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    AlreadySubmitted,
    AtFirstQuestion,
    AtLastQuestion,
    NotAtLastQuestion,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            SessionError::AlreadySubmitted => "Quiz has already been submitted",
            SessionError::AtFirstQuestion => "Already at the first question",
            SessionError::AtLastQuestion => "Already at the last question",
            SessionError::NotAtLastQuestion => "All questions must be visited before submitting",
        };
        f.write_str(msg)
    }
}

/// Drives one user through a parsed MCQ quiz, one question at a time.
///
/// Two logical states: answering (with a cursor into `questions`) and
/// submitted. After submission the session is read-only; discarding it is the
/// only way forward.
#[derive(Debug, Clone)]
pub struct QuizSession {
    questions: Vec<QuestionRecord>,
    current: usize,
    answers: HashMap<usize, char>,
    score: u32,
    explanations: HashMap<usize, String>,
    completed: bool,
}

impl QuizSession {
    /// Returns `None` for an empty question list; callers treat that as
    /// "no interactive quiz available".
    pub fn new(questions: Vec<QuestionRecord>) -> Option<Self> {
        if questions.is_empty() {
            return None;
        }
        Some(Self {
            questions,
            current: 0,
            answers: HashMap::new(),
            score: 0,
            explanations: HashMap::new(),
            completed: false,
        })
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn questions(&self) -> &[QuestionRecord] {
        &self.questions
    }

    pub fn current_question(&self) -> &QuestionRecord {
        &self.questions[self.current]
    }

    /// The answer previously selected for the given question index, if any.
    /// Used to pre-select the option when a question is re-rendered.
    pub fn answer_for(&self, index: usize) -> Option<char> {
        self.answers.get(&index).copied()
    }

    pub fn explanation_for(&self, index: usize) -> Option<&str> {
        self.explanations.get(&index).map(String::as_str)
    }

    /// Records (or overwrites) the answer for the current question. The
    /// cursor does not move. Letters are normalized to lowercase; values
    /// outside the option set are stored as-is and simply never match the
    /// correct answer.
    pub fn select_answer(&mut self, letter: char) -> Result<(), SessionError> {
        if self.completed {
            return Err(SessionError::AlreadySubmitted);
        }
        self.answers.insert(self.current, letter.to_ascii_lowercase());
        Ok(())
    }

    pub fn next(&mut self) -> Result<(), SessionError> {
        if self.completed {
            return Err(SessionError::AlreadySubmitted);
        }
        if self.current + 1 >= self.questions.len() {
            return Err(SessionError::AtLastQuestion);
        }
        self.current += 1;
        Ok(())
    }

    pub fn previous(&mut self) -> Result<(), SessionError> {
        if self.completed {
            return Err(SessionError::AlreadySubmitted);
        }
        if self.current == 0 {
            return Err(SessionError::AtFirstQuestion);
        }
        self.current -= 1;
        Ok(())
    }

    /// Finalizes the quiz. Only valid on the last question. The score is the
    /// number of indices whose stored answer equals the correct letter;
    /// unanswered questions never count.
    pub fn submit(&mut self) -> Result<u32, SessionError> {
        if self.completed {
            return Err(SessionError::AlreadySubmitted);
        }
        if self.current != self.questions.len() - 1 {
            return Err(SessionError::NotAtLastQuestion);
        }

        self.score = self
            .questions
            .iter()
            .enumerate()
            .filter(|(i, q)| self.answers.get(i) == Some(&q.correct_answer))
            .count() as u32;
        self.completed = true;

        Ok(self.score)
    }

    /// Stores the explanation fetched for one question after submission.
    pub fn store_explanation(&mut self, index: usize, text: String) {
        self.explanations.insert(index, text);
    }
}
