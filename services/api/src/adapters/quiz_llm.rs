//! services/api/src/adapters/quiz_llm.rs
//!
//! This module contains the adapter for the quiz-generating LLM.
//! It implements the `QuizGenerationService` port from the `core` crate.
//!
//! The endpoint returns free text with no schema guarantee, so everything it
//! sends back is treated as untrusted input: parsed defensively and shape-
//! validated before a single question leaves this module.

const SYSTEM_INSTRUCTIONS: &str = r#"You are a study companion generating a practice quiz from a student's notes.
Respond with ONLY a JSON array, no prose and no code fences. Each element must be an object with:
- "question": the question text
- "options": an array of exactly 4 answer strings
- "correct_answer": the 0-based index of the correct option
Every question must be answerable from the provided text alone."#;

use crate::adapters::gemini::{GeminiClient, GeminiTurn};
use async_trait::async_trait;
use eduzen_core::domain::{quiz_is_well_formed, QuizQuestion};
use eduzen_core::ports::{PortError, PortResult, QuizGenerationService};
use serde::Deserialize;

/// The JSON shape the prompt asks the endpoint to produce.
#[derive(Deserialize)]
struct QuizQuestionDto {
    question: String,
    options: Vec<String>,
    correct_answer: usize,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `QuizGenerationService` using the Gemini endpoint.
#[derive(Clone)]
pub struct GeminiQuizAdapter {
    client: GeminiClient,
    question_count: usize,
}

impl GeminiQuizAdapter {
    /// Creates a new `GeminiQuizAdapter` that asks for `question_count`
    /// questions per quiz.
    pub fn new(client: GeminiClient, question_count: usize) -> Self {
        Self {
            client,
            question_count,
        }
    }
}

//=========================================================================================
// `QuizGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl QuizGenerationService for GeminiQuizAdapter {
    async fn generate_quiz(&self, text: &str) -> PortResult<Vec<QuizQuestion>> {
        let prompt = format!(
            "Please create a quiz of {} multiple choice questions based on this text:\n\n{}",
            self.question_count, text
        );

        let raw = self
            .client
            .generate(SYSTEM_INSTRUCTIONS, &[GeminiTurn::user(prompt)], true)
            .await?;

        parse_quiz(&raw)
    }
}

//=========================================================================================
// Defensive Parsing
//=========================================================================================

/// Parses the endpoint's response text into validated quiz questions. Any
/// shape violation is the recoverable `MalformedQuizData`, never a panic and
/// never an invalid structure handed onward.
fn parse_quiz(raw: &str) -> PortResult<Vec<QuizQuestion>> {
    let stripped = strip_code_fences(raw);

    let dtos: Vec<QuizQuestionDto> = serde_json::from_str(stripped)
        .map_err(|e| PortError::MalformedQuizData(e.to_string()))?;

    let questions: Vec<QuizQuestion> = dtos
        .into_iter()
        .map(|dto| QuizQuestion {
            prompt: dto.question,
            options: dto.options,
            correct_index: dto.correct_answer,
        })
        .collect();

    if !quiz_is_well_formed(&questions) {
        return Err(PortError::MalformedQuizData(
            "response did not contain at least one question with 4 options and an in-range answer index"
                .to_string(),
        ));
    }

    Ok(questions)
}

/// The endpoint sometimes wraps its JSON in a markdown code fence despite
/// being asked not to.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    let inner = inner.trim_end();
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    const WELL_FORMED: &str = r#"[{
        "question": "What does photosynthesis convert light into?",
        "options": ["Energy", "Water", "Soil", "Oxygen"],
        "correct_answer": 0
    }]"#;

    #[test]
    fn parses_a_plain_json_array() {
        let quiz = parse_quiz(WELL_FORMED).unwrap();
        assert_eq!(quiz.len(), 1);
        assert_eq!(quiz[0].correct_index, 0);
        assert_eq!(quiz[0].options.len(), 4);
    }

    #[test]
    fn parses_a_fenced_json_array() {
        let fenced = format!("```json\n{}\n```", WELL_FORMED);
        let quiz = parse_quiz(&fenced).unwrap();
        assert_eq!(quiz.len(), 1);
    }

    #[test]
    fn rejects_an_out_of_range_answer_index() {
        let raw = r#"[{
            "question": "Q?",
            "options": ["a", "b", "c", "d"],
            "correct_answer": 4
        }]"#;
        let err = parse_quiz(raw).unwrap_err();
        assert!(matches!(err, PortError::MalformedQuizData(_)));
    }

    #[test]
    fn rejects_the_wrong_option_count() {
        let raw = r#"[{
            "question": "Q?",
            "options": ["a", "b", "c"],
            "correct_answer": 0
        }]"#;
        let err = parse_quiz(raw).unwrap_err();
        assert!(matches!(err, PortError::MalformedQuizData(_)));
    }

    #[test]
    fn rejects_prose_instead_of_json() {
        let err = parse_quiz("Here is your quiz! 1. What is...").unwrap_err();
        assert!(matches!(err, PortError::MalformedQuizData(_)));
    }

    #[test]
    fn rejects_an_empty_array() {
        let err = parse_quiz("[]").unwrap_err();
        assert!(matches!(err, PortError::MalformedQuizData(_)));
    }
}
