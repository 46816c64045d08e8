//! services/api/src/adapters/summary_llm.rs
//!
//! This module contains the adapter for the summarizing LLM.
//! It implements the `SummarizationService` port from the `core` crate.

const SYSTEM_INSTRUCTIONS: &str = "You are a study companion summarizing a student's notes. \
Respond in plain text format without using markdown symbols like asterisks (**) for emphasis. \
Produce a short list of key points, one per line, that captures the essential ideas of the text.";

use crate::adapters::gemini::{GeminiClient, GeminiTurn};
use async_trait::async_trait;
use eduzen_core::ports::{PortError, PortResult, SummarizationService};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `SummarizationService` using the Gemini endpoint.
#[derive(Clone)]
pub struct GeminiSummaryAdapter {
    client: GeminiClient,
    input_cap: usize,
}

impl GeminiSummaryAdapter {
    /// Creates a new `GeminiSummaryAdapter`. `input_cap` bounds the number
    /// of characters forwarded to the endpoint in a single request.
    pub fn new(client: GeminiClient, input_cap: usize) -> Self {
        Self { client, input_cap }
    }
}

//=========================================================================================
// `SummarizationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl SummarizationService for GeminiSummaryAdapter {
    /// Summarizes the extracted note text into key points.
    async fn summarize(&self, text: &str) -> PortResult<String> {
        // The endpoint has its own context limit; anything past the cap is
        // rejected up front instead of being silently truncated remotely.
        let chars = text.chars().count();
        if chars > self.input_cap {
            return Err(PortError::GenerationFailed(format!(
                "input of {} characters exceeds the {}-character summarization limit",
                chars, self.input_cap
            )));
        }

        let prompt = format!(
            "Please summarize the following text into key points:\n\n{}",
            text
        );

        let summary = self
            .client
            .generate(SYSTEM_INSTRUCTIONS, &[GeminiTurn::user(prompt)], false)
            .await?;

        Ok(summary.trim().to_string())
    }
}
