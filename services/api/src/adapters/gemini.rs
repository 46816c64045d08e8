//! services/api/src/adapters/gemini.rs
//!
//! Shared client for the Gemini generative-language REST endpoint. The
//! summarization, quiz, and chat adapters all speak through this.

use eduzen_core::ports::{PortError, PortResult};
use serde::Deserialize;
use tracing::error;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// One conversational turn forwarded to the endpoint.
#[derive(Debug, Clone)]
pub struct GeminiTurn {
    pub role: &'static str,
    pub text: String,
}

impl GeminiTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user",
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: "model",
            text: text.into(),
        }
    }
}

//=========================================================================================
// The Shared Client
//=========================================================================================

/// A thin client over the `generateContent` endpoint. The API key travels
/// as a URL query parameter, not a header.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GeminiClient {
    pub fn new(http: reqwest::Client, api_key: String, model: String) -> Self {
        Self {
            http,
            api_key,
            model,
        }
    }

    /// Sends one `generateContent` request and returns the first candidate's
    /// text. `json_output` sets `responseMimeType` so the endpoint emits
    /// valid JSON instead of prose.
    pub async fn generate(
        &self,
        system_instruction: &str,
        turns: &[GeminiTurn],
        json_output: bool,
    ) -> PortResult<String> {
        let url = format!(
            "{}/{}:generateContent?key={}",
            API_BASE, self.model, self.api_key
        );

        let contents: Vec<_> = turns
            .iter()
            .map(|t| {
                serde_json::json!({
                    "role": t.role,
                    "parts": [{ "text": t.text }]
                })
            })
            .collect();

        let mut generation_config = serde_json::json!({
            "temperature": 0.7,
            "maxOutputTokens": 2048,
        });
        if json_output {
            generation_config["responseMimeType"] =
                serde_json::Value::String("application/json".to_string());
        }

        let body = serde_json::json!({
            "contents": contents,
            "systemInstruction": { "parts": [{ "text": system_instruction }] },
            "generationConfig": generation_config,
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PortError::GenerationFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            // The full body goes to the log, never to the user.
            let body = response.text().await.unwrap_or_default();
            error!("Gemini endpoint returned {}: {}", status, body);
            return Err(PortError::GenerationFailed(format!(
                "endpoint returned {}",
                status
            )));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| PortError::GenerationFailed(e.to_string()))?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| {
                PortError::GenerationFailed("endpoint returned no candidates".to_string())
            })
    }
}
