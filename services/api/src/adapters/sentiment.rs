//! services/api/src/adapters/sentiment.rs
//!
//! This module contains the adapter for the Cloud Natural Language
//! sentiment endpoint. It implements the `SentimentService` port from the
//! `core` crate.

use async_trait::async_trait;
use eduzen_core::domain::SentimentScore;
use eduzen_core::ports::{PortError, PortResult, SentimentService};
use serde::Deserialize;
use tracing::warn;

const API_ENDPOINT: &str = "https://language.googleapis.com/v1/documents:analyzeSentiment";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `SentimentService` port using the Cloud
/// Natural Language `analyzeSentiment` API.
///
/// The API key is optional: when it is absent every call fails with
/// `MissingConfiguration`, which callers degrade to a neutral score. Scoring
/// is advisory and must never block a chat turn.
#[derive(Clone)]
pub struct GoogleSentimentAdapter {
    http: reqwest::Client,
    api_key: Option<String>,
}

impl GoogleSentimentAdapter {
    /// Creates a new `GoogleSentimentAdapter`.
    pub fn new(http: reqwest::Client, api_key: Option<String>) -> Self {
        Self { http, api_key }
    }
}

#[derive(Deserialize)]
struct AnalyzeSentimentResponse {
    #[serde(rename = "documentSentiment")]
    document_sentiment: Option<DocumentSentiment>,
}

#[derive(Deserialize)]
struct DocumentSentiment {
    #[serde(default)]
    score: f32,
    #[serde(default)]
    magnitude: f32,
}

//=========================================================================================
// `SentimentService` Trait Implementation
//=========================================================================================

#[async_trait]
impl SentimentService for GoogleSentimentAdapter {
    async fn score(&self, text: &str) -> PortResult<SentimentScore> {
        if text.trim().is_empty() {
            return Ok(SentimentScore::neutral());
        }

        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| PortError::MissingConfiguration("LANGUAGE_API_KEY".to_string()))?;

        let url = format!("{}?key={}", API_ENDPOINT, api_key);
        let body = serde_json::json!({
            "document": { "content": text, "type": "PLAIN_TEXT" },
            "encodingType": "UTF8",
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PortError::SentimentUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Sentiment endpoint returned {}: {}", status, body);
            return Err(PortError::SentimentUnavailable(format!(
                "endpoint returned {}",
                status
            )));
        }

        let parsed: AnalyzeSentimentResponse = response
            .json()
            .await
            .map_err(|e| PortError::SentimentUnavailable(e.to_string()))?;

        let sentiment = parsed.document_sentiment.ok_or_else(|| {
            PortError::SentimentUnavailable("response carried no documentSentiment".to_string())
        })?;

        Ok(SentimentScore {
            score: sentiment.score,
            magnitude: sentiment.magnitude,
        })
    }
}
