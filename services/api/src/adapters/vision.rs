//! services/api/src/adapters/vision.rs
//!
//! This module contains the adapter for the Cloud Vision OCR endpoint.
//! It implements the `TextExtractionService` port from the `core` crate.

use async_trait::async_trait;
use base64::Engine;
use eduzen_core::ports::{PortError, PortResult, TextExtractionService};
use serde::Deserialize;
use tracing::error;

const API_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `TextExtractionService` port using the
/// Cloud Vision `images:annotate` API.
#[derive(Clone)]
pub struct GoogleVisionAdapter {
    http: reqwest::Client,
    api_key: String,
}

impl GoogleVisionAdapter {
    /// Creates a new `GoogleVisionAdapter`.
    pub fn new(http: reqwest::Client, api_key: String) -> Self {
        Self { http, api_key }
    }
}

#[derive(Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Deserialize)]
struct AnnotateImageResponse {
    #[serde(rename = "textAnnotations", default)]
    text_annotations: Vec<TextAnnotation>,
    error: Option<ImageError>,
}

#[derive(Deserialize)]
struct TextAnnotation {
    #[serde(default)]
    description: String,
}

#[derive(Deserialize)]
struct ImageError {
    #[serde(default)]
    message: String,
}

//=========================================================================================
// `TextExtractionService` Trait Implementation
//=========================================================================================

#[async_trait]
impl TextExtractionService for GoogleVisionAdapter {
    /// Sends the image inline as base64 with a TEXT_DETECTION feature
    /// request. The first annotation carries the full extracted text; zero
    /// annotations means the image held no detectable text, which is a
    /// successful extraction of nothing.
    async fn extract(&self, image_bytes: &[u8]) -> PortResult<String> {
        let content = base64::engine::general_purpose::STANDARD.encode(image_bytes);
        let url = format!("{}?key={}", API_ENDPOINT, self.api_key);

        let body = serde_json::json!({
            "requests": [{
                "image": { "content": content },
                "features": [{ "type": "TEXT_DETECTION" }],
            }],
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PortError::ExtractionFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Vision endpoint returned {}: {}", status, body);
            return Err(PortError::ExtractionFailed(format!(
                "endpoint returned {}",
                status
            )));
        }

        let parsed: AnnotateResponse = response
            .json()
            .await
            .map_err(|e| PortError::ExtractionFailed(e.to_string()))?;

        let first = parsed.responses.into_iter().next().ok_or_else(|| {
            PortError::ExtractionFailed("endpoint returned no responses".to_string())
        })?;

        // A per-image error arrives inside a 200 response.
        if let Some(image_error) = first.error {
            return Err(PortError::ExtractionFailed(image_error.message));
        }

        Ok(first
            .text_annotations
            .into_iter()
            .next()
            .map(|a| a.description)
            .unwrap_or_default())
    }
}
