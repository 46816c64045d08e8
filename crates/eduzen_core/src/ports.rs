//! crates/eduzen_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the Google Cloud services that back them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{ChatMessage, QuizQuestion, SentimentScore, StudySession, UploadedMedia};

//=========================================================================================
// Port Error and Result Types
//=========================================================================================

/// The failure taxonomy for all port operations.
///
/// `NoTextDetected` and `SentimentUnavailable` are soft failures: callers
/// degrade gracefully instead of aborting. Everything else halts the stage
/// that raised it while leaving upstream results intact.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PortError {
    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),
    #[error("Unsupported media kind: {0}")]
    UnsupportedMediaKind(String),
    #[error("Failed to ingest media: {0}")]
    IngestionFailed(String),
    #[error("Text extraction failed: {0}")]
    ExtractionFailed(String),
    #[error("No text was detected in the uploaded image")]
    NoTextDetected,
    #[error("Content generation failed: {0}")]
    GenerationFailed(String),
    #[error("Generated quiz data was malformed: {0}")]
    MalformedQuizData(String),
    #[error("Sentiment analysis unavailable: {0}")]
    SentimentUnavailable(String),
    #[error("Export failed: {0}")]
    ExportFailed(String),
    #[error("Authentication with the external service failed")]
    AuthenticationFailed,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// A short-lived OAuth access token for the user's Google account. Passed
/// explicitly to every export call instead of living in ambient global state.
#[derive(Debug, Clone)]
pub struct GoogleAccess {
    pub access_token: String,
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait MediaStorageService: Send + Sync {
    /// Persists the uploaded image bytes to blob storage and returns a
    /// durable reference. Non-image input fails with `UnsupportedMediaKind`
    /// before any network call; a failed write is `IngestionFailed`.
    async fn store(
        &self,
        bytes: &[u8],
        original_name: &str,
        content_type: &str,
    ) -> PortResult<UploadedMedia>;
}

#[async_trait]
pub trait TextExtractionService: Send + Sync {
    /// Runs OCR over the raw image bytes. An image with no detectable text
    /// yields `Ok("")` — success, not failure. Transport or non-2xx
    /// responses are `ExtractionFailed`.
    async fn extract(&self, image_bytes: &[u8]) -> PortResult<String>;
}

#[async_trait]
pub trait SummarizationService: Send + Sync {
    /// Summarizes extracted note text into key points with a single fixed
    /// prompt. Zero candidates or a non-2xx status is `GenerationFailed`.
    async fn summarize(&self, text: &str) -> PortResult<String>;
}

#[async_trait]
pub trait QuizGenerationService: Send + Sync {
    /// Generates a multiple-choice quiz from extracted note text. The
    /// endpoint returns free text with no schema guarantee, so response
    /// text that fails to parse as the expected structure is the
    /// recoverable `MalformedQuizData`.
    async fn generate_quiz(&self, text: &str) -> PortResult<Vec<QuizQuestion>>;
}

#[async_trait]
pub trait ConversationService: Send + Sync {
    /// Generates the assistant's reply to the latest user message.
    /// `history` is the transcript so far; whether it is replayed to the
    /// endpoint is an explicit adapter configuration choice (stateless by
    /// default — the endpoint has no memory of prior turns).
    async fn reply(&self, user_text: &str, history: &[ChatMessage]) -> PortResult<String>;
}

#[async_trait]
pub trait SentimentService: Send + Sync {
    /// Scores the valence of a chat message. Advisory only: callers degrade
    /// a `SentimentUnavailable` failure to `SentimentScore::neutral()`
    /// rather than blocking the chat turn.
    async fn score(&self, text: &str) -> PortResult<SentimentScore>;
}

#[async_trait]
pub trait SessionStoreService: Send + Sync {
    /// Appends a completed study session to the external document store and
    /// returns the created record's id. Records are never mutated or
    /// deleted by this system once submitted.
    async fn append_session(&self, session: &StudySession) -> PortResult<String>;
}

#[async_trait]
pub trait StudyExportService: Send + Sync {
    /// Creates an external document containing the summary text and returns
    /// its id.
    async fn export_summary_doc(
        &self,
        title: &str,
        content: &str,
        access: &GoogleAccess,
    ) -> PortResult<String>;

    /// Creates an external form with one required multiple-choice item per
    /// quiz question and returns the form id.
    async fn create_quiz_form(
        &self,
        title: &str,
        questions: &[QuizQuestion],
        access: &GoogleAccess,
    ) -> PortResult<String>;

    /// Schedules a study or break event on the user's primary calendar and
    /// returns the event id.
    async fn schedule_event(
        &self,
        summary: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        access: &GoogleAccess,
    ) -> PortResult<String>;
}
