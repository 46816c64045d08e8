//! services/api/src/web/state.rs
//!
//! Defines the application's shared and chat-session states.

use crate::config::Config;
use eduzen_core::domain::ChatMessage;
use eduzen_core::pipeline::StudyPipeline;
use eduzen_core::ports::{
    ConversationService, MediaStorageService, QuizGenerationService, SentimentService,
    SessionStoreService, StudyExportService, SummarizationService, TextExtractionService,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub storage: Arc<dyn MediaStorageService>,
    pub extractor: Arc<dyn TextExtractionService>,
    pub summarizer: Arc<dyn SummarizationService>,
    pub quiz_gen: Arc<dyn QuizGenerationService>,
    pub chat: Arc<dyn ConversationService>,
    pub sentiment: Arc<dyn SentimentService>,
    pub sessions: Arc<dyn SessionStoreService>,
    pub exporter: Arc<dyn StudyExportService>,
}

impl AppState {
    /// Builds a fresh pipeline over the shared adapters for one upload.
    pub fn study_pipeline(&self) -> StudyPipeline {
        StudyPipeline::new(
            self.storage.clone(),
            self.extractor.clone(),
            self.summarizer.clone(),
            self.quiz_gen.clone(),
            self.sessions.clone(),
        )
    }
}

//=========================================================================================
// ChatSessionState (Specific to One WebSocket Connection)
//=========================================================================================

/// The state for a single, active chat WebSocket connection.
pub struct ChatSessionState {
    /// Ordered, append-only transcript held for the lifetime of this
    /// connection. Transcripts are deliberately not persisted anywhere.
    pub transcript: Vec<ChatMessage>,
    /// A token to gracefully cancel the current breathing exercise.
    pub breathing_token: CancellationToken,
}

impl ChatSessionState {
    pub fn new() -> Self {
        Self {
            transcript: Vec::new(),
            breathing_token: CancellationToken::new(),
        }
    }
}

impl Default for ChatSessionState {
    fn default() -> Self {
        Self::new()
    }
}
