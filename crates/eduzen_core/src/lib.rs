pub mod domain;
pub mod pipeline;
pub mod ports;

pub use domain::{
    ChatMessage, ExtractionResult, MediaKind, QuizQuestion, Sender, SentimentScore, StudySession,
    SummaryResult, UploadedMedia,
};
pub use pipeline::{PipelineStage, PipelineState, StudyPipeline};
pub use ports::{
    ConversationService, GoogleAccess, MediaStorageService, PortError, PortResult,
    QuizGenerationService, SentimentService, SessionStoreService, StudyExportService,
    SummarizationService, TextExtractionService,
};
