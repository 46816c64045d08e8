//! crates/eduzen_core/src/pipeline.rs
//!
//! The study-pipeline orchestrator. Sequences the ingestion, extraction,
//! summarization, and quiz-generation ports, tracks a linear progress
//! indicator, and aggregates the final record for persistence.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{
    quiz_is_well_formed, ExtractionResult, QuizQuestion, StudySession, SummaryResult,
    UploadedMedia,
};
use crate::ports::{
    MediaStorageService, PortError, PortResult, QuizGenerationService, SessionStoreService,
    SummarizationService, TextExtractionService,
};

//=========================================================================================
// States and Stages
//=========================================================================================

/// The pipeline stage a failure is attributed to. Surfaced to the caller so
/// the user sees a specific, actionable message per stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Ingesting,
    Extracting,
    Summarizing,
    QuizGenerating,
    Persisting,
}

/// The orchestrator's linear progress indicator.
///
/// `Failed(stage)` is reachable from any non-idle state and preserves the
/// partial results already obtained: extracted text stays readable even when
/// summarization fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    AwaitingMedia,
    Extracting,
    Generating,
    Complete,
    Failed(PipelineStage),
}

//=========================================================================================
// The Orchestrator
//=========================================================================================

/// Owns the in-progress state for one active upload session. Only one
/// pipeline is active at a time per session; there is no concurrent
/// multi-upload handling.
pub struct StudyPipeline {
    storage: Arc<dyn MediaStorageService>,
    extractor: Arc<dyn TextExtractionService>,
    summarizer: Arc<dyn SummarizationService>,
    quiz_gen: Arc<dyn QuizGenerationService>,
    store: Arc<dyn SessionStoreService>,

    state: PipelineState,
    media: Option<UploadedMedia>,
    extracted_text: Option<String>,
    summary: Option<SummaryResult>,
    quiz: Option<Vec<QuizQuestion>>,
}

impl StudyPipeline {
    pub fn new(
        storage: Arc<dyn MediaStorageService>,
        extractor: Arc<dyn TextExtractionService>,
        summarizer: Arc<dyn SummarizationService>,
        quiz_gen: Arc<dyn QuizGenerationService>,
        store: Arc<dyn SessionStoreService>,
    ) -> Self {
        Self {
            storage,
            extractor,
            summarizer,
            quiz_gen,
            store,
            state: PipelineState::Idle,
            media: None,
            extracted_text: None,
            summary: None,
            quiz: None,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    // Partial results stay readable in every state, including `Failed`.

    pub fn media(&self) -> Option<&UploadedMedia> {
        self.media.as_ref()
    }

    pub fn extracted_text(&self) -> Option<&str> {
        self.extracted_text.as_deref()
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_ref().map(|s| s.summary_text.as_str())
    }

    pub fn quiz(&self) -> Option<&[QuizQuestion]> {
        self.quiz.as_deref()
    }

    /// Drives the full pipeline for one uploaded image: ingest and extract
    /// concurrently, fan out summarization and quiz generation on the
    /// extracted text, then persist the aggregate session record.
    pub async fn run(
        &mut self,
        bytes: &[u8],
        original_name: &str,
        content_type: &str,
    ) -> PortResult<StudySession> {
        self.ingest_and_extract(bytes, original_name, content_type)
            .await?;
        self.generate().await?;
        self.persist().await
    }

    /// Runs ingestion and extraction concurrently against the raw bytes.
    /// Extraction does not need the durable reference, so neither call waits
    /// on the other. The join waits for both branches; the successful
    /// branch's result is kept even when the other fails.
    async fn ingest_and_extract(
        &mut self,
        bytes: &[u8],
        original_name: &str,
        content_type: &str,
    ) -> PortResult<()> {
        self.state = PipelineState::AwaitingMedia;

        let (stored, extracted) = futures::join!(
            self.storage.store(bytes, original_name, content_type),
            self.extractor.extract(bytes),
        );

        if let Ok(text) = &extracted {
            self.extracted_text = Some(text.clone());
        }

        let media = match stored {
            Ok(media) => {
                self.media = Some(media.clone());
                self.state = PipelineState::Extracting;
                media
            }
            Err(e) => return self.fail(PipelineStage::Ingesting, e),
        };

        let extraction = match extracted {
            Ok(text) => ExtractionResult {
                media_url: media.durable_url,
                text,
            },
            Err(e) => return self.fail(PipelineStage::Extracting, e),
        };

        if !extraction.has_text() {
            // Successful OCR that found nothing. A soft stop: the caller
            // prompts for a clearer image instead of reporting a hard error.
            return self.fail(PipelineStage::Extracting, PortError::NoTextDetected);
        }

        self.state = PipelineState::Generating;
        Ok(())
    }

    /// Fans out summarization and quiz generation concurrently on the same
    /// extracted text. Re-entrant: a caller may invoke this again after a
    /// failure without re-running upstream stages.
    pub async fn generate(&mut self) -> PortResult<()> {
        let text = self.text_for_generation()?;
        self.state = PipelineState::Generating;

        let (summary, quiz) = futures::join!(
            self.summarizer.summarize(&text),
            self.quiz_gen.generate_quiz(&text),
        );

        if let Ok(s) = &summary {
            self.summary = Some(SummaryResult {
                source_chars: text.chars().count(),
                summary_text: s.clone(),
            });
        }

        // Re-validate the quiz at the orchestrator boundary. The generator
        // parses free text, so its output is untrusted input.
        let quiz = quiz.and_then(Self::validate_quiz);
        if let Ok(q) = &quiz {
            self.quiz = Some(q.clone());
        }

        match (summary, quiz) {
            (Ok(_), Ok(_)) => Ok(()),
            (Err(e), _) => self.fail(PipelineStage::Summarizing, e),
            (_, Err(e)) => self.fail(PipelineStage::QuizGenerating, e),
        }
    }

    /// Re-runs only the summarization branch from the already-extracted
    /// text. Upstream results are never discarded by a retry.
    pub async fn retry_summary(&mut self) -> PortResult<()> {
        let text = self.text_for_generation()?;
        self.state = PipelineState::Generating;
        match self.summarizer.summarize(&text).await {
            Ok(summary) => {
                self.summary = Some(SummaryResult {
                    source_chars: text.chars().count(),
                    summary_text: summary,
                });
                Ok(())
            }
            Err(e) => self.fail(PipelineStage::Summarizing, e),
        }
    }

    /// Re-runs only the quiz branch from the already-extracted text.
    pub async fn retry_quiz(&mut self) -> PortResult<()> {
        let text = self.text_for_generation()?;
        self.state = PipelineState::Generating;
        match self
            .quiz_gen
            .generate_quiz(&text)
            .await
            .and_then(Self::validate_quiz)
        {
            Ok(questions) => {
                self.quiz = Some(questions);
                Ok(())
            }
            Err(e) => self.fail(PipelineStage::QuizGenerating, e),
        }
    }

    /// Assembles the aggregate `StudySession` and appends it to the document
    /// store. A store failure leaves every computed result intact.
    pub async fn persist(&mut self) -> PortResult<StudySession> {
        let (media, text, summary, quiz) = match (
            &self.media,
            &self.extracted_text,
            &self.summary,
            &self.quiz,
        ) {
            (Some(m), Some(t), Some(s), Some(q)) => {
                (m.clone(), t.clone(), s.summary_text.clone(), q.clone())
            }
            _ => {
                return Err(PortError::Unexpected(
                    "pipeline has incomplete results and cannot persist a session".to_string(),
                ))
            }
        };

        let session = StudySession {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            media_url: media.durable_url,
            extracted_text: text,
            summary_text: summary,
            quiz,
        };

        match self.store.append_session(&session).await {
            Ok(_record_id) => {
                self.state = PipelineState::Complete;
                Ok(session)
            }
            Err(e) => self.fail(PipelineStage::Persisting, e),
        }
    }

    fn text_for_generation(&self) -> PortResult<String> {
        match &self.extracted_text {
            Some(t) if !t.trim().is_empty() => Ok(t.clone()),
            _ => Err(PortError::NoTextDetected),
        }
    }

    fn validate_quiz(questions: Vec<QuizQuestion>) -> PortResult<Vec<QuizQuestion>> {
        if quiz_is_well_formed(&questions) {
            Ok(questions)
        } else {
            Err(PortError::MalformedQuizData(
                "a generated question had the wrong option count or an out-of-range answer index"
                    .to_string(),
            ))
        }
    }

    fn fail<T>(&mut self, stage: PipelineStage, err: PortError) -> PortResult<T> {
        self.state = PipelineState::Failed(stage);
        Err(err)
    }
}

//=========================================================================================
// Tests
//=========================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MediaKind;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const OCR_TEXT: &str = "Photosynthesis converts light to energy.";
    const SUMMARY_TEXT: &str = "Plants convert light to energy.";

    fn question() -> QuizQuestion {
        QuizQuestion {
            prompt: "What does photosynthesis convert light into?".into(),
            options: vec!["Energy".into(), "Water".into(), "Soil".into(), "Oxygen".into()],
            correct_index: 0,
        }
    }

    struct FakeStorage {
        fail: bool,
    }

    #[async_trait]
    impl MediaStorageService for FakeStorage {
        async fn store(
            &self,
            _bytes: &[u8],
            original_name: &str,
            _content_type: &str,
        ) -> PortResult<UploadedMedia> {
            if self.fail {
                return Err(PortError::IngestionFailed("bucket write refused".into()));
            }
            Ok(UploadedMedia {
                durable_url: format!("https://storage.test/notes/1_{original_name}"),
                original_name: original_name.to_string(),
                kind: MediaKind::Png,
            })
        }
    }

    struct FakeExtractor {
        text: PortResult<&'static str>,
        calls: AtomicUsize,
    }

    impl FakeExtractor {
        fn ok(text: &'static str) -> Self {
            Self {
                text: Ok(text),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TextExtractionService for FakeExtractor {
        async fn extract(&self, _image_bytes: &[u8]) -> PortResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.text.clone().map(str::to_string)
        }
    }

    enum SummaryBehavior {
        Ok,
        Error,
        FailOnce(AtomicUsize),
    }

    struct FakeSummarizer {
        behavior: SummaryBehavior,
    }

    #[async_trait]
    impl SummarizationService for FakeSummarizer {
        async fn summarize(&self, _text: &str) -> PortResult<String> {
            match &self.behavior {
                SummaryBehavior::Ok => Ok(SUMMARY_TEXT.to_string()),
                SummaryBehavior::Error => {
                    Err(PortError::GenerationFailed("endpoint returned 503".into()))
                }
                SummaryBehavior::FailOnce(calls) => {
                    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(PortError::GenerationFailed("endpoint returned 503".into()))
                    } else {
                        Ok(SUMMARY_TEXT.to_string())
                    }
                }
            }
        }
    }

    enum QuizBehavior {
        Ok,
        Error,
        Malformed,
        FailOnce(AtomicUsize),
    }

    struct FakeQuizGen {
        behavior: QuizBehavior,
    }

    #[async_trait]
    impl QuizGenerationService for FakeQuizGen {
        async fn generate_quiz(&self, _text: &str) -> PortResult<Vec<QuizQuestion>> {
            match &self.behavior {
                QuizBehavior::Ok => Ok(vec![question()]),
                QuizBehavior::Error => {
                    Err(PortError::GenerationFailed("endpoint returned 500".into()))
                }
                QuizBehavior::Malformed => {
                    let mut q = question();
                    q.options.pop();
                    Ok(vec![q])
                }
                QuizBehavior::FailOnce(calls) => {
                    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(PortError::GenerationFailed("endpoint returned 500".into()))
                    } else {
                        Ok(vec![question()])
                    }
                }
            }
        }
    }

    struct FakeStore {
        fail: bool,
        saved: Mutex<Vec<StudySession>>,
    }

    impl FakeStore {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                saved: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SessionStoreService for FakeStore {
        async fn append_session(&self, session: &StudySession) -> PortResult<String> {
            if self.fail {
                return Err(PortError::Unexpected("document store unreachable".into()));
            }
            self.saved.lock().unwrap().push(session.clone());
            Ok(format!("records/{}", session.id))
        }
    }

    struct Harness {
        storage: Arc<FakeStorage>,
        extractor: Arc<FakeExtractor>,
        summarizer: Arc<FakeSummarizer>,
        quiz_gen: Arc<FakeQuizGen>,
        store: Arc<FakeStore>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                storage: Arc::new(FakeStorage { fail: false }),
                extractor: Arc::new(FakeExtractor::ok(OCR_TEXT)),
                summarizer: Arc::new(FakeSummarizer {
                    behavior: SummaryBehavior::Ok,
                }),
                quiz_gen: Arc::new(FakeQuizGen {
                    behavior: QuizBehavior::Ok,
                }),
                store: Arc::new(FakeStore::new(false)),
            }
        }

        fn pipeline(&self) -> StudyPipeline {
            StudyPipeline::new(
                self.storage.clone(),
                self.extractor.clone(),
                self.summarizer.clone(),
                self.quiz_gen.clone(),
                self.store.clone(),
            )
        }
    }

    #[tokio::test]
    async fn pipeline_completes_and_persists_one_session() {
        let h = Harness::new();
        let mut pipeline = h.pipeline();

        let session = pipeline
            .run(b"png bytes", "notes.png", "image/png")
            .await
            .unwrap();

        assert_eq!(pipeline.state(), PipelineState::Complete);
        assert_eq!(session.extracted_text, OCR_TEXT);
        assert_eq!(session.summary_text, SUMMARY_TEXT);
        assert_eq!(session.quiz.len(), 1);
        assert!(session.media_url.contains("notes.png"));

        let saved = h.store.saved.lock().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].id, session.id);
    }

    #[tokio::test]
    async fn empty_extraction_is_a_soft_stop() {
        let mut h = Harness::new();
        h.extractor = Arc::new(FakeExtractor::ok(""));
        let mut pipeline = h.pipeline();

        let err = pipeline
            .run(b"blank", "blank.png", "image/png")
            .await
            .unwrap_err();

        assert_eq!(err, PortError::NoTextDetected);
        assert_eq!(
            pipeline.state(),
            PipelineState::Failed(PipelineStage::Extracting)
        );
        // The upload itself succeeded and stays visible.
        assert!(pipeline.media().is_some());
        assert!(h.store.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn quiz_failure_keeps_summary_visible() {
        let mut h = Harness::new();
        h.quiz_gen = Arc::new(FakeQuizGen {
            behavior: QuizBehavior::Error,
        });
        let mut pipeline = h.pipeline();

        let err = pipeline
            .run(b"png bytes", "notes.png", "image/png")
            .await
            .unwrap_err();

        assert!(matches!(err, PortError::GenerationFailed(_)));
        assert_eq!(
            pipeline.state(),
            PipelineState::Failed(PipelineStage::QuizGenerating)
        );
        assert_eq!(pipeline.summary(), Some(SUMMARY_TEXT));
        assert_eq!(pipeline.extracted_text(), Some(OCR_TEXT));
        assert!(h.store.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn summary_failure_keeps_extracted_text() {
        let mut h = Harness::new();
        h.summarizer = Arc::new(FakeSummarizer {
            behavior: SummaryBehavior::Error,
        });
        let mut pipeline = h.pipeline();

        let err = pipeline
            .run(b"png bytes", "notes.png", "image/png")
            .await
            .unwrap_err();

        assert!(matches!(err, PortError::GenerationFailed(_)));
        assert_eq!(
            pipeline.state(),
            PipelineState::Failed(PipelineStage::Summarizing)
        );
        // No rollback of upstream state, and the successful quiz branch
        // stays visible too.
        assert_eq!(pipeline.extracted_text(), Some(OCR_TEXT));
        assert!(pipeline.quiz().is_some());
    }

    #[tokio::test]
    async fn malformed_quiz_is_rejected_at_the_boundary() {
        let mut h = Harness::new();
        h.quiz_gen = Arc::new(FakeQuizGen {
            behavior: QuizBehavior::Malformed,
        });
        let mut pipeline = h.pipeline();

        let err = pipeline
            .run(b"png bytes", "notes.png", "image/png")
            .await
            .unwrap_err();

        assert!(matches!(err, PortError::MalformedQuizData(_)));
        assert_eq!(
            pipeline.state(),
            PipelineState::Failed(PipelineStage::QuizGenerating)
        );
        assert!(pipeline.quiz().is_none());
    }

    #[tokio::test]
    async fn ingest_failure_reports_its_stage_and_keeps_extracted_text() {
        let mut h = Harness::new();
        h.storage = Arc::new(FakeStorage { fail: true });
        let mut pipeline = h.pipeline();

        let err = pipeline
            .run(b"png bytes", "notes.png", "image/png")
            .await
            .unwrap_err();

        assert!(matches!(err, PortError::IngestionFailed(_)));
        assert_eq!(
            pipeline.state(),
            PipelineState::Failed(PipelineStage::Ingesting)
        );
        // Extraction ran concurrently against the raw bytes and its result
        // survives the ingestion failure.
        assert_eq!(pipeline.extracted_text(), Some(OCR_TEXT));
    }

    #[tokio::test]
    async fn quiz_retry_reuses_extracted_text() {
        let mut h = Harness::new();
        h.quiz_gen = Arc::new(FakeQuizGen {
            behavior: QuizBehavior::FailOnce(AtomicUsize::new(0)),
        });
        let mut pipeline = h.pipeline();

        pipeline
            .run(b"png bytes", "notes.png", "image/png")
            .await
            .unwrap_err();
        assert_eq!(
            pipeline.state(),
            PipelineState::Failed(PipelineStage::QuizGenerating)
        );

        pipeline.retry_quiz().await.unwrap();
        let session = pipeline.persist().await.unwrap();

        assert_eq!(pipeline.state(), PipelineState::Complete);
        assert_eq!(session.quiz.len(), 1);
        // The retry regenerated the quiz only; OCR was not re-run.
        assert_eq!(h.extractor.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn summary_retry_recovers_after_failure() {
        let mut h = Harness::new();
        h.summarizer = Arc::new(FakeSummarizer {
            behavior: SummaryBehavior::FailOnce(AtomicUsize::new(0)),
        });
        let mut pipeline = h.pipeline();

        pipeline
            .run(b"png bytes", "notes.png", "image/png")
            .await
            .unwrap_err();
        assert_eq!(
            pipeline.state(),
            PipelineState::Failed(PipelineStage::Summarizing)
        );

        pipeline.retry_summary().await.unwrap();
        let session = pipeline.persist().await.unwrap();

        assert_eq!(pipeline.state(), PipelineState::Complete);
        assert_eq!(session.summary_text, SUMMARY_TEXT);
        assert_eq!(h.extractor.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn persistence_failure_preserves_results() {
        let mut h = Harness::new();
        h.store = Arc::new(FakeStore::new(true));
        let mut pipeline = h.pipeline();

        let err = pipeline
            .run(b"png bytes", "notes.png", "image/png")
            .await
            .unwrap_err();

        assert!(matches!(err, PortError::Unexpected(_)));
        assert_eq!(
            pipeline.state(),
            PipelineState::Failed(PipelineStage::Persisting)
        );
        assert_eq!(pipeline.summary(), Some(SUMMARY_TEXT));
        assert!(pipeline.quiz().is_some());
    }
}
