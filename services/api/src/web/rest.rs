//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the study-companion REST endpoints and the
//! master definition for the OpenAPI specification.

use crate::web::state::AppState;
use axum::{
    extract::{Multipart, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use eduzen_core::domain::QuizQuestion;
use eduzen_core::pipeline::{PipelineStage, PipelineState, StudyPipeline};
use eduzen_core::ports::{GoogleAccess, PortError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        create_study_session_handler,
        generate_summary_handler,
        generate_quiz_handler,
        export_doc_handler,
        export_form_handler,
        export_calendar_handler,
    ),
    components(schemas(
        StudySessionResponse,
        StudyFailureResponse,
        QuizQuestionPayload,
        SummaryRequest,
        SummaryResponse,
        QuizRequest,
        QuizResponse,
        ExportDocRequest,
        ExportFormRequest,
        ExportCalendarRequest,
        ExportResponse,
    )),
    tags(
        (name = "EduZen API", description = "API endpoints for the study companion and well-being assistant.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// A quiz question as it travels over the REST API.
#[derive(Serialize, Deserialize, Clone, ToSchema)]
pub struct QuizQuestionPayload {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
}

impl From<&QuizQuestion> for QuizQuestionPayload {
    fn from(q: &QuizQuestion) -> Self {
        Self {
            question: q.prompt.clone(),
            options: q.options.clone(),
            correct_answer: q.correct_index,
        }
    }
}

impl QuizQuestionPayload {
    fn into_domain(self) -> QuizQuestion {
        QuizQuestion {
            prompt: self.question,
            options: self.options,
            correct_index: self.correct_answer,
        }
    }
}

/// The response payload sent after a full pipeline run completes.
#[derive(Serialize, ToSchema)]
pub struct StudySessionResponse {
    session_id: Uuid,
    image_url: String,
    extracted_text: String,
    summary: String,
    quiz: Vec<QuizQuestionPayload>,
}

/// Returned when the pipeline stops at a stage. Partial results computed
/// before the failure stay visible so the client can keep displaying them.
#[derive(Serialize, ToSchema)]
pub struct StudyFailureResponse {
    stage: String,
    message: String,
    image_url: Option<String>,
    extracted_text: Option<String>,
    summary: Option<String>,
    quiz: Option<Vec<QuizQuestionPayload>>,
}

#[derive(Deserialize, ToSchema)]
pub struct SummaryRequest {
    pub text: String,
}

#[derive(Serialize, ToSchema)]
pub struct SummaryResponse {
    summary: String,
}

#[derive(Deserialize, ToSchema)]
pub struct QuizRequest {
    pub text: String,
}

#[derive(Serialize, ToSchema)]
pub struct QuizResponse {
    quiz: Vec<QuizQuestionPayload>,
}

#[derive(Deserialize, ToSchema)]
pub struct ExportDocRequest {
    pub title: String,
    pub content: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ExportFormRequest {
    pub title: String,
    pub questions: Vec<QuizQuestionPayload>,
}

#[derive(Deserialize, ToSchema)]
pub struct ExportCalendarRequest {
    pub summary: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Serialize, ToSchema)]
pub struct ExportResponse {
    resource_id: String,
}

//=========================================================================================
// Error Mapping
//=========================================================================================

fn stage_name(state: PipelineState) -> &'static str {
    match state {
        PipelineState::Failed(PipelineStage::Ingesting) => "ingesting",
        PipelineState::Failed(PipelineStage::Extracting) => "extracting",
        PipelineState::Failed(PipelineStage::Summarizing) => "summarizing",
        PipelineState::Failed(PipelineStage::QuizGenerating) => "quiz_generating",
        PipelineState::Failed(PipelineStage::Persisting) => "persisting",
        _ => "pipeline",
    }
}

/// Stage-tagged, user-actionable messages. Raw transport errors stay in the
/// server log and are never forwarded to the client.
fn user_message(err: &PortError) -> String {
    match err {
        PortError::UnsupportedMediaKind(kind) => format!(
            "'{}' is not a supported image type. Please upload a PNG, JPEG, WebP, or GIF.",
            kind
        ),
        PortError::IngestionFailed(_) => "We couldn't save your upload. Please try again.".into(),
        PortError::ExtractionFailed(_) => "We couldn't read your image. Please try again.".into(),
        PortError::NoTextDetected => {
            "We couldn't find any text in that image. Try a clearer photo of your notes.".into()
        }
        PortError::GenerationFailed(_) => {
            "We couldn't generate content from your notes. Please try again.".into()
        }
        PortError::MalformedQuizData(_) => {
            "The generated quiz came back in an unexpected shape. Please regenerate it.".into()
        }
        PortError::MissingConfiguration(name) => {
            format!("The server is missing its '{}' configuration.", name)
        }
        PortError::ExportFailed(_) => "The export failed. Please try again.".into(),
        PortError::AuthenticationFailed => {
            "Your Google sign-in has expired. Please sign in again.".into()
        }
        PortError::SentimentUnavailable(_) | PortError::Unexpected(_) => {
            "Something went wrong on our side. Please try again.".into()
        }
    }
}

fn status_for(err: &PortError) -> StatusCode {
    match err {
        PortError::UnsupportedMediaKind(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        PortError::NoTextDetected => StatusCode::UNPROCESSABLE_ENTITY,
        PortError::IngestionFailed(_)
        | PortError::ExtractionFailed(_)
        | PortError::GenerationFailed(_)
        | PortError::MalformedQuizData(_)
        | PortError::ExportFailed(_) => StatusCode::BAD_GATEWAY,
        PortError::AuthenticationFailed => StatusCode::UNAUTHORIZED,
        PortError::MissingConfiguration(_)
        | PortError::SentimentUnavailable(_)
        | PortError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn failure_response(
    pipeline: &StudyPipeline,
    err: &PortError,
) -> (StatusCode, Json<StudyFailureResponse>) {
    (
        status_for(err),
        Json(StudyFailureResponse {
            stage: stage_name(pipeline.state()).to_string(),
            message: user_message(err),
            image_url: pipeline.media().map(|m| m.durable_url.clone()),
            extracted_text: pipeline.extracted_text().map(str::to_string),
            summary: pipeline.summary().map(str::to_string),
            quiz: pipeline
                .quiz()
                .map(|qs| qs.iter().map(QuizQuestionPayload::from).collect()),
        }),
    )
}

fn bad_upload(message: String) -> (StatusCode, Json<StudyFailureResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(StudyFailureResponse {
            stage: "upload".to_string(),
            message,
            image_url: None,
            extracted_text: None,
            summary: None,
            quiz: None,
        }),
    )
}

fn bearer_token(headers: &HeaderMap) -> Result<GoogleAccess, (StatusCode, String)> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or((
            StatusCode::UNAUTHORIZED,
            "Authorization header is required".to_string(),
        ))?;
    let token = value.strip_prefix("Bearer ").ok_or((
        StatusCode::UNAUTHORIZED,
        "Authorization header must be a Bearer token".to_string(),
    ))?;
    Ok(GoogleAccess {
        access_token: token.to_string(),
    })
}

//=========================================================================================
// REST API Handlers — Study Pipeline
//=========================================================================================

/// Run the full study pipeline for one uploaded image.
///
/// Accepts a multipart/form-data request with a single image part. The
/// pipeline ingests and extracts concurrently, fans out summarization and
/// quiz generation, persists the completed session, and returns the
/// aggregate result.
#[utoipa::path(
    post,
    path = "/study/sessions",
    request_body(content_type = "multipart/form-data", description = "The notes image to upload."),
    responses(
        (status = 201, description = "Study session completed and persisted", body = StudySessionResponse),
        (status = 400, description = "Bad upload (missing or unreadable file)", body = StudyFailureResponse),
        (status = 415, description = "Not a supported image type", body = StudyFailureResponse),
        (status = 422, description = "No text detected in the image", body = StudyFailureResponse),
        (status = 502, description = "An external service failed; partial results included", body = StudyFailureResponse)
    )
)]
pub async fn create_study_session_handler(
    State(app_state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, (StatusCode, Json<StudyFailureResponse>)> {
    let (file_name, content_type, data) = match multipart.next_field().await {
        Ok(Some(field)) => {
            let name = field.file_name().unwrap_or("notes.png").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| bad_upload(format!("Failed to read file bytes: {}", e)))?;
            (name, content_type, data)
        }
        Ok(None) => {
            return Err(bad_upload(
                "Multipart form must include an image file".to_string(),
            ))
        }
        Err(e) => return Err(bad_upload(format!("Failed to read multipart data: {}", e))),
    };

    let mut pipeline = app_state.study_pipeline();
    match pipeline.run(&data, &file_name, &content_type).await {
        Ok(session) => Ok((
            StatusCode::CREATED,
            Json(StudySessionResponse {
                session_id: session.id,
                image_url: session.media_url,
                extracted_text: session.extracted_text,
                summary: session.summary_text,
                quiz: session.quiz.iter().map(QuizQuestionPayload::from).collect(),
            }),
        )),
        Err(e) => {
            error!("Study pipeline failed at {:?}: {}", pipeline.state(), e);
            Err(failure_response(&pipeline, &e))
        }
    }
}

/// Regenerate a summary from already-extracted text.
///
/// A user-initiated retry: the upstream extraction result is kept on the
/// client and resent, so no image is re-processed.
#[utoipa::path(
    post,
    path = "/study/summary",
    request_body = SummaryRequest,
    responses(
        (status = 200, description = "Summary generated", body = SummaryResponse),
        (status = 502, description = "The generation endpoint failed")
    )
)]
pub async fn generate_summary_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<SummaryRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    match app_state.summarizer.summarize(&req.text).await {
        Ok(summary) => Ok(Json(SummaryResponse { summary })),
        Err(e) => {
            error!("Summary retry failed: {}", e);
            Err((status_for(&e), user_message(&e)))
        }
    }
}

/// Regenerate a quiz from already-extracted text.
#[utoipa::path(
    post,
    path = "/study/quiz",
    request_body = QuizRequest,
    responses(
        (status = 200, description = "Quiz generated", body = QuizResponse),
        (status = 502, description = "The generation endpoint failed or returned malformed data")
    )
)]
pub async fn generate_quiz_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<QuizRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    match app_state.quiz_gen.generate_quiz(&req.text).await {
        Ok(questions) => Ok(Json(QuizResponse {
            quiz: questions.iter().map(QuizQuestionPayload::from).collect(),
        })),
        Err(e) => {
            error!("Quiz retry failed: {}", e);
            Err((status_for(&e), user_message(&e)))
        }
    }
}

//=========================================================================================
// REST API Handlers — Exports
//=========================================================================================

/// Export a summary to an external document.
///
/// Requires the user's OAuth access token as a Bearer `Authorization` header.
#[utoipa::path(
    post,
    path = "/study/export/docs",
    request_body = ExportDocRequest,
    responses(
        (status = 200, description = "Document created", body = ExportResponse),
        (status = 401, description = "Missing or expired access token"),
        (status = 502, description = "The export endpoint failed")
    )
)]
pub async fn export_doc_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ExportDocRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let access = bearer_token(&headers)?;
    match app_state
        .exporter
        .export_summary_doc(&req.title, &req.content, &access)
        .await
    {
        Ok(resource_id) => Ok(Json(ExportResponse { resource_id })),
        Err(e) => {
            error!("Docs export failed: {}", e);
            Err((status_for(&e), user_message(&e)))
        }
    }
}

/// Export a quiz as an external form.
#[utoipa::path(
    post,
    path = "/study/export/form",
    request_body = ExportFormRequest,
    responses(
        (status = 200, description = "Form created", body = ExportResponse),
        (status = 401, description = "Missing or expired access token"),
        (status = 502, description = "The export endpoint failed")
    )
)]
pub async fn export_form_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ExportFormRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let access = bearer_token(&headers)?;
    let questions: Vec<QuizQuestion> = req
        .questions
        .into_iter()
        .map(QuizQuestionPayload::into_domain)
        .collect();
    match app_state
        .exporter
        .create_quiz_form(&req.title, &questions, &access)
        .await
    {
        Ok(resource_id) => Ok(Json(ExportResponse { resource_id })),
        Err(e) => {
            error!("Forms export failed: {}", e);
            Err((status_for(&e), user_message(&e)))
        }
    }
}

/// Schedule a study session on the user's calendar.
#[utoipa::path(
    post,
    path = "/study/export/calendar",
    request_body = ExportCalendarRequest,
    responses(
        (status = 200, description = "Event scheduled", body = ExportResponse),
        (status = 401, description = "Missing or expired access token"),
        (status = 502, description = "The export endpoint failed")
    )
)]
pub async fn export_calendar_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ExportCalendarRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let access = bearer_token(&headers)?;
    match app_state
        .exporter
        .schedule_event(&req.summary, req.start, req.end, &access)
        .await
    {
        Ok(resource_id) => Ok(Json(ExportResponse { resource_id })),
        Err(e) => {
            error!("Calendar export failed: {}", e);
            Err((status_for(&e), user_message(&e)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages_never_leak_transport_detail() {
        let err = PortError::ExtractionFailed(
            "error sending request for url (https://vision.googleapis.com/...)".to_string(),
        );
        let message = user_message(&err);
        assert!(!message.contains("vision.googleapis.com"));
        assert!(!message.contains("error sending request"));
    }

    #[test]
    fn soft_and_hard_failures_map_to_distinct_statuses() {
        assert_eq!(
            status_for(&PortError::NoTextDetected),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&PortError::UnsupportedMediaKind("text/plain".into())),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            status_for(&PortError::GenerationFailed("503".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&PortError::AuthenticationFailed),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn bearer_token_requires_the_bearer_scheme() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_err());

        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert!(bearer_token(&headers).is_err());

        headers.insert(header::AUTHORIZATION, "Bearer tok123".parse().unwrap());
        let access = bearer_token(&headers).unwrap();
        assert_eq!(access.access_token, "tok123");
    }
}
