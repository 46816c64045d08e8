//! services/api/src/adapters/google_workspace.rs
//!
//! This module contains the adapter for the Google Docs, Forms, and
//! Calendar export endpoints. It implements the `StudyExportService` port
//! from the `core` crate.
//!
//! Every call authenticates with an explicitly passed access token; there is
//! no ambient client or sign-in state anywhere in the service.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eduzen_core::domain::QuizQuestion;
use eduzen_core::ports::{GoogleAccess, PortError, PortResult, StudyExportService};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tracing::error;

const DOCS_ENDPOINT: &str = "https://docs.googleapis.com/v1/documents";
const FORMS_ENDPOINT: &str = "https://forms.googleapis.com/v1/forms";
const CALENDAR_EVENTS_ENDPOINT: &str =
    "https://www.googleapis.com/calendar/v3/calendars/primary/events";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `StudyExportService` port against the
/// Google Workspace REST APIs.
#[derive(Clone)]
pub struct GoogleWorkspaceAdapter {
    http: reqwest::Client,
}

impl GoogleWorkspaceAdapter {
    /// Creates a new `GoogleWorkspaceAdapter`.
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        access: &GoogleAccess,
    ) -> PortResult<Value> {
        let response = self
            .http
            .post(url)
            .bearer_auth(&access.access_token)
            .json(body)
            .send()
            .await
            .map_err(|e| PortError::ExportFailed(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(PortError::AuthenticationFailed);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Export endpoint {} returned {}: {}", url, status, body);
            return Err(PortError::ExportFailed(format!(
                "endpoint returned {}",
                status
            )));
        }

        response
            .json()
            .await
            .map_err(|e| PortError::ExportFailed(e.to_string()))
    }

    fn string_field(value: &Value, field: &str) -> PortResult<String> {
        value
            .get(field)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                PortError::ExportFailed(format!("create response carried no '{}'", field))
            })
    }
}

//=========================================================================================
// `StudyExportService` Trait Implementation
//=========================================================================================

#[async_trait]
impl StudyExportService for GoogleWorkspaceAdapter {
    /// Creates an empty document, then inserts the summary text at the top.
    async fn export_summary_doc(
        &self,
        title: &str,
        content: &str,
        access: &GoogleAccess,
    ) -> PortResult<String> {
        let created = self
            .post_json(DOCS_ENDPOINT, &json!({ "title": title }), access)
            .await?;
        let document_id = Self::string_field(&created, "documentId")?;

        let update_url = format!("{}/{}:batchUpdate", DOCS_ENDPOINT, document_id);
        let requests = json!({
            "requests": [{
                "insertText": {
                    "location": { "index": 1 },
                    "text": content,
                }
            }]
        });
        self.post_json(&update_url, &requests, access).await?;

        Ok(document_id)
    }

    /// Creates a form with one required radio-choice item per quiz question.
    async fn create_quiz_form(
        &self,
        title: &str,
        questions: &[QuizQuestion],
        access: &GoogleAccess,
    ) -> PortResult<String> {
        let items: Vec<Value> = questions
            .iter()
            .map(|q| {
                json!({
                    "title": q.prompt,
                    "questionItem": { "question": {
                        "required": true,
                        "choiceQuestion": {
                            "type": "RADIO",
                            "options": q.options.iter()
                                .map(|o| json!({ "value": o }))
                                .collect::<Vec<_>>(),
                        }
                    }}
                })
            })
            .collect();

        let form = json!({
            "info": { "title": title, "documentTitle": title },
            "items": items,
        });

        let created = self.post_json(FORMS_ENDPOINT, &form, access).await?;
        Self::string_field(&created, "formId")
    }

    /// Inserts an event on the user's primary calendar.
    async fn schedule_event(
        &self,
        summary: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        access: &GoogleAccess,
    ) -> PortResult<String> {
        let event = json!({
            "summary": summary,
            "start": { "dateTime": start.to_rfc3339() },
            "end": { "dateTime": end.to_rfc3339() },
        });

        let created = self
            .post_json(CALENDAR_EVENTS_ENDPOINT, &event, access)
            .await?;
        Self::string_field(&created, "id")
    }
}
