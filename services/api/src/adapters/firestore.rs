//! services/api/src/adapters/firestore.rs
//!
//! This module contains the adapter for the Cloud Firestore document store.
//! It implements the `SessionStoreService` port from the `core` crate.
//! Study sessions are append-only records in the `study_sessions`
//! collection; nothing here ever reads, mutates, or deletes one.

use async_trait::async_trait;
use eduzen_core::domain::StudySession;
use eduzen_core::ports::{PortError, PortResult, SessionStoreService};
use serde_json::{json, Value};
use tracing::error;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `SessionStoreService` port using the
/// Firestore REST API.
#[derive(Clone)]
pub struct FirestoreAdapter {
    http: reqwest::Client,
    project_id: String,
    api_key: String,
}

impl FirestoreAdapter {
    /// Creates a new `FirestoreAdapter`.
    pub fn new(http: reqwest::Client, project_id: String, api_key: String) -> Self {
        Self {
            http,
            project_id,
            api_key,
        }
    }

    fn collection_url(&self) -> String {
        format!(
            "https://firestore.googleapis.com/v1/projects/{}/databases/(default)/documents/study_sessions?key={}",
            self.project_id, self.api_key
        )
    }
}

//=========================================================================================
// Firestore Value Mapping
//=========================================================================================

/// Maps a session into Firestore's typed value JSON.
fn session_to_fields(session: &StudySession) -> Value {
    let quiz: Vec<Value> = session
        .quiz
        .iter()
        .map(|q| {
            json!({
                "mapValue": { "fields": {
                    "question": { "stringValue": q.prompt },
                    "options": { "arrayValue": { "values":
                        q.options.iter().map(|o| json!({ "stringValue": o })).collect::<Vec<_>>()
                    }},
                    "correctAnswer": { "integerValue": q.correct_index.to_string() },
                }}
            })
        })
        .collect();

    json!({ "fields": {
        "sessionId": { "stringValue": session.id.to_string() },
        "createdAt": { "timestampValue": session.created_at.to_rfc3339() },
        "imageUrl": { "stringValue": session.media_url },
        "extractedText": { "stringValue": session.extracted_text },
        "summary": { "stringValue": session.summary_text },
        "quiz": { "arrayValue": { "values": quiz } },
    }})
}

/// The created document's resource name ends in its record id.
fn record_id_from_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

//=========================================================================================
// `SessionStoreService` Trait Implementation
//=========================================================================================

#[async_trait]
impl SessionStoreService for FirestoreAdapter {
    async fn append_session(&self, session: &StudySession) -> PortResult<String> {
        let response = self
            .http
            .post(self.collection_url())
            .json(&session_to_fields(session))
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Firestore endpoint returned {}: {}", status, body);
            return Err(PortError::Unexpected(format!(
                "document store returned {}",
                status
            )));
        }

        let created: Value = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let name = created.get("name").and_then(Value::as_str).ok_or_else(|| {
            PortError::Unexpected("create response carried no document name".to_string())
        })?;

        Ok(record_id_from_name(name).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use eduzen_core::domain::QuizQuestion;
    use uuid::Uuid;

    #[test]
    fn maps_a_session_into_typed_firestore_values() {
        let session = StudySession {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            media_url: "https://storage.test/notes/1_a.png".into(),
            extracted_text: "Photosynthesis converts light to energy.".into(),
            summary_text: "Plants convert light to energy.".into(),
            quiz: vec![QuizQuestion {
                prompt: "Q?".into(),
                options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                correct_index: 2,
            }],
        };

        let fields = session_to_fields(&session);
        let quiz = &fields["fields"]["quiz"]["arrayValue"]["values"];
        assert_eq!(quiz.as_array().unwrap().len(), 1);
        // Firestore integers travel as strings.
        assert_eq!(
            quiz[0]["mapValue"]["fields"]["correctAnswer"]["integerValue"],
            "2"
        );
        assert_eq!(
            fields["fields"]["summary"]["stringValue"],
            "Plants convert light to energy."
        );
    }

    #[test]
    fn record_id_is_the_last_path_segment() {
        let name = "projects/eduzen/databases/(default)/documents/study_sessions/abc123";
        assert_eq!(record_id_from_name(name), "abc123");
    }
}
