//! services/api/src/adapters/storage.rs
//!
//! This module contains the adapter for Firebase Storage uploads.
//! It implements the `MediaStorageService` port from the `core` crate.

use async_trait::async_trait;
use chrono::Utc;
use eduzen_core::domain::{MediaKind, UploadedMedia};
use eduzen_core::ports::{MediaStorageService, PortError, PortResult};
use serde::Deserialize;
use tracing::error;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `MediaStorageService` port using the
/// Firebase Storage REST API.
#[derive(Clone)]
pub struct FirebaseStorageAdapter {
    http: reqwest::Client,
    bucket: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    name: String,
    #[serde(rename = "downloadTokens")]
    download_tokens: Option<String>,
}

impl FirebaseStorageAdapter {
    /// Creates a new `FirebaseStorageAdapter`.
    pub fn new(http: reqwest::Client, bucket: String) -> Self {
        Self { http, bucket }
    }

    /// Builds the durable download URL for a stored object.
    fn download_url(&self, object_name: &str, token: Option<&str>) -> String {
        let mut url = format!(
            "https://firebasestorage.googleapis.com/v0/b/{}/o/{}?alt=media",
            self.bucket,
            urlencoding::encode(object_name)
        );
        if let Some(token) = token {
            url.push_str("&token=");
            url.push_str(token);
        }
        url
    }
}

//=========================================================================================
// `MediaStorageService` Trait Implementation
//=========================================================================================

#[async_trait]
impl MediaStorageService for FirebaseStorageAdapter {
    /// Writes the image bytes to the bucket and returns the durable
    /// reference. The media kind is checked before any network call.
    async fn store(
        &self,
        bytes: &[u8],
        original_name: &str,
        content_type: &str,
    ) -> PortResult<UploadedMedia> {
        let kind = MediaKind::from_mime(content_type)
            .ok_or_else(|| PortError::UnsupportedMediaKind(content_type.to_string()))?;

        // Prefix with a millisecond timestamp so repeated uploads of the
        // same filename never collide.
        let object_name = format!(
            "notes/{}_{}",
            Utc::now().timestamp_millis(),
            original_name
        );
        let url = format!(
            "https://firebasestorage.googleapis.com/v0/b/{}/o?uploadType=media&name={}",
            self.bucket,
            urlencoding::encode(&object_name)
        );

        let response = self
            .http
            .post(&url)
            .header("content-type", kind.as_mime())
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| PortError::IngestionFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Storage endpoint returned {}: {}", status, body);
            return Err(PortError::IngestionFailed(format!(
                "endpoint returned {}",
                status
            )));
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| PortError::IngestionFailed(e.to_string()))?;

        Ok(UploadedMedia {
            durable_url: self.download_url(&uploaded.name, uploaded.download_tokens.as_deref()),
            original_name: original_name.to_string(),
            kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> FirebaseStorageAdapter {
        FirebaseStorageAdapter::new(reqwest::Client::new(), "notes-bucket".to_string())
    }

    #[tokio::test]
    async fn rejects_non_image_uploads_before_any_network_call() {
        let err = adapter()
            .store(b"%PDF-1.4", "notes.pdf", "application/pdf")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            PortError::UnsupportedMediaKind("application/pdf".to_string())
        );
    }

    #[test]
    fn download_url_escapes_the_object_path() {
        let url = adapter().download_url("notes/17_my page.png", Some("tok"));
        assert_eq!(
            url,
            "https://firebasestorage.googleapis.com/v0/b/notes-bucket/o/notes%2F17_my%20page.png?alt=media&token=tok"
        );
    }
}
