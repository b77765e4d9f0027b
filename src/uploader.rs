//! # Uploader Module
//!
//! Invia l'immagine (originale o derivata) al servizio remoto come
//! `multipart/form-data` autenticato.
//!
//! ## Richiesta
//! - `POST <destination><upload_path>` (default `/api/upload`)
//! - Header `Authorization: Bearer <credential>`
//! - Part `file`: bytes dell'immagine, filename `upload_<unixMillis>.jpg`, `image/jpeg`
//! - Part `message`: testo opzionale, solo se presente e non vuoto
//!
//! ## Risposta
//! - 2xx: body JSON (o testo grezzo come stringa JSON) restituito come payload opaco
//! - non-2xx: `UploadError` con status e body, il messaggio segue la catena in
//!   [`error`](crate::error)
//! - errore di rete / file illeggibile: `UploadError` con solo il messaggio di trasporto

use crate::error::UploadError;
use crate::image_ref::ImageRef;
use crate::utils::unix_millis;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default path appended to the destination base URL
pub const DEFAULT_UPLOAD_PATH: &str = "/api/upload";

/// Content type of the binary part
pub const JPEG_MIME: &str = "image/jpeg";

/// Opaque payload returned by the remote service
pub type UploadResponse = Value;

/// Everything needed for one upload. Exactly one image part is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRequest {
    pub image: ImageRef,
    pub annotation: Option<String>,
    pub credential: String,
    pub destination: String,
}

impl UploadRequest {
    /// Annotation to send, `None` when absent or empty
    pub fn message_part(&self) -> Option<&str> {
        self.annotation.as_deref().filter(|m| !m.is_empty())
    }
}

/// Sends an image to the remote service
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, request: &UploadRequest) -> Result<UploadResponse, UploadError>;
}

/// Synthetic, collision-resistant file name for the binary part
pub fn upload_file_name(millis: u128) -> String {
    format!("upload_{}.jpg", millis)
}

/// Parses a response body, returning `None` for empty or non-JSON text
fn parse_body(text: &str) -> Option<Value> {
    if text.trim().is_empty() {
        return None;
    }
    serde_json::from_str(text).ok()
}

/// `reqwest`-based uploader
pub struct HttpUploader {
    client: reqwest::Client,
    upload_path: String,
}

impl HttpUploader {
    /// Creates an uploader; `timeout` bounds the whole request when set
    pub fn new(
        upload_path: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, UploadError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| UploadError::transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            upload_path: upload_path.into(),
        })
    }

    /// Full endpoint URL for a destination base
    pub fn endpoint(&self, destination: &str) -> String {
        format!("{}{}", destination.trim_end_matches('/'), self.upload_path)
    }

    async fn build_form(&self, request: &UploadRequest) -> Result<Form, UploadError> {
        let path = request.image.to_path();
        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            UploadError::transport(format!("Failed to read image {}: {}", path.display(), e))
        })?;

        let file_part = Part::bytes(bytes)
            .file_name(upload_file_name(unix_millis()))
            .mime_str(JPEG_MIME)
            .map_err(|e| UploadError::transport(format!("invalid mime '{}': {}", JPEG_MIME, e)))?;

        let mut form = Form::new().part("file", file_part);
        if let Some(message) = request.message_part() {
            form = form.text("message", message.to_string());
        }
        Ok(form)
    }
}

#[async_trait]
impl Uploader for HttpUploader {
    async fn upload(&self, request: &UploadRequest) -> Result<UploadResponse, UploadError> {
        let form = self.build_form(request).await?;
        let url = self.endpoint(&request.destination);

        info!("Uploading {} to {}", request.image.file_name(), url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&request.credential)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                warn!("Upload request failed: {}", e);
                UploadError::transport(e.to_string())
            })?;

        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) if status.is_success() => return Err(UploadError::transport(e.to_string())),
            Err(e) => {
                warn!("Failed to read error body (status {}): {}", status.as_u16(), e);
                return Err(UploadError::from_status(status.as_u16(), None));
            }
        };
        let body = parse_body(&text);

        if status.is_success() {
            debug!("Upload succeeded with status {}", status.as_u16());
            Ok(body.unwrap_or_else(|| {
                if text.is_empty() {
                    Value::Null
                } else {
                    Value::String(text)
                }
            }))
        } else {
            warn!("Upload rejected with status {}", status.as_u16());
            Err(UploadError::from_status(status.as_u16(), body))
        }
    }
}
