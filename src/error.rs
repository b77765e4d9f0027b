//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom della pipeline.
//!
//! ## Responsabilità:
//! - Un enum `thiserror` per ogni stage che può fallire
//! - `UploadError` conserva status HTTP, body strutturato e messaggio di trasporto
//! - Estrazione del messaggio user-facing tramite una catena ordinata di estrattori
//! - `PipelineError` raccoglie tutto per la propagazione interna all'orchestratore
//!
//! ## Categorie di errori:
//! - `ProbeError` / `TransformError`: recuperabili, la pipeline usa l'immagine originale
//! - `UploadError`: fatale per il run, diventa il messaggio di `Failure`
//! - `CleanupError`: sempre assorbito, al massimo loggato
//!
//! ## Catena dei messaggi:
//! 1. campo `error` del body JSON di risposta
//! 2. messaggio di trasporto (status non-2xx o errore di rete)
//! 3. `"Upload failed"`
//!
//! ## Esempio:
//! ```rust
//! use image_upload_pipeline::error::UploadError;
//! use serde_json::json;
//!
//! let err = UploadError::from_status(429, Some(json!({ "error": "quota exceeded" })));
//! assert_eq!(err.message(), "quota exceeded");
//! ```

use serde_json::Value;

/// Message used when neither the response body nor the transport explain the failure.
pub const FALLBACK_MESSAGE: &str = "Upload failed";

/// Errors raised while reading image dimensions
#[derive(thiserror::Error, Debug)]
pub enum ProbeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image decoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Probe task failed: {0}")]
    Task(String),
}

/// Errors raised by an image transformer backend
#[derive(thiserror::Error, Debug)]
pub enum TransformError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Resize tool failed: {0}")]
    Tool(String),

    #[error("Dependency missing: {0}")]
    MissingDependency(String),

    #[error("Transform task failed: {0}")]
    Task(String),
}

/// Errors raised while deleting a derived artifact
#[derive(thiserror::Error, Debug)]
pub enum CleanupError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of the upload stage.
///
/// Every field is optional because the failure can happen before a response
/// exists (unreadable file, connection refused) or after it (non-2xx status).
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("{}", extract_message(self))]
pub struct UploadError {
    /// HTTP status, when the server answered
    pub status: Option<u16>,
    /// Response body, when it parsed as JSON
    pub body: Option<Value>,
    /// Client-side description of what went wrong
    pub transport_message: Option<String>,
}

impl UploadError {
    /// The server answered with a non-success status
    pub fn from_status(status: u16, body: Option<Value>) -> Self {
        Self {
            status: Some(status),
            body,
            transport_message: Some(format!("Request failed with status code {}", status)),
        }
    }

    /// The request never produced a response
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            body: None,
            transport_message: Some(message.into()),
        }
    }

    /// Nothing is known about the failure
    pub fn unknown() -> Self {
        Self {
            status: None,
            body: None,
            transport_message: None,
        }
    }

    /// User-facing message, see [`extract_message`]
    pub fn message(&self) -> String {
        extract_message(self)
    }
}

/// One step of the message fallback chain
pub type MessageExtractor = fn(&UploadError) -> Option<String>;

/// Extractors in precedence order
pub const MESSAGE_EXTRACTORS: &[MessageExtractor] = &[structured_error_field, transport_message];

/// `error` field of the JSON response body.
///
/// Strings are taken as-is; other non-null values are rendered as JSON text.
/// Empty strings, `null` and `false` count as absent.
pub fn structured_error_field(err: &UploadError) -> Option<String> {
    match err.body.as_ref()?.get("error")? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Transport-level description of the failure
pub fn transport_message(err: &UploadError) -> Option<String> {
    err.transport_message
        .as_ref()
        .filter(|m| !m.is_empty())
        .cloned()
}

/// Runs `extractors` in order and returns the first hit, or [`FALLBACK_MESSAGE`]
pub fn extract_message_with(err: &UploadError, extractors: &[MessageExtractor]) -> String {
    extractors
        .iter()
        .find_map(|extract| extract(err))
        .unwrap_or_else(|| FALLBACK_MESSAGE.to_string())
}

/// Message shown to the caller for a failed upload
pub fn extract_message(err: &UploadError) -> String {
    extract_message_with(err, MESSAGE_EXTRACTORS)
}

/// Errors that can end a pipeline run
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("Probe error: {0}")]
    Probe(#[from] ProbeError),

    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    #[error("Unexpected fault: {0}")]
    Unexpected(String),
}

impl PipelineError {
    /// Message reported in `PipelineResult::Failure`.
    ///
    /// Upload failures go through the extractor chain; anything else gets the
    /// generic fallback.
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::Upload(err) => err.message(),
            _ => FALLBACK_MESSAGE.to_string(),
        }
    }

    /// Whether the pipeline degrades instead of failing on this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PipelineError::Probe(_) | PipelineError::Transform(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_structured_error_wins() {
        let err = UploadError::from_status(429, Some(json!({ "error": "quota exceeded" })));
        assert_eq!(err.message(), "quota exceeded");
        assert_eq!(err.to_string(), "quota exceeded");
    }

    #[test]
    fn test_status_without_body_uses_transport_message() {
        let err = UploadError::from_status(500, None);
        assert_eq!(err.message(), "Request failed with status code 500");
    }

    #[test]
    fn test_body_without_error_field_falls_through() {
        let err = UploadError::from_status(502, Some(json!({ "detail": "bad gateway" })));
        assert_eq!(err.message(), "Request failed with status code 502");
    }

    #[test]
    fn test_empty_error_field_is_skipped() {
        let err = UploadError::from_status(400, Some(json!({ "error": "" })));
        assert_eq!(err.message(), "Request failed with status code 400");

        let err = UploadError::from_status(400, Some(json!({ "error": null })));
        assert_eq!(err.message(), "Request failed with status code 400");
    }

    #[test]
    fn test_non_string_error_field_is_rendered() {
        let err = UploadError::from_status(422, Some(json!({ "error": { "code": 7 } })));
        assert_eq!(err.message(), r#"{"code":7}"#);
    }

    #[test]
    fn test_network_failure_uses_transport_message() {
        let err = UploadError::transport("connection refused");
        assert_eq!(err.message(), "connection refused");
    }

    #[test]
    fn test_fallback_message() {
        assert_eq!(UploadError::unknown().message(), "Upload failed");
        assert_eq!(UploadError::transport("").message(), "Upload failed");
    }

    #[test]
    fn test_extractor_order_is_respected() {
        let err = UploadError {
            status: Some(413),
            body: Some(json!({ "error": "too large" })),
            transport_message: Some("Request failed with status code 413".to_string()),
        };

        assert_eq!(extract_message_with(&err, &[transport_message, structured_error_field]),
                   "Request failed with status code 413");
        assert_eq!(extract_message_with(&err, &[structured_error_field]), "too large");
        assert_eq!(extract_message_with(&err, &[]), FALLBACK_MESSAGE);
    }

    #[test]
    fn test_pipeline_error_messages() {
        let upload: PipelineError = UploadError::transport("timed out").into();
        assert_eq!(upload.user_message(), "timed out");
        assert!(!upload.is_recoverable());

        let unexpected = PipelineError::Unexpected("boom".to_string());
        assert_eq!(unexpected.user_message(), FALLBACK_MESSAGE);
        assert!(!unexpected.is_recoverable());

        let probe: PipelineError = ProbeError::InvalidDimensions { width: 0, height: 10 }.into();
        assert!(probe.is_recoverable());
    }
}
