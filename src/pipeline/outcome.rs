//! # Pipeline Outcome
//!
//! Risultato di un run e report dettagliato per logging/JSON.
//!
//! `PipelineResult` si serializza esattamente come:
//! - `{ "success": true, "data": <payload> }`
//! - `{ "success": false, "error": "<messaggio>" }`

use crate::cleanup::CleanupOutcome;
use crate::image_ref::{Dimensions, ImageRef};
use crate::uploader::UploadResponse;
use serde::Serialize;

/// Final outcome of one pipeline run; exactly one variant is populated
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "ResultEnvelope")]
pub enum PipelineResult {
    Success { data: UploadResponse },
    Failure { error: String },
}

impl PipelineResult {
    pub fn is_success(&self) -> bool {
        matches!(self, PipelineResult::Success { .. })
    }

    pub fn data(&self) -> Option<&UploadResponse> {
        match self {
            PipelineResult::Success { data } => Some(data),
            PipelineResult::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            PipelineResult::Success { .. } => None,
            PipelineResult::Failure { error } => Some(error),
        }
    }
}

/// Wire shape of [`PipelineResult`]
#[derive(Serialize)]
struct ResultEnvelope {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<UploadResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<PipelineResult> for ResultEnvelope {
    fn from(result: PipelineResult) -> Self {
        match result {
            PipelineResult::Success { data } => Self {
                success: true,
                data: Some(data),
                error: None,
            },
            PipelineResult::Failure { error } => Self {
                success: false,
                data: None,
                error: Some(error),
            },
        }
    }
}

/// What happened in the resize stage.
///
/// `Skipped` and `Degraded` both upload the original image; they are kept
/// apart so a failed resize is visible in logs and reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResizeOutcome {
    /// A derived, downscaled image was produced
    Resized { from: Dimensions, to: Dimensions },
    /// Source already within bounds
    Skipped { dimensions: Dimensions },
    /// Probe or transform failed; the original is used
    Degraded { reason: String },
}

impl ResizeOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, ResizeOutcome::Degraded { .. })
    }
}

/// Full account of one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// Normalized caller-owned reference
    pub original: ImageRef,
    /// Reference handed to the uploader, if the run got that far
    pub uploaded: Option<ImageRef>,
    /// `None` when the run aborted before the resize stage finished
    pub resize: Option<ResizeOutcome>,
    pub cleanup: CleanupOutcome,
    pub result: PipelineResult,
}
