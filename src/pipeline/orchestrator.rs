//! # Upload Pipeline Orchestrator
//!
//! Orchestratore di un singolo run: normalizza, ridimensiona, carica e pulisce.
//!
//! ## Flusso:
//! ```text
//! Start → Normalized → Resized | Skipped → Uploaded → Done
//!                   └──────────── Cleanup (sempre, una sola volta) ───┘
//! ```
//!
//! ## Politica di degradazione:
//! - Probe o transform falliti: si carica l'originale normalizzato, il run continua
//! - Upload fallito: unico errore fatale, diventa `Failure { error }`
//! - Panic in uno stage: catturato, il cleanup gira comunque, `Failure("Upload failed")`
//! - Cleanup: sempre eseguito con `(originale, derivato)`, mai propagato
//!
//! ## Concorrenza:
//! Ogni run ha il proprio stato locale; i collaboratori sono `Arc<dyn …>` condivisi,
//! quindi più run possono girare in parallelo sulla stessa `UploadPipeline`.
//!
//! ## Esempio:
//! ```rust,no_run
//! use image_upload_pipeline::{Config, PipelineInput, UploadPipeline};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let pipeline = UploadPipeline::from_config(&Config::default())?;
//! let input = PipelineInput::new("/photos/cat.jpg", "token", "https://api.example.com")
//!     .with_annotation(Some("Analyze this image".to_string()));
//! let result = pipeline.run(&input).await;
//! println!("{}", serde_json::to_string(&result)?);
//! # Ok(())
//! # }
//! ```

use crate::cleanup::{CleanupManager, FileStore, LocalFileStore};
use crate::config::Config;
use crate::error::PipelineError;
use crate::file_manager::FileManager;
use crate::image_processor::ImageTransformer;
use crate::image_ref::{Dimensions, ImageRef};
use crate::pipeline::outcome::{PipelineResult, ResizeOutcome, RunReport};
use crate::platform::Platform;
use crate::probe::{DimensionProbe, ImageDimensionProbe};
use crate::resize::{plan_resize, ResizePlan};
use crate::uploader::{HttpUploader, UploadRequest, UploadResponse, Uploader};
use crate::uri::normalize_uri;
use anyhow::Result;
use futures::FutureExt;
use serde::Serialize;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

/// Tunables that shape a run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineSettings {
    pub max_dimension: u32,
    pub jpeg_quality: f32,
    pub platform: Platform,
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            max_dimension: config.max_dimension,
            jpeg_quality: config.jpeg_quality,
            platform: config.platform,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// Caller-supplied input of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineInput {
    /// Raw path as reported by the platform
    pub path: String,
    pub annotation: Option<String>,
    pub credential: String,
    /// Base URL of the remote service
    pub destination: String,
}

impl PipelineInput {
    pub fn new(
        path: impl Into<String>,
        credential: impl Into<String>,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            annotation: None,
            credential: credential.into(),
            destination: destination.into(),
        }
    }

    pub fn with_annotation(mut self, annotation: Option<String>) -> Self {
        self.annotation = annotation;
        self
    }
}

/// States a run moves through, reported on the optional event channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Start,
    Normalized,
    Resized,
    Skipped,
    Uploaded,
    Cleanup,
    Done,
}

impl PipelineStage {
    pub fn label(&self) -> &'static str {
        match self {
            PipelineStage::Start => "Starting",
            PipelineStage::Normalized => "Preparing image",
            PipelineStage::Resized => "Uploading resized image",
            PipelineStage::Skipped => "Uploading original image",
            PipelineStage::Uploaded => "Upload complete",
            PipelineStage::Cleanup => "Cleaning up",
            PipelineStage::Done => "Done",
        }
    }
}

/// Per-run bookkeeping read by the finalizer
#[derive(Default)]
struct RunState {
    derived: Option<ImageRef>,
    resize: Option<ResizeOutcome>,
    uploaded: Option<ImageRef>,
}

enum ResizeAttempt {
    Resized {
        derived: ImageRef,
        from: Dimensions,
        to: Dimensions,
    },
    Skipped(Dimensions),
}

/// Orchestrates normalize → resize → upload → cleanup
#[derive(Clone)]
pub struct UploadPipeline {
    settings: PipelineSettings,
    probe: Arc<dyn DimensionProbe>,
    transformer: Arc<dyn ImageTransformer>,
    uploader: Arc<dyn Uploader>,
    cleanup: CleanupManager,
    stage_events: Option<UnboundedSender<PipelineStage>>,
}

impl UploadPipeline {
    pub fn new(
        settings: PipelineSettings,
        probe: Arc<dyn DimensionProbe>,
        transformer: Arc<dyn ImageTransformer>,
        uploader: Arc<dyn Uploader>,
        store: Arc<dyn FileStore>,
    ) -> Self {
        Self {
            settings,
            probe,
            transformer,
            uploader,
            cleanup: CleanupManager::new(store),
            stage_events: None,
        }
    }

    /// Production wiring: `image` probe, configured transformer, HTTP uploader, local store
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let transformer = config.transformer.build(config.effective_temp_dir());
        let uploader = HttpUploader::new(config.upload_path.clone(), config.request_timeout())?;

        Ok(Self::new(
            PipelineSettings::from(config),
            Arc::new(ImageDimensionProbe),
            transformer,
            Arc::new(uploader),
            Arc::new(LocalFileStore),
        ))
    }

    /// Reports every stage transition on `sender`
    pub fn with_stage_events(mut self, sender: UnboundedSender<PipelineStage>) -> Self {
        self.stage_events = Some(sender);
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    fn emit(&self, stage: PipelineStage) {
        if let Some(sender) = &self.stage_events {
            // A closed receiver only means nobody is watching.
            let _ = sender.send(stage);
        }
    }

    /// Runs the pipeline and returns only the caller-facing result
    pub async fn run(&self, input: &PipelineInput) -> PipelineResult {
        self.run_with_report(input).await.result
    }

    /// Runs the pipeline; cleanup runs exactly once whatever happens before it
    pub async fn run_with_report(&self, input: &PipelineInput) -> RunReport {
        self.emit(PipelineStage::Start);

        let original = ImageRef::new(normalize_uri(&input.path, self.settings.platform));
        debug!("Normalized {} -> {} ({})", input.path, original, self.settings.platform);
        self.emit(PipelineStage::Normalized);

        let mut state = RunState::default();
        let outcome = AssertUnwindSafe(self.run_stages(&original, input, &mut state))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(PipelineError::Unexpected(panic_message(panic.as_ref()))));

        self.emit(PipelineStage::Cleanup);
        let cleanup = self.cleanup.cleanup(&original, state.derived.as_ref()).await;

        let result = match outcome {
            Ok(data) => {
                info!("Upload succeeded for {}", original.file_name());
                PipelineResult::Success { data }
            }
            Err(e) => {
                error!("Upload failed for {}: {}", original.file_name(), e);
                PipelineResult::Failure {
                    error: e.user_message(),
                }
            }
        };
        self.emit(PipelineStage::Done);

        RunReport {
            original,
            uploaded: state.uploaded,
            resize: state.resize,
            cleanup,
            result,
        }
    }

    async fn run_stages(
        &self,
        original: &ImageRef,
        input: &PipelineInput,
        state: &mut RunState,
    ) -> Result<UploadResponse, PipelineError> {
        let upload_ref = self.resize_stage(original, state).await?;

        let request = UploadRequest {
            image: upload_ref.clone(),
            annotation: input.annotation.clone(),
            credential: input.credential.clone(),
            destination: input.destination.clone(),
        };
        state.uploaded = Some(upload_ref);

        let data = self.uploader.upload(&request).await?;
        self.emit(PipelineStage::Uploaded);
        Ok(data)
    }

    /// Recoverable probe/transform errors degrade to the original image
    async fn resize_stage(
        &self,
        original: &ImageRef,
        state: &mut RunState,
    ) -> Result<ImageRef, PipelineError> {
        match self.try_resize(original).await {
            Ok(ResizeAttempt::Resized { derived, from, to }) => {
                // Recorded first so the finalizer owns it from here on.
                state.derived = Some(derived.clone());
                self.log_reduction(original, &derived, from, to).await;
                state.resize = Some(ResizeOutcome::Resized { from, to });
                self.emit(PipelineStage::Resized);
                Ok(derived)
            }
            Ok(ResizeAttempt::Skipped(dimensions)) => {
                debug!("{} is {} and fits within {}, no resize needed",
                       original.file_name(), dimensions, self.settings.max_dimension);
                state.derived = Some(original.clone());
                state.resize = Some(ResizeOutcome::Skipped { dimensions });
                self.emit(PipelineStage::Skipped);
                Ok(original.clone())
            }
            Err(e) if e.is_recoverable() => {
                warn!("Image resize failed for {}, using original: {}", original.file_name(), e);
                state.derived = Some(original.clone());
                state.resize = Some(ResizeOutcome::Degraded {
                    reason: e.to_string(),
                });
                self.emit(PipelineStage::Skipped);
                Ok(original.clone())
            }
            Err(e) => Err(e),
        }
    }

    async fn try_resize(&self, original: &ImageRef) -> Result<ResizeAttempt, PipelineError> {
        let dimensions = self.probe.probe(original).await?;

        match plan_resize(dimensions, self.settings.max_dimension) {
            ResizePlan::NoOp => Ok(ResizeAttempt::Skipped(dimensions)),
            ResizePlan::Target(target) => {
                let derived = self
                    .transformer
                    .transform(original, target, self.settings.jpeg_quality)
                    .await?;
                Ok(ResizeAttempt::Resized {
                    derived,
                    from: dimensions,
                    to: target,
                })
            }
        }
    }

    async fn log_reduction(
        &self,
        original: &ImageRef,
        derived: &ImageRef,
        from: Dimensions,
        to: Dimensions,
    ) {
        let before = FileManager::file_size(&original.to_path()).await;
        let after = FileManager::file_size(&derived.to_path()).await;

        match (before, after) {
            (Ok(before), Ok(after)) => info!(
                "Resized {} {} -> {}: {} -> {} ({:.1}% smaller)",
                original.file_name(),
                from,
                to,
                FileManager::format_size(before),
                FileManager::format_size(after),
                FileManager::calculate_reduction(before, after)
            ),
            _ => info!("Resized {} {} -> {}", original.file_name(), from, to),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "stage panicked".to_string()
    }
}
