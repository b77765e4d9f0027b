//! # Batch Uploader
//!
//! Esegue la pipeline su più file con concorrenza limitata.
//!
//! ## Responsabilità:
//! - Un `Semaphore` limita i run contemporanei a `workers`
//! - Ogni file è un run indipendente con il proprio cleanup
//! - I risultati tornano nell'ordine degli input
//! - Nessun retry: un file fallito resta fallito

use crate::cleanup::CleanupOutcome;
use crate::error::FALLBACK_MESSAGE;
use crate::image_ref::ImageRef;
use crate::json_output::JsonMessage;
use crate::pipeline::orchestrator::{PipelineInput, UploadPipeline};
use crate::pipeline::outcome::{PipelineResult, RunReport};
use crate::progress::ProgressManager;
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Outcome of one file in a batch
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub path: PathBuf,
    pub report: RunReport,
}

impl BatchItem {
    /// Item for a task that died outside the pipeline
    fn aborted(path: PathBuf) -> Self {
        let report = RunReport {
            original: ImageRef::from_path(&path),
            uploaded: None,
            resize: None,
            cleanup: CleanupOutcome::NothingToDelete,
            result: PipelineResult::Failure {
                error: FALLBACK_MESSAGE.to_string(),
            },
        };
        Self { path, report }
    }
}

/// Runs one pipeline per file, at most `workers` at a time
pub struct BatchUploader {
    pipeline: UploadPipeline,
    semaphore: Arc<Semaphore>,
    workers: usize,
    json_output: bool,
}

impl BatchUploader {
    pub fn new(pipeline: UploadPipeline, workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            pipeline,
            semaphore: Arc::new(Semaphore::new(workers)),
            workers,
            json_output: false,
        }
    }

    /// Emit a `result` JSON line as each file completes
    pub fn with_json_output(mut self, json_output: bool) -> Self {
        self.json_output = json_output;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Uploads every file using `template` for credential, destination and annotation
    pub async fn run(
        &self,
        files: Vec<PathBuf>,
        template: &PipelineInput,
        progress: Option<ProgressManager>,
    ) -> Result<Vec<BatchItem>> {
        debug!("Uploading {} files with {} workers", files.len(), self.workers);
        let mut tasks = Vec::with_capacity(files.len());

        for (index, path) in files.into_iter().enumerate() {
            let permit = self.semaphore.clone().acquire_owned().await?;
            let pipeline = self.pipeline.clone();
            let progress = progress.clone();
            let json_output = self.json_output;
            let task_path = path.clone();
            let input = PipelineInput {
                path: path.to_string_lossy().into_owned(),
                ..template.clone()
            };

            let task = tokio::spawn(async move {
                let _permit = permit;
                let report = pipeline.run_with_report(&input).await;

                if let Some(progress) = &progress {
                    let status = if report.result.is_success() { "✅" } else { "❌" };
                    progress.update(&format!("{} {}", status, report.original.file_name()));
                }
                if json_output {
                    JsonMessage::result(path.clone(), index, report.clone()).emit();
                }

                BatchItem { path, report }
            });
            tasks.push((task_path, task));
        }

        Ok(collect_items(tasks).await)
    }
}

/// Awaits every task in order; a task that panicked counts as a failed item
async fn collect_items(tasks: Vec<(PathBuf, JoinHandle<BatchItem>)>) -> Vec<BatchItem> {
    let mut items = Vec::with_capacity(tasks.len());
    for (path, task) in tasks {
        match task.await {
            Ok(item) => items.push(item),
            Err(e) => {
                error!("Upload task for {} failed: {}", path.display(), e);
                items.push(BatchItem::aborted(path));
            }
        }
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UploadError;
    use crate::image_processor::ImageTransformer;
    use crate::image_ref::ImageRef;
    use crate::pipeline::mocks::{
        MockProbe, MockTransformer, MockUploader, RecordingStore, TransformBehavior, UploadBehavior,
    };
    use crate::pipeline::orchestrator::PipelineSettings;
    use crate::platform::Platform;
    use crate::probe::DimensionProbe;
    use crate::uploader::{UploadRequest, UploadResponse, Uploader};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn settings() -> PipelineSettings {
        PipelineSettings {
            max_dimension: 800,
            jpeg_quality: 0.7,
            platform: Platform::Linux,
        }
    }

    fn template() -> PipelineInput {
        PipelineInput::new("", "token", "https://api.example.com")
            .with_annotation(Some("batch".to_string()))
    }

    /// Tracks how many uploads are in flight at once
    #[derive(Default)]
    struct SlowUploader {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Uploader for SlowUploader {
        async fn upload(&self, request: &UploadRequest) -> Result<UploadResponse, UploadError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if request.image.as_str().contains("bad") {
                Err(UploadError::from_status(400, Some(json!({ "error": "rejected" }))))
            } else {
                Ok(json!({ "ok": true }))
            }
        }
    }

    #[tokio::test]
    async fn test_batch_preserves_order_and_reports_each_file() {
        let store = Arc::new(RecordingStore::default());
        let uploader = Arc::new(MockUploader::new(UploadBehavior::Succeed));
        let probe: Arc<dyn DimensionProbe> = Arc::new(MockProbe::with_dimensions(1600, 1200));
        let transformer: Arc<dyn ImageTransformer> =
            Arc::new(MockTransformer::new(TransformBehavior::Succeed));
        let pipeline =
            UploadPipeline::new(settings(), probe, transformer, uploader.clone(), store.clone());

        let files: Vec<PathBuf> =
            (0..5).map(|i| PathBuf::from(format!("/photos/{}.jpg", i))).collect();
        let progress = ProgressManager::hidden();
        let items = BatchUploader::new(pipeline, 2)
            .run(files.clone(), &template(), Some(progress.clone()))
            .await
            .unwrap();

        assert_eq!(items.iter().map(|i| i.path.clone()).collect::<Vec<_>>(), files);
        assert!(items.iter().all(|i| i.report.result.is_success()));
        assert_eq!(items[3].report.original, ImageRef::new("/photos/3.jpg"));
        assert_eq!(store.deleted().len(), 5);
        assert_eq!(progress.position(), 5);

        let requests = uploader.calls.lock().unwrap();
        assert!(requests.iter().all(|(r, _)| r.annotation.as_deref() == Some("batch")));
    }

    #[tokio::test]
    async fn test_batch_respects_worker_limit_and_isolates_failures() {
        let uploader = Arc::new(SlowUploader::default());
        let pipeline = UploadPipeline::new(
            settings(),
            Arc::new(MockProbe::with_dimensions(100, 100)),
            Arc::new(MockTransformer::new(TransformBehavior::Succeed)),
            uploader.clone(),
            Arc::new(RecordingStore::default()),
        );

        let files = vec![
            PathBuf::from("/p/a.jpg"),
            PathBuf::from("/p/bad.jpg"),
            PathBuf::from("/p/c.jpg"),
            PathBuf::from("/p/d.jpg"),
            PathBuf::from("/p/e.jpg"),
        ];
        let items = BatchUploader::new(pipeline, 2)
            .run(files, &template(), None)
            .await
            .unwrap();

        assert!(uploader.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(items[1].report.result.error(), Some("rejected"));
        assert_eq!(items.iter().filter(|i| i.report.result.is_success()).count(), 4);
    }

    #[tokio::test]
    async fn test_zero_workers_is_clamped() {
        let pipeline = UploadPipeline::new(
            settings(),
            Arc::new(MockProbe::with_dimensions(100, 100)),
            Arc::new(MockTransformer::new(TransformBehavior::Succeed)),
            Arc::new(MockUploader::new(UploadBehavior::Succeed)),
            Arc::new(RecordingStore::default()),
        );
        let batch = BatchUploader::new(pipeline, 0);
        assert_eq!(batch.workers(), 1);

        let items = batch.run(vec![PathBuf::from("/x.jpg")], &template(), None).await.unwrap();
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn test_panicked_task_becomes_failed_item() {
        let ok_path = PathBuf::from("/p/ok.jpg");
        let lost_path = PathBuf::from("/p/lost.jpg");
        let last_path = PathBuf::from("/p/last.jpg");

        let finished = |path: PathBuf| {
            tokio::spawn(async move {
                let mut item = BatchItem::aborted(path);
                item.report.result = PipelineResult::Success { data: json!({}) };
                item
            })
        };
        let lost: JoinHandle<BatchItem> = tokio::spawn(async { panic!("stdout closed") });
        let tasks = vec![
            (ok_path.clone(), finished(ok_path.clone())),
            (lost_path.clone(), lost),
            (last_path.clone(), finished(last_path.clone())),
        ];

        let items = collect_items(tasks).await;

        assert_eq!(items.len(), 3);
        assert!(items[0].report.result.is_success());
        assert_eq!(items[1].path, lost_path);
        assert_eq!(items[1].report.result.error(), Some("Upload failed"));
        assert_eq!(items[1].report.original, ImageRef::from_path(&lost_path));
        assert!(items[2].report.result.is_success());
    }
}
