//! Recording collaborators for pipeline tests.
//! Mutex-backed so they are `Sync` and can be shared across concurrent runs.

use crate::cleanup::FileStore;
use crate::error::{CleanupError, ProbeError, TransformError, UploadError};
use crate::image_processor::ImageTransformer;
use crate::image_ref::{Dimensions, ImageRef};
use crate::probe::DimensionProbe;
use crate::uploader::{UploadRequest, UploadResponse, Uploader};
use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Returns fixed dimensions, or fails when built with `failing()`
pub struct MockProbe {
    dims: Option<Dimensions>,
    panics: bool,
    pub calls: Mutex<Vec<String>>,
}

impl MockProbe {
    pub fn with_dimensions(width: u32, height: u32) -> Self {
        Self {
            dims: Dimensions::new(width, height),
            panics: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            dims: None,
            panics: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn panicking() -> Self {
        Self {
            dims: None,
            panics: true,
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl DimensionProbe for MockProbe {
    async fn probe(&self, image: &ImageRef) -> Result<Dimensions, ProbeError> {
        self.calls.lock().unwrap().push(image.as_str().to_string());
        if self.panics {
            panic!("probe exploded");
        }
        self.dims
            .ok_or_else(|| ProbeError::Task("mock probe failure".to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformBehavior {
    Succeed,
    Fail,
    Panic,
}

/// Hands out `/tmp/derived_<n>.jpg` refs without touching the disk
pub struct MockTransformer {
    behavior: TransformBehavior,
    counter: AtomicUsize,
    pub calls: Mutex<Vec<(String, Dimensions, f32)>>,
}

impl MockTransformer {
    pub fn new(behavior: TransformBehavior) -> Self {
        Self {
            behavior,
            counter: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ImageTransformer for MockTransformer {
    async fn transform(
        &self,
        image: &ImageRef,
        target: Dimensions,
        quality: f32,
    ) -> Result<ImageRef, TransformError> {
        self.calls
            .lock()
            .unwrap()
            .push((image.as_str().to_string(), target, quality));

        match self.behavior {
            TransformBehavior::Succeed => {
                let n = self.counter.fetch_add(1, Ordering::SeqCst);
                Ok(ImageRef::new(format!("/tmp/derived_{}.jpg", n)))
            }
            TransformBehavior::Fail => {
                Err(TransformError::Tool("mock transform failure".to_string()))
            }
            TransformBehavior::Panic => panic!("transformer exploded"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum UploadBehavior {
    Succeed,
    Fail(UploadError),
    Panic,
}

/// Records every request, plus the dimensions of the file if it exists
pub struct MockUploader {
    behavior: UploadBehavior,
    pub calls: Mutex<Vec<(UploadRequest, Option<(u32, u32)>)>>,
}

impl MockUploader {
    pub fn new(behavior: UploadBehavior) -> Self {
        Self {
            behavior,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn uploaded_refs(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(request, _)| request.image.as_str().to_string())
            .collect()
    }
}

#[async_trait]
impl Uploader for MockUploader {
    async fn upload(&self, request: &UploadRequest) -> Result<UploadResponse, UploadError> {
        let dims = image::image_dimensions(request.image.to_path()).ok();
        self.calls.lock().unwrap().push((request.clone(), dims));

        match &self.behavior {
            UploadBehavior::Succeed => Ok(json!({ "uploaded": request.image.as_str() })),
            UploadBehavior::Fail(err) => Err(err.clone()),
            UploadBehavior::Panic => panic!("uploader exploded"),
        }
    }
}

/// Records deletions; optionally fails every one of them
#[derive(Default)]
pub struct RecordingStore {
    pub fail: bool,
    pub deleted: Mutex<Vec<String>>,
}

impl RecordingStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl FileStore for RecordingStore {
    async fn delete(&self, image: &ImageRef, _idempotent: bool) -> Result<(), CleanupError> {
        self.deleted.lock().unwrap().push(image.as_str().to_string());
        if self.fail {
            let err =
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "mock delete failure");
            Err(err.into())
        } else {
            Ok(())
        }
    }
}
