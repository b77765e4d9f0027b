//! # Cleanup Manager
//!
//! Cancella l'artifact derivato prodotto durante un run.
//!
//! ## Regole:
//! - Nessun artifact derivato, o derivato uguale all'originale: nessuna operazione
//! - L'originale (di proprietà del chiamante) non viene mai passato a `delete`
//! - Cancellazione idempotente: un file già assente non è un errore
//! - Best-effort: ogni errore viene loggato e assorbito, mai propagato

use crate::error::CleanupError;
use crate::image_ref::ImageRef;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Storage that can delete image artifacts
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Deletes `image`; with `idempotent`, a missing file is not an error
    async fn delete(&self, image: &ImageRef, idempotent: bool) -> Result<(), CleanupError>;
}

/// Local filesystem store
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileStore;

#[async_trait]
impl FileStore for LocalFileStore {
    async fn delete(&self, image: &ImageRef, idempotent: bool) -> Result<(), CleanupError> {
        match tokio::fs::remove_file(image.to_path()).await {
            Ok(()) => Ok(()),
            Err(e) if idempotent && e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// What the cleanup step did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupOutcome {
    /// No derived artifact, or it was the original
    NothingToDelete,
    Deleted,
    /// Deletion failed and was swallowed
    Failed,
}

/// Deletes derived artifacts, never failing outward
#[derive(Clone)]
pub struct CleanupManager {
    store: Arc<dyn FileStore>,
}

impl CleanupManager {
    pub fn new(store: Arc<dyn FileStore>) -> Self {
        Self { store }
    }

    pub async fn cleanup(&self, original: &ImageRef, derived: Option<&ImageRef>) -> CleanupOutcome {
        let derived = match derived {
            Some(derived) if derived != original => derived,
            _ => {
                debug!("No derived artifact to clean up for {}", original.file_name());
                return CleanupOutcome::NothingToDelete;
            }
        };

        match self.store.delete(derived, true).await {
            Ok(()) => {
                debug!("Deleted derived artifact {}", derived);
                CleanupOutcome::Deleted
            }
            Err(e) => {
                warn!("Failed to delete derived artifact {}: {}", derived, e);
                CleanupOutcome::Failed
            }
        }
    }
}
