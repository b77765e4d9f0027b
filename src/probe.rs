//! # Dimension Probe
//!
//! Legge larghezza e altezza di un'immagine senza decodificare i pixel.
//! Un fallimento qui non è mai fatale: l'orchestratore salta il resize e
//! carica l'immagine originale.

use crate::error::ProbeError;
use crate::image_ref::{Dimensions, ImageRef};
use async_trait::async_trait;
use tracing::debug;

/// Reads the pixel size of an image. Read-only.
#[async_trait]
pub trait DimensionProbe: Send + Sync {
    async fn probe(&self, image: &ImageRef) -> Result<Dimensions, ProbeError>;
}

/// Probe backed by the `image` crate header readers
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageDimensionProbe;

#[async_trait]
impl DimensionProbe for ImageDimensionProbe {
    async fn probe(&self, image: &ImageRef) -> Result<Dimensions, ProbeError> {
        let path = image.to_path();

        let (width, height) = tokio::task::spawn_blocking(move || image::image_dimensions(&path))
            .await
            .map_err(|e| ProbeError::Task(e.to_string()))??;

        debug!("Probed {}: {}x{}", image.file_name(), width, height);

        Dimensions::new(width, height).ok_or(ProbeError::InvalidDimensions { width, height })
    }
}
