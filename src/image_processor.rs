//! # Image Processing Module
//!
//! Questo modulo esegue resize + compressione JPEG di un'immagine secondo un
//! piano già calcolato dal [`resize`](crate::resize) planner.
//!
//! ## Contratto
//! - Input: riferimento all'immagine, dimensioni di destinazione, qualità in (0, 1]
//! - Output: un **nuovo** `ImageRef` (artifact derivato, di proprietà del run)
//! - Qualsiasi errore è un `TransformError`: l'orchestratore lo tratta come non fatale
//! - In caso di errore nessun file temporaneo resta su disco
//!
//! ## Backend disponibili
//!
//! | Backend   | Implementazione | Note |
//! |-----------|-----------------|------|
//! | `builtin` | crate `image` (Lanczos3 + JpegEncoder) | Default, nessuna dipendenza esterna |
//! | `magick`  | ImageMagick via `tokio::process::Command` | `magick` (7.x), fallback `convert` (6.x) |
//!
//! ## Qualità
//! La frazione di compressione (default 0.7) viene convertita in qualità JPEG
//! 1-100 (`0.7` → `70`).
//!
//! ## Output
//! Gli artifact derivati vengono scritti nella directory temporanea configurata
//! con nome `resized_<random>.jpg`. La cancellazione è responsabilità del
//! [`CleanupManager`](crate::cleanup::CleanupManager).

use crate::error::TransformError;
use crate::image_ref::{Dimensions, ImageRef};
use crate::platform::PlatformCommands;
use crate::utils::{jpeg_quality_percent, to_string_vec};
use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

const DERIVED_PREFIX: &str = "resized_";
const DERIVED_SUFFIX: &str = ".jpg";

/// Resize + lossy compress capability
#[async_trait]
pub trait ImageTransformer: Send + Sync {
    /// Writes a downscaled JPEG copy of `image` and returns its location
    async fn transform(
        &self,
        image: &ImageRef,
        target: Dimensions,
        quality: f32,
    ) -> Result<ImageRef, TransformError>;
}

/// Which transformer backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformerKind {
    #[default]
    Builtin,
    Magick,
}

impl TransformerKind {
    /// Creates the backend, writing derived files into `temp_dir`
    pub fn build(self, temp_dir: PathBuf) -> Arc<dyn ImageTransformer> {
        match self {
            TransformerKind::Builtin => Arc::new(BuiltinTransformer::new(temp_dir)),
            TransformerKind::Magick => Arc::new(MagickTransformer::new(temp_dir)),
        }
    }
}

impl fmt::Display for TransformerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformerKind::Builtin => f.write_str("builtin"),
            TransformerKind::Magick => f.write_str("magick"),
        }
    }
}

impl FromStr for TransformerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "builtin" => Ok(TransformerKind::Builtin),
            "magick" | "imagemagick" => Ok(TransformerKind::Magick),
            other => Err(format!("Unknown transformer: {}", other)),
        }
    }
}

fn derived_temp_file(temp_dir: &Path) -> Result<tempfile::NamedTempFile, TransformError> {
    Ok(tempfile::Builder::new()
        .prefix(DERIVED_PREFIX)
        .suffix(DERIVED_SUFFIX)
        .tempfile_in(temp_dir)?)
}

/// In-process transformer built on the `image` crate
pub struct BuiltinTransformer {
    temp_dir: PathBuf,
}

impl BuiltinTransformer {
    pub fn new(temp_dir: PathBuf) -> Self {
        Self { temp_dir }
    }

    fn transform_blocking(
        source: &Path,
        temp_dir: &Path,
        target: Dimensions,
        quality: u8,
    ) -> Result<PathBuf, TransformError> {
        let decoded = image::open(source)?;
        let resized = decoded
            .resize_exact(target.width(), target.height(), FilterType::Lanczos3)
            .to_rgb8();

        // The temp file deletes itself if anything below fails.
        let mut output = derived_temp_file(temp_dir)?;
        {
            let mut writer = BufWriter::new(output.as_file_mut());
            JpegEncoder::new_with_quality(&mut writer, quality).encode_image(&resized)?;
            writer.flush()?;
        }

        let (_, path) = output.keep().map_err(|e| TransformError::Io(e.error))?;
        Ok(path)
    }
}

#[async_trait]
impl ImageTransformer for BuiltinTransformer {
    async fn transform(
        &self,
        image: &ImageRef,
        target: Dimensions,
        quality: f32,
    ) -> Result<ImageRef, TransformError> {
        let source = image.to_path();
        let temp_dir = self.temp_dir.clone();
        let jpeg_quality = jpeg_quality_percent(quality);

        debug!(
            "Resizing {} to {} (JPEG quality {})",
            image.file_name(),
            target,
            jpeg_quality
        );

        let output = tokio::task::spawn_blocking(move || {
            Self::transform_blocking(&source, &temp_dir, target, jpeg_quality)
        })
        .await
        .map_err(|e| TransformError::Task(e.to_string()))??;

        debug!("Derived image written to {}", output.display());
        Ok(ImageRef::from_path(&output))
    }
}

/// Transformer that shells out to ImageMagick
pub struct MagickTransformer {
    temp_dir: PathBuf,
    /// Resolved tool name, looked up once
    cached_tool: OnceCell<&'static str>,
}

impl MagickTransformer {
    pub fn new(temp_dir: PathBuf) -> Self {
        Self {
            temp_dir,
            cached_tool: OnceCell::new(),
        }
    }

    /// Finds `magick` (ImageMagick 7.x) or `convert` (6.x)
    async fn resolve_tool(&self) -> Result<&'static str, TransformError> {
        self.cached_tool
            .get_or_try_init(|| async {
                let platform = PlatformCommands::instance();
                for tool in ["magick", "convert"] {
                    if platform.is_command_available(tool).await {
                        info!("Using ImageMagick tool: {}", tool);
                        return Ok(tool);
                    }
                }
                Err(TransformError::MissingDependency(
                    "ImageMagick (magick or convert)".to_string(),
                ))
            })
            .await
            .copied()
    }

    /// Argument list for a forced-size resize with JPEG quality
    pub fn build_args(
        input: &str,
        output: &str,
        target: Dimensions,
        jpeg_quality: u8,
    ) -> Vec<String> {
        let geometry = format!("{}x{}!", target.width(), target.height());
        let quality = jpeg_quality.to_string();
        to_string_vec([
            input,
            "-resize",
            geometry.as_str(),
            "-quality",
            quality.as_str(),
            output,
        ])
    }
}

#[async_trait]
impl ImageTransformer for MagickTransformer {
    async fn transform(
        &self,
        image: &ImageRef,
        target: Dimensions,
        quality: f32,
    ) -> Result<ImageRef, TransformError> {
        let tool = self.resolve_tool().await?;
        let command = PlatformCommands::instance().get_command(tool);

        let source = image.to_path();
        let input = source
            .to_str()
            .ok_or_else(|| TransformError::Tool(format!("Invalid input path: {:?}", source)))?;

        // Removed on drop unless the tool succeeds.
        let output = derived_temp_file(&self.temp_dir)?.into_temp_path();
        let output_str = output
            .to_str()
            .ok_or_else(|| TransformError::Tool(format!("Invalid output path: {:?}", output)))?
            .to_string();

        let args = Self::build_args(input, &output_str, target, jpeg_quality_percent(quality));
        debug!("Command: {} {:?}", command, args);

        let result = Command::new(command).args(&args).output().await?;
        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            warn!("{} failed for {}: {}", tool, image.file_name(), stderr.trim());
            return Err(TransformError::Tool(format!(
                "{} exited with {}: {}",
                tool,
                result.status,
                stderr.trim()
            )));
        }

        let path = output.keep().map_err(|e| TransformError::Io(e.error))?;
        Ok(ImageRef::from_path(&path))
    }
}
