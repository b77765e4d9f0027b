//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione della pipeline.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con tutti i parametri della pipeline
//! - Fornisce validazione dei parametri di input
//! - Supporta caricamento/salvataggio da/verso file JSON
//! - Fornisce valori di default sensati per tutti i parametri
//!
//! ## Parametri di configurazione:
//! - `max_dimension`: Lato massimo dopo il resize (default: 800)
//! - `jpeg_quality`: Frazione di compressione in (0, 1] (default: 0.7)
//! - `upload_path`: Path aggiunto al base URL (default: "/api/upload")
//! - `platform`: Piattaforma per la normalizzazione degli URI (default: quella corrente)
//! - `transformer`: Backend di resize, `builtin` o `magick` (default: builtin)
//! - `temp_dir`: Directory per gli artifact derivati (default: None = temp di sistema)
//! - `request_timeout_secs`: Timeout HTTP (default: None = nessun timeout)
//! - `workers`: Upload concorrenti in modalità batch (default: 4)
//! - `json_output`: Output JSON per uso programmatico (default: false)
//!
//! ## Esempio:
//! ```rust
//! use image_upload_pipeline::Config;
//!
//! let config = Config {
//!     max_dimension: 1024,
//!     jpeg_quality: 0.8,
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use crate::image_processor::TransformerKind;
use crate::platform::Platform;
use crate::uploader::DEFAULT_UPLOAD_PATH;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default longest side, in pixels
pub const DEFAULT_MAX_DIMENSION: u32 = 800;

/// Default compression fraction
pub const DEFAULT_JPEG_QUALITY: f32 = 0.7;

/// Configuration for the upload pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Longest side allowed before upload
    pub max_dimension: u32,
    /// Lossy compression fraction, in (0, 1]
    pub jpeg_quality: f32,
    /// Path appended to the destination base URL
    pub upload_path: String,
    /// Platform whose file layer receives the paths
    pub platform: Platform,
    /// Resize backend
    pub transformer: TransformerKind,
    /// Directory for derived artifacts (None = system temp dir)
    pub temp_dir: Option<PathBuf>,
    /// HTTP request timeout in seconds (None = no timeout)
    pub request_timeout_secs: Option<u64>,
    /// Number of concurrent uploads in batch mode
    pub workers: usize,
    /// Output results as JSON lines for programmatic use
    pub json_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            upload_path: DEFAULT_UPLOAD_PATH.to_string(),
            platform: Platform::current(),
            transformer: TransformerKind::Builtin,
            temp_dir: None,
            request_timeout_secs: None,
            workers: 4,
            json_output: false,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.max_dimension == 0 {
            return Err(anyhow::anyhow!("Maximum dimension must be greater than 0"));
        }

        if !(self.jpeg_quality > 0.0 && self.jpeg_quality <= 1.0) {
            return Err(anyhow::anyhow!("JPEG quality must be in (0, 1]"));
        }

        if !self.upload_path.starts_with('/') {
            return Err(anyhow::anyhow!("Upload path must start with '/': {}", self.upload_path));
        }

        if self.workers == 0 {
            return Err(anyhow::anyhow!("Number of workers must be greater than 0"));
        }

        if self.request_timeout_secs == Some(0) {
            return Err(anyhow::anyhow!("Request timeout must be greater than 0 seconds"));
        }

        if let Some(ref temp_dir) = self.temp_dir {
            if !temp_dir.is_dir() {
                return Err(anyhow::anyhow!(
                    "Temp directory does not exist: {}",
                    temp_dir.display()
                ));
            }
        }

        Ok(())
    }

    /// Directory where derived artifacts are written
    pub fn effective_temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// HTTP timeout as a `Duration`
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Default config file location (`<config dir>/image-upload/config.json`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("image-upload").join("config.json"))
    }

    /// Load configuration from file, falling back to defaults if it does not exist
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}
