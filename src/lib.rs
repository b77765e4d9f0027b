//! # Image Upload Pipeline Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare della pipeline di upload
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Gestione configurazione e validazione parametri
//! - `error`: Tipi di errore e catena di estrazione dei messaggi
//! - `platform` / `uri`: Normalizzazione dei riferimenti per piattaforma
//! - `image_ref`: Riferimenti opachi e dimensioni
//! - `probe`: Lettura delle dimensioni senza decodifica completa
//! - `resize`: Calcolo del target di resize
//! - `image_processor`: Resize + ricompressione JPEG
//! - `uploader`: Upload multipart autenticato
//! - `cleanup`: Eliminazione degli artifact derivati
//! - `pipeline`: Orchestratore e modalità batch
//! - `file_manager`, `progress`, `json_output`: Supporto alla CLI
//!
//! ## Utilizzo:
//! ```rust,no_run
//! use image_upload_pipeline::{Config, PipelineInput, UploadPipeline};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let pipeline = UploadPipeline::from_config(&Config::default())?;
//! let input = PipelineInput::new("/photos/cat.jpg", "token", "https://api.example.com");
//! let result = pipeline.run(&input).await;
//! assert!(result.is_success() || result.error().is_some());
//! # Ok(())
//! # }
//! ```

pub mod cleanup;
pub mod config;
pub mod error;
pub mod file_manager;
pub mod image_processor;
pub mod image_ref;
pub mod json_output;
pub mod pipeline;
pub mod platform;
pub mod probe;
pub mod progress;
pub mod resize;
pub mod uploader;
pub mod uri;
pub mod utils;

pub use cleanup::{CleanupManager, CleanupOutcome, FileStore, LocalFileStore};
pub use config::Config;
pub use error::{PipelineError, UploadError};
pub use image_processor::{ImageTransformer, TransformerKind};
pub use image_ref::{Dimensions, ImageRef};
pub use pipeline::{
    BatchItem, BatchUploader, PipelineInput, PipelineResult, PipelineSettings, PipelineStage,
    ResizeOutcome, RunReport, UploadPipeline,
};
pub use platform::Platform;
pub use probe::{DimensionProbe, ImageDimensionProbe};
pub use resize::{plan_resize, ResizePlan};
pub use uploader::{HttpUploader, UploadRequest, Uploader};
pub use uri::normalize_uri;
