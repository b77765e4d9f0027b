//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON per l'uso programmatico.
//!
//! ## Responsabilità:
//! - Emette una riga JSON su stdout per ogni evento
//! - Riusa `RunReport` per il risultato di ogni file
//! - I log restano su stderr, quindi stdout è sempre JSON valido
//!
//! ## Tipi di messaggi:
//! - `start`: Inizio del batch con configurazione effettiva
//! - `result`: Esito di un singolo file
//! - `complete`: Fine del batch con statistiche finali
//! - `error`: Errore prima o fuori dalla pipeline

use crate::config::Config;
use crate::image_processor::TransformerKind;
use crate::pipeline::RunReport;
use crate::platform::Platform;
use crate::progress::BatchStats;
use serde::Serialize;
use std::path::PathBuf;

/// Tipo di messaggio JSON
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JsonMessage {
    /// Inizio del batch
    Start {
        total_files: usize,
        destination: String,
        config: JsonConfig,
    },

    /// Esito di un file
    Result {
        path: PathBuf,
        index: usize,
        report: RunReport,
    },

    /// Batch completato
    Complete {
        files_processed: usize,
        files_uploaded: usize,
        files_failed: usize,
        files_resized: usize,
        files_degraded: usize,
        duration_seconds: f64,
    },

    /// Errore generale
    Error {
        message: String,
        details: Option<String>,
    },
}

/// Configurazione effettiva riportata nel messaggio `start`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonConfig {
    pub max_dimension: u32,
    pub jpeg_quality: f32,
    pub upload_path: String,
    pub platform: Platform,
    pub transformer: TransformerKind,
    pub workers: usize,
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn start(total_files: usize, destination: &str, config: &Config) -> Self {
        Self::Start {
            total_files,
            destination: destination.to_string(),
            config: JsonConfig::from(config),
        }
    }

    pub fn result(path: PathBuf, index: usize, report: RunReport) -> Self {
        Self::Result { path, index, report }
    }

    pub fn complete(stats: &BatchStats, duration_seconds: f64) -> Self {
        Self::Complete {
            files_processed: stats.files_processed,
            files_uploaded: stats.files_uploaded,
            files_failed: stats.files_failed,
            files_resized: stats.files_resized,
            files_degraded: stats.files_degraded,
            duration_seconds,
        }
    }

    pub fn error(message: impl Into<String>, details: Option<String>) -> Self {
        Self::Error {
            message: message.into(),
            details,
        }
    }
}

impl From<&Config> for JsonConfig {
    fn from(config: &Config) -> Self {
        Self {
            max_dimension: config.max_dimension,
            jpeg_quality: config.jpeg_quality,
            upload_path: config.upload_path.clone(),
            platform: config.platform,
            transformer: config.transformer,
            workers: config.workers,
        }
    }
}
