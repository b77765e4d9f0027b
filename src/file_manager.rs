//! # File Management Module
//!
//! Questo modulo gestisce la discovery delle immagini e le utilità sui file.
//!
//! ## Responsabilità:
//! - Espansione degli argomenti CLI: file singoli o directory (ricorsiva)
//! - Determinazione del tipo file (immagine o no) dall'estensione
//! - Dimensione dei file e formattazione human-readable
//! - Calcolo della riduzione percentuale dopo il resize
//!
//! ## Formati riconosciuti in discovery:
//! - JPG, JPEG, PNG, WebP, GIF, BMP, HEIC

use anyhow::Result;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "bmp", "heic"];

/// Manages file discovery and size bookkeeping
pub struct FileManager;

impl FileManager {
    /// Size of a file in bytes
    pub async fn file_size(path: &Path) -> Result<u64> {
        Ok(tokio::fs::metadata(path).await?.len())
    }

    /// Check if a file is an image, by extension
    pub fn is_image(path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
    }

    /// Find all images below a directory, sorted for a stable order
    pub fn find_images(dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|path| Self::is_image(path))
            .collect();
        files.sort();
        files
    }

    /// Expands CLI inputs: directories are walked, files are kept as given.
    ///
    /// Explicit files are not filtered by extension; the pipeline decides what
    /// it can upload.
    pub fn collect_inputs(inputs: &[PathBuf]) -> Vec<PathBuf> {
        inputs
            .iter()
            .flat_map(|input| {
                if input.is_dir() {
                    Self::find_images(input)
                } else {
                    vec![input.clone()]
                }
            })
            .collect()
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }

    /// Calculate percentage reduction
    pub fn calculate_reduction(original_size: u64, new_size: u64) -> f64 {
        if original_size == 0 {
            0.0
        } else {
            ((original_size as f64 - new_size as f64) / original_size as f64) * 100.0
        }
    }
}
