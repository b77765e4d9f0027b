//! # Progress Tracking and Statistics Module
//!
//! Questo modulo gestisce il feedback visivo e le statistiche di upload.
//!
//! ## Responsabilità:
//! - Progress bar con `indicatif` per la modalità batch
//! - Spinner guidato dagli stage della pipeline per il file singolo
//! - Conteggio dei risultati: caricati, falliti, ridimensionati, degradati
//! - Riepilogo finale leggibile
//!
//! ## Statistiche tracciate:
//! - **files_processed**: Totale run completati
//! - **files_uploaded** / **files_failed**: Esito dell'upload
//! - **files_resized** / **files_skipped** / **files_degraded**: Esito del resize
//! - **cleanup_failures**: Artifact derivati non eliminati
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:00:12] [========================================] 12/12 (100%) ✅ cat.jpg
//! ```

use crate::cleanup::CleanupOutcome;
use crate::pipeline::{PipelineStage, ResizeOutcome, RunReport};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}";
const SPINNER_TEMPLATE: &str = "{spinner:.green} {msg}";

/// Manages progress reporting for uploads
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a progress bar over `total_files` runs
    pub fn new(total_files: u64) -> Self {
        let bar = ProgressBar::new(total_files);

        let style = ProgressStyle::default_bar()
            .template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Create a spinner for a single run
    pub fn spinner(message: &str) -> Self {
        let bar = ProgressBar::new_spinner();

        bar.set_style(
            ProgressStyle::default_spinner()
                .template(SPINNER_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Progress manager that draws nothing
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Update progress with a message
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    /// Set a custom message without incrementing
    pub fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    /// Show the current pipeline stage
    pub fn set_stage(&self, stage: PipelineStage) {
        self.set_message(stage.label());
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn message(&self) -> String {
        self.bar.message().to_string()
    }
}

/// Statistics over a set of runs
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchStats {
    pub files_processed: usize,
    pub files_uploaded: usize,
    pub files_failed: usize,
    pub files_resized: usize,
    pub files_skipped: usize,
    pub files_degraded: usize,
    pub cleanup_failures: usize,
}

impl BatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, report: &RunReport) {
        self.files_processed += 1;

        if report.result.is_success() {
            self.files_uploaded += 1;
        } else {
            self.files_failed += 1;
        }

        match report.resize {
            Some(ResizeOutcome::Resized { .. }) => self.files_resized += 1,
            Some(ResizeOutcome::Skipped { .. }) => self.files_skipped += 1,
            Some(ResizeOutcome::Degraded { .. }) => self.files_degraded += 1,
            None => {}
        }

        if report.cleanup == CleanupOutcome::Failed {
            self.cleanup_failures += 1;
        }
    }

    pub fn has_failures(&self) -> bool {
        self.files_failed > 0
    }

    pub fn format_summary(&self) -> String {
        let mut summary = format!(
            "Processed: {} files | Uploaded: {} | Failed: {} | Resized: {} | Original size: {}",
            self.files_processed,
            self.files_uploaded,
            self.files_failed,
            self.files_resized,
            self.files_skipped + self.files_degraded
        );
        if self.files_degraded > 0 {
            summary.push_str(&format!(" ({} after resize errors)", self.files_degraded));
        }
        if self.cleanup_failures > 0 {
            summary.push_str(&format!(" | Cleanup failures: {}", self.cleanup_failures));
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_ref::{Dimensions, ImageRef};
    use crate::pipeline::PipelineResult;
    use serde_json::json;

    fn report(resize: Option<ResizeOutcome>, cleanup: CleanupOutcome, ok: bool) -> RunReport {
        RunReport {
            original: ImageRef::new("/a.jpg"),
            uploaded: Some(ImageRef::new("/a.jpg")),
            resize,
            cleanup,
            result: if ok {
                PipelineResult::Success { data: json!({}) }
            } else {
                PipelineResult::Failure { error: "Upload failed".to_string() }
            },
        }
    }

    #[test]
    fn test_batch_stats_record() {
        let d = Dimensions::new(10, 10).unwrap();
        let mut stats = BatchStats::new();
        stats.record(&report(
            Some(ResizeOutcome::Resized { from: d, to: d }),
            CleanupOutcome::Deleted,
            true,
        ));
        stats.record(&report(
            Some(ResizeOutcome::Skipped { dimensions: d }),
            CleanupOutcome::NothingToDelete,
            true,
        ));
        stats.record(&report(
            Some(ResizeOutcome::Degraded { reason: "bad".into() }),
            CleanupOutcome::NothingToDelete,
            false,
        ));
        stats.record(&report(None, CleanupOutcome::Failed, false));

        assert_eq!(
            stats,
            BatchStats {
                files_processed: 4,
                files_uploaded: 2,
                files_failed: 2,
                files_resized: 1,
                files_skipped: 1,
                files_degraded: 1,
                cleanup_failures: 1,
            }
        );
        assert!(stats.has_failures());
    }

    #[test]
    fn test_format_summary() {
        let stats = BatchStats {
            files_processed: 3,
            files_uploaded: 3,
            files_resized: 2,
            files_skipped: 1,
            ..Default::default()
        };
        assert_eq!(
            stats.format_summary(),
            "Processed: 3 files | Uploaded: 3 | Failed: 0 | Resized: 2 | Original size: 1"
        );

        let stats = BatchStats {
            files_degraded: 1,
            cleanup_failures: 2,
            ..Default::default()
        };
        assert!(stats.format_summary().ends_with("(1 after resize errors) | Cleanup failures: 2"));
    }

    #[test]
    fn test_hidden_progress_tracks_position() {
        let progress = ProgressManager::hidden();
        progress.update("one");
        progress.update("two");
        assert_eq!(progress.position(), 2);

        progress.set_stage(PipelineStage::Cleanup);
        assert_eq!(progress.message(), "Cleaning up");
    }
}
