//! # Pipeline Module
//!
//! Orchestrazione del flusso normalize → resize → upload → cleanup.
//!
//! ## Struttura:
//! - `orchestrator`: Un singolo run con cleanup garantito
//! - `outcome`: `PipelineResult` e `RunReport`
//! - `batch`: Più run in parallelo con concorrenza limitata

pub mod batch;
pub mod orchestrator;
pub mod outcome;

#[cfg(test)]
pub(crate) mod mocks;

pub use batch::{BatchItem, BatchUploader};
pub use orchestrator::{PipelineInput, PipelineSettings, PipelineStage, UploadPipeline};
pub use outcome::{PipelineResult, ResizeOutcome, RunReport};
