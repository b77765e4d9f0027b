//! # Image Upload - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing` (sempre su stderr)
//! - Caricamento della configurazione da file e override dalla CLI
//! - Avvio della pipeline su un file singolo o in batch
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI (file/directory, base URL, token, messaggio, etc.)
//! 2. Configura il logging (INFO o DEBUG a seconda del flag verbose, oppure `RUST_LOG`)
//! 3. Carica il file di configurazione e applica gli override
//! 4. Espande le directory in liste di immagini
//! 5. Esegue la pipeline e riporta i risultati; exit code 1 se qualcosa fallisce
//!
//! ## Esempio di utilizzo:
//! ```bash
//! image-upload photo.jpg --base-url https://api.example.com --token $TOKEN -m "Analyze this image"
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use image_upload_pipeline::file_manager::FileManager;
use image_upload_pipeline::json_output::JsonMessage;
use image_upload_pipeline::progress::{BatchStats, ProgressManager};
use image_upload_pipeline::{
    BatchUploader, Config, PipelineInput, Platform, TransformerKind, UploadPipeline,
};

#[derive(Parser)]
#[command(name = "image-upload")]
#[command(about = "Downscale, re-encode and upload images to a remote service")]
struct Args {
    /// Image files or directories to upload
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Base URL of the remote service
    #[arg(long, env = "IMAGE_UPLOAD_BASE_URL")]
    base_url: String,

    /// Bearer token for the remote service
    #[arg(long, env = "IMAGE_UPLOAD_TOKEN", hide_env_values = true)]
    token: String,

    /// Optional message sent along with each image
    #[arg(short, long)]
    message: Option<String>,

    /// Longest side allowed before upload, in pixels
    #[arg(long)]
    max_dimension: Option<u32>,

    /// JPEG quality as a fraction in (0, 1]
    #[arg(short, long)]
    quality: Option<f32>,

    /// Path appended to the base URL
    #[arg(long)]
    upload_path: Option<String>,

    /// Platform whose path conventions apply (android, ios, linux, macos, windows, web)
    #[arg(long)]
    platform: Option<Platform>,

    /// Resize backend (builtin, magick)
    #[arg(long)]
    transformer: Option<TransformerKind>,

    /// Directory for resized temporary files
    #[arg(long)]
    temp_dir: Option<PathBuf>,

    /// HTTP request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Number of concurrent uploads
    #[arg(short, long)]
    workers: Option<usize>,

    /// Configuration file (default: <config dir>/image-upload/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the effective configuration to the config file
    #[arg(long)]
    save_config: bool,

    /// Output JSON lines for programmatic use
    #[arg(long)]
    json: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn apply_to(&self, config: &mut Config) {
        if let Some(max_dimension) = self.max_dimension {
            config.max_dimension = max_dimension;
        }
        if let Some(quality) = self.quality {
            config.jpeg_quality = quality;
        }
        if let Some(ref upload_path) = self.upload_path {
            config.upload_path = upload_path.clone();
        }
        if let Some(platform) = self.platform {
            config.platform = platform;
        }
        if let Some(transformer) = self.transformer {
            config.transformer = transformer;
        }
        if let Some(ref temp_dir) = self.temp_dir {
            config.temp_dir = Some(temp_dir.clone());
        }
        if let Some(timeout) = self.timeout {
            config.request_timeout_secs = Some(timeout);
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if self.json {
            config.json_output = true;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let succeeded = match run(&args).await {
        Ok(succeeded) => succeeded,
        Err(e) => {
            if args.json {
                JsonMessage::error(e.to_string(), Some(format!("{:#}", e))).emit();
            } else {
                error!("{:#}", e);
            }
            false
        }
    };

    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}

async fn run(args: &Args) -> Result<bool> {
    let config_path = args.config.clone().or_else(Config::default_path);
    let mut config = match config_path {
        Some(ref path) => Config::from_file(path).await?,
        None => Config::default(),
    };
    args.apply_to(&mut config);
    config.validate()?;

    if args.save_config {
        let path = config_path.ok_or_else(|| anyhow::anyhow!("No config file location available"))?;
        config.save_to_file(&path).await?;
        info!("Saved configuration to {}", path.display());
    }

    let files = FileManager::collect_inputs(&args.paths);
    if files.is_empty() {
        return Err(anyhow::anyhow!("No images found in the given paths"));
    }

    let template = PipelineInput::new("", args.token.clone(), args.base_url.clone())
        .with_annotation(args.message.clone());
    let pipeline = UploadPipeline::from_config(&config)?;

    if config.json_output {
        JsonMessage::start(files.len(), &args.base_url, &config).emit();
    } else {
        info!(
            "Uploading {} file(s) to {} (max {}px, quality {:.2}, {} backend)",
            files.len(),
            args.base_url,
            config.max_dimension,
            config.jpeg_quality,
            config.transformer
        );
    }

    let start = Instant::now();
    let stats = if files.len() == 1 && !config.json_output {
        upload_single(pipeline, &files[0], &template).await
    } else {
        upload_batch(pipeline, files, &template, &config).await?
    };

    if config.json_output {
        JsonMessage::complete(&stats, start.elapsed().as_secs_f64()).emit();
    } else {
        info!("{}", stats.format_summary());
    }

    Ok(!stats.has_failures())
}

/// One file: spinner driven by stage events, result printed as JSON
async fn upload_single(
    pipeline: UploadPipeline,
    path: &Path,
    template: &PipelineInput,
) -> BatchStats {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let pipeline = pipeline.with_stage_events(tx);
    let spinner = ProgressManager::spinner("Starting");

    let watcher = {
        let spinner = spinner.clone();
        tokio::spawn(async move {
            while let Some(stage) = rx.recv().await {
                spinner.set_stage(stage);
            }
        })
    };

    let input = PipelineInput {
        path: path.to_string_lossy().into_owned(),
        ..template.clone()
    };
    let report = pipeline.run_with_report(&input).await;
    drop(pipeline);
    let _ = watcher.await;

    let status = if report.result.is_success() { "✅" } else { "❌" };
    spinner.finish(&format!("{} {}", status, report.original.file_name()));

    match serde_json::to_string_pretty(&report.result) {
        Ok(json) => println!("{}", json),
        Err(e) => error!("Failed to serialize result: {}", e),
    }

    let mut stats = BatchStats::new();
    stats.record(&report);
    stats
}

async fn upload_batch(
    pipeline: UploadPipeline,
    files: Vec<PathBuf>,
    template: &PipelineInput,
    config: &Config,
) -> Result<BatchStats> {
    let progress = (!config.json_output).then(|| ProgressManager::new(files.len() as u64));
    let batch = BatchUploader::new(pipeline, config.workers).with_json_output(config.json_output);
    let items = batch.run(files, template, progress.clone()).await?;

    let mut stats = BatchStats::new();
    for item in &items {
        stats.record(&item.report);
        if let Some(error) = item.report.result.error() {
            if !config.json_output {
                error!("{}: {}", item.path.display(), error);
            }
        }
    }

    if let Some(progress) = progress {
        progress.finish(&stats.format_summary());
    }
    Ok(stats)
}
