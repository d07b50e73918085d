//! Pixelift CLI Tool
//!
//! Command-line interface for batch image enhancement, AI upscaling, and
//! vectorization using the unified pipeline processor.

use crate::{
    config::{
        DenoiseLevel, DpiSetting, OutputTarget, ProcessOptions, UpscaleFactor, VectorPrecision,
    },
    processor::PipelineProcessor,
    queue::{ProcessingQueue, QueueObserver},
    services::ProgressUpdate,
    tracing_config::TracingConfig,
    types::{BatchStats, ImageItem, ItemStatus, ProcessResult},
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

/// Pixelift CLI tool
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "pixelift")]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Input image files or directories
    #[arg(value_name = "INPUT", required = true)]
    pub input: Vec<String>,

    /// Output directory (defaults to writing beside each input)
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = CliFormat::Png)]
    pub format: CliFormat,

    /// Upscale factor applied to pixel dimensions (2, 3, or 4)
    #[arg(short, long, default_value_t = 2)]
    pub scale: u32,

    /// Denoise tier for the enhancement stage
    #[arg(long, value_enum, default_value_t = CliDenoise::Light)]
    pub denoise: CliDenoise,

    /// Embed this DPI into raster outputs (72, 150, 300, or 600)
    #[arg(long)]
    pub dpi: Option<u32>,

    /// Detail tier for vectorization
    #[arg(long, value_enum, default_value_t = CliPrecision::Medium)]
    pub precision: CliPrecision,

    /// Skip the deterministic enhancement stage
    #[arg(long)]
    pub no_enhance: bool,

    /// Run the AI super-resolution stage
    #[arg(long)]
    pub ai_upscale: bool,

    /// Run the bitmap-to-vector tracing stage
    #[arg(long)]
    pub vectorize: bool,

    /// Process directories recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
pub enum CliFormat {
    Png,
    Svg,
    Both,
}

impl From<CliFormat> for OutputTarget {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Png => Self::Png,
            CliFormat::Svg => Self::Svg,
            CliFormat::Both => Self::Both,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
pub enum CliDenoise {
    None,
    Light,
    Medium,
    Heavy,
}

impl From<CliDenoise> for DenoiseLevel {
    fn from(denoise: CliDenoise) -> Self {
        match denoise {
            CliDenoise::None => Self::None,
            CliDenoise::Light => Self::Light,
            CliDenoise::Medium => Self::Medium,
            CliDenoise::Heavy => Self::Heavy,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
pub enum CliPrecision {
    Low,
    Medium,
    High,
}

impl From<CliPrecision> for VectorPrecision {
    fn from(precision: CliPrecision) -> Self {
        match precision {
            CliPrecision::Low => Self::Low,
            CliPrecision::Medium => Self::Medium,
            CliPrecision::High => Self::High,
        }
    }
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    TracingConfig::new()
        .with_verbosity(cli.verbose)
        .init()
        .context("Failed to initialize tracing")?;

    let options = build_options(&cli).context("Invalid CLI arguments")?;

    let files = collect_input_files(&cli.input, cli.recursive)?;
    if files.is_empty() {
        warn!("No supported image files found in the provided inputs");
        return Ok(());
    }
    info!("Found {} image file(s) to process", files.len());

    if let Some(output) = &cli.output {
        std::fs::create_dir_all(output)
            .with_context(|| format!("Failed to create output directory {}", output.display()))?;
    }

    let mut items = Vec::with_capacity(files.len());
    for path in &files {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let id = uuid::Uuid::new_v4().to_string();
        items.push((path.clone(), ImageItem::new(id, bytes, options.clone())));
    }

    let observer = std::sync::Arc::new(CliProgressObserver::new(items.len()));
    let mut queue = ProcessingQueue::new(PipelineProcessor::new(), observer.clone());
    queue.add_images(items.iter().map(|(_, item)| item.clone()).collect());

    let start_time = Instant::now();
    let stats = queue.start().await?;
    observer.finish();

    write_outputs(&mut queue, &items, cli.output.as_deref())?;
    print_summary(queue.items(), stats, start_time.elapsed().as_secs_f64());

    if stats.failed > 0 {
        anyhow::bail!("{} image(s) failed", stats.failed);
    }
    Ok(())
}

/// Convert CLI arguments to a validated options snapshot
fn build_options(cli: &Cli) -> Result<ProcessOptions> {
    let dpi = match cli.dpi {
        Some(value) => DpiSetting::Fixed(value),
        None => DpiSetting::Original,
    };
    let options = ProcessOptions::builder()
        .basic_enhancement(!cli.no_enhance)
        .ai_upscale(cli.ai_upscale)
        .vectorize(cli.vectorize)
        .upscale_factor(UpscaleFactor::from_scale(cli.scale))
        .denoise_level(cli.denoise.into())
        .output_format(cli.format.into())
        .dpi(dpi)
        .vectorize_precision(cli.precision.into())
        .build()?;
    Ok(options)
}

/// Expand the positional inputs into a sorted list of image files
fn collect_input_files(inputs: &[String], recursive: bool) -> Result<Vec<PathBuf>> {
    let extensions = ["jpg", "jpeg", "png"];
    let mut files = Vec::new();

    for input in inputs {
        let path = PathBuf::from(input);
        if path.is_file() {
            if is_image_file(&path, &extensions) {
                files.push(path);
            } else {
                warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            if recursive {
                for entry in walkdir::WalkDir::new(&path) {
                    let entry = entry?;
                    if entry.file_type().is_file() && is_image_file(entry.path(), &extensions) {
                        files.push(entry.path().to_path_buf());
                    }
                }
            } else {
                for entry in std::fs::read_dir(&path)? {
                    let entry = entry?;
                    if entry.file_type()?.is_file() && is_image_file(&entry.path(), &extensions) {
                        files.push(entry.path());
                    }
                }
            }
        } else {
            warn!("Input not found: {}", path.display());
        }
    }

    // Sort alphanumerically for consistent processing order
    files.sort();
    files.dedup();
    Ok(files)
}

/// Check if file is an image based on extension
fn is_image_file(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.contains(&ext.to_lowercase().as_str()))
}

/// Batch progress bar driven by queue callbacks
struct CliProgressObserver {
    bar: ProgressBar,
    current_index: AtomicUsize,
}

impl CliProgressObserver {
    fn new(total: usize) -> Self {
        let bar = ProgressBar::new((total * 100) as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Self {
            bar,
            current_index: AtomicUsize::new(0),
        }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }

    fn set_image_progress(&self, progress: u8) {
        let base = self.current_index.load(Ordering::SeqCst) * 100;
        self.bar.set_position((base + progress as usize) as u64);
    }
}

#[async_trait]
impl QueueObserver for CliProgressObserver {
    async fn on_image_start(&self, _id: &str, index: usize, total: usize) {
        self.current_index.store(index, Ordering::SeqCst);
        self.bar.set_message(format!("image {}/{}", index + 1, total));
    }

    fn on_image_progress(&self, _id: &str, update: &ProgressUpdate) {
        self.set_image_progress(update.progress);
        self.bar.set_message(update.description.clone());
    }

    async fn on_image_complete(&self, _id: &str, _result: &ProcessResult) {
        self.set_image_progress(100);
    }

    async fn on_image_error(&self, id: &str, error: &str) {
        self.set_image_progress(100);
        self.bar.println(format!("failed {id}: {error}"));
    }
}

/// Write outputs beside the inputs or into the output directory
fn write_outputs(
    queue: &mut ProcessingQueue,
    sources: &[(PathBuf, ImageItem)],
    output_dir: Option<&Path>,
) -> Result<()> {
    let arena = queue.processor_mut().arena().clone();

    for (index, item) in queue.items().iter().enumerate() {
        let Some(result) = &item.result else { continue };
        let source = &sources[index].0;
        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("output");
        let base_dir = output_dir
            .map(Path::to_path_buf)
            .or_else(|| source.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));

        if let Some(handle) = &result.raster {
            if let Some(bytes) = arena.get(handle) {
                let path = base_dir.join(format!("{stem}_lifted.png"));
                std::fs::write(&path, bytes.as_slice())
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                match crate::codec::read_png_dpi(&bytes) {
                    Ok(Some(dpi)) => info!("Wrote {} ({dpi} dpi)", path.display()),
                    _ => info!("Wrote {}", path.display()),
                }
            }
        }
        if let Some(handle) = &result.vector {
            if let Some(bytes) = arena.get(handle) {
                let path = base_dir.join(format!("{stem}_lifted.svg"));
                std::fs::write(&path, bytes.as_slice())
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                info!("Wrote {}", path.display());
            }
        }
    }
    Ok(())
}

/// Per-image summary plus batch totals
fn print_summary(items: &[ImageItem], stats: BatchStats, elapsed_secs: f64) {
    for item in items {
        match item.status {
            ItemStatus::Completed => {
                let elapsed = item.result.as_ref().map_or(0, ProcessResult::elapsed_ms);
                info!("{}: completed in {elapsed}ms", item.id);
            },
            ItemStatus::Failed => {
                info!(
                    "{}: failed ({})",
                    item.id,
                    item.error.as_deref().unwrap_or("unknown error")
                );
            },
            ItemStatus::Skipped => {
                info!(
                    "{}: skipped ({})",
                    item.id,
                    item.error.as_deref().unwrap_or("no reason recorded")
                );
            },
            ItemStatus::Pending | ItemStatus::Processing => {
                info!("{}: not processed", item.id);
            },
        }
    }
    info!(
        "Batch finished in {elapsed_secs:.2}s: {} completed, {} failed, {} skipped of {}",
        stats.completed, stats.failed, stats.skipped, stats.total
    );
}
