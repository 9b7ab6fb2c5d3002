//! Recognize command - OCR invoice images and extract their fields.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, info, warn};

use fapiao_core::invoice::{FieldExtractor, Normalizer};
use fapiao_core::models::config::FapiaoConfig;
use fapiao_core::ocr::{EngineFactory, ImageSource, LocalEngineFactory, Recognizer, RemoteOcrClient};

use super::{format_results, load_config, OutputFormat, RecognizedInvoice};

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

/// Arguments for the recognize command.
#[derive(Args)]
pub struct RecognizeArgs {
    /// Input images or glob patterns
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Model directory (overrides ocr.model_dir)
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    /// Use the remote OCR service instead of the local models
    #[arg(long)]
    remote: bool,

    /// Report missing required fields
    #[arg(long)]
    validate: bool,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

pub async fn run(args: RecognizeArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let mut config = load_config(config_path)?;
    if let Some(model_dir) = &args.model_dir {
        config.ocr.model_dir = model_dir.clone();
    }

    let files = expand_inputs(&args.inputs)?;
    if files.is_empty() {
        anyhow::bail!("No matching images found for: {}", args.inputs.join(" "));
    }
    info!("Recognizing {} images", files.len());

    let recognizer = create_recognizer(&config, args.remote).await?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );

    let extractor = FieldExtractor::new();
    let normalizer = Normalizer::new();
    let mut results = Vec::with_capacity(files.len());
    let mut failed = Vec::new();

    for path in files {
        pb.set_message(path.display().to_string());

        match recognize_file(&path, recognizer.as_ref(), &extractor, &normalizer).await {
            Ok(result) => results.push(result),
            Err(e) if args.continue_on_error => {
                warn!("Failed to recognize {}: {}", path.display(), e);
                failed.push((path, e.to_string()));
            }
            Err(e) => {
                error!("Failed to recognize {}: {}", path.display(), e);
                pb.abandon();
                return Err(e);
            }
        }

        pb.inc(1);
    }

    pb.finish_and_clear();

    if args.validate {
        for result in &results {
            let missing = result.result.record.missing_required();
            if !missing.is_empty() {
                let labels: Vec<&str> = missing.iter().map(|f| f.label()).collect();
                eprintln!(
                    "{} {}: missing {}",
                    style("!").yellow(),
                    result.source,
                    labels.join(", ")
                );
            }
        }
    }

    let output = format_results(&results, args.format)?;
    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if !failed.is_empty() {
        eprintln!("{}", style("Failed files:").red());
        for (path, error) in &failed {
            eprintln!("  - {}: {}", path.display(), error);
        }
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

/// Expand glob patterns, keeping supported image files only.
fn expand_inputs(inputs: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for input in inputs {
        for path in glob(input)?.filter_map(|r| r.ok()) {
            if is_image(&path) {
                files.push(path);
            } else {
                debug!("Skipping {}", path.display());
            }
        }
    }

    Ok(files)
}

pub(crate) fn is_image(path: &std::path::Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// The remote client, or the local engine loaded from the model directory.
pub(crate) async fn create_recognizer(
    config: &FapiaoConfig,
    remote: bool,
) -> anyhow::Result<Arc<dyn Recognizer>> {
    if remote {
        return Ok(Arc::new(RemoteOcrClient::new(&config.api)?));
    }

    if !config.ocr.models_present() {
        anyhow::bail!(
            "OCR models not found in {}.\n\n\
             Place {}, {} and {} there, pass --model-dir, or use --remote.",
            config.ocr.model_dir.display(),
            config.ocr.detection_model,
            config.ocr.recognition_model,
            config.ocr.dictionary
        );
    }

    LocalEngineFactory::new(config.ocr.clone())
        .init()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load OCR models: {}", e))
}

async fn recognize_file(
    path: &std::path::Path,
    recognizer: &dyn Recognizer,
    extractor: &FieldExtractor,
    normalizer: &Normalizer,
) -> anyhow::Result<RecognizedInvoice> {
    let bytes = fs::read(path)?;
    let image = ImageSource::new(path.display().to_string(), bytes);

    let raw = recognizer.recognize(&image).await?;
    let record = extractor.extract(&raw)?;

    Ok(RecognizedInvoice {
        source: image.key,
        result: normalizer.normalize(&record),
    })
}
