//! Ingest command - run the pipeline over every image in a directory.

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use kyc_core::{Pipeline, Stage, discover_images};

use super::{ProviderArg, load_config};

/// Arguments for the ingest command.
#[derive(Args)]
pub struct IngestArgs {
    /// Directory of .jpg/.jpeg/.png images (overrides config)
    #[arg(short, long)]
    input_dir: Option<PathBuf>,

    /// JSON record store (overrides config)
    #[arg(short, long)]
    output_file: Option<PathBuf>,

    /// Text-extraction provider (overrides config)
    #[arg(long, value_enum)]
    ocr_provider: Option<ProviderArg>,
}

pub async fn run(args: IngestArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if let Some(input_dir) = args.input_dir {
        config.pipeline.input_dir = input_dir;
    }
    if let Some(output_file) = args.output_file {
        config.pipeline.output_file = output_file;
    }
    if let Some(provider) = args.ocr_provider {
        config.pipeline.ocr_provider = provider.into();
    }

    let images = discover_images(&config.pipeline.input_dir)?;
    if images.is_empty() {
        println!(
            "{} No images found in {}",
            style("ℹ").blue(),
            config.pipeline.input_dir.display()
        );
        return Ok(());
    }

    println!(
        "{} Found {} images to process ({} OCR)",
        style("ℹ").blue(),
        images.len(),
        config.pipeline.ocr_provider
    );

    let pipeline = Pipeline::from_config(&config)?;

    let pb = ProgressBar::new(images.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} images")?
            .progress_chars("=>-"),
    );

    let report = pipeline
        .run_with_progress(&images, |outcome| {
            debug!(
                "{} finished in {}ms",
                outcome.path.display(),
                outcome.processing_time_ms
            );
            pb.inc(1);
        })
        .await;

    pb.finish_and_clear();

    println!(
        "{} Processed {} images in {:?}",
        style("✓").green(),
        report.scanned(),
        start.elapsed()
    );
    println!(
        "   {} added, {} duplicates, {} failed",
        style(report.added()).green(),
        style(report.duplicates()).yellow(),
        style(report.failed()).red()
    );

    if report.failed() > 0 {
        let breakdown: Vec<String> = [
            Stage::Extraction,
            Stage::Normalization,
            Stage::Coercion,
            Stage::Store,
        ]
        .into_iter()
        .filter(|s| report.failed_at(*s) > 0)
        .map(|s| format!("{} {}", report.failed_at(s), s))
        .collect();
        println!("   failed at: {}", breakdown.join(", "));

        println!();
        println!("{}", style("Dropped images:").red());
        for (path, error) in report.failures() {
            println!("  - {}: {}", path.display(), error);
        }
    }

    if report.added() > 0 {
        println!(
            "{} Records written to {}",
            style("✓").green(),
            pipeline.store().path().display()
        );
    }

    Ok(())
}
