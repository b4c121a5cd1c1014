//! Extract command - recover a record from a single image without storing it.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use console::style;
use tracing::info;

use kyc_core::Pipeline;
use kyc_core::discovery::is_supported_image;

use super::{ProviderArg, load_config};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input image (.jpg, .jpeg or .png)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Text-extraction provider (overrides config)
    #[arg(long, value_enum)]
    ocr_provider: Option<ProviderArg>,
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    if !args.input.is_file() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }
    if !is_supported_image(&args.input) {
        anyhow::bail!(
            "Unsupported file format: {} (expected .jpg, .jpeg or .png)",
            args.input.display()
        );
    }

    let mut config = load_config(config_path)?;
    if let Some(provider) = args.ocr_provider {
        config.pipeline.ocr_provider = provider.into();
    }

    info!("Processing file: {}", args.input.display());

    let pipeline = Pipeline::from_config(&config)?;
    let record = pipeline.extract_record(&args.input).await?;

    let output = serde_json::to_string_pretty(&record)?;

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

    Ok(())
}
