//! Models command - fetch and inspect the fallback OCR model files.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use console::style;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};

use kyc_core::ocr::{DETECTION_MODEL, DICTIONARY, RECOGNITION_MODEL};

use super::load_config;

const MODEL_FILES: [&str; 3] = [DETECTION_MODEL, RECOGNITION_MODEL, DICTIONARY];

/// Arguments for the models command.
#[derive(Args)]
pub struct ModelsArgs {
    #[command(subcommand)]
    command: ModelsCommand,
}

#[derive(Subcommand)]
enum ModelsCommand {
    /// Download the model files into the model directory
    Download(DownloadArgs),

    /// Show which model files are present
    Status,
}

#[derive(Args)]
struct DownloadArgs {
    /// Base URL serving det.onnx, latin_rec.onnx and latin_dict.txt
    /// (overrides local_ocr.model_base_url)
    #[arg(long)]
    base_url: Option<String>,

    /// Output directory (overrides local_ocr.model_dir)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Re-download files that already exist
    #[arg(long)]
    force: bool,
}

pub async fn run(args: ModelsArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    match args.command {
        ModelsCommand::Download(download_args) => {
            let base_url = download_args
                .base_url
                .clone()
                .or_else(|| config.local_ocr.model_base_url.clone())
                .ok_or_else(|| {
                    anyhow::anyhow!(
                        "No model source configured. Pass --base-url or set local_ocr.model_base_url."
                    )
                })?;
            let output_dir = download_args
                .output
                .clone()
                .unwrap_or_else(|| config.local_ocr.resolved_model_dir());
            download_models(&base_url, &output_dir, download_args.force).await
        }
        ModelsCommand::Status => check_status(&config.local_ocr.resolved_model_dir()),
    }
}

async fn download_models(base_url: &str, output_dir: &Path, force: bool) -> anyhow::Result<()> {
    fs::create_dir_all(output_dir)?;

    println!(
        "{} Downloading OCR models to {}",
        style("ℹ").blue(),
        output_dir.display()
    );
    println!();

    let client = reqwest::Client::builder()
        .user_agent(concat!("kyc-cli/", env!("CARGO_PKG_VERSION")))
        .timeout(std::time::Duration::from_secs(300))
        .build()?;

    let mut downloaded = 0;
    let mut skipped = 0;
    let mut failed = 0;

    for filename in MODEL_FILES {
        let path = output_dir.join(filename);

        if path.exists() && !force {
            let size = fs::metadata(&path)?.len();
            println!(
                "  {} {} (already exists, {})",
                style("✓").green(),
                filename,
                format_size(size)
            );
            skipped += 1;
            continue;
        }

        let url = model_url(base_url, filename);

        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {spinner:.green} {msg:<20} [{bar:25.cyan/blue}] {bytes}/{total_bytes}")?
                .progress_chars("=>-"),
        );
        pb.set_message(filename.to_string());

        match download_file(&client, &url, &path, &pb).await {
            Ok(()) => {
                pb.finish_with_message(format!("{} {}", style("✓").green(), filename));
                downloaded += 1;
            }
            Err(e) => {
                pb.finish_with_message(format!("{} {} - {}", style("✗").red(), filename, e));
                failed += 1;
            }
        }
    }

    println!();

    if failed == 0 {
        println!(
            "{} Models ready ({} downloaded, {} already present)",
            style("✓").green().bold(),
            downloaded,
            skipped
        );
    } else {
        println!(
            "{} Download completed with errors",
            style("⚠").yellow().bold()
        );
        println!(
            "   {} downloaded, {} skipped, {} failed",
            downloaded, skipped, failed
        );
        println!("Retry with: kyc models download --force");
    }

    println!();
    check_status(output_dir)?;

    if failed > 0 {
        anyhow::bail!("{} model file(s) failed to download", failed);
    }

    Ok(())
}

fn model_url(base_url: &str, filename: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), filename)
}

async fn download_file(
    client: &reqwest::Client,
    url: &str,
    path: &Path,
    pb: &ProgressBar,
) -> anyhow::Result<()> {
    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        anyhow::bail!("HTTP {}", response.status());
    }

    if let Some(content_length) = response.content_length() {
        pb.set_length(content_length);
    }

    let temp_path = path.with_extension("tmp");
    let mut file = File::create(&temp_path)?;

    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)?;
        written += chunk.len() as u64;
        pb.set_position(written);
    }

    file.flush()?;
    drop(file);

    fs::rename(&temp_path, path)?;

    Ok(())
}

fn check_status(model_dir: &Path) -> anyhow::Result<()> {
    println!("{}", style("Model Status").bold());
    println!("Directory: {}", model_dir.display());
    println!();

    let mut all_present = true;
    let mut total_size: u64 = 0;

    for filename in MODEL_FILES {
        let path = model_dir.join(filename);
        let (status, size_str) = match fs::metadata(&path) {
            Ok(metadata) if metadata.len() > 0 => {
                total_size += metadata.len();
                (style("✓").green(), format_size(metadata.len()))
            }
            Ok(_) => {
                all_present = false;
                (style("⚠").yellow(), "empty".to_string())
            }
            Err(_) => {
                all_present = false;
                (style("✗").red(), "missing".to_string())
            }
        };

        println!("    {} {:<20} {:>10}", status, filename, size_str);
    }

    if all_present {
        println!(
            "    {} Ready ({} total)",
            style("✓").green(),
            format_size(total_size)
        );
    } else {
        println!(
            "    {} Run 'kyc models download --base-url <URL>' to fetch them",
            style("⚠").yellow()
        );
    }

    if !cfg!(feature = "local-ocr") {
        println!();
        println!(
            "{} This build has no local OCR support (feature `local-ocr` disabled).",
            style("ℹ").blue()
        );
    }

    Ok(())
}

fn format_size(bytes: u64) -> String {
    if bytes >= 1_000_000_000 {
        format!("{:.1}GB", bytes as f64 / 1_000_000_000.0)
    } else if bytes >= 1_000_000 {
        format!("{:.1}MB", bytes as f64 / 1_000_000.0)
    } else if bytes >= 1_000 {
        format!("{:.1}KB", bytes as f64 / 1_000.0)
    } else {
        format!("{}B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_url_joins_base() {
        assert_eq!(
            model_url("https://host/models/", DETECTION_MODEL),
            "https://host/models/det.onnx"
        );
        assert_eq!(
            model_url("https://host/models", DICTIONARY),
            "https://host/models/latin_dict.txt"
        );
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512B");
        assert_eq!(format_size(2_000), "2.0KB");
        assert_eq!(format_size(7_500_000), "7.5MB");
    }

    #[test]
    fn test_status_with_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(DICTIONARY), "a\nb\n").unwrap();
        check_status(dir.path()).unwrap();
    }
}
