//! CLI subcommands.

pub mod config;
pub mod extract;
pub mod ingest;
pub mod models;

use std::path::Path;

use clap::ValueEnum;
use tracing::debug;

use kyc_core::models::config::{KycConfig, OcrProviderKind};

/// Text-extraction provider selectable on the command line.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ProviderArg {
    /// Google Cloud Vision (network)
    Primary,
    /// Local PaddleOCR models (offline)
    Fallback,
}

impl From<ProviderArg> for OcrProviderKind {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Primary => OcrProviderKind::Primary,
            ProviderArg::Fallback => OcrProviderKind::Fallback,
        }
    }
}

/// Load the config given with `--config`, else the default file if present,
/// else built-in defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<KycConfig> {
    if let Some(path) = config_path {
        return Ok(KycConfig::from_file(Path::new(path))?);
    }

    let default_path = config::default_config_path();
    if default_path.exists() {
        debug!("Using config file {}", default_path.display());
        Ok(KycConfig::from_file(&default_path)?)
    } else {
        Ok(KycConfig::default())
    }
}
