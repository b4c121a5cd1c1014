//! Input image discovery.

use std::io;
use std::path::{Path, PathBuf};

use glob::{Pattern, glob};

/// Image extensions accepted by the pipeline (compared case-insensitively).
pub const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Whether `path` has an accepted image extension.
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// List images directly under `dir`, sorted by path.
pub fn discover_images(dir: &Path) -> io::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("input directory not found: {}", dir.display()),
        ));
    }

    let pattern = format!("{}/*", Pattern::escape(&dir.to_string_lossy()));
    let entries = glob(&pattern).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file() && is_supported_image(p))
        .collect();

    files.sort();
    Ok(files)
}
