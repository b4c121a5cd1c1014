//! Local OCR provider using `pure-onnx-ocr` (pure Rust, no network).

use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;

use async_trait::async_trait;
use image::{DynamicImage, GenericImageView};
use tracing::{debug, info};

use crate::error::OcrError;

use super::{DETECTION_MODEL, DICTIONARY, RECOGNITION_MODEL, TextExtractor, non_blank};

/// Fallback OCR provider running PaddleOCR models in-process.
pub struct LocalOcr {
    engine: Mutex<pure_onnx_ocr::engine::OcrEngine>,
    keep_unk: bool,
}

/// A recognized line with its top-left corner, used for ordering.
struct Line {
    x: f32,
    y: f32,
    text: String,
}

impl LocalOcr {
    /// Create an engine from model files in a directory.
    pub fn from_dir(model_dir: &Path, keep_unk: bool) -> Result<Self, OcrError> {
        let det_path = model_dir.join(DETECTION_MODEL);
        let rec_path = model_dir.join(RECOGNITION_MODEL);
        let dict_path = model_dir.join(DICTIONARY);

        for path in [&det_path, &rec_path, &dict_path] {
            if !path.exists() {
                return Err(OcrError::ModelLoad(format!("missing {}", path.display())));
            }
        }

        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&det_path)
            .rec_model_path(&rec_path)
            .dictionary_path(&dict_path)
            .build()
            .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))?;

        info!("Loaded local OCR models from {}", model_dir.display());

        Ok(Self {
            engine: Mutex::new(engine),
            keep_unk,
        })
    }

    /// Recognize text in a decoded image.
    pub fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError> {
        let start = Instant::now();
        let (width, height) = image.dimensions();

        let results = {
            let engine = self
                .engine
                .lock()
                .map_err(|_| OcrError::Recognition("engine lock poisoned".to_string()))?;
            engine
                .run_from_image(image)
                .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)))?
        };

        let mut lines: Vec<Line> = results
            .iter()
            .map(|r| {
                let (x, y) = top_left(&r.bounding_box);
                Line {
                    x,
                    y,
                    text: clean_text(&r.text, self.keep_unk),
                }
            })
            .collect();

        sort_reading_order(&mut lines);

        let text = lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        debug!(
            "Local OCR: {} lines from {}x{} image in {}ms",
            lines.len(),
            width,
            height,
            start.elapsed().as_millis()
        );

        Ok(text)
    }
}

#[async_trait]
impl TextExtractor for LocalOcr {
    fn name(&self) -> &str {
        "local-paddleocr"
    }

    async fn extract(&self, image_path: &Path) -> Result<String, OcrError> {
        let image = image::open(image_path)
            .map_err(|e| OcrError::Recognition(format!("failed to decode image: {}", e)))?;
        non_blank(self.recognize(&image)?)
    }
}

fn clean_text(text: &str, keep_unk: bool) -> String {
    if keep_unk {
        text.to_string()
    } else {
        text.replace("[UNK]", " ")
    }
}

/// Smallest x and y over the first four polygon points.
fn top_left(polygon: &pure_onnx_ocr::Polygon<f64>) -> (f32, f32) {
    polygon
        .exterior()
        .coords()
        .take(4)
        .fold((f32::INFINITY, f32::INFINITY), |(x, y), c| {
            (x.min(c.x as f32), y.min(c.y as f32))
        })
}

/// Top-to-bottom in 20px rows, then left-to-right.
fn sort_reading_order(lines: &mut [Line]) {
    lines.sort_by(|a, b| {
        let row_a = (a.y / 20.0) as i32;
        let row_b = (b.y / 20.0) as i32;
        if row_a != row_b {
            row_a.cmp(&row_b)
        } else {
            a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal)
        }
    });
}
