//! Straight-line orchestration: resolve the input into image files, run one
//! inference per file, print a per-image report. A failure on one file is
//! reported and the batch moves on.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::annotate;
use crate::error::DetectError;
use crate::labels;
use crate::yolo::model::{Detection, Detector, YoloDetector};

/// Extensions picked up when scanning a directory. A single-file argument is
/// trusted as given and never filtered.
pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "tiff"];

const MODEL_EXTENSION: &str = "onnx";

/// Builds the detector for a model artifact. Any `ort` failure is absorbed
/// here; the caller only ever sees a `DetectError`.
pub fn load_model(
    model_path: &Path,
    conf_threshold: f32,
    iou_threshold: f32,
) -> Result<YoloDetector, DetectError> {
    if !model_path.exists() {
        return Err(DetectError::ModelNotFound(model_path.to_path_buf()));
    }
    let detector = YoloDetector::new(model_path, conf_threshold, iou_threshold)
        .map_err(|e| DetectError::ModelLoad(format!("{e:#}")))?;
    println!("✅ Model loaded successfully: {}", model_path.display());
    Ok(detector)
}

/// Model artifacts directly inside `dir`, as a hint when `--model` is wrong.
pub fn available_models(dir: &Path) -> Vec<PathBuf> {
    let mut models: Vec<PathBuf> = fs::read_dir(dir)
        .into_iter()
        .flatten()
        .filter_map(|entry| entry.ok())
        .map(|entry| PathBuf::from(entry.file_name()))
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case(MODEL_EXTENSION))
                .unwrap_or(false)
        })
        .collect();
    models.sort();
    models
}

/// Classifies the `--image` argument into a concrete batch of files.
///
/// A file is a batch of one. A directory yields its direct children with a
/// known image extension, sorted so batch order is deterministic. An empty
/// directory is its own condition so the caller can end the run normally.
pub fn resolve_images(path: &Path) -> Result<Vec<PathBuf>, DetectError> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if path.is_dir() {
        let mut files: Vec<PathBuf> = fs::read_dir(path)
            .map_err(|_| DetectError::ImagePathNotFound(path.to_path_buf()))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.is_file() && has_image_extension(p))
            .collect();
        if files.is_empty() {
            return Err(DetectError::EmptyDirectory(path.to_path_buf()));
        }
        files.sort();
        return Ok(files);
    }
    Err(DetectError::ImagePathNotFound(path.to_path_buf()))
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Runs one inference call and prints the report for it.
///
/// Returns the batch on success (possibly empty, which is not a failure) and
/// `None` when inference itself failed; either way the caller can keep going
/// with the next file.
pub fn detect_banknotes<D: Detector>(
    detector: &mut D,
    image_path: &Path,
    save: bool,
    run_dir: &Path,
) -> Option<Vec<Detection>> {
    let detections = match detector.detect_file(image_path) {
        Ok(detections) => detections,
        Err(e) => {
            println!("❌ {}", DetectError::Inference(format!("{e:#}")));
            return None;
        }
    };

    print!("{}", render_report(image_path, &detections));

    if save && !detections.is_empty() {
        if let Err(e) = annotate::save_annotated(image_path, &detections, run_dir) {
            println!("❌ Error saving results: {e:#}");
        }
    }

    Some(detections)
}

/// Per-image console report, one block per detection in batch order.
pub fn render_report(image_path: &Path, detections: &[Detection]) -> String {
    let mut report = String::new();
    let _ = writeln!(report, "\n🔍 Detection Results for {}:", image_path.display());
    let _ = writeln!(report, "{}", "-".repeat(50));

    if detections.is_empty() {
        let _ = writeln!(report, "No banknotes detected.");
        return report;
    }

    for (i, det) in detections.iter().enumerate() {
        let _ = writeln!(
            report,
            "Banknote {}: {}",
            i + 1,
            labels::class_name(det.class_id)
        );
        let _ = writeln!(report, "  Confidence: {:.3}", det.confidence);
        let _ = writeln!(
            report,
            "  Bounding Box: ({:.1}, {:.1}) to ({:.1}, {:.1})",
            det.x1, det.y1, det.x2, det.y2
        );
        let _ = writeln!(report);
    }

    let _ = writeln!(report, "Total banknotes detected: {}", detections.len());
    report
}
