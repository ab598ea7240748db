//! Persists annotated copies of processed images when `--save` is on.

use anyhow::{Context, Result};
use chrono::Local;
use image::Rgb;
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use std::fs;
use std::path::{Path, PathBuf};

use crate::yolo::model::Detection;

const BOX_COLOR: Rgb<u8> = Rgb([255, 56, 56]);

/// Output directory for one process run, e.g. `runs/detect_20260806_141503`.
pub fn run_dir() -> PathBuf {
    PathBuf::from(format!(
        "runs/detect_{}",
        Local::now().format("%Y%m%d_%H%M%S")
    ))
}

/// Draws every detection box onto a copy of the source image and writes it
/// under `run_dir` with the source file name.
pub fn save_annotated(
    image_path: &Path,
    detections: &[Detection],
    run_dir: &Path,
) -> Result<PathBuf> {
    let mut img = image::open(image_path)
        .with_context(|| format!("failed to open image {}", image_path.display()))?
        .to_rgb8();

    for det in detections {
        let w = (det.x2 - det.x1).max(1.0).round() as u32;
        let h = (det.y2 - det.y1).max(1.0).round() as u32;
        let rect = Rect::at(det.x1.round() as i32, det.y1.round() as i32).of_size(w, h);
        draw_hollow_rect_mut(&mut img, rect, BOX_COLOR);
    }

    fs::create_dir_all(run_dir)
        .with_context(|| format!("failed to create {}", run_dir.display()))?;
    let file_name = image_path
        .file_name()
        .context("image path has no file name")?;
    let out_path = run_dir.join(file_name);
    img.save(&out_path)
        .with_context(|| format!("failed to write {}", out_path.display()))?;

    Ok(out_path)
}

#[cfg(test)]
mod test {
    use super::save_annotated;
    use crate::yolo::model::Detection;

    fn det(x1: f32, y1: f32, x2: f32, y2: f32) -> Detection {
        Detection {
            x1,
            y1,
            x2,
            y2,
            confidence: 0.9,
            class_id: 0,
        }
    }

    #[test]
    fn writes_annotated_copy_under_run_dir() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("note.png");
        image::RgbImage::new(64, 64).save(&src).unwrap();

        let run_dir = dir.path().join("run");
        let out = save_annotated(&src, &[det(10.0, 10.0, 30.0, 30.0)], &run_dir).unwrap();

        assert_eq!(out, run_dir.join("note.png"));
        assert!(out.is_file());
    }

    #[test]
    fn box_outside_image_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("note.png");
        image::RgbImage::new(32, 32).save(&src).unwrap();

        let run_dir = dir.path().join("run");
        save_annotated(&src, &[det(-5.0, -5.0, 100.0, 100.0)], &run_dir).unwrap();
    }

    #[test]
    fn missing_source_image_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone.png");
        let run_dir = dir.path().join("run");
        assert!(save_annotated(&missing, &[], &run_dir).is_err());
    }
}
