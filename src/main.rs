use clap::Parser;
use std::path::{Path, PathBuf};

use pkr_detect::annotate;
use pkr_detect::error::DetectError;
use pkr_detect::runner;

/// Detect Pakistani Rupee banknotes with a trained YOLOv8 model.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to the trained model (.onnx file)
    #[arg(long, default_value = "best.onnx")]
    model: PathBuf,

    /// Path to the image file or directory
    #[arg(long)]
    image: PathBuf,

    /// Confidence threshold
    #[arg(long, default_value_t = 0.25)]
    conf: f32,

    /// IoU threshold for non-max suppression
    #[arg(long, default_value_t = 0.45)]
    iou: f32,

    /// Save annotated detection results
    #[arg(long, default_value_t = true)]
    save: bool,
}

fn main() {
    let args = Args::parse();

    let mut detector = match runner::load_model(&args.model, args.conf, args.iou) {
        Ok(detector) => detector,
        Err(e @ DetectError::ModelNotFound(_)) => {
            println!("❌ {e}");
            println!("Available models:");
            for model in runner::available_models(Path::new(".")) {
                println!("  - {}", model.display());
            }
            return;
        }
        Err(e) => {
            println!("❌ {e}");
            return;
        }
    };

    let images = match runner::resolve_images(&args.image) {
        Ok(images) => images,
        Err(e) => {
            println!("❌ {e}");
            return;
        }
    };

    if args.image.is_dir() {
        println!("📁 Processing {} images...", images.len());
    }

    let run_dir = annotate::run_dir();
    for image in &images {
        runner::detect_banknotes(&mut detector, image, args.save, &run_dir);
    }
}
