use std::path::Path;

use pkr_detect::labels;
use pkr_detect::yolo::model::{Detector, YoloDetector};

fn main() {
    let model_path = "best.onnx";
    let image_path = "demos/banknotes.jpg";

    let mut detector = YoloDetector::new(model_path, 0.25, 0.45).unwrap();

    println!("running detection...");
    let detections = detector.detect_file(Path::new(image_path)).unwrap();

    println!("{} banknotes found:", detections.len());
    for d in detections {
        println!(
            "{}: {:.2}%, ({:.1}, {:.1}) - ({:.1}, {:.1})",
            labels::class_name(d.class_id),
            d.confidence * 100.0,
            d.x1,
            d.y1,
            d.x2,
            d.y2
        );
    }
}
