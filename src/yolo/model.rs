use anyhow::{Context, Result};
use image::{imageops::FilterType, DynamicImage, GenericImageView};
use ndarray::{s, Array, ArrayView, Axis, Ix3, IxDyn};
use ort::{
    inputs,
    session::{builder::GraphOptimizationLevel, Session},
    value::Tensor,
};
use regex::Regex;
use std::path::Path;

use crate::labels;

/// One detected banknote: pixel-space box, score, model class id.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    pub class_id: usize,
}

/// Inference capability the runner is written against. `YoloDetector` is the
/// real implementation; tests substitute scripted ones.
pub trait Detector {
    fn detect_file(&mut self, image_path: &Path) -> Result<Vec<Detection>>;
}

pub struct YoloDetector {
    session: Session,
    input_width: u32,
    input_height: u32,
    conf_threshold: f32,
    iou_threshold: f32,
}

impl YoloDetector {
    pub fn new<P: AsRef<Path>>(
        model_path: P,
        conf_threshold: f32,
        iou_threshold: f32,
    ) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(model_path)?;

        let detector = Self {
            session,
            input_width: 640,
            input_height: 640,
            conf_threshold,
            iou_threshold,
        };

        // The artifact embeds its class list; a count mismatch means the
        // wrong model was handed in. Labels still come from the fixed table.
        if let Some(names) = detector.names() {
            if names.len() != labels::PKR_CLASSES.len() {
                println!(
                    "⚠️ Model reports {} classes, expected {}",
                    names.len(),
                    labels::PKR_CLASSES.len()
                );
            }
        }

        Ok(detector)
    }

    pub fn fetch_from_metadata(&self, key: &str) -> Option<String> {
        match self.session.metadata() {
            Err(_) => None,
            Ok(metadata) => metadata.custom(key).unwrap_or_else(|_| None),
        }
    }

    /// Class names embedded in the ONNX metadata, in id order.
    pub fn names(&self) -> Option<Vec<String>> {
        match self.fetch_from_metadata("names") {
            Some(names) => {
                let re = Regex::new(r#"(['"])([-()\w '"]+)(['"])"#).unwrap();
                let mut names_ = vec![];
                for (_, [_, name, _]) in re.captures_iter(&names).map(|x| x.extract()) {
                    names_.push(name.to_string());
                }
                Some(names_)
            }
            None => None,
        }
    }

    pub fn detect(&mut self, img: &DynamicImage) -> Result<Vec<Detection>> {
        let (input_tensor, original_w, original_h) = self.prepare_input(img);

        let output_array = {
            let outputs = self.session.run(inputs!["images" => input_tensor])?;

            let output_tensor = outputs["output0"].try_extract_tensor::<f32>()?;
            let (shape_ref, data_slice) = output_tensor;

            let shape_usize: Vec<usize> = shape_ref.iter().map(|&x| x as usize).collect();

            let output_view_dyn = ArrayView::from_shape(IxDyn(&shape_usize), data_slice)?;

            let output_view_3d = output_view_dyn
                .into_dimensionality::<Ix3>()
                .context("unexpected model output shape (expected 3 dims)")?;

            // [1, 4+nc, anchors] -> [1, anchors, 4+nc]
            output_view_3d.permuted_axes([0, 2, 1]).to_owned()
        };

        let detections = self.process_output(output_array, original_w, original_h);

        Ok(detections)
    }

    fn prepare_input(&self, img: &DynamicImage) -> (Tensor<f32>, u32, u32) {
        let (img_width, img_height) = (img.width(), img.height());
        let img_resized =
            img.resize_exact(self.input_width, self.input_height, FilterType::CatmullRom);

        let mut input = Array::zeros((1, 3, self.input_height as usize, self.input_width as usize));

        for pixel in img_resized.pixels() {
            let x = pixel.0 as usize;
            let y = pixel.1 as usize;
            let [r, g, b, _] = pixel.2 .0;
            input[[0, 0, y, x]] = (r as f32) / 255.0;
            input[[0, 1, y, x]] = (g as f32) / 255.0;
            input[[0, 2, y, x]] = (b as f32) / 255.0;
        }

        let tensor = Tensor::from_array(input).unwrap();
        (tensor, img_width, img_height)
    }

    fn process_output(
        &self,
        output: Array<f32, Ix3>,
        img_width: u32,
        img_height: u32,
    ) -> Vec<Detection> {
        let mut boxes = Vec::new();
        let output_2d = output.slice(s![0, .., ..]);

        for row in output_2d.axis_iter(Axis(0)) {
            let row: Vec<_> = row.iter().map(|x| *x).collect();

            let (class_id, prob) = row
                .iter()
                .skip(4)
                .enumerate()
                .map(|(index, value)| (index, *value))
                .reduce(|accum, row| if row.1 > accum.1 { row } else { accum })
                .unwrap_or((0, 0.0));

            if prob < self.conf_threshold {
                continue;
            }

            // cxcywh in model space back to source pixel space
            let xc = row[0] / (self.input_width as f32) * (img_width as f32);
            let yc = row[1] / (self.input_height as f32) * (img_height as f32);
            let w = row[2] / (self.input_width as f32) * (img_width as f32);
            let h = row[3] / (self.input_height as f32) * (img_height as f32);

            boxes.push(Detection {
                x1: xc - w / 2.0,
                y1: yc - h / 2.0,
                x2: xc + w / 2.0,
                y2: yc + h / 2.0,
                confidence: prob,
                class_id,
            });
        }

        non_max_suppression(boxes, self.iou_threshold)
    }
}

impl Detector for YoloDetector {
    fn detect_file(&mut self, image_path: &Path) -> Result<Vec<Detection>> {
        let img = image::open(image_path)
            .with_context(|| format!("failed to open image {}", image_path.display()))?;
        self.detect(&img)
    }
}

/// Greedy NMS: keep the highest-confidence box, drop everything that
/// overlaps it past the threshold, repeat.
pub fn non_max_suppression(mut boxes: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    boxes.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    let mut result = Vec::new();
    while !boxes.is_empty() {
        let current = boxes.remove(0);
        result.push(current.clone());
        boxes.retain(|box1| iou(&current, box1) < iou_threshold);
    }
    result
}

fn iou(box1: &Detection, box2: &Detection) -> f32 {
    let inter = intersection(box1, box2);
    let u = union_area(box1, box2, inter);
    if u == 0.0 {
        0.0
    } else {
        inter / u
    }
}

fn intersection(box1: &Detection, box2: &Detection) -> f32 {
    let x1 = box1.x1.max(box2.x1);
    let y1 = box1.y1.max(box2.y1);
    let x2 = box1.x2.min(box2.x2);
    let y2 = box1.y2.min(box2.y2);
    if x2 < x1 || y2 < y1 {
        return 0.0;
    }
    (x2 - x1) * (y2 - y1)
}

fn union_area(box1: &Detection, box2: &Detection, inter_area: f32) -> f32 {
    let area1 = (box1.x2 - box1.x1) * (box1.y2 - box1.y1);
    let area2 = (box2.x2 - box2.x1) * (box2.y2 - box2.y1);
    area1 + area2 - inter_area
}

#[cfg(test)]
mod test {
    use super::{iou, non_max_suppression, Detection};

    fn det(x1: f32, y1: f32, x2: f32, y2: f32, confidence: f32, class_id: usize) -> Detection {
        Detection {
            x1,
            y1,
            x2,
            y2,
            confidence,
            class_id,
        }
    }

    #[test]
    fn iou_of_disjoint_boxes_is_zero() {
        let a = det(0.0, 0.0, 10.0, 10.0, 0.9, 0);
        let b = det(20.0, 20.0, 30.0, 30.0, 0.9, 0);
        assert_eq!(iou(&a, &b), 0.0);
    }

    #[test]
    fn iou_of_identical_boxes_is_one() {
        let a = det(5.0, 5.0, 15.0, 25.0, 0.9, 0);
        assert!((iou(&a, &a.clone()) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn iou_of_half_overlapping_boxes() {
        // each 10x10, overlapping in a 5x10 strip: 50 / (100 + 100 - 50)
        let a = det(0.0, 0.0, 10.0, 10.0, 0.9, 0);
        let b = det(5.0, 0.0, 15.0, 10.0, 0.8, 0);
        assert!((iou(&a, &b) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn nms_suppresses_overlapping_lower_confidence_box() {
        let boxes = vec![
            det(0.0, 0.0, 10.0, 10.0, 0.8, 1),
            det(1.0, 1.0, 11.0, 11.0, 0.95, 1),
            det(100.0, 100.0, 120.0, 120.0, 0.5, 2),
        ];
        let kept = non_max_suppression(boxes, 0.45);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].confidence, 0.95);
        assert_eq!(kept[1].class_id, 2);
    }

    #[test]
    fn nms_keeps_disjoint_boxes_regardless_of_class() {
        let boxes = vec![
            det(0.0, 0.0, 10.0, 10.0, 0.6, 0),
            det(50.0, 50.0, 60.0, 60.0, 0.7, 0),
        ];
        let kept = non_max_suppression(boxes, 0.45);
        assert_eq!(kept.len(), 2);
        // highest confidence first
        assert_eq!(kept[0].confidence, 0.7);
    }
}
