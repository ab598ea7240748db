pub mod model;

pub use model::{Detection, Detector, YoloDetector};
