//! Failure taxonomy for a detection run.
//!
//! Everything here ends up as a printed diagnostic; nothing from the ONNX
//! runtime or the image decoder is allowed to unwind past the call site that
//! produced it.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectError {
    #[error("Model file not found: {}", .0.display())]
    ModelNotFound(PathBuf),

    #[error("Error loading model: {0}")]
    ModelLoad(String),

    #[error("Image path not found: {}", .0.display())]
    ImagePathNotFound(PathBuf),

    #[error("No image files found in directory: {}", .0.display())]
    EmptyDirectory(PathBuf),

    #[error("Error during detection: {0}")]
    Inference(String),
}

#[cfg(test)]
mod test {
    use super::DetectError;
    use std::path::PathBuf;

    #[test]
    fn messages_match_console_output() {
        let err = DetectError::ModelNotFound(PathBuf::from("best.onnx"));
        assert_eq!(err.to_string(), "Model file not found: best.onnx");

        let err = DetectError::Inference("broken header".to_string());
        assert_eq!(err.to_string(), "Error during detection: broken header");
    }
}
