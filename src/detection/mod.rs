mod nms;
mod preprocess;
pub mod types;
mod yolo;

pub use types::{BoundingBox, Detection, DetectionModel, FrameSize};
pub use yolo::YoloDetector;

use anyhow::Result;

/// Create the default detection model (YOLOv8 ONNX)
pub fn create_default_model(
    model_path: &str,
    input_size: u32,
    labels: Option<Vec<String>>,
) -> Result<Box<dyn DetectionModel>> {
    let model = YoloDetector::new(model_path, input_size, labels)?;
    Ok(Box::new(model))
}
