use super::nms::non_max_suppression;
use super::preprocess::{Letterbox, Preprocessor};
use super::types::{BoundingBox, Detection, DetectionModel};
use anyhow::{bail, Context, Result};
use image::RgbImage;
use ndarray::{ArrayView2, ArrayViewD, Axis, Ix2, IxDyn};
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;

/// YOLOv8-layout ONNX detector
///
/// Expects a single output of shape [1, 4 + classes, candidates] where each
/// column is (cx, cy, w, h, score per class) in model-input pixels.
pub struct YoloDetector {
    session: Session,
    preprocessor: Preprocessor,
    labels: Vec<String>,
}

impl YoloDetector {
    /// Load a detector from an ONNX file
    ///
    /// # Arguments
    /// * `model_path` - Path to the ONNX model file
    /// * `input_size` - Square input resolution the model was exported with
    /// * `labels` - Class names by id; read from the model's `names` metadata when `None`
    pub fn new<P: AsRef<Path>>(
        model_path: P,
        input_size: u32,
        labels: Option<Vec<String>>,
    ) -> Result<Self> {
        let path = model_path.as_ref();

        tracing::info!("Loading detection model from {}", path.display());

        let mut builder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?;

        // CUDA is optional: fall back to CPU when the provider cannot register
        let cuda = CUDAExecutionProvider::default().build();
        if let Ok(with_cuda) = builder.clone().with_execution_providers([cuda]) {
            builder = with_cuda;
        }

        let session = builder
            .commit_from_file(path)
            .with_context(|| format!("Failed to load model from {}", path.display()))?;

        let labels = match labels {
            Some(labels) => labels,
            None => {
                let names = session
                    .metadata()?
                    .custom("names")?
                    .context("Model has no `names` metadata; pass --class-names")?;
                parse_class_names(&names)
            }
        };
        if labels.is_empty() {
            bail!("Detection model has no class labels");
        }

        tracing::info!("Detection model loaded with {} classes", labels.len());
        tracing::debug!("Classes: {:?}", labels);

        Ok(Self {
            session,
            preprocessor: Preprocessor::new(input_size),
            labels,
        })
    }
}

impl DetectionModel for YoloDetector {
    fn infer(
        &mut self,
        frame: &RgbImage,
        confidence_floor: f32,
        iou_floor: f32,
    ) -> Result<Vec<Detection>> {
        let _span = tracing::debug_span!("yolo_infer").entered();

        let (input, letterbox) = self.preprocessor.preprocess(frame)?;
        let size = self.preprocessor.input_size() as usize;
        let data = input.into_raw_vec().into_boxed_slice();
        let input_tensor = Tensor::from_array(([1usize, 3, size, size], data))
            .context("Failed to create input tensor")?;

        let _infer_span = tracing::debug_span!("inference").entered();
        let outputs = self
            .session
            .run(ort::inputs![input_tensor])
            .context("Failed to run inference")?;
        drop(_infer_span);

        let (out_shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .context("Failed to extract output tensor")?;
        let dims: Vec<usize> = out_shape.iter().map(|&d| d as usize).collect();
        if dims.len() != 3 || dims[0] != 1 {
            bail!("Unexpected detector output shape {:?}", dims);
        }

        let view = ArrayViewD::from_shape(IxDyn(&dims), data)?
            .index_axis_move(Axis(0), 0)
            .into_dimensionality::<Ix2>()?;

        let candidates = decode_candidates(
            view,
            letterbox,
            frame.dimensions(),
            confidence_floor,
            &self.labels,
        );

        Ok(non_max_suppression(candidates, iou_floor))
    }

    fn class_labels(&self) -> &[String] {
        &self.labels
    }
}

/// Turn a [4 + classes, candidates] prediction matrix into frame-space detections
///
/// Boxes are mapped out of the letterboxed input and clipped to the frame;
/// candidates that collapse to nothing after clipping are dropped.
fn decode_candidates(
    predictions: ArrayView2<f32>,
    letterbox: Letterbox,
    (frame_width, frame_height): (u32, u32),
    confidence_floor: f32,
    labels: &[String],
) -> Vec<Detection> {
    let rows = predictions.shape()[0];
    if rows <= 4 {
        return Vec::new();
    }

    let mut detections = Vec::new();
    for column in predictions.axis_iter(Axis(1)) {
        let Some((class_id, score)) = column
            .iter()
            .skip(4)
            .copied()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
        else {
            continue;
        };

        if score <= confidence_floor {
            continue;
        }

        let (cx, cy, w, h) = (column[0], column[1], column[2], column[3]);
        let (x1, y1) = letterbox.to_frame(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = letterbox.to_frame(cx + w / 2.0, cy + h / 2.0);
        let bbox = BoundingBox::new(
            x1.max(0.0),
            y1.max(0.0),
            x2.min(frame_width as f32),
            y2.min(frame_height as f32),
        );
        if !bbox.is_well_formed() {
            continue;
        }

        let label = labels
            .get(class_id)
            .cloned()
            .unwrap_or_else(|| format!("class{}", class_id));

        detections.push(Detection::new(bbox, score.clamp(0.0, 1.0), label));
    }

    detections
}

/// Parse class names from an exported model's `names` metadata
///
/// Accepts the dictionary form `{0: 'komodo dragon', 1: 'person'}` and falls
/// back to a plain comma-separated list.
pub fn parse_class_names(raw: &str) -> Vec<String> {
    let body = raw.trim().trim_start_matches('{').trim_end_matches('}');

    let mut entries: Vec<(usize, String)> = Vec::new();
    for (position, entry) in body.split(',').enumerate() {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let (index, name) = match entry.split_once(':') {
            Some((index, name)) => match index.trim().parse::<usize>() {
                Ok(index) => (index, name),
                Err(_) => (position, entry),
            },
            None => (position, entry),
        };
        let name = name.trim().trim_matches(|c: char| c == '\'' || c == '"').trim();
        entries.push((index, name.to_string()));
    }

    entries.sort_by_key(|(index, _)| *index);
    entries.into_iter().map(|(_, name)| name).collect()
}
