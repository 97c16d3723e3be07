use crate::config::HumanShapeLimits;
use crate::detection::{BoundingBox, FrameSize};

/// Shape measurements of one box relative to its frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeFeatures {
    pub width: f32,
    pub height: f32,
    pub aspect_ratio: f32,
    pub relative_size: f32,
    pub is_human_like: bool,
}

/// Measure a box and decide whether it looks like a standing person
///
/// Any one of the three conditions marks the box human-like:
/// - taller than wide
/// - taller than `max_height_fraction` of the frame
/// - aspect ratio below `max_aspect`
///
/// The box must be well formed; the aggregator filters the rest.
pub fn classify(bbox: &BoundingBox, frame: FrameSize, limits: &HumanShapeLimits) -> ShapeFeatures {
    let width = bbox.width();
    let height = bbox.height();
    let aspect_ratio = width / height;
    let relative_size = (width * height) / frame.area();

    let is_human_like = height > width
        || height > frame.height as f32 * limits.max_height_fraction
        || aspect_ratio < limits.max_aspect;

    ShapeFeatures {
        width,
        height,
        aspect_ratio,
        relative_size,
        is_human_like,
    }
}
