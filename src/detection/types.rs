use anyhow::Result;
use image::RgbImage;

/// Axis-aligned box in pixel coordinates of the source frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Finite coordinates with positive width and height
    pub fn is_well_formed(&self) -> bool {
        [self.x1, self.y1, self.x2, self.y2]
            .iter()
            .all(|v| v.is_finite())
            && self.x2 > self.x1
            && self.y2 > self.y1
    }

    /// Intersection over union with another box
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);
        let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }
}

/// One candidate object reported by the detection model for a frame
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub class_label: String,
}

impl Detection {
    pub fn new(bbox: BoundingBox, confidence: f32, class_label: impl Into<String>) -> Self {
        Self {
            bbox,
            confidence,
            class_label: class_label.into(),
        }
    }

    /// Whether the model upheld its contract for this detection
    pub fn is_well_formed(&self) -> bool {
        self.bbox.is_well_formed() && (0.0..=1.0).contains(&self.confidence)
    }
}

/// Frame dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn of(frame: &RgbImage) -> Self {
        let (width, height) = frame.dimensions();
        Self { width, height }
    }

    pub fn area(&self) -> f32 {
        self.width as f32 * self.height as f32
    }
}

/// Trait for object detectors
/// Allows swapping the inference backend without touching the decision layer
pub trait DetectionModel {
    /// Run inference on a frame
    ///
    /// Returns detections scoring above `confidence_floor` after
    /// non-maximum suppression at `iou_floor`.
    fn infer(
        &mut self,
        frame: &RgbImage,
        confidence_floor: f32,
        iou_floor: f32,
    ) -> Result<Vec<Detection>>;

    /// Class labels this model can emit, indexed by class id
    fn class_labels(&self) -> &[String];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_boxes_are_not_well_formed() {
        assert!(!BoundingBox::new(10.0, 10.0, 10.0, 20.0).is_well_formed());
        assert!(!BoundingBox::new(10.0, 30.0, 20.0, 20.0).is_well_formed());
        assert!(!BoundingBox::new(f32::NAN, 0.0, 20.0, 20.0).is_well_formed());
        assert!(BoundingBox::new(0.0, 0.0, 1.0, 1.0).is_well_formed());
    }

    #[test]
    fn confidence_outside_unit_interval_breaks_contract() {
        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        assert!(!Detection::new(bbox, 1.5, "x").is_well_formed());
        assert!(!Detection::new(bbox, f32::NAN, "x").is_well_formed());
        assert!(Detection::new(bbox, 1.0, "x").is_well_formed());
    }

    #[test]
    fn iou_of_half_overlap() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 0.0, 15.0, 10.0);
        let iou = a.iou(&b);
        assert!((iou - 50.0 / 150.0).abs() < 1e-6);
        assert_eq!(a.iou(&BoundingBox::new(20.0, 20.0, 30.0, 30.0)), 0.0);
    }
}
