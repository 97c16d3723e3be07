use crate::error::ConfigError;

/// Class label the pipeline is looking for (compared case-insensitively)
pub const TARGET_LABEL: &str = "komodo dragon";

/// Detections at or below this confidence are not rendered at all
pub const DISPLAY_FLOOR: f32 = 0.35;

/// Target-class detections must score above this to be shape-checked
pub const CONFIRMATION_FLOOR: f32 = 0.45;

/// IoU threshold handed to the detection model for class-agnostic NMS
pub const NMS_IOU: f32 = 0.45;

/// Maximum number of ranked detections gated per frame
pub const MAX_GATED_PER_FRAME: usize = 3;

/// Boxes narrower than this aspect ratio are treated as human-like
pub const HUMAN_MAX_ASPECT: f32 = 1.2;

/// Boxes taller than this fraction of the frame are treated as human-like
pub const HUMAN_MAX_HEIGHT_FRACTION: f32 = 0.6;

/// Width must exceed this multiple of height for a horizontal pose
pub const MIN_WIDTH_TO_HEIGHT: f32 = 0.8;

/// Open interval of accepted aspect ratios
pub const MIN_ASPECT: f32 = 1.3;
pub const MAX_ASPECT: f32 = 2.3;

/// Open interval of accepted box area relative to the frame area
pub const MIN_RELATIVE_SIZE: f32 = 0.03;
pub const MAX_RELATIVE_SIZE: f32 = 0.8;

/// Minimum seconds between two alert dispatches
pub const ALERT_COOLDOWN_SECS: f64 = 2.0;

/// Thresholds for the human-silhouette filter
#[derive(Debug, Clone, PartialEq)]
pub struct HumanShapeLimits {
    pub max_aspect: f32,
    pub max_height_fraction: f32,
}

impl Default for HumanShapeLimits {
    fn default() -> Self {
        Self {
            max_aspect: HUMAN_MAX_ASPECT,
            max_height_fraction: HUMAN_MAX_HEIGHT_FRACTION,
        }
    }
}

/// Shape bounds a target detection must satisfy to be confirmed
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeLimits {
    pub min_width_to_height: f32,
    pub min_aspect: f32,
    pub max_aspect: f32,
    pub min_relative_size: f32,
    pub max_relative_size: f32,
}

impl Default for ShapeLimits {
    fn default() -> Self {
        Self {
            min_width_to_height: MIN_WIDTH_TO_HEIGHT,
            min_aspect: MIN_ASPECT,
            max_aspect: MAX_ASPECT,
            min_relative_size: MIN_RELATIVE_SIZE,
            max_relative_size: MAX_RELATIVE_SIZE,
        }
    }
}

/// Every tunable of the decision pipeline
///
/// The 0.35 / 0.45 floors and the top-3 cap are empirical values carried over
/// as-is. They have not been calibrated against a labelled validation set.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionConfig {
    pub target_label: String,
    pub display_floor: f32,
    pub confirmation_floor: f32,
    pub nms_iou: f32,
    pub max_gated_per_frame: usize,
    pub human: HumanShapeLimits,
    pub shape: ShapeLimits,
    pub cooldown_secs: f64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            target_label: TARGET_LABEL.to_string(),
            display_floor: DISPLAY_FLOOR,
            confirmation_floor: CONFIRMATION_FLOOR,
            nms_iou: NMS_IOU,
            max_gated_per_frame: MAX_GATED_PER_FRAME,
            human: HumanShapeLimits::default(),
            shape: ShapeLimits::default(),
            cooldown_secs: ALERT_COOLDOWN_SECS,
        }
    }
}

impl DecisionConfig {
    /// Reject configurations the pipeline cannot run with
    ///
    /// Called once at startup; a failure here is fatal.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_label.trim().is_empty() {
            return Err(ConfigError::EmptyTargetLabel);
        }

        check_unit("display_floor", self.display_floor)?;
        check_unit("confirmation_floor", self.confirmation_floor)?;
        check_unit("nms_iou", self.nms_iou)?;
        check_unit("human.max_height_fraction", self.human.max_height_fraction)?;
        check_unit("shape.min_relative_size", self.shape.min_relative_size)?;
        check_unit("shape.max_relative_size", self.shape.max_relative_size)?;
        check_positive("human.max_aspect", self.human.max_aspect)?;
        check_positive("shape.min_width_to_height", self.shape.min_width_to_height)?;
        check_positive("shape.min_aspect", self.shape.min_aspect)?;
        check_positive("shape.max_aspect", self.shape.max_aspect)?;

        if self.confirmation_floor < self.display_floor {
            return Err(ConfigError::Inverted {
                low: "display_floor",
                high: "confirmation_floor",
            });
        }
        if self.shape.min_aspect >= self.shape.max_aspect {
            return Err(ConfigError::Inverted {
                low: "shape.min_aspect",
                high: "shape.max_aspect",
            });
        }
        if self.shape.min_relative_size >= self.shape.max_relative_size {
            return Err(ConfigError::Inverted {
                low: "shape.min_relative_size",
                high: "shape.max_relative_size",
            });
        }
        if self.max_gated_per_frame == 0 {
            return Err(ConfigError::ZeroDetectionCap);
        }
        if !self.cooldown_secs.is_finite() || self.cooldown_secs <= 0.0 {
            return Err(ConfigError::InvalidCooldown(self.cooldown_secs));
        }

        Ok(())
    }
}

fn check_unit(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { name, value })
    }
}

fn check_positive(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { name, value })
    }
}
