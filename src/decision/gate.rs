use super::geometry::ShapeFeatures;
use crate::config::DecisionConfig;
use crate::detection::Detection;
use std::fmt;

/// Verdict class for a single detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    Confirmed,
    Uncertain,
    Rejected,
}

/// Why a detection received its verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reason {
    Ok,
    NotTargetClass,
    LowConfidence,
    HumanShape,
    TooVertical,
    BadAspectRatio,
    BadSize,
}

impl Reason {
    pub fn describe(&self) -> &'static str {
        match self {
            Reason::Ok => "ok",
            Reason::NotTargetClass => "not the target class",
            Reason::LowConfidence => "below confirmation floor",
            Reason::HumanShape => "human-like shape",
            Reason::TooVertical => "too vertical",
            Reason::BadAspectRatio => "wrong proportions",
            Reason::BadSize => "wrong size",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Disposition {
    pub verdict: Verdict,
    pub reason: Reason,
}

impl Disposition {
    pub const fn confirmed() -> Self {
        Self {
            verdict: Verdict::Confirmed,
            reason: Reason::Ok,
        }
    }

    pub const fn uncertain(reason: Reason) -> Self {
        Self {
            verdict: Verdict::Uncertain,
            reason,
        }
    }

    pub const fn rejected(reason: Reason) -> Self {
        Self {
            verdict: Verdict::Rejected,
            reason,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.verdict == Verdict::Confirmed
    }
}

/// Decide what a detection is, first matching rule wins
///
/// 1. wrong label -> rejected
/// 2. confidence at or below the confirmation floor -> rejected
/// 3. human-like shape -> rejected
/// 4. not horizontal enough -> uncertain
/// 5. aspect ratio outside the open range -> uncertain
/// 6. relative size outside the open range -> uncertain
/// 7. confirmed
pub fn gate(
    detection: &Detection,
    features: &ShapeFeatures,
    config: &DecisionConfig,
) -> Disposition {
    if !detection
        .class_label
        .eq_ignore_ascii_case(config.target_label.as_str())
    {
        return Disposition::rejected(Reason::NotTargetClass);
    }

    if detection.confidence <= config.confirmation_floor {
        return Disposition::rejected(Reason::LowConfidence);
    }

    if features.is_human_like {
        return Disposition::rejected(Reason::HumanShape);
    }

    let shape = &config.shape;

    if !(features.width > features.height * shape.min_width_to_height) {
        return Disposition::uncertain(Reason::TooVertical);
    }

    if !(shape.min_aspect < features.aspect_ratio && features.aspect_ratio < shape.max_aspect) {
        return Disposition::uncertain(Reason::BadAspectRatio);
    }

    if !(shape.min_relative_size < features.relative_size
        && features.relative_size < shape.max_relative_size)
    {
        return Disposition::uncertain(Reason::BadSize);
    }

    Disposition::confirmed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::geometry::classify;
    use crate::detection::{BoundingBox, FrameSize};

    const FRAME: FrameSize = FrameSize {
        width: 640,
        height: 480,
    };

    fn run(x1: f32, y1: f32, x2: f32, y2: f32, confidence: f32, label: &str) -> Disposition {
        let config = DecisionConfig::default();
        let detection = Detection::new(BoundingBox::new(x1, y1, x2, y2), confidence, label);
        let features = classify(&detection.bbox, FRAME, &config.human);
        gate(&detection, &features, &config)
    }

    #[test]
    fn confirms_reference_scenario() {
        assert_eq!(
            run(100.0, 100.0, 280.0, 200.0, 0.9, "komodo dragon"),
            Disposition::confirmed()
        );
    }

    #[test]
    fn label_comparison_ignores_case() {
        assert!(run(100.0, 100.0, 280.0, 200.0, 0.9, "Komodo Dragon").is_confirmed());
    }

    #[test]
    fn wrong_label_is_rejected_whatever_the_shape() {
        let cases = [(280.0, 200.0, 0.9), (150.0, 400.0, 0.99), (101.0, 101.0, 0.2)];
        for (x2, y2, confidence) in cases {
            assert_eq!(
                run(100.0, 100.0, x2, y2, confidence, "person"),
                Disposition::rejected(Reason::NotTargetClass)
            );
        }
    }

    #[test]
    fn confidence_at_floor_is_rejected() {
        assert_eq!(
            run(100.0, 100.0, 280.0, 200.0, 0.45, "komodo dragon"),
            Disposition::rejected(Reason::LowConfidence)
        );
    }

    #[test]
    fn vertical_box_is_rejected_as_human() {
        assert_eq!(
            run(100.0, 50.0, 200.0, 250.0, 0.95, "komodo dragon"),
            Disposition::rejected(Reason::HumanShape)
        );
    }

    #[test]
    fn narrow_box_is_too_vertical() {
        // Reachable only with a laxer human filter than the default
        let config = DecisionConfig::default();
        let detection = Detection::new(
            BoundingBox::new(0.0, 0.0, 70.0, 100.0),
            0.9,
            "komodo dragon",
        );
        let features = ShapeFeatures {
            width: 70.0,
            height: 100.0,
            aspect_ratio: 0.7,
            relative_size: 7_000.0 / 307_200.0,
            is_human_like: false,
        };
        assert_eq!(
            gate(&detection, &features, &config),
            Disposition::uncertain(Reason::TooVertical)
        );
    }

    #[test]
    fn aspect_ratio_bounds_are_exclusive() {
        assert_eq!(
            run(0.0, 0.0, 130.0, 100.0, 0.9, "komodo dragon"),
            Disposition::uncertain(Reason::BadAspectRatio)
        );
        assert_eq!(
            run(0.0, 0.0, 230.0, 100.0, 0.9, "komodo dragon"),
            Disposition::uncertain(Reason::BadAspectRatio)
        );
        assert!(run(0.0, 0.0, 131.0, 100.0, 0.9, "komodo dragon").is_confirmed());
        assert!(run(0.0, 0.0, 229.0, 100.0, 0.9, "komodo dragon").is_confirmed());
    }

    #[test]
    fn tiny_box_has_bad_size() {
        // 36x20 covers about 0.2% of the frame
        assert_eq!(
            run(0.0, 0.0, 36.0, 20.0, 0.9, "komodo dragon"),
            Disposition::uncertain(Reason::BadSize)
        );
    }

    #[test]
    fn same_input_same_disposition() {
        let first = run(12.0, 40.0, 300.0, 190.0, 0.7, "komodo dragon");
        for _ in 0..10 {
            assert_eq!(run(12.0, 40.0, 300.0, 190.0, 0.7, "komodo dragon"), first);
        }
    }
}
