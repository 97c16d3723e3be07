use super::gate::{gate, Disposition, Reason, Verdict};
use super::geometry::{classify, ShapeFeatures};
use crate::config::DecisionConfig;
use crate::detection::{Detection, FrameSize};

/// A ranked detection together with everything derived from it
#[derive(Debug, Clone, PartialEq)]
pub struct GatedDetection {
    pub detection: Detection,
    pub features: ShapeFeatures,
    pub disposition: Disposition,
}

/// Outcome of one frame
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameResult {
    /// At least one detection cleared the display floor
    pub any_detection: bool,
    /// Highest ranked confirmed detection
    pub best_confirmed: Option<Detection>,
    /// Gated detections in rank order
    pub dispositions: Vec<GatedDetection>,
}

/// What the operator should be told about a frame
#[derive(Debug, Clone, PartialEq)]
pub enum FrameStatus {
    /// Nothing cleared the display floor
    Nothing,
    /// Something was seen but no target candidate survived
    NoTarget,
    /// A target candidate failed a shape check
    Uncertain(Reason),
    Confirmed { confidence: f32 },
}

impl FrameResult {
    pub fn status(&self) -> FrameStatus {
        if let Some(best) = &self.best_confirmed {
            return FrameStatus::Confirmed {
                confidence: best.confidence,
            };
        }

        let uncertain = self
            .dispositions
            .iter()
            .find(|g| g.disposition.verdict == Verdict::Uncertain);

        match uncertain {
            Some(g) => FrameStatus::Uncertain(g.disposition.reason),
            None if self.any_detection => FrameStatus::NoTarget,
            None => FrameStatus::Nothing,
        }
    }
}

/// Reduce a frame's raw detections to a [`FrameResult`]
///
/// Malformed detections are skipped, the rest are floored at the display
/// threshold, ranked by confidence (ties keep model order) and only the top
/// `max_gated_per_frame` are classified and gated.
pub fn aggregate(raw: &[Detection], frame: FrameSize, config: &DecisionConfig) -> FrameResult {
    let mut ranked: Vec<&Detection> = raw
        .iter()
        .filter(|d| {
            let ok = d.is_well_formed();
            if !ok {
                tracing::warn!("Skipping malformed detection: {:?}", d);
            }
            ok
        })
        .filter(|d| d.confidence > config.display_floor)
        .collect();

    let any_detection = !ranked.is_empty();

    ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    ranked.truncate(config.max_gated_per_frame);

    let dispositions: Vec<GatedDetection> = ranked
        .into_iter()
        .map(|detection| {
            let features = classify(&detection.bbox, frame, &config.human);
            let disposition = gate(detection, &features, config);
            GatedDetection {
                detection: detection.clone(),
                features,
                disposition,
            }
        })
        .collect();

    let best_confirmed = dispositions
        .iter()
        .find(|g| g.disposition.is_confirmed())
        .map(|g| g.detection.clone());

    FrameResult {
        any_detection,
        best_confirmed,
        dispositions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::BoundingBox;

    const FRAME: FrameSize = FrameSize {
        width: 640,
        height: 480,
    };

    fn komodo(x1: f32, confidence: f32) -> Detection {
        Detection::new(
            BoundingBox::new(x1, 100.0, x1 + 180.0, 200.0),
            confidence,
            "komodo dragon",
        )
    }

    #[test]
    fn empty_input_yields_empty_result() {
        let result = aggregate(&[], FRAME, &DecisionConfig::default());
        assert_eq!(result, FrameResult::default());
        assert_eq!(result.status(), FrameStatus::Nothing);
    }

    #[test]
    fn gates_only_top_three() {
        let raw: Vec<_> = [0.5, 0.9, 0.6, 0.8, 0.7]
            .iter()
            .enumerate()
            .map(|(i, &c)| komodo(i as f32, c))
            .collect();

        let result = aggregate(&raw, FRAME, &DecisionConfig::default());

        let confidences: Vec<f32> = result
            .dispositions
            .iter()
            .map(|g| g.detection.confidence)
            .collect();
        assert_eq!(confidences, vec![0.9, 0.8, 0.7]);
        assert_eq!(result.best_confirmed.unwrap().confidence, 0.9);
    }

    #[test]
    fn display_floor_is_exclusive() {
        let result = aggregate(&[komodo(0.0, 0.35)], FRAME, &DecisionConfig::default());
        assert!(!result.any_detection);
        assert!(result.dispositions.is_empty());
    }

    #[test]
    fn best_confirmed_skips_higher_ranked_rejects() {
        let person = Detection::new(BoundingBox::new(0.0, 0.0, 100.0, 300.0), 0.95, "person");
        let upright = Detection::new(
            BoundingBox::new(300.0, 0.0, 400.0, 200.0),
            0.9,
            "komodo dragon",
        );
        let raw = vec![person, upright, komodo(10.0, 0.6)];

        let result = aggregate(&raw, FRAME, &DecisionConfig::default());

        assert!(result.any_detection);
        assert_eq!(result.dispositions.len(), 3);
        assert_eq!(
            result.dispositions[0].disposition,
            Disposition::rejected(Reason::NotTargetClass)
        );
        assert_eq!(
            result.dispositions[1].disposition,
            Disposition::rejected(Reason::HumanShape)
        );
        assert_eq!(result.best_confirmed, Some(komodo(10.0, 0.6)));
    }

    #[test]
    fn ties_keep_model_order() {
        let raw = vec![komodo(0.0, 0.8), komodo(50.0, 0.8)];
        let result = aggregate(&raw, FRAME, &DecisionConfig::default());
        assert_eq!(result.best_confirmed, Some(komodo(0.0, 0.8)));
    }

    #[test]
    fn malformed_detections_are_skipped() {
        let degenerate = Detection::new(
            BoundingBox::new(10.0, 10.0, 10.0, 50.0),
            0.9,
            "komodo dragon",
        );
        let overconfident = komodo(0.0, 1.7);
        let raw = vec![degenerate, overconfident, komodo(20.0, 0.5)];

        let result = aggregate(&raw, FRAME, &DecisionConfig::default());

        assert_eq!(result.dispositions.len(), 1);
        assert_eq!(result.dispositions[0].detection, komodo(20.0, 0.5));
    }

    #[test]
    fn aggregation_is_idempotent() {
        let raw = vec![
            komodo(0.0, 0.7),
            Detection::new(BoundingBox::new(0.0, 0.0, 100.0, 100.0), 0.9, "komodo dragon"),
            Detection::new(BoundingBox::new(0.0, 0.0, 50.0, 20.0), 0.6, "person"),
        ];
        let config = DecisionConfig::default();

        let first = aggregate(&raw, FRAME, &config);
        let second = aggregate(&raw, FRAME, &config);
        assert_eq!(first, second);
    }

    #[test]
    fn status_distinguishes_outcomes() {
        let config = DecisionConfig::default();

        let person = Detection::new(BoundingBox::new(0.0, 0.0, 100.0, 300.0), 0.9, "person");
        assert_eq!(aggregate(&[person], FRAME, &config).status(), FrameStatus::NoTarget);

        let small = Detection::new(BoundingBox::new(0.0, 0.0, 36.0, 20.0), 0.9, "komodo dragon");
        assert_eq!(
            aggregate(&[small], FRAME, &config).status(),
            FrameStatus::Uncertain(Reason::BadSize)
        );

        assert_eq!(
            aggregate(&[komodo(0.0, 0.8)], FRAME, &config).status(),
            FrameStatus::Confirmed { confidence: 0.8 }
        );
    }
}
