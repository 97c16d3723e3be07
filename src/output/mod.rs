mod loopback;
mod overlay;

pub use loopback::V4L2Output;
pub use overlay::{load_font, DEFAULT_FONT_PATH};

use ab_glyph::FontArc;
use overlay::Overlay;

use crate::decision::{FrameStatus, GatedDetection};
use anyhow::Result;
use image::RgbImage;

/// Trait for output destinations
pub trait OutputSink {
    /// Write a frame to the output
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()>;

    /// Get the expected output resolution
    fn resolution(&self) -> (u32, u32);
}

/// Where the operator sees each frame's verdicts
///
/// Rendering is fire-and-forget: implementations log their own failures.
pub trait DisplaySink {
    fn render(&mut self, frame: RgbImage, dispositions: &[GatedDetection], status: &FrameStatus);
}

/// Logs the operator-facing status text whenever it changes
struct StatusLog {
    target_label: String,
    last_status: Option<FrameStatus>,
}

impl StatusLog {
    fn new(target_label: String) -> Self {
        Self {
            target_label,
            last_status: None,
        }
    }

    fn update(&mut self, status: &FrameStatus) {
        // Confidence jitter between confirmed frames is not a change
        let changed = match (&self.last_status, status) {
            (Some(FrameStatus::Confirmed { .. }), FrameStatus::Confirmed { .. }) => false,
            (Some(previous), current) => previous != current,
            (None, _) => true,
        };

        if changed {
            tracing::info!("Status: {}", describe_status(status, &self.target_label));
            self.last_status = Some(status.clone());
        }
    }
}

/// Draws the overlay and forwards the frame to an [`OutputSink`]
///
/// Captions and status text need a font; without one only boxes and the
/// coloured status bar are drawn.
pub struct OverlayDisplay<O: OutputSink> {
    output: O,
    overlay: Overlay,
    status_log: StatusLog,
    failures: u64,
}

impl<O: OutputSink> OverlayDisplay<O> {
    pub fn new(output: O, target_label: impl Into<String>, font: Option<FontArc>) -> Self {
        let target_label = target_label.into();
        Self {
            output,
            overlay: Overlay::new(font, target_label.clone()),
            status_log: StatusLog::new(target_label),
            failures: 0,
        }
    }
}

impl<O: OutputSink> DisplaySink for OverlayDisplay<O> {
    fn render(
        &mut self,
        mut frame: RgbImage,
        dispositions: &[GatedDetection],
        status: &FrameStatus,
    ) {
        self.status_log.update(status);
        self.overlay.annotate(&mut frame, dispositions, status);

        if let Err(e) = self.output.write_frame(&frame) {
            self.failures += 1;
            // Only the first failure and every hundredth after it, to keep the log readable
            if self.failures == 1 || self.failures % 100 == 0 {
                tracing::warn!("Display write failed ({} so far): {:#}", self.failures, e);
            }
        }
    }
}

/// Display for runs without an output device; logs status changes only
pub struct HeadlessDisplay {
    status_log: StatusLog,
}

impl HeadlessDisplay {
    pub fn new(target_label: impl Into<String>) -> Self {
        Self {
            status_log: StatusLog::new(target_label.into()),
        }
    }
}

impl DisplaySink for HeadlessDisplay {
    fn render(&mut self, _frame: RgbImage, _dispositions: &[GatedDetection], status: &FrameStatus) {
        self.status_log.update(status);
    }
}

/// Operator-facing text for a frame status
pub fn describe_status(status: &FrameStatus, target_label: &str) -> String {
    match status {
        FrameStatus::Nothing => "nothing in view".to_string(),
        FrameStatus::NoTarget => format!("no {} detected - try another angle", target_label),
        FrameStatus::Uncertain(reason) => format!("possible {}, but {}", target_label, reason),
        FrameStatus::Confirmed { confidence } => {
            format!("{} detected! ({:.2})", target_label, confidence)
        }
    }
}
