use super::describe_status;
use crate::decision::{FrameStatus, GatedDetection, Reason, Verdict};
use ab_glyph::FontArc;
use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::path::Path;

/// Font tried when `--font` is not given
pub const DEFAULT_FONT_PATH: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";

const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
const YELLOW: Rgb<u8> = Rgb([255, 255, 0]);
const RED: Rgb<u8> = Rgb([255, 0, 0]);
const GREY: Rgb<u8> = Rgb([64, 64, 64]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

const STATUS_BAR_HEIGHT: u32 = 24;
const STATUS_TEXT_SCALE: f32 = 18.0;
const LABEL_SCALE: f32 = 14.0;
const CONFIRMED_LABEL_SCALE: f32 = 18.0;
const LABEL_PADDING: i32 = 2;

/// Load a TrueType font for overlay text
pub fn load_font<P: AsRef<Path>>(path: P) -> Result<FontArc> {
    let path = path.as_ref();
    let data = std::fs::read(path)
        .with_context(|| format!("Failed to read font {}", path.display()))?;
    FontArc::try_from_vec(data).with_context(|| format!("Invalid font file {}", path.display()))
}

/// Colour and stroke width for a verdict
pub fn style(verdict: Verdict) -> (Rgb<u8>, u32) {
    match verdict {
        Verdict::Confirmed => (GREEN, 3),
        Verdict::Uncertain => (YELLOW, 2),
        Verdict::Rejected => (RED, 1),
    }
}

pub fn status_colour(status: &FrameStatus) -> Rgb<u8> {
    match status {
        FrameStatus::Nothing => GREY,
        FrameStatus::NoTarget => RED,
        FrameStatus::Uncertain(_) => YELLOW,
        FrameStatus::Confirmed { .. } => GREEN,
    }
}

/// Caption drawn above a box: label, confidence and any shape complaint
pub fn box_caption(gated: &GatedDetection) -> String {
    let detection = &gated.detection;
    let caption = format!("{}: {:.2}", detection.class_label, detection.confidence);
    match gated.disposition.reason {
        Reason::HumanShape | Reason::TooVertical | Reason::BadAspectRatio | Reason::BadSize => {
            format!("{} ({})", caption, gated.disposition.reason)
        }
        Reason::Ok | Reason::NotTargetClass | Reason::LowConfidence => caption,
    }
}

/// Draws boxes, captions and the status bar onto outgoing frames
///
/// Without a font only the boxes and the coloured bar are drawn.
pub struct Overlay {
    font: Option<FontArc>,
    target_label: String,
}

impl Overlay {
    pub fn new(font: Option<FontArc>, target_label: impl Into<String>) -> Self {
        Self {
            font,
            target_label: target_label.into(),
        }
    }

    pub fn annotate(
        &self,
        frame: &mut RgbImage,
        dispositions: &[GatedDetection],
        status: &FrameStatus,
    ) {
        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return;
        }

        for gated in dispositions {
            let (colour, thickness) = style(gated.disposition.verdict);
            draw_box(frame, gated, colour, thickness);

            if let Some(font) = &self.font {
                let scale = if gated.disposition.is_confirmed() {
                    CONFIRMED_LABEL_SCALE
                } else {
                    LABEL_SCALE
                };
                let bbox = &gated.detection.bbox;
                draw_caption(
                    frame,
                    font,
                    &box_caption(gated),
                    (bbox.x1 as i32, bbox.y1 as i32),
                    scale,
                    colour,
                );
            }
        }

        let bar_height = STATUS_BAR_HEIGHT.min(height);
        let bar_top = (height - bar_height) as i32;
        let bar = Rect::at(0, bar_top).of_size(width, bar_height);
        draw_filled_rect_mut(frame, bar, status_colour(status));

        if let Some(font) = &self.font {
            let text = describe_status(status, &self.target_label);
            let (_, text_height) = text_size(STATUS_TEXT_SCALE, font, &text);
            let y = bar_top + (bar_height as i32 - text_height as i32).max(0) / 2;
            draw_text_mut(frame, BLACK, 4, y, STATUS_TEXT_SCALE, font, &text);
        }
    }
}

fn draw_box(frame: &mut RgbImage, gated: &GatedDetection, colour: Rgb<u8>, thickness: u32) {
    let bbox = &gated.detection.bbox;
    for inset in 0..thickness {
        let inset = inset as f32;
        let width = (bbox.width() - 2.0 * inset).round();
        let height = (bbox.height() - 2.0 * inset).round();
        if width < 1.0 || height < 1.0 {
            break;
        }
        let rect = Rect::at((bbox.x1 + inset) as i32, (bbox.y1 + inset) as i32)
            .of_size(width as u32, height as u32);
        draw_hollow_rect_mut(frame, rect, colour);
    }
}

/// Text on a black plate whose bottom edge sits on `anchor`, kept inside the frame
fn draw_caption(
    frame: &mut RgbImage,
    font: &FontArc,
    text: &str,
    (x, bottom): (i32, i32),
    scale: f32,
    colour: Rgb<u8>,
) {
    let (text_width, text_height) = text_size(scale, font, text);
    if text_width == 0 || text_height == 0 {
        return;
    }
    let plate_width = text_width + 2 * LABEL_PADDING as u32;
    let plate_height = text_height + 2 * LABEL_PADDING as u32;
    let x = x.max(0);
    let top = (bottom - plate_height as i32).max(0);

    draw_filled_rect_mut(frame, Rect::at(x, top).of_size(plate_width, plate_height), BLACK);
    draw_text_mut(frame, colour, x + LABEL_PADDING, top + LABEL_PADDING, scale, font, text);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::{Disposition, ShapeFeatures};
    use crate::detection::{BoundingBox, Detection};

    fn gated(verdict: Disposition) -> GatedDetection {
        GatedDetection {
            detection: Detection::new(
                BoundingBox::new(10.0, 10.0, 50.0, 30.0),
                0.9,
                "komodo dragon",
            ),
            features: ShapeFeatures {
                width: 40.0,
                height: 20.0,
                aspect_ratio: 2.0,
                relative_size: 0.1,
                is_human_like: false,
            },
            disposition: verdict,
        }
    }

    fn with_font() -> Overlay {
        let font = load_font(DEFAULT_FONT_PATH).expect("DejaVu Sans is installed");
        Overlay::new(Some(font), "komodo dragon")
    }

    #[test]
    fn draws_box_outline_in_verdict_colour() {
        let mut frame = RgbImage::new(100, 100);
        Overlay::new(None, "komodo dragon").annotate(
            &mut frame,
            &[gated(Disposition::confirmed())],
            &FrameStatus::Confirmed { confidence: 0.9 },
        );

        assert_eq!(*frame.get_pixel(10, 10), GREEN);
        // Third stroke of a thick box
        assert_eq!(*frame.get_pixel(12, 20), GREEN);
        // Interior untouched
        assert_eq!(*frame.get_pixel(30, 20), BLACK);
        // Status bar
        assert_eq!(*frame.get_pixel(50, 99), GREEN);
    }

    #[test]
    fn rejected_boxes_are_thin_and_red() {
        let mut frame = RgbImage::new(100, 100);
        Overlay::new(None, "komodo dragon").annotate(
            &mut frame,
            &[gated(Disposition::rejected(Reason::HumanShape))],
            &FrameStatus::NoTarget,
        );

        assert_eq!(*frame.get_pixel(10, 20), RED);
        assert_eq!(*frame.get_pixel(11, 20), BLACK);
    }

    #[test]
    fn boxes_outside_the_frame_are_clipped() {
        let mut frame = RgbImage::new(20, 20);
        let mut outside = gated(Disposition::uncertain(Reason::BadSize));
        outside.detection.bbox = BoundingBox::new(-50.0, -50.0, 500.0, 500.0);
        Overlay::new(None, "komodo dragon").annotate(
            &mut frame,
            &[outside],
            &FrameStatus::Uncertain(Reason::BadSize),
        );

        assert_eq!(*frame.get_pixel(0, 19), YELLOW);
    }

    #[test]
    fn captions_name_shape_complaints_only() {
        assert_eq!(
            box_caption(&gated(Disposition::uncertain(Reason::TooVertical))),
            "komodo dragon: 0.90 (too vertical)"
        );
        assert_eq!(
            box_caption(&gated(Disposition::rejected(Reason::HumanShape))),
            "komodo dragon: 0.90 (human-like shape)"
        );
        assert_eq!(box_caption(&gated(Disposition::confirmed())), "komodo dragon: 0.90");
        assert_eq!(
            box_caption(&gated(Disposition::rejected(Reason::LowConfidence))),
            "komodo dragon: 0.90"
        );
    }

    #[test]
    fn status_bar_shows_the_uncertainty_reason() {
        let overlay = with_font();
        let mut too_small = RgbImage::new(320, 240);
        let mut too_vertical = RgbImage::new(320, 240);

        overlay.annotate(&mut too_small, &[], &FrameStatus::Uncertain(Reason::BadSize));
        overlay.annotate(&mut too_vertical, &[], &FrameStatus::Uncertain(Reason::TooVertical));

        assert_ne!(too_small, too_vertical);
        // Text is drawn inside the bar, not over the picture
        let bar_top = 240 - STATUS_BAR_HEIGHT;
        for (_, y, pixel) in too_small.enumerate_pixels() {
            if y < bar_top {
                assert_eq!(*pixel, BLACK);
            }
        }
        assert!(too_small
            .enumerate_pixels()
            .any(|(_, y, pixel)| y >= bar_top && *pixel != YELLOW));
    }

    #[test]
    fn captions_are_drawn_above_boxes() {
        let overlay = with_font();
        let mut frame = RgbImage::new(320, 240);
        let mut uncertain = gated(Disposition::uncertain(Reason::BadAspectRatio));
        uncertain.detection.bbox = BoundingBox::new(40.0, 100.0, 200.0, 180.0);

        let status = FrameStatus::Uncertain(Reason::BadAspectRatio);
        overlay.annotate(&mut frame, &[uncertain], &status);

        // Caption glyphs sit just above the box's top edge
        assert!((80..100)
            .flat_map(|y| (40..200).map(move |x| (x, y)))
            .any(|(x, y)| frame.get_pixel(x, y)[0] > 0));
        // Area well above the caption is untouched
        assert_eq!(*frame.get_pixel(100, 20), BLACK);
    }
}
