mod image_dir;
mod v4l_capture;

pub use image_dir::ImageDirectory;
pub use v4l_capture::WebcamCapture;

use crate::error::FrameUnavailable;
use image::RgbImage;

/// Trait for frame sources
pub trait FrameSource {
    /// Block until the next frame is available
    ///
    /// An error means the source is exhausted or broken; the stream loop
    /// stops and does not retry.
    fn next_frame(&mut self) -> Result<RgbImage, FrameUnavailable>;

    /// Get the resolution of produced frames, if known in advance
    fn resolution(&self) -> Option<(u32, u32)>;
}
