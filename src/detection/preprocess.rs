use anyhow::{bail, Result};
use image::{imageops, RgbImage};
use ndarray::Array4;

/// Grey used for the padding bands, as in Ultralytics exports
const PAD_VALUE: f32 = 114.0 / 255.0;

/// Placement of the source frame inside the square model input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
}

impl Letterbox {
    /// Largest aspect-preserving fit of a frame into a `size` x `size` input
    pub fn fit((width, height): (u32, u32), size: u32) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        let scale = (size as f32 / width as f32).min(size as f32 / height as f32);
        let (resized_width, resized_height) = resized_dims((width, height), scale, size);
        Self {
            scale,
            pad_x: ((size - resized_width) / 2) as f32,
            pad_y: ((size - resized_height) / 2) as f32,
        }
    }

    /// Map a model-input point back onto the source frame
    pub fn to_frame(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

fn resized_dims((width, height): (u32, u32), scale: f32, size: u32) -> (u32, u32) {
    (
        ((width as f32 * scale).round() as u32).clamp(1, size),
        ((height as f32 * scale).round() as u32).clamp(1, size),
    )
}

/// Preprocessor for converting RGB frames to detector input tensors
pub struct Preprocessor {
    input_size: u32,
}

impl Preprocessor {
    pub fn new(input_size: u32) -> Self {
        Self { input_size }
    }

    pub fn input_size(&self) -> u32 {
        self.input_size
    }

    /// Preprocess an RGB frame into a normalized NCHW tensor
    ///
    /// Steps:
    /// 1. Resize keeping the aspect ratio and centre on a grey square (letterbox)
    /// 2. Convert to float and normalize to [0, 1]
    /// 3. Transpose from HWC to NCHW format
    ///
    /// Returns: Array4<f32> with shape [1, 3, size, size] and the placement
    /// needed to map model coordinates back onto the frame
    pub fn preprocess(&self, frame: &RgbImage) -> Result<(Array4<f32>, Letterbox)> {
        let _span = tracing::debug_span!("preprocess").entered();

        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            bail!("Cannot preprocess an empty frame");
        }

        let size = self.input_size;
        let letterbox = Letterbox::fit((width, height), size);
        let (resized_width, resized_height) = resized_dims((width, height), letterbox.scale, size);
        let resized = if (resized_width, resized_height) != (width, height) {
            imageops::resize(
                frame,
                resized_width,
                resized_height,
                imageops::FilterType::Triangle,
            )
        } else {
            frame.clone()
        };

        let (offset_x, offset_y) = (letterbox.pad_x as usize, letterbox.pad_y as usize);
        let mut tensor = Array4::<f32>::from_elem((1, 3, size as usize, size as usize), PAD_VALUE);
        for (x, y, pixel) in resized.enumerate_pixels() {
            let (x, y) = (x as usize + offset_x, y as usize + offset_y);
            tensor[[0, 0, y, x]] = pixel[0] as f32 / 255.0;
            tensor[[0, 1, y, x]] = pixel[1] as f32 / 255.0;
            tensor[[0, 2, y, x]] = pixel[2] as f32 / 255.0;
        }

        Ok((tensor, letterbox))
    }
}
