use super::FrameSource;
use crate::error::FrameUnavailable;
use anyhow::{bail, Context, Result};
use image::RgbImage;
use std::path::{Path, PathBuf};

const EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp"];

/// Replays still images from a directory in file-name order
pub struct ImageDirectory {
    paths: Vec<PathBuf>,
    next: usize,
    repeat: bool,
}

impl ImageDirectory {
    /// # Arguments
    /// * `dir` - Directory holding jpg/png/bmp files
    /// * `repeat` - Start over after the last image instead of ending the stream
    pub fn new<P: AsRef<Path>>(dir: P, repeat: bool) -> Result<Self> {
        let dir = dir.as_ref();
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read image directory {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        if paths.is_empty() {
            bail!("No images found in {}", dir.display());
        }

        tracing::info!("Replaying {} images from {}", paths.len(), dir.display());

        Ok(Self {
            paths,
            next: 0,
            repeat,
        })
    }
}

impl FrameSource for ImageDirectory {
    fn next_frame(&mut self) -> Result<RgbImage, FrameUnavailable> {
        // One full pass without a readable image means there is nothing left to show
        for _ in 0..self.paths.len() {
            if self.next >= self.paths.len() {
                if !self.repeat {
                    break;
                }
                self.next = 0;
            }

            let path = &self.paths[self.next];
            self.next += 1;

            match image::open(path) {
                Ok(img) => return Ok(img.into_rgb8()),
                Err(e) => tracing::warn!("Skipping unreadable image {}: {}", path.display(), e),
            }
        }

        Err(FrameUnavailable("image directory exhausted".into()))
    }

    fn resolution(&self) -> Option<(u32, u32)> {
        None
    }
}
