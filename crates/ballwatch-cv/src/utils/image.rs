//! Frame import and export through the `image` crate

use crate::Result;
use anyhow::Context;
use ballwatch_core::Frame;
use image::{DynamicImage, RgbaImage};
use log::warn;
use std::fs;
use std::path::{Path, PathBuf};

const SUPPORTED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Conversions between frames and raster images
pub struct ImageUtils;

impl ImageUtils {
    /// Frame from any decoded image.
    pub fn frame_from_image(image: DynamicImage, sequence: u64) -> Frame {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        Frame::from_rgba(width, height, rgba.into_raw(), sequence)
    }

    /// Frame as an `image` buffer; fails for malformed frames.
    pub fn frame_to_image(frame: &Frame) -> Result<RgbaImage> {
        frame.validate()?;
        RgbaImage::from_raw(frame.width(), frame.height(), frame.pixels().to_vec())
            .context("Frame buffer does not match its dimensions")
    }

    /// Decode one image file.
    pub fn load_frame<P: AsRef<Path>>(path: P, sequence: u64) -> Result<Frame> {
        let image = image::open(&path)
            .with_context(|| format!("Failed to open image: {:?}", path.as_ref()))?;
        Ok(Self::frame_from_image(image, sequence))
    }

    /// Encode a frame; the format follows the file extension.
    pub fn save_frame<P: AsRef<Path>>(frame: &Frame, path: P) -> Result<()> {
        let image = Self::frame_to_image(frame)?;
        image
            .save(&path)
            .with_context(|| format!("Failed to save image: {:?}", path.as_ref()))
    }

    /// Image files in `dir`, sorted by name.
    pub fn list_images<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        let entries =
            fs::read_dir(dir).with_context(|| format!("Failed to read directory: {:?}", dir))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let supported = path
                .extension()
                .map(|ext| ext.to_string_lossy().to_lowercase())
                .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()));
            if supported {
                paths.push(path);
            }
        }

        paths.sort();
        Ok(paths)
    }

    /// Decode every image in `dir` into frames numbered in name order.
    ///
    /// A file that fails to decode keeps its slot as an empty frame so the
    /// sequence stays aligned with the directory listing; playback skips it.
    pub fn load_frames_from_dir<P: AsRef<Path>>(dir: P) -> Result<Vec<Frame>> {
        let paths = Self::list_images(dir)?;

        #[cfg(feature = "parallel")]
        let frames = {
            use rayon::prelude::*;
            paths
                .par_iter()
                .enumerate()
                .map(|(seq, path)| Self::load_or_placeholder(path, seq as u64))
                .collect()
        };

        #[cfg(not(feature = "parallel"))]
        let frames = paths
            .iter()
            .enumerate()
            .map(|(seq, path)| Self::load_or_placeholder(path, seq as u64))
            .collect();

        Ok(frames)
    }

    fn load_or_placeholder(path: &Path, sequence: u64) -> Frame {
        Self::load_frame(path, sequence).unwrap_or_else(|e| {
            warn!("{:#}", e);
            Frame::from_rgba(0, 0, Vec::new(), sequence)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_frame() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("frame.png");
        let frame = Frame::filled(12, 8, [200, 100, 50, 255], 4);

        ImageUtils::save_frame(&frame, &path)?;
        let loaded = ImageUtils::load_frame(&path, 4)?;

        assert_eq!(loaded.dimensions(), (12, 8));
        assert_eq!(loaded.pixels(), frame.pixels());
        Ok(())
    }

    #[test]
    fn test_malformed_frame_not_exported() {
        let frame = Frame::from_rgba(10, 10, vec![0; 3], 0);
        assert!(ImageUtils::frame_to_image(&frame).is_err());
    }

    #[test]
    fn test_directory_import_keeps_broken_slots() -> Result<()> {
        let dir = tempfile::tempdir()?;
        ImageUtils::save_frame(&Frame::filled(6, 6, [0, 0, 0, 255], 0), dir.path().join("a.png"))?;
        fs::write(dir.path().join("b.png"), b"not an image")?;
        ImageUtils::save_frame(&Frame::filled(6, 6, [9, 9, 9, 255], 0), dir.path().join("c.png"))?;
        fs::write(dir.path().join("notes.txt"), b"ignored")?;

        let frames = ImageUtils::load_frames_from_dir(dir.path())?;

        assert_eq!(frames.len(), 3);
        assert!(frames[0].is_valid());
        assert!(!frames[1].is_valid());
        assert_eq!(frames[2].sequence(), 2);
        assert_eq!(frames[2].pixel(0, 0), Some([9, 9, 9, 255]));
        Ok(())
    }
}
