//! Image loading and pixel conversions shared by the trainer and the
//! video processing binaries.

use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::{GrayImage, Luma, RgbImage};
use std::path::{Path, PathBuf};

/// List the regular files in a folder, sorted by path.
///
/// A missing or unreadable folder is logged and yields an empty list so
/// callers can treat "no data" and "no folder" the same way.
pub fn image_paths(dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::error!("Cannot read image folder {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    paths.sort();
    paths
}

/// Decode every readable image in `paths`, skipping files that fail to
/// decode with a warning.
pub fn load_images(paths: &[PathBuf]) -> Vec<RgbImage> {
    let mut images = Vec::with_capacity(paths.len());
    for path in paths {
        match image::open(path) {
            Ok(img) => images.push(img.to_rgb8()),
            Err(e) => {
                tracing::warn!("Skipping unreadable image {}: {}", path.display(), e);
            }
        }
    }
    images
}

/// Convert an RGB image to single-channel grayscale using BT.601 weights.
pub fn to_grayscale(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let p = image.get_pixel(x, y);
        let luma =
            0.299 * f32::from(p[0]) + 0.587 * f32::from(p[1]) + 0.114 * f32::from(p[2]);
        Luma([luma.round() as u8])
    })
}

/// Flatten a grayscale image into a row-major feature vector.
pub fn flatten(image: &GrayImage) -> Vec<f64> {
    image.as_raw().iter().map(|&v| v as f64).collect()
}

/// Resize the image at `path` in place when its dimensions differ from
/// `target` (width, height). Returns whether a resize happened.
pub fn resize_if_needed(path: &Path, target: (u32, u32)) -> Result<bool> {
    let img = image::open(path)
        .with_context(|| format!("Failed to open image {}", path.display()))?
        .to_rgb8();

    if img.dimensions() == target {
        return Ok(false);
    }

    tracing::info!(
        "Resizing {} from {}x{} to {}x{}",
        path.display(),
        img.width(),
        img.height(),
        target.0,
        target.1
    );

    let resized = image::imageops::resize(&img, target.0, target.1, FilterType::Lanczos3);
    resized
        .save(path)
        .with_context(|| format!("Failed to write resized image {}", path.display()))?;
    Ok(true)
}
