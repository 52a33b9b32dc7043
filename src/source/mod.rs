mod buffer;
mod ffmpeg;

pub use buffer::BufferSource;
pub use ffmpeg::VideoFileSource;

use anyhow::Result;
use image::RgbImage;

/// Trait for frame sources
pub trait FrameSource {
    /// Read the next frame, or `None` once the source is exhausted
    fn read_frame(&mut self) -> Result<Option<RgbImage>>;

    /// Get the resolution of produced frames
    fn resolution(&self) -> (u32, u32);
}
