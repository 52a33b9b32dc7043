use super::FrameSource;
use anyhow::Result;
use image::RgbImage;
use std::collections::VecDeque;

/// In-memory frame source, used by tests and for replaying stored frames.
pub struct BufferSource {
    frames: VecDeque<RgbImage>,
    width: u32,
    height: u32,
}

impl BufferSource {
    pub fn new(width: u32, height: u32, frames: Vec<RgbImage>) -> Self {
        Self {
            frames: frames.into(),
            width,
            height,
        }
    }
}

impl FrameSource for BufferSource {
    fn read_frame(&mut self) -> Result<Option<RgbImage>> {
        Ok(self.frames.pop_front())
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_frames_then_ends() {
        let frames = vec![RgbImage::new(4, 2), RgbImage::new(4, 2)];
        let mut source = BufferSource::new(4, 2, frames);

        assert_eq!(source.resolution(), (4, 2));
        assert!(source.read_frame().unwrap().is_some());
        assert!(source.read_frame().unwrap().is_some());
        assert!(source.read_frame().unwrap().is_none());
    }
}
