use image::{Rgb, RgbImage};

/// Pixel position inside a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

/// Selection progress of one marked area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AreaState {
    /// No corner chosen yet.
    Idle,
    /// First corner fixed, second following the pointer.
    Drawing { start: Point, current: Option<Point> },
    /// Both corners fixed.
    Committed { start: Point, end: Point },
}

/// A named rectangular region marked on top of the video.
#[derive(Debug, Clone)]
pub struct MarkedArea {
    name: String,
    color: Rgb<u8>,
    state: AreaState,
}

impl MarkedArea {
    pub fn new(name: impl Into<String>, color: Rgb<u8>) -> Self {
        Self {
            name: name.into(),
            color,
            state: AreaState::Idle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color(&self) -> Rgb<u8> {
        self.color
    }

    pub fn state(&self) -> AreaState {
        self.state
    }

    /// Fix the first corner. Pressing on a committed area starts it over.
    pub fn press(&mut self, x: u32, y: u32) {
        self.state = AreaState::Drawing {
            start: Point { x, y },
            current: None,
        };
    }

    /// Follow the pointer while the button is held.
    pub fn drag(&mut self, x: u32, y: u32) {
        if let AreaState::Drawing { start, .. } = self.state {
            self.state = AreaState::Drawing {
                start,
                current: Some(Point { x, y }),
            };
        }
    }

    /// Fix the second corner.
    pub fn release(&mut self, x: u32, y: u32) {
        if let AreaState::Drawing { start, .. } = self.state {
            self.state = AreaState::Committed {
                start,
                end: Point { x, y },
            };
        }
    }

    /// Corners normalized to (left, top, right, bottom). Available while
    /// dragging as well so the preview can show the rectangle in flight.
    pub fn bounds(&self) -> Option<(u32, u32, u32, u32)> {
        let (a, b) = match self.state {
            AreaState::Idle => return None,
            AreaState::Drawing { start, current } => (start, current?),
            AreaState::Committed { start, end } => (start, end),
        };
        Some((a.x.min(b.x), a.y.min(b.y), a.x.max(b.x), a.y.max(b.y)))
    }

    /// Cut the committed region out of `frame`, insetting every edge by
    /// `inset` pixels to drop the drawn border. Returns `None` while the
    /// area is uncommitted or when the inset leaves no pixels.
    pub fn crop(&self, frame: &RgbImage, inset: u32) -> Option<RgbImage> {
        if !matches!(self.state, AreaState::Committed { .. }) {
            return None;
        }
        let (left, top, right, bottom) = self.bounds()?;

        let right = right.min(frame.width());
        let bottom = bottom.min(frame.height());
        let x0 = left + inset;
        let y0 = top + inset;
        let x1 = right.saturating_sub(inset);
        let y1 = bottom.saturating_sub(inset);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        Some(image::imageops::crop_imm(frame, x0, y0, x1 - x0, y1 - y0).to_image())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area() -> MarkedArea {
        MarkedArea::new("area_0", Rgb([0, 0, 255]))
    }

    fn frame(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 0]))
    }

    #[test]
    fn starts_idle_without_bounds() {
        let a = area();
        assert_eq!(a.state(), AreaState::Idle);
        assert_eq!(a.bounds(), None);
    }

    #[test]
    fn drag_and_release_commit_the_rectangle() {
        let mut a = area();
        a.press(10, 20);
        assert_eq!(a.bounds(), None);

        a.drag(30, 40);
        assert_eq!(a.bounds(), Some((10, 20, 30, 40)));

        a.release(35, 45);
        assert_eq!(
            a.state(),
            AreaState::Committed {
                start: Point { x: 10, y: 20 },
                end: Point { x: 35, y: 45 },
            }
        );
    }

    #[test]
    fn bounds_normalize_inverted_corners() {
        let mut a = area();
        a.press(50, 60);
        a.release(10, 20);
        assert_eq!(a.bounds(), Some((10, 20, 50, 60)));
    }

    #[test]
    fn drag_without_press_is_ignored() {
        let mut a = area();
        a.drag(5, 5);
        a.release(9, 9);
        assert_eq!(a.state(), AreaState::Idle);
    }

    #[test]
    fn press_on_committed_area_restarts_it() {
        let mut a = area();
        a.press(1, 1);
        a.release(20, 20);
        a.press(3, 4);
        assert_eq!(
            a.state(),
            AreaState::Drawing {
                start: Point { x: 3, y: 4 },
                current: None,
            }
        );
    }

    #[test]
    fn crop_applies_the_inset() {
        let mut a = area();
        a.press(10, 10);
        a.release(40, 30);

        let crop = a.crop(&frame(100, 100), 5).unwrap();
        assert_eq!(crop.dimensions(), (20, 10));
        // Top-left crop pixel comes from (15, 15) in the frame.
        assert_eq!(crop.get_pixel(0, 0), &Rgb([15, 15, 0]));
    }

    #[test]
    fn crop_clamps_to_the_frame() {
        let mut a = area();
        a.press(10, 10);
        a.release(300, 300);

        let crop = a.crop(&frame(50, 40), 5).unwrap();
        assert_eq!(crop.dimensions(), (30, 20));
    }

    #[test]
    fn crop_rejects_uncommitted_or_tiny_areas() {
        let f = frame(100, 100);

        let mut drawing = area();
        drawing.press(10, 10);
        drawing.drag(40, 40);
        assert!(drawing.crop(&f, 5).is_none());

        let mut tiny = area();
        tiny.press(10, 10);
        tiny.release(18, 18);
        assert!(tiny.crop(&f, 5).is_none());
    }
}
