use super::area::MarkedArea;
use image::{Rgb, RgbImage};

const BORDER_THICKNESS: u32 = 2;

/// Outline every area that already has two corners onto the display frame.
pub fn draw_areas(frame: &mut RgbImage, areas: &[MarkedArea]) {
    for area in areas {
        if let Some((left, top, right, bottom)) = area.bounds() {
            draw_rect(
                frame,
                [left, top, right, bottom],
                area.color(),
                BORDER_THICKNESS,
            );
        }
    }
}

/// Draw a rectangle border with the given thickness, clamped to the frame.
pub fn draw_rect(frame: &mut RgbImage, rect: [u32; 4], color: Rgb<u8>, thickness: u32) {
    let (w, h) = frame.dimensions();
    if w == 0 || h == 0 {
        return;
    }
    let [x0, y0, x1, y1] = rect;
    for t in 0..thickness {
        let xx0 = x0.saturating_add(t);
        let yy0 = y0.saturating_add(t);
        let xx1 = x1.saturating_sub(t).min(w - 1);
        let yy1 = y1.saturating_sub(t).min(h - 1);
        if xx0 >= w || yy0 >= h || xx0 > xx1 || yy0 > yy1 {
            continue;
        }
        for x in xx0..=xx1 {
            frame.put_pixel(x, yy0, color);
            frame.put_pixel(x, yy1, color);
        }
        for y in yy0..=yy1 {
            frame.put_pixel(xx0, y, color);
            frame.put_pixel(xx1, y, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgb<u8> = Rgb([255, 0, 0]);

    #[test]
    fn draws_the_border_and_leaves_the_interior() {
        let mut frame = RgbImage::new(20, 20);
        draw_rect(&mut frame, [2, 3, 10, 8], RED, 1);

        assert_eq!(frame.get_pixel(2, 3), &RED);
        assert_eq!(frame.get_pixel(10, 8), &RED);
        assert_eq!(frame.get_pixel(6, 3), &RED);
        assert_eq!(frame.get_pixel(2, 6), &RED);
        assert_eq!(frame.get_pixel(6, 6), &Rgb([0, 0, 0]));
    }

    #[test]
    fn clamps_rectangles_that_leave_the_frame() {
        let mut frame = RgbImage::new(20, 20);
        draw_rect(&mut frame, [5, 5, 100, 100], RED, 1);

        assert_eq!(frame.get_pixel(19, 5), &RED);
        assert_eq!(frame.get_pixel(5, 19), &RED);
    }

    #[test]
    fn draws_only_areas_with_two_corners() {
        let mut frame = RgbImage::new(20, 20);
        let mut committed = MarkedArea::new("area_0", RED);
        committed.press(1, 1);
        committed.release(6, 6);
        let idle = MarkedArea::new("area_1", RED);

        draw_areas(&mut frame, &[committed, idle]);
        assert_eq!(frame.get_pixel(1, 1), &RED);
    }
}
