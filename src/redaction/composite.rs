//! Pure compositing of redaction rectangles onto an image

use super::geometry::Rect;
use image::{Pixel, Rgba, RgbaImage};

/// Opaque fill flattened into the exported image
pub const REDACTION_FILL: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Semi-transparent fill for the rectangle being drawn
pub const PREVIEW_FILL: Rgba<u8> = Rgba([0, 0, 0, 128]);

pub const PREVIEW_BORDER: Rgba<u8> = Rgba([220, 38, 38, 255]);

pub const PREVIEW_BORDER_WIDTH: u32 = 2;

/// Source image with every committed rectangle filled, plus an optional preview
pub fn composite(base: &RgbaImage, rects: &[Rect], preview: Option<&Rect>) -> RgbaImage {
    let mut canvas = base.clone();
    for rect in rects {
        fill(&mut canvas, rect, REDACTION_FILL);
    }
    if let Some(rect) = preview {
        blend(&mut canvas, rect, PREVIEW_FILL);
        stroke(&mut canvas, rect, PREVIEW_BORDER, PREVIEW_BORDER_WIDTH);
    }
    canvas
}

fn fill(canvas: &mut RgbaImage, rect: &Rect, color: Rgba<u8>) {
    let Some((x0, y0, x1, y1)) = rect.pixel_bounds(canvas.width(), canvas.height()) else {
        return;
    };
    for y in y0..y1 {
        for x in x0..x1 {
            canvas.put_pixel(x, y, color);
        }
    }
}

fn blend(canvas: &mut RgbaImage, rect: &Rect, color: Rgba<u8>) {
    let Some((x0, y0, x1, y1)) = rect.pixel_bounds(canvas.width(), canvas.height()) else {
        return;
    };
    for y in y0..y1 {
        for x in x0..x1 {
            canvas.get_pixel_mut(x, y).blend(&color);
        }
    }
}

fn stroke(canvas: &mut RgbaImage, rect: &Rect, color: Rgba<u8>, width: u32) {
    let Some((x0, y0, x1, y1)) = rect.pixel_bounds(canvas.width(), canvas.height()) else {
        return;
    };
    for y in y0..y1 {
        for x in x0..x1 {
            let on_edge = x < x0 + width || x + width >= x1 || y < y0 + width || y + width >= y1;
            if on_edge {
                canvas.put_pixel(x, y, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    fn white(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, WHITE)
    }

    fn rect(x: f64, y: f64, w: f64, h: f64) -> Rect {
        Rect { x, y, w, h }
    }

    #[test]
    fn test_committed_rects_are_opaque() {
        let out = composite(&white(20, 20), &[rect(2.0, 2.0, 5.0, 5.0)], None);
        assert_eq!(*out.get_pixel(2, 2), REDACTION_FILL);
        assert_eq!(*out.get_pixel(6, 6), REDACTION_FILL);
        assert_eq!(*out.get_pixel(7, 7), WHITE);
    }

    #[test]
    fn test_base_is_untouched() {
        let base = white(10, 10);
        let _ = composite(&base, &[rect(0.0, 0.0, 10.0, 10.0)], None);
        assert_eq!(*base.get_pixel(5, 5), WHITE);
    }

    #[test]
    fn test_preview_is_translucent_with_border() {
        let out = composite(&white(30, 30), &[], Some(&rect(5.0, 5.0, 20.0, 20.0)));
        assert_eq!(*out.get_pixel(5, 5), PREVIEW_BORDER);
        assert_eq!(*out.get_pixel(24, 15), PREVIEW_BORDER);

        let inner = out.get_pixel(15, 15);
        assert_ne!(*inner, WHITE);
        assert_ne!(*inner, REDACTION_FILL);
        assert_eq!(*out.get_pixel(2, 2), WHITE);
    }

    #[test]
    fn test_out_of_bounds_rect_is_clamped() {
        let out = composite(&white(10, 10), &[rect(8.0, -4.0, 50.0, 6.0)], None);
        assert_eq!(*out.get_pixel(9, 0), REDACTION_FILL);
        assert_eq!(*out.get_pixel(9, 1), REDACTION_FILL);
        assert_eq!(*out.get_pixel(9, 2), WHITE);
        assert_eq!(*out.get_pixel(7, 0), WHITE);
    }
}
