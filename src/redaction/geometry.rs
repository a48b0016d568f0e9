//! Coordinate mapping between the displayed canvas and native pixels

/// Minimum rectangle size in native pixels to avoid accidental clicks
pub const MIN_RECT_SIZE: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in native image coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    /// Rectangle spanned by two drag corners (handles negative width/height)
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            w: (b.x - a.x).abs(),
            h: (b.y - a.y).abs(),
        }
    }

    pub fn meets_minimum(&self) -> bool {
        self.w >= MIN_RECT_SIZE && self.h >= MIN_RECT_SIZE
    }

    /// Pixel span `(x0, y0, x1, y1)` clamped to the image, end-exclusive
    ///
    /// `None` when nothing of the rectangle lies inside the image.
    pub fn pixel_bounds(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let clamp = |v: f64, max: u32| v.max(0.0).min(max as f64) as u32;
        let x0 = clamp(self.x.floor(), width);
        let y0 = clamp(self.y.floor(), height);
        let x1 = clamp((self.x + self.w).ceil(), width);
        let y1 = clamp((self.y + self.h).ceil(), height);
        (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
    }
}

/// Per-axis scale from displayed size to native size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportScale {
    sx: f64,
    sy: f64,
}

impl ViewportScale {
    /// A zero or negative displayed dimension falls back to 1:1 on that axis.
    pub fn new(native: (u32, u32), displayed: (f64, f64)) -> Self {
        let axis = |native: u32, shown: f64| {
            if shown > 0.0 {
                native as f64 / shown
            } else {
                1.0
            }
        };
        Self {
            sx: axis(native.0, displayed.0),
            sy: axis(native.1, displayed.1),
        }
    }

    pub fn identity() -> Self {
        Self { sx: 1.0, sy: 1.0 }
    }

    pub fn to_native(&self, p: Point) -> Point {
        Point::new(p.x * self.sx, p.y * self.sy)
    }
}
