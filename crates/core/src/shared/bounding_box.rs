use crate::shared::constants::{SCAN_BAND_HALF_HEIGHT, SCAN_BAND_INSET};

/// A point in frame coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A quadrilateral region hypothesized to contain a barcode.
///
/// Corners are stored in the order the locator emits them; axis-aligned
/// helpers use top-left, top-right, bottom-right, bottom-left.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundingBox {
    corners: [Point; 4],
}

impl BoundingBox {
    pub fn new(corners: [Point; 4]) -> Self {
        Self { corners }
    }

    /// Axis-aligned rectangle from origin and extent.
    pub fn axis_aligned(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::new([
            Point::new(x, y),
            Point::new(x + width, y),
            Point::new(x + width, y + height),
            Point::new(x, y + height),
        ])
    }

    /// The fixed horizontal band used in place of a locator when locating
    /// is disabled: inset from the left and right edges, 2 * half-height
    /// tall, centered vertically.
    pub fn scan_band(frame_width: u32, frame_height: u32) -> Self {
        let mid = frame_height as f32 / 2.0;
        Self::new([
            Point::new(SCAN_BAND_INSET, mid - SCAN_BAND_HALF_HEIGHT),
            Point::new(SCAN_BAND_INSET, mid + SCAN_BAND_HALF_HEIGHT),
            Point::new(frame_width as f32 - SCAN_BAND_INSET, mid + SCAN_BAND_HALF_HEIGHT),
            Point::new(frame_width as f32 - SCAN_BAND_INSET, mid - SCAN_BAND_HALF_HEIGHT),
        ])
    }

    pub fn corners(&self) -> &[Point; 4] {
        &self.corners
    }

    pub fn centroid(&self) -> Point {
        let (sx, sy) = self
            .corners
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        Point::new(sx / 4.0, sy / 4.0)
    }
}
