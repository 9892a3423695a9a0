//! Pixel-space geometry primitives.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Bounding box in pixel coordinates.
///
/// Trackers may emit degenerate boxes (zero or negative extent). They are
/// carried through unchanged and treated as zero-area by every overlap
/// computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BoundingBox {
    /// Left edge x-coordinate
    pub x: f64,
    /// Top edge y-coordinate
    pub y: f64,
    /// Box width
    pub width: f64,
    /// Box height
    pub height: f64,
}

impl BoundingBox {
    /// Create a new bounding box.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// A zero-extent box sitting at the given point.
    pub fn degenerate_at(cx: f64, cy: f64) -> Self {
        Self::new(cx, cy, 0.0, 0.0)
    }

    /// Center x-coordinate.
    #[inline]
    pub fn cx(&self) -> f64 {
        self.x + self.width / 2.0
    }

    /// Center y-coordinate.
    #[inline]
    pub fn cy(&self) -> f64 {
        self.y + self.height / 2.0
    }

    /// Right edge x-coordinate.
    #[inline]
    pub fn x2(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge y-coordinate.
    #[inline]
    pub fn y2(&self) -> f64 {
        self.y + self.height
    }

    /// True when the box has no positive area.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Box area in pixels; zero for degenerate boxes.
    #[inline]
    pub fn area(&self) -> f64 {
        if self.is_degenerate() {
            0.0
        } else {
            self.width * self.height
        }
    }

    /// Area of the overlap with another box.
    pub fn intersection_area(&self, other: &BoundingBox) -> f64 {
        if self.is_degenerate() || other.is_degenerate() {
            return 0.0;
        }

        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.x2().min(other.x2());
        let y2 = self.y2().min(other.y2());

        if x2 <= x1 || y2 <= y1 {
            return 0.0;
        }

        (x2 - x1) * (y2 - y1)
    }

    /// Compute Intersection over Union with another box.
    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let intersection = self.intersection_area(other);
        if intersection <= 0.0 {
            return 0.0;
        }

        let union = self.area() + other.area() - intersection;

        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }

    /// True if the point lies inside the box (edges inclusive).
    pub fn contains_point(&self, px: f64, py: f64) -> bool {
        !self.is_degenerate() && px >= self.x && px <= self.x2() && py >= self.y && py <= self.y2()
    }

    /// Return a box with the same center and both sides multiplied by `factor`.
    pub fn scale_about_center(&self, factor: f64) -> BoundingBox {
        let width = self.width * factor;
        let height = self.height * factor;
        BoundingBox {
            x: self.cx() - width / 2.0,
            y: self.cy() - height / 2.0,
            width,
            height,
        }
    }

    /// Intersect the box with the frame rectangle.
    ///
    /// Boxes entirely outside the frame come back degenerate.
    pub fn clip_to(&self, frame: FrameSize) -> BoundingBox {
        let x1 = self.x.max(0.0);
        let y1 = self.y.max(0.0);
        let x2 = self.x2().min(frame.width as f64);
        let y2 = self.y2().min(frame.height as f64);

        BoundingBox {
            x: x1,
            y: y1,
            width: (x2 - x1).max(0.0),
            height: (y2 - y1).max(0.0),
        }
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from(v: [f64; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

/// Frame dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    /// Create a validated frame size.
    pub fn new(width: u32, height: u32) -> ModelResult<Self> {
        if width == 0 || height == 0 {
            return Err(ModelError::InvalidFrameSize { width, height });
        }
        Ok(Self { width, height })
    }

    /// Frame center as (x, y).
    pub fn center(&self) -> (f64, f64) {
        (self.width as f64 / 2.0, self.height as f64 / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_iou() {
        let box1 = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        let box2 = BoundingBox::new(50.0, 50.0, 100.0, 100.0);

        let iou = box1.iou(&box2);
        // Intersection: 50x50 = 2500
        // Union: 10000 + 10000 - 2500 = 17500
        assert!((iou - 0.1428).abs() < 0.01);
    }

    #[test]
    fn test_bounding_box_no_overlap() {
        let box1 = BoundingBox::new(0.0, 0.0, 50.0, 50.0);
        let box2 = BoundingBox::new(100.0, 100.0, 50.0, 50.0);

        assert_eq!(box1.iou(&box2), 0.0);
    }

    #[test]
    fn test_degenerate_box_has_zero_overlap() {
        let real = BoundingBox::new(0.0, 0.0, 50.0, 50.0);
        let flat = BoundingBox::new(10.0, 10.0, 20.0, 0.0);
        let negative = BoundingBox::new(10.0, 10.0, -5.0, 20.0);

        assert_eq!(flat.area(), 0.0);
        assert_eq!(negative.area(), 0.0);
        assert_eq!(real.iou(&flat), 0.0);
        assert_eq!(negative.iou(&real), 0.0);
        assert_eq!(flat.iou(&flat), 0.0);
    }

    #[test]
    fn test_scale_about_center_keeps_center() {
        let b = BoundingBox::new(100.0, 100.0, 40.0, 20.0);
        let roi = b.scale_about_center(2.0);

        assert_eq!(roi.cx(), b.cx());
        assert_eq!(roi.cy(), b.cy());
        assert_eq!(roi.width, 80.0);
        assert_eq!(roi.height, 40.0);
    }

    #[test]
    fn test_clip_to_frame() {
        let frame = FrameSize::new(100, 100).unwrap();
        let clipped = BoundingBox::new(-10.0, 90.0, 30.0, 30.0).clip_to(frame);

        assert_eq!(clipped, BoundingBox::new(0.0, 90.0, 20.0, 10.0));
        assert!(BoundingBox::new(200.0, 200.0, 10.0, 10.0)
            .clip_to(frame)
            .is_degenerate());
    }

    #[test]
    fn test_frame_size_rejects_zero() {
        assert!(FrameSize::new(0, 480).is_err());
        assert_eq!(FrameSize::new(640, 480).unwrap().center(), (320.0, 240.0));
    }
}
