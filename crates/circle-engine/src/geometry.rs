//! Bounding-box math and angular positions around the frame center.
//!
//! Angles are bearings in degrees from the frame center to a box center,
//! measured from the positive x-axis with y pointing up (counter-clockwise
//! on screen) and wrapped into `[0, 360)`.

use std::collections::BTreeMap;

use circle_models::{BoundingBox, FrameSize, IdentityId, TempTrack};

/// Intersection over union; zero for disjoint or degenerate boxes.
#[inline]
pub fn iou(a: &BoundingBox, b: &BoundingBox) -> f64 {
    a.iou(b)
}

/// True if either box is (near-)wholly enclosed by the other.
///
/// `ratio` is the fraction of the smaller box's area that must fall inside
/// the larger one. Catches a small box sitting inside a much larger one,
/// where IoU stays low.
pub fn contains(a: &BoundingBox, b: &BoundingBox, ratio: f64) -> bool {
    let smaller = a.area().min(b.area());
    if smaller <= 0.0 {
        return false;
    }
    a.intersection_area(b) / smaller >= ratio
}

/// Bearing of the box center around the frame center, in `[0, 360)`.
pub fn angle_of(bbox: &BoundingBox, frame: FrameSize) -> f64 {
    let (fx, fy) = frame.center();
    let dx = bbox.cx() - fx;
    let dy = fy - bbox.cy();
    normalize_degrees(dy.atan2(dx).to_degrees())
}

/// Angle of every identity's box.
pub fn angles_of(track: &TempTrack, frame: FrameSize) -> BTreeMap<IdentityId, f64> {
    track
        .iter()
        .map(|(id, bbox)| (id.clone(), angle_of(bbox, frame)))
        .collect()
}

/// Wrap an angle into `[0, 360)`.
#[inline]
pub fn normalize_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Distance travelled going from `from` to `to` in the increasing-angle
/// direction, in `[0, 360)`.
#[inline]
pub fn forward_span(from: f64, to: f64) -> f64 {
    normalize_degrees(to - from)
}

/// Enlarged search region around a track box, clipped to the frame.
pub fn roi_around(bbox: &BoundingBox, frame: FrameSize, scale: f64) -> BoundingBox {
    bbox.scale_about_center(scale).clip_to(frame)
}

/// True if the candidate's center falls inside the ROI built around `track_box`.
pub fn center_in_roi(
    track_box: &BoundingBox,
    candidate: &BoundingBox,
    frame: FrameSize,
    scale: f64,
) -> bool {
    roi_around(track_box, frame, scale).contains_point(candidate.cx(), candidate.cy())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> FrameSize {
        FrameSize::new(640, 640).unwrap()
    }

    fn centered_at(cx: f64, cy: f64) -> BoundingBox {
        BoundingBox::new(cx - 10.0, cy - 10.0, 20.0, 20.0)
    }

    #[test]
    fn test_iou_properties() {
        let a = BoundingBox::new(10.0, 20.0, 40.0, 30.0);
        let b = BoundingBox::new(30.0, 25.0, 40.0, 30.0);
        let far = BoundingBox::new(400.0, 400.0, 10.0, 10.0);

        assert_eq!(iou(&a, &a), 1.0);
        assert_eq!(iou(&a, &b), iou(&b, &a));
        assert_eq!(iou(&a, &far), 0.0);
    }

    #[test]
    fn test_contains_small_box_inside_large() {
        let large = BoundingBox::new(0.0, 0.0, 200.0, 200.0);
        let small = BoundingBox::new(50.0, 50.0, 20.0, 20.0);

        assert!(iou(&large, &small) < 0.05);
        assert!(contains(&large, &small, 0.9));
        assert!(contains(&small, &large, 0.9));
    }

    #[test]
    fn test_contains_partial_overlap_below_ratio() {
        let a = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        let b = BoundingBox::new(50.0, 0.0, 100.0, 100.0);

        assert!(!contains(&a, &b, 0.9));
        assert!(contains(&a, &b, 0.5));
    }

    #[test]
    fn test_contains_ignores_degenerate() {
        let a = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        let flat = BoundingBox::new(10.0, 10.0, 0.0, 0.0);
        assert!(!contains(&a, &flat, 0.9));
    }

    #[test]
    fn test_angle_cardinal_directions() {
        let f = frame();
        assert!((angle_of(&centered_at(500.0, 320.0), f) - 0.0).abs() < 1e-9);
        assert!((angle_of(&centered_at(320.0, 100.0), f) - 90.0).abs() < 1e-9);
        assert!((angle_of(&centered_at(100.0, 320.0), f) - 180.0).abs() < 1e-9);
        assert!((angle_of(&centered_at(320.0, 500.0), f) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_angle_is_wrapped() {
        let f = frame();
        let just_below_axis = centered_at(500.0, 321.0);
        let angle = angle_of(&just_below_axis, f);
        assert!(angle > 359.0 && angle < 360.0);
    }

    #[test]
    fn test_forward_span_wraps() {
        assert_eq!(forward_span(350.0, 10.0), 20.0);
        assert_eq!(forward_span(10.0, 350.0), 340.0);
        assert_eq!(forward_span(42.0, 42.0), 0.0);
    }

    #[test]
    fn test_center_in_roi() {
        let f = frame();
        let track = BoundingBox::new(100.0, 100.0, 40.0, 40.0);
        let near = BoundingBox::new(135.0, 135.0, 20.0, 20.0);
        let far = BoundingBox::new(300.0, 300.0, 20.0, 20.0);

        assert!(center_in_roi(&track, &near, f, 2.0));
        assert!(!center_in_roi(&track, &far, f, 2.0));
    }
}
