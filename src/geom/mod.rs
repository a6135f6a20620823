//! Box geometry in the `(y0, x0, y1, x1)` convention.
//!
//! The first coordinate pair is the origin corner, the second the opposite
//! corner, so `y1 >= y0` and `x1 >= x0` always hold for a constructed box.
//! All coordinates are input-image units. Integrators feeding boxes from an
//! `(x0, y0, x1, y1)` producer must transpose at the boundary; nothing inside
//! this crate will detect a swapped convention.

use crate::util::{DenseDetError, DenseDetResult};

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    /// Origin-corner row coordinate.
    pub y0: f32,
    /// Origin-corner column coordinate.
    pub x0: f32,
    /// Opposite-corner row coordinate.
    pub y1: f32,
    /// Opposite-corner column coordinate.
    pub x1: f32,
}

impl BoundingBox {
    /// Creates a box, rejecting non-finite or out-of-order corners.
    pub fn new(y0: f32, x0: f32, y1: f32, x1: f32) -> DenseDetResult<Self> {
        let finite = y0.is_finite() && x0.is_finite() && y1.is_finite() && x1.is_finite();
        if !finite || y1 < y0 || x1 < x0 {
            return Err(DenseDetError::InvalidBox { y0, x0, y1, x1 });
        }
        Ok(Self { y0, x0, y1, x1 })
    }

    /// Box height `y1 - y0`.
    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Box width `x1 - x0`.
    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    /// Box area.
    pub fn area(&self) -> f32 {
        self.height() * self.width()
    }

    /// Length of the longer side.
    pub fn max_side(&self) -> f32 {
        self.height().max(self.width())
    }

    /// Center as `(y, x)`.
    pub fn center(&self) -> (f32, f32) {
        (
            self.y0 + self.height() / 2.0,
            self.x0 + self.width() / 2.0,
        )
    }

    /// True when `(y, x)` lies strictly inside the box.
    pub fn contains_strict(&self, y: f32, x: f32) -> bool {
        y > self.y0 && y < self.y1 && x > self.x0 && x < self.x1
    }

    /// Perpendicular distances from `(y, x)` to the four edges.
    pub fn edge_distances(&self, y: f32, x: f32) -> EdgeDistances {
        EdgeDistances {
            top: y - self.y0,
            left: x - self.x0,
            bottom: self.y1 - y,
            right: self.x1 - x,
        }
    }

    /// Intersection-over-union with another box.
    ///
    /// Returns 0 when the union has no area, so zero-area boxes are safe.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let inter_h = (self.y1.min(other.y1) - self.y0.max(other.y0)).max(0.0);
        let inter_w = (self.x1.min(other.x1) - self.x0.max(other.x0)).max(0.0);
        let intersection = inter_h * inter_w;
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            return 0.0;
        }
        intersection / union
    }
}

/// Distances from a location to its assigned box's edges, input-image units,
/// in `(top, left, bottom, right)` order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeDistances {
    pub top: f32,
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
}

/// Ground-truth boxes with parallel class labels for one image.
#[derive(Clone, Debug, PartialEq)]
pub struct BoxSet {
    boxes: Vec<BoundingBox>,
    labels: Vec<usize>,
}

impl BoxSet {
    /// Creates a box set, rejecting mismatched sequence lengths.
    ///
    /// Labels are validated against the class count by the encoder consuming
    /// the set, not here.
    pub fn new(boxes: Vec<BoundingBox>, labels: Vec<usize>) -> DenseDetResult<Self> {
        if boxes.len() != labels.len() {
            return Err(DenseDetError::LengthMismatch {
                context: "boxes vs labels",
                left: boxes.len(),
                right: labels.len(),
            });
        }
        Ok(Self { boxes, labels })
    }

    /// Number of boxes.
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    /// True when the set has no boxes.
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// All boxes in insertion order.
    pub fn boxes(&self) -> &[BoundingBox] {
        &self.boxes
    }

    /// Labels parallel to `boxes()`.
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Iterates `(box, label)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&BoundingBox, usize)> {
        self.boxes.iter().zip(self.labels.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::BoundingBox;

    #[test]
    fn iou_of_identical_boxes_is_one() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0).unwrap();
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn iou_of_disjoint_boxes_is_zero() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0).unwrap();
        let b = BoundingBox::new(20.0, 20.0, 30.0, 30.0).unwrap();
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn iou_of_half_overlapping_boxes() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0).unwrap();
        let b = BoundingBox::new(0.0, 5.0, 10.0, 15.0).unwrap();
        // intersection 50, union 150
        assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-6);
    }
}
