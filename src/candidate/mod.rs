//! Candidate extraction and pruning.
//!
//! Decoding turns dense per-level prediction maps into a flat candidate
//! list; non-maximum suppression prunes overlapping candidates per class.

pub(crate) mod decode;
pub(crate) mod nms;

use crate::geom::BoundingBox;

/// One decoded detection candidate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    /// Candidate box in input-image coordinates.
    pub bbox: BoundingBox,
    /// Predicted class index.
    pub label: usize,
    /// Class confidence times center-ness, in `[0, 1]`.
    pub score: f32,
}
